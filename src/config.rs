use rocket::{
    figment::{
        providers::{Env, Format, Toml},
        Figment,
    },
    Build, Rocket,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TOKEN_EXPIRE_MINUTES: i64 = 43_200;
pub const DEFAULT_UPLOAD_DIR: &str = "uploads";
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text:latest";
pub const DEFAULT_EMBEDDING_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful and knowledgeable AI assistant. Answer the user's questions accurately and concisely.";

/// Main server config (settings are merged with Rocket's default config)
#[derive(Debug, Serialize, Deserialize)]
pub struct AppConfig {
    /// Postgres database URL
    pub database_url: String,
    /// Max Postgres pool size (default: 16)
    pub database_pool: Option<usize>,
    /// Redis connection URL
    pub redis_url: String,
    /// Redis pool size (default: 4)
    pub redis_pool: Option<usize>,
    /// 64-character hex key used to encrypt the API keys of chat models
    pub secret_key: String,
    /// HS256 secret for signing access tokens
    pub jwt_secret: String,
    /// Access token lifetime in minutes (default: 30 days)
    pub access_token_expire_minutes: Option<i64>,
    /// Directory for uploaded documents (default: `uploads`)
    pub upload_dir: Option<String>,
    /// Base URL of the Ollama runtime used for embeddings and default chat models
    pub ollama_base_url: Option<String>,
    /// Embedding model name
    pub embedding_model: Option<String>,
    /// Embedding request timeout in seconds
    pub embedding_timeout: Option<u64>,
    /// System prompt prepended to every conversation
    pub system_prompt: Option<String>,
}

impl AppConfig {
    pub fn token_expire_minutes(&self) -> i64 {
        self.access_token_expire_minutes
            .unwrap_or(DEFAULT_TOKEN_EXPIRE_MINUTES)
    }

    pub fn upload_dir(&self) -> &str {
        self.upload_dir.as_deref().unwrap_or(DEFAULT_UPLOAD_DIR)
    }

    pub fn ollama_base_url(&self) -> &str {
        self.ollama_base_url.as_deref().unwrap_or(DEFAULT_OLLAMA_URL)
    }

    pub fn embedding_model(&self) -> &str {
        self.embedding_model
            .as_deref()
            .unwrap_or(DEFAULT_EMBEDDING_MODEL)
    }

    pub fn embedding_timeout(&self) -> u64 {
        self.embedding_timeout
            .unwrap_or(DEFAULT_EMBEDDING_TIMEOUT_SECS)
    }

    pub fn system_prompt(&self) -> &str {
        self.system_prompt.as_deref().unwrap_or(DEFAULT_SYSTEM_PROMPT)
    }
}

/// Get the server configuration variables from Rocket
pub fn get_app_config(rocket: &Rocket<Build>) -> &AppConfig {
    rocket
        .state::<AppConfig>()
        .expect("Server configuration not loaded")
}

/// Builds and returns a Figment configuration provider that merges settings from:
/// 1. Default Rocket config
/// 2. Rocket.toml file
/// 3. Environment variables prefixed with `TENANT_RAG_`. In debug/dev mode, will load
///    variables from local `.env` file
pub fn get_config_provider() -> Figment {
    #[cfg(debug_assertions)]
    if let Err(e) = dotenvy::dotenv() {
        println!("Failed to read .env file: {}", e);
    }

    Figment::from(rocket::Config::default())
        .merge(Toml::file("Rocket.toml").nested())
        .merge(Env::prefixed("TENANT_RAG_").global())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_config() -> AppConfig {
        Figment::new()
            .merge(("database_url", "postgres://localhost/rag"))
            .merge(("redis_url", "redis://localhost"))
            .merge(("secret_key", "00".repeat(32)))
            .merge(("jwt_secret", "jwt-secret"))
            .extract()
            .expect("minimal config should deserialize")
    }

    #[test]
    fn optional_settings_fall_back_to_defaults() {
        let config = minimal_config();
        assert_eq!(config.token_expire_minutes(), DEFAULT_TOKEN_EXPIRE_MINUTES);
        assert_eq!(config.upload_dir(), DEFAULT_UPLOAD_DIR);
        assert_eq!(config.ollama_base_url(), DEFAULT_OLLAMA_URL);
        assert_eq!(config.embedding_model(), DEFAULT_EMBEDDING_MODEL);
        assert_eq!(config.embedding_timeout(), DEFAULT_EMBEDDING_TIMEOUT_SECS);
        assert_eq!(config.system_prompt(), DEFAULT_SYSTEM_PROMPT);
    }

    #[test]
    fn explicit_settings_override_defaults() {
        let config: AppConfig = Figment::new()
            .merge(rocket::figment::providers::Serialized::defaults(minimal_config()))
            .merge(("upload_dir", "/data/uploads"))
            .merge(("access_token_expire_minutes", 60))
            .extract()
            .expect("config should deserialize");
        assert_eq!(config.upload_dir(), "/data/uploads");
        assert_eq!(config.token_expire_minutes(), 60);
    }
}
