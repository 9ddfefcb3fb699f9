//! Test server backed by the Postgres database at `TEST_DATABASE_URL`.
//! Tests return early when it is unset.

use fred::prelude::{Builder, Config, Pool};
use rocket::{
    fairing::AdHoc,
    http::{ContentType, Header, Status},
    local::asynchronous::{Client, LocalResponse},
};
use rocket_okapi::settings::OpenApiSettings;
use serde_json::{json, Value};
use tempfile::TempDir;
use tenant_rag_api::{
    api,
    auth::{setup_encryption, setup_jwt},
    config::AppConfig,
    db::{setup_db, DbConnection, DbPool},
    provider::setup_providers,
    storage::setup_storage,
};

/// Serializes server startup so that migrations run once at a time
static STARTUP: tokio::sync::Mutex<()> = tokio::sync::Mutex::const_new(());

const SECRET_KEY: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

pub struct TestServer {
    pub client: Client,
    pub upload_dir: TempDir,
}

impl TestServer {
    pub async fn start() -> Option<Self> {
        let Ok(database_url) = std::env::var("TEST_DATABASE_URL") else {
            eprintln!("TEST_DATABASE_URL not set, skipping");
            return None;
        };
        let upload_dir = tempfile::tempdir().unwrap();
        let figment = rocket::Config::figment()
            .merge(("log_level", "off"))
            .merge(("database_url", database_url))
            .merge(("redis_url", "redis://127.0.0.1:6379"))
            .merge(("secret_key", SECRET_KEY))
            .merge(("jwt_secret", "integration-test"))
            .merge(("upload_dir", upload_dir.path().to_string_lossy().to_string()))
            // Nothing listens here, so every embedding request fails
            .merge(("ollama_base_url", "http://127.0.0.1:9"))
            .merge(("embedding_timeout", 1));

        // Managed but never connected: these tests don't touch the cache
        let redis: Pool = Builder::from_config(Config::from_url("redis://127.0.0.1:6379").unwrap())
            .build_pool(1)
            .unwrap();

        let settings = OpenApiSettings::default();
        let rocket = rocket::custom(figment)
            .attach(AdHoc::config::<AppConfig>())
            .attach(setup_db())
            .attach(setup_encryption())
            .attach(setup_jwt())
            .attach(setup_providers())
            .attach(setup_storage())
            .manage(redis)
            .mount("/service/user", api::user_routes(&settings).0)
            .mount("/service/ai", api::chat_routes(&settings).0);

        let _guard = STARTUP.lock().await;
        let client = Client::tracked(rocket).await.unwrap();
        Some(Self { client, upload_dir })
    }

    pub async fn db(&self) -> DbConnection {
        let pool = self.client.rocket().state::<DbPool>().unwrap();
        DbConnection(pool.get().await.unwrap())
    }

    /// Register a fresh user. Returns `(user_id, token)`.
    pub async fn register(&self, account: &str, email: &str, password: &str) -> (String, String) {
        let response = self
            .post_json(
                "/service/user/register",
                json!({
                    "userAccount": account,
                    "email": email,
                    "username": account,
                    "password": password,
                }),
            )
            .await;
        assert_eq!(response.status(), Status::Ok);
        let body = body_json(response).await;
        (
            body["data"]["id"].as_str().unwrap().to_owned(),
            body["token"].as_str().unwrap().to_owned(),
        )
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> LocalResponse<'_> {
        self.client
            .post(uri.to_owned())
            .header(ContentType::JSON)
            .body(body.to_string())
            .dispatch()
            .await
    }
}

pub fn bearer(token: &str) -> Header<'static> {
    Header::new("Authorization", format!("Bearer {token}"))
}

pub async fn body_json(response: LocalResponse<'_>) -> Value {
    response.into_json::<Value>().await.unwrap()
}

/// Unique suffix so tests can share one database
pub fn unique(prefix: &str) -> String {
    format!("{prefix}{}", &uuid::Uuid::new_v4().simple().to_string()[..12])
}
