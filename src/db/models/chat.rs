use chrono::{DateTime, Utc};
use diesel::{
    prelude::{AsChangeset, Identifiable, Insertable, Queryable},
    Selectable,
};
use enum_iterator::Sequence;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A persisted conversation turn
#[derive(Debug, Clone, Identifiable, Queryable, Selectable, JsonSchema, Serialize)]
#[diesel(table_name = super::schema::chat_history)]
#[serde(rename_all = "camelCase")]
pub struct ChatHistory {
    pub id: i32,
    pub user_id: String,
    pub chat_id: String,
    pub model_name: String,
    pub files: Option<String>,
    pub prompt: String,
    pub content: String,
    pub think_content: Option<String>,
    pub response_content: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = super::schema::chat_history)]
pub struct NewChatHistory {
    pub user_id: String,
    pub chat_id: String,
    pub model_name: String,
    pub files: Option<String>,
    pub prompt: String,
    pub content: String,
    pub think_content: Option<String>,
    pub response_content: Option<String>,
}

/// The API type of a chat model's runtime
#[derive(diesel_derive_enum::DbEnum)]
#[db_enum(existing_type_path = "crate::db::schema::sql_types::LlmProvider")]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Sequence, JsonSchema, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProviderType {
    Ollama,
    Openai,
    Lorem,
}

/// A chat model that can be selected in a conversation
#[derive(Debug, Clone, Identifiable, Queryable, Selectable, JsonSchema, Serialize)]
#[diesel(table_name = super::schema::chat_model_configs)]
#[serde(rename_all = "camelCase")]
pub struct ChatModelConfig {
    pub id: i32,
    pub provider_type: LlmProviderType,
    pub model_name: String,
    pub display_name: Option<String>,
    pub base_url: Option<String>,
    #[serde(skip)]
    pub api_key_ciphertext: Option<Vec<u8>>,
    #[serde(skip)]
    pub api_key_nonce: Option<Vec<u8>>,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChatModelConfig {
    pub fn has_api_key(&self) -> bool {
        self.api_key_ciphertext.is_some() && self.api_key_nonce.is_some()
    }
}

#[derive(Insertable)]
#[diesel(table_name = super::schema::chat_model_configs)]
pub struct NewChatModelConfig<'r> {
    pub provider_type: LlmProviderType,
    pub model_name: &'r str,
    pub display_name: Option<&'r str>,
    pub base_url: Option<&'r str>,
    pub api_key_ciphertext: Option<&'r [u8]>,
    pub api_key_nonce: Option<&'r [u8]>,
    pub enabled: bool,
}

#[derive(AsChangeset, Default)]
#[diesel(table_name = super::schema::chat_model_configs)]
pub struct UpdateChatModelConfig<'r> {
    pub provider_type: Option<LlmProviderType>,
    pub display_name: Option<&'r str>,
    pub base_url: Option<&'r str>,
    pub api_key_ciphertext: Option<&'r [u8]>,
    pub api_key_nonce: Option<&'r [u8]>,
    pub enabled: Option<bool>,
    pub updated_at: Option<DateTime<Utc>>,
}
