use chrono::{DateTime, Utc};
use diesel::{
    prelude::{Associations, Identifiable, Insertable, Queryable},
    Selectable,
};
use pgvector::Vector;
use schemars::JsonSchema;
use serde::Serialize;
use uuid::Uuid;

use crate::db::models::User;

/// The directory that documents belong to when none is chosen
pub const PUBLIC_DIRECTORY: &str = "public";

#[derive(
    Debug, Clone, Identifiable, Queryable, Selectable, Associations, JsonSchema, Serialize,
)]
#[diesel(belongs_to(User, foreign_key = user_id))]
#[diesel(table_name = super::schema::chat_directories)]
#[serde(rename_all = "camelCase")]
pub struct ChatDirectory {
    pub id: String,
    pub user_id: String,
    pub tenant_id: Option<String>,
    pub directory: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = super::schema::chat_directories)]
pub struct NewChatDirectory<'r> {
    pub id: &'r str,
    pub user_id: &'r str,
    pub tenant_id: Option<&'r str>,
    pub directory: &'r str,
}

#[derive(
    Debug, Clone, Identifiable, Queryable, Selectable, Associations, JsonSchema, Serialize,
)]
#[diesel(belongs_to(User, foreign_key = user_id))]
#[diesel(table_name = super::schema::chat_documents)]
#[serde(rename_all = "camelCase")]
pub struct ChatDocument {
    pub id: String,
    pub user_id: String,
    pub tenant_id: Option<String>,
    pub directory_id: String,
    pub name: String,
    pub ext: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = super::schema::chat_documents)]
pub struct NewChatDocument<'r> {
    pub id: &'r str,
    pub user_id: &'r str,
    pub tenant_id: Option<&'r str>,
    pub directory_id: &'r str,
    pub name: &'r str,
    pub ext: &'r str,
}

/// An indexed chunk as returned by similarity search
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = super::schema::document_chunks)]
pub struct ChunkHit {
    pub filename: String,
    pub page: i32,
    pub content: String,
}

#[derive(Insertable)]
#[diesel(table_name = super::schema::document_chunks)]
pub struct NewDocumentChunk<'r> {
    pub id: Uuid,
    pub doc_id: &'r str,
    pub user_id: &'r str,
    pub tenant_id: Option<&'r str>,
    pub directory_id: &'r str,
    pub filename: &'r str,
    pub page: i32,
    pub content: &'r str,
    pub embedding: Vector,
}
