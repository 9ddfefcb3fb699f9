use chrono::{DateTime, Utc};
use diesel::{
    prelude::{AsChangeset, Associations, Identifiable, Insertable, Queryable},
    Selectable,
};
use schemars::JsonSchema;
use serde::Serialize;

use crate::db::models::Tenant;

#[derive(Debug, Clone, Identifiable, Queryable, Selectable, JsonSchema, Serialize)]
#[diesel(table_name = super::schema::prompt_categories)]
#[serde(rename_all = "camelCase")]
pub struct PromptCategory {
    pub id: String,
    pub category: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A system-provided prompt template
#[derive(
    Debug, Clone, Identifiable, Queryable, Selectable, Associations, JsonSchema, Serialize,
)]
#[diesel(belongs_to(PromptCategory, foreign_key = category_id))]
#[diesel(table_name = super::schema::prompt_templates)]
#[serde(rename_all = "camelCase")]
pub struct PromptTemplate {
    pub id: String,
    pub category_id: Option<String>,
    pub title: Option<String>,
    pub prompt: String,
    pub disabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A user's favorite prompt template within a tenant
#[derive(Debug, Clone, Identifiable, Queryable, Selectable, JsonSchema, Serialize)]
#[diesel(table_name = super::schema::prompt_collections)]
#[serde(rename_all = "camelCase")]
pub struct PromptCollection {
    pub id: String,
    pub prompt_id: String,
    pub category_id: Option<String>,
    pub tenant_id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = super::schema::prompt_collections)]
pub struct NewPromptCollection<'r> {
    pub id: &'r str,
    pub prompt_id: &'r str,
    pub category_id: Option<&'r str>,
    pub tenant_id: &'r str,
    pub user_id: &'r str,
}

/// A prompt authored by a member of a tenant
#[derive(
    Debug, Clone, Identifiable, Queryable, Selectable, Associations, JsonSchema, Serialize,
)]
#[diesel(belongs_to(Tenant, foreign_key = tenant_id))]
#[diesel(table_name = super::schema::tenant_prompts)]
#[serde(rename_all = "camelCase")]
pub struct TenantPrompt {
    pub id: String,
    pub tenant_id: String,
    pub user_id: String,
    pub title: String,
    pub content: String,
    pub disabled: bool,
    pub industry: Option<String>,
    pub tags: Option<String>,
    pub created_by: String,
    pub updated_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = super::schema::tenant_prompts)]
pub struct NewTenantPrompt<'r> {
    pub id: &'r str,
    pub tenant_id: &'r str,
    pub user_id: &'r str,
    pub title: &'r str,
    pub content: &'r str,
    pub industry: Option<&'r str>,
    pub tags: Option<&'r str>,
    pub created_by: &'r str,
}

#[derive(AsChangeset, Default)]
#[diesel(table_name = super::schema::tenant_prompts)]
pub struct UpdateTenantPrompt<'r> {
    pub title: Option<&'r str>,
    pub content: Option<&'r str>,
    pub disabled: Option<bool>,
    pub industry: Option<&'r str>,
    pub tags: Option<&'r str>,
    pub updated_by: Option<&'r str>,
    pub updated_at: Option<DateTime<Utc>>,
}
