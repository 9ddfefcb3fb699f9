use chrono::{DateTime, Utc};
use diesel::{
    prelude::{AsChangeset, Identifiable, Insertable, Queryable},
    Selectable,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Registered user account
#[derive(Debug, Clone, Identifiable, Queryable, Selectable, JsonSchema, Serialize)]
#[diesel(table_name = super::schema::users)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub user_account: String,
    #[serde(skip)]
    pub password_hash: String,
    pub username: String,
    pub telephone: Option<String>,
    pub email: Option<String>,
    pub avatar: Option<String>,
    pub birthday: Option<String>,
    pub sex: Option<String>,
    pub role: Option<String>,
    pub sign: Option<String>,
    pub region: Option<String>,
    pub disabled: bool,
    pub permission: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The user profile embedded in access tokens. Never contains the password hash.
#[derive(Debug, Clone, PartialEq, JsonSchema, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub user_account: String,
    pub username: String,
    pub email: Option<String>,
    pub telephone: Option<String>,
    pub avatar: Option<String>,
    pub role: Option<String>,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub permission: i32,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        UserProfile {
            id: user.id.clone(),
            user_account: user.user_account.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            telephone: user.telephone.clone(),
            avatar: user.avatar.clone(),
            role: user.role.clone(),
            disabled: user.disabled,
            permission: user.permission,
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = super::schema::users)]
pub struct NewUser<'r> {
    pub id: &'r str,
    pub user_account: &'r str,
    pub password_hash: &'r str,
    pub username: &'r str,
    pub email: Option<&'r str>,
    pub telephone: Option<&'r str>,
    pub birthday: Option<&'r str>,
    pub sex: Option<&'r str>,
    pub sign: Option<&'r str>,
    pub region: Option<&'r str>,
}

#[derive(AsChangeset, Default)]
#[diesel(table_name = super::schema::users)]
pub struct UpdateUser<'r> {
    pub username: Option<&'r str>,
    pub telephone: Option<&'r str>,
    pub email: Option<&'r str>,
    pub avatar: Option<&'r str>,
    pub birthday: Option<&'r str>,
    pub sex: Option<&'r str>,
    pub role: Option<&'r str>,
    pub sign: Option<&'r str>,
    pub region: Option<&'r str>,
    pub password_hash: Option<&'r str>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A user row in search results, flagged with membership of the searched tenant
#[derive(Debug, JsonSchema, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSearchResult {
    #[serde(flatten)]
    pub user: User,
    pub in_tenant: bool,
}
