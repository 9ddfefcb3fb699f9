use chrono::{DateTime, Utc};
use diesel::{
    prelude::{AsChangeset, Associations, Identifiable, Insertable, Queryable},
    Selectable,
};
use enum_iterator::Sequence;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::db::models::User;

#[derive(Debug, Clone, Identifiable, Queryable, Selectable, JsonSchema, Serialize)]
#[diesel(table_name = super::schema::tenants)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: String,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub status: i16,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = super::schema::tenants)]
pub struct NewTenant<'r> {
    pub id: &'r str,
    pub name: &'r str,
    pub code: &'r str,
    pub description: Option<&'r str>,
    pub created_by: &'r str,
}

#[derive(AsChangeset, Default)]
#[diesel(table_name = super::schema::tenants)]
pub struct UpdateTenant<'r> {
    pub name: Option<&'r str>,
    pub code: Option<&'r str>,
    pub description: Option<&'r str>,
    pub status: Option<i16>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Membership of a user in a tenant
#[derive(
    Debug, Clone, Identifiable, Queryable, Selectable, Associations, JsonSchema, Serialize,
)]
#[diesel(belongs_to(Tenant, foreign_key = tenant_id))]
#[diesel(belongs_to(User, foreign_key = user_id))]
#[diesel(table_name = super::schema::tenant_users)]
#[serde(rename_all = "camelCase")]
pub struct TenantUser {
    pub id: String,
    pub tenant_id: String,
    pub user_id: String,
    pub role_type: i16,
    pub disabled: bool,
    pub created_by: String,
    pub joined_at: DateTime<Utc>,
}

impl TenantUser {
    /// Role tier of this membership, falling back to member for out-of-range values
    pub fn tier(&self) -> RoleTier {
        RoleTier::try_from(self.role_type).unwrap_or(RoleTier::Member)
    }
}

#[derive(Insertable)]
#[diesel(table_name = super::schema::tenant_users)]
pub struct NewTenantUser<'r> {
    pub id: &'r str,
    pub tenant_id: &'r str,
    pub user_id: &'r str,
    pub role_type: i16,
    pub disabled: bool,
    pub created_by: &'r str,
}

#[derive(AsChangeset, Default)]
#[diesel(table_name = super::schema::tenant_users)]
pub struct UpdateTenantUser {
    pub role_type: Option<i16>,
    pub disabled: Option<bool>,
}

/// A tenant the user belongs to, with the user's role in it
#[derive(Debug, JsonSchema, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserTenant {
    #[serde(flatten)]
    pub tenant: Tenant,
    pub role_type: i16,
}

/// A tenant membership with some of the member's profile fields
#[derive(Debug, Queryable, JsonSchema, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantMember {
    pub id: String,
    pub tenant_id: String,
    pub user_id: String,
    pub role_type: i16,
    pub disabled: bool,
    pub joined_at: DateTime<Utc>,
    pub username: String,
    pub email: Option<String>,
    pub avatar: Option<String>,
}

/// Role tier inside a tenant. Higher tiers include the rights of lower ones.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Sequence, JsonSchema, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RoleTier {
    Member = 0,
    TenantAdmin = 1,
    SuperAdmin = 2,
}

impl RoleTier {
    pub fn as_i16(self) -> i16 {
        self as i16
    }
}

impl TryFrom<i16> for RoleTier {
    type Error = i16;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        enum_iterator::all::<RoleTier>()
            .find(|tier| tier.as_i16() == value)
            .ok_or(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_tiers_are_ordered() {
        assert!(RoleTier::SuperAdmin > RoleTier::TenantAdmin);
        assert!(RoleTier::TenantAdmin > RoleTier::Member);
    }

    #[test]
    fn role_tier_from_i16() {
        assert_eq!(RoleTier::try_from(0), Ok(RoleTier::Member));
        assert_eq!(RoleTier::try_from(1), Ok(RoleTier::TenantAdmin));
        assert_eq!(RoleTier::try_from(2), Ok(RoleTier::SuperAdmin));
        assert_eq!(RoleTier::try_from(3), Err(3));
        assert_eq!(RoleTier::try_from(-1), Err(-1));
    }
}
