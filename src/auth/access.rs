use crate::{
    db::{
        models::{RoleTier, TenantUser},
        services::TenantDbService,
        DbConnection,
    },
    errors::ApiError,
};

/// The caller's role tiers across tenants, built from their enabled memberships.
#[derive(Debug, Default)]
pub struct TenantAccess {
    roles: Vec<(String, RoleTier)>,
}

impl TenantAccess {
    pub fn from_memberships(memberships: &[TenantUser]) -> Self {
        let roles = memberships
            .iter()
            .filter(|m| !m.disabled)
            .map(|m| (m.tenant_id.clone(), m.tier()))
            .collect();
        Self { roles }
    }

    pub async fn load(db: &mut DbConnection, user_id: &str) -> Result<Self, ApiError> {
        let memberships = TenantDbService::new(db).find_memberships(user_id).await?;
        Ok(Self::from_memberships(&memberships))
    }

    fn highest_tier(&self) -> Option<RoleTier> {
        self.roles.iter().map(|(_, tier)| *tier).max()
    }

    fn tier_in(&self, tenant_id: &str) -> Option<RoleTier> {
        self.roles
            .iter()
            .filter(|(id, _)| id == tenant_id)
            .map(|(_, tier)| *tier)
            .max()
    }

    /// Tier 1 or above in any tenant
    pub fn is_admin_anywhere(&self) -> bool {
        self.highest_tier() >= Some(RoleTier::TenantAdmin)
    }

    pub fn is_super_admin(&self) -> bool {
        self.highest_tier() == Some(RoleTier::SuperAdmin)
    }

    /// Super-admin, or tier 1 or above in this tenant
    pub fn is_tenant_admin(&self, tenant_id: &str) -> bool {
        self.is_super_admin() || self.tier_in(tenant_id) >= Some(RoleTier::TenantAdmin)
    }

    pub fn is_member(&self, tenant_id: &str) -> bool {
        self.is_super_admin() || self.tier_in(tenant_id).is_some()
    }

    pub fn require_super_admin(&self) -> Result<(), ApiError> {
        if self.is_super_admin() {
            Ok(())
        } else {
            Err(ApiError::forbidden("Super administrator role required"))
        }
    }

    pub fn require_tenant_admin(&self, tenant_id: &str) -> Result<(), ApiError> {
        if self.is_tenant_admin(tenant_id) {
            Ok(())
        } else {
            Err(ApiError::forbidden("Tenant administrator role required"))
        }
    }

    pub fn require_member(&self, tenant_id: &str) -> Result<(), ApiError> {
        if self.is_member(tenant_id) {
            Ok(())
        } else {
            Err(ApiError::forbidden("Not a member of this tenant"))
        }
    }
}
