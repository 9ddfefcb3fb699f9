use rocket::{delete, get, post, put, serde::json::Json, Route};
use rocket_okapi::{
    okapi::openapi3::OpenApi, openapi, openapi_get_routes_spec, settings::OpenApiSettings,
};
use schemars::JsonSchema;
use serde::Deserialize;

use crate::{
    api::result::{ApiResult, ResultEntity},
    auth::{CurrentUser, TenantAccess},
    db::{
        models::{
            new_id, NewTenant, RoleTier, Tenant, TenantMember, TenantUser, UpdateTenant, UserTenant,
        },
        services::{TenantDbService, UserDbService},
        DbConnection,
    },
    errors::ApiError,
    utils::Pagination,
};

pub fn get_routes(settings: &OpenApiSettings) -> (Vec<Route>, OpenApi) {
    openapi_get_routes_spec![
        settings: get_user_tenants,
        get_tenant_user,
        create_tenant,
        update_tenant,
        delete_tenant,
        manage_tenant_user,
        get_tenant_users
    ]
}

/// # Get my tenants
/// Tenants the current user belongs to, with the user's role in each
#[openapi(tag = "Tenant")]
#[get("/getUserTenants")]
async fn get_user_tenants(
    user: CurrentUser,
    mut db: DbConnection,
) -> Result<ApiResult<Vec<UserTenant>>, ApiError> {
    let tenants = TenantDbService::new(&mut db)
        .find_user_tenants(&user.id)
        .await?;

    Ok(ResultEntity::list(tenants))
}

/// # Get my membership
/// The current user's membership in a tenant
#[openapi(tag = "Tenant")]
#[get("/getTenantUser/<tenant_id>")]
async fn get_tenant_user(
    user: CurrentUser,
    mut db: DbConnection,
    tenant_id: &str,
) -> Result<ApiResult<TenantUser>, ApiError> {
    let membership = TenantDbService::new(&mut db)
        .find_membership(tenant_id, &user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Tenant membership not found"))?;

    Ok(ResultEntity::success(membership))
}

#[derive(Debug, JsonSchema, Deserialize)]
struct CreateTenantInput {
    name: String,
    code: String,
    description: Option<String>,
}

/// # Create tenant
/// Create a tenant. The creator becomes its administrator.
#[openapi(tag = "Tenant")]
#[post("/tenants", data = "<input>")]
async fn create_tenant(
    user: CurrentUser,
    mut db: DbConnection,
    input: Json<CreateTenantInput>,
) -> Result<ApiResult<Tenant>, ApiError> {
    if !TenantAccess::load(&mut db, &user.id).await?.is_admin_anywhere() {
        return Err(ApiError::forbidden("Administrator role required"));
    }
    let (name, code) = (input.name.trim(), input.code.trim());
    if name.is_empty() || code.is_empty() {
        return Err(ApiError::bad_request("Tenant name and code are required"));
    }

    let mut tenant_service = TenantDbService::new(&mut db);
    if tenant_service.code_exists(code).await? {
        return Err(ApiError::bad_request("Tenant code already exists"));
    }
    let tenant = tenant_service
        .create_with_owner(NewTenant {
            id: &new_id(),
            name,
            code,
            description: input.description.as_deref(),
            created_by: &user.id,
        })
        .await?;
    rocket::info!("User {} created tenant {}", user.id, tenant.id);

    Ok(ResultEntity::success(tenant))
}

#[derive(Debug, JsonSchema, Deserialize)]
struct UpdateTenantInput {
    name: Option<String>,
    code: Option<String>,
    description: Option<String>,
    /// 1 = active
    status: Option<i16>,
}

/// # Update tenant
#[openapi(tag = "Tenant")]
#[put("/tenants/<tenant_id>", data = "<input>")]
async fn update_tenant(
    user: CurrentUser,
    mut db: DbConnection,
    tenant_id: &str,
    input: Json<UpdateTenantInput>,
) -> Result<ApiResult<Tenant>, ApiError> {
    TenantAccess::load(&mut db, &user.id)
        .await?
        .require_tenant_admin(tenant_id)?;

    let mut tenant_service = TenantDbService::new(&mut db);
    let existing = tenant_service
        .find_by_id(tenant_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Tenant not found"))?;
    let code = input.code.as_deref().map(str::trim).filter(|c| !c.is_empty());
    if let Some(code) = code {
        if code != existing.code && tenant_service.code_exists(code).await? {
            return Err(ApiError::bad_request("Tenant code already exists"));
        }
    }

    let tenant = tenant_service
        .update(
            tenant_id,
            UpdateTenant {
                name: input.name.as_deref().map(str::trim).filter(|n| !n.is_empty()),
                code,
                description: input.description.as_deref(),
                status: input.status,
                updated_at: Some(chrono::Utc::now()),
            },
        )
        .await?;

    Ok(ResultEntity::success(tenant))
}

/// # Delete tenant
/// Delete a tenant and all of its memberships
#[openapi(tag = "Tenant")]
#[delete("/tenants/<tenant_id>")]
async fn delete_tenant(
    user: CurrentUser,
    mut db: DbConnection,
    tenant_id: &str,
) -> Result<ApiResult<usize>, ApiError> {
    TenantAccess::load(&mut db, &user.id)
        .await?
        .require_super_admin()?;

    let deleted = TenantDbService::new(&mut db).delete(tenant_id).await?;
    if deleted == 0 {
        return Err(ApiError::not_found("Tenant not found"));
    }
    rocket::info!("User {} deleted tenant {}", user.id, tenant_id);

    Ok(ResultEntity::success(deleted))
}

#[derive(Debug, JsonSchema, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ManageTenantUserInput {
    /// 0 = member, 1 = tenant administrator, 2 = super administrator
    #[serde(alias = "role_type")]
    role_type: Option<i16>,
    disabled: Option<bool>,
}

/// Check that the caller may apply the requested role in the tenant
fn check_role_change(
    access: &TenantAccess,
    tenant_id: &str,
    role_type: Option<i16>,
) -> Result<Option<RoleTier>, ApiError> {
    access.require_tenant_admin(tenant_id)?;
    let tier = role_type
        .map(RoleTier::try_from)
        .transpose()
        .map_err(|value| ApiError::bad_request(format!("Invalid role type: {}", value)))?;
    if tier.is_some_and(|tier| tier >= RoleTier::TenantAdmin) && !access.is_super_admin() {
        return Err(ApiError::forbidden(
            "Super administrator role required to grant administrator roles",
        ));
    }
    Ok(tier)
}

/// # Manage tenant user
/// Add a user to a tenant, or change their role or disabled status
#[openapi(tag = "Tenant")]
#[post("/tenants/<tenant_id>/users/<user_id>", data = "<input>")]
async fn manage_tenant_user(
    user: CurrentUser,
    mut db: DbConnection,
    tenant_id: &str,
    user_id: &str,
    input: Json<ManageTenantUserInput>,
) -> Result<ApiResult<TenantUser>, ApiError> {
    let access = TenantAccess::load(&mut db, &user.id).await?;
    let tier = check_role_change(&access, tenant_id, input.role_type)?;

    if TenantDbService::new(&mut db).find_by_id(tenant_id).await?.is_none() {
        return Err(ApiError::not_found("Tenant not found"));
    }
    if UserDbService::new(&mut db).find_by_id(user_id).await?.is_none() {
        return Err(ApiError::not_found("User not found"));
    }

    let membership = TenantDbService::new(&mut db)
        .upsert_membership(tenant_id, user_id, tier, input.disabled, &user.id)
        .await?;

    Ok(ResultEntity::success(membership))
}

/// # Get tenant users
/// Members of a tenant, newest first
#[openapi(tag = "Tenant")]
#[get("/tenants/<tenant_id>/users?<page_num>&<page_size>")]
async fn get_tenant_users(
    user: CurrentUser,
    mut db: DbConnection,
    tenant_id: &str,
    page_num: Option<i64>,
    page_size: Option<i64>,
) -> Result<ApiResult<Vec<TenantMember>>, ApiError> {
    TenantAccess::load(&mut db, &user.id)
        .await?
        .require_tenant_admin(tenant_id)?;
    let page = TenantDbService::new(&mut db)
        .find_members(tenant_id, Pagination::new(page_num, page_size))
        .await?;

    Ok(ResultEntity::page(page))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn access(roles: &[(&str, i16)]) -> TenantAccess {
        let memberships: Vec<TenantUser> = roles
            .iter()
            .map(|(tenant_id, role_type)| TenantUser {
                id: new_id(),
                tenant_id: tenant_id.to_string(),
                user_id: "caller".into(),
                role_type: *role_type,
                disabled: false,
                created_by: "caller".into(),
                joined_at: Utc::now(),
            })
            .collect();
        TenantAccess::from_memberships(&memberships)
    }

    #[test]
    fn tenant_admin_can_add_members() {
        let caller = access(&[("t1", 1)]);
        assert_eq!(check_role_change(&caller, "t1", Some(0)).unwrap(), Some(RoleTier::Member));
        assert_eq!(check_role_change(&caller, "t1", None).unwrap(), None);
    }

    #[test]
    fn only_super_admin_grants_admin_roles() {
        let tenant_admin = access(&[("t1", 1)]);
        assert!(matches!(
            check_role_change(&tenant_admin, "t1", Some(1)),
            Err(ApiError::Forbidden(_))
        ));

        let super_admin = access(&[("t9", 2)]);
        assert_eq!(
            check_role_change(&super_admin, "t1", Some(1)).unwrap(),
            Some(RoleTier::TenantAdmin)
        );
    }

    #[test]
    fn members_cannot_manage_users() {
        let member = access(&[("t1", 0)]);
        assert!(matches!(
            check_role_change(&member, "t1", Some(0)),
            Err(ApiError::Forbidden(_))
        ));
        let other_admin = access(&[("t2", 1)]);
        assert!(matches!(
            check_role_change(&other_admin, "t1", None),
            Err(ApiError::Forbidden(_))
        ));
    }

    #[test]
    fn invalid_role_type_is_rejected() {
        let super_admin = access(&[("t1", 2)]);
        assert!(matches!(
            check_role_change(&super_admin, "t1", Some(7)),
            Err(ApiError::BadRequest(_))
        ));
    }
}
