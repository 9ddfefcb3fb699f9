use diesel::prelude::*;
use diesel::result::Error;
use diesel_async::{scoped_futures::ScopedFutureExt, AsyncConnection, RunQueryDsl};

use crate::{
    db::{
        models::{
            new_id, NewTenant, NewTenantUser, RoleTier, Tenant, TenantMember, TenantUser,
            UpdateTenant, UpdateTenantUser, UserTenant,
        },
        schema::{tenant_users, tenants, users},
        DbConnection,
    },
    utils::{Paginated, Pagination},
};

pub struct TenantDbService<'a> {
    pub db: &'a mut DbConnection,
}

impl<'a> TenantDbService<'a> {
    pub fn new(db: &'a mut DbConnection) -> Self {
        TenantDbService { db }
    }

    pub async fn find_by_id(&mut self, id: &str) -> Result<Option<Tenant>, Error> {
        tenants::table
            .find(id)
            .select(Tenant::as_select())
            .first(self.db)
            .await
            .optional()
    }

    pub async fn code_exists(&mut self, code: &str) -> Result<bool, Error> {
        let count: i64 = tenants::table
            .filter(tenants::code.eq(code))
            .count()
            .get_result(self.db)
            .await?;
        Ok(count > 0)
    }

    /// Create the tenant and make the creator a tenant-admin of it
    pub async fn create_with_owner(&mut self, tenant: NewTenant<'_>) -> Result<Tenant, Error> {
        self.db
            .transaction::<_, Error, _>(|conn| {
                async move {
                    let created = diesel::insert_into(tenants::table)
                        .values(&tenant)
                        .returning(Tenant::as_returning())
                        .get_result(conn)
                        .await?;
                    diesel::insert_into(tenant_users::table)
                        .values(NewTenantUser {
                            id: &new_id(),
                            tenant_id: &created.id,
                            user_id: tenant.created_by,
                            role_type: RoleTier::TenantAdmin.as_i16(),
                            disabled: false,
                            created_by: tenant.created_by,
                        })
                        .execute(conn)
                        .await?;
                    Ok(created)
                }
                .scope_boxed()
            })
            .await
    }

    pub async fn update(&mut self, id: &str, data: UpdateTenant<'_>) -> Result<Tenant, Error> {
        diesel::update(tenants::table.find(id))
            .set(data)
            .returning(Tenant::as_returning())
            .get_result(self.db)
            .await
    }

    /// Delete the tenant. Memberships and tenant prompts are removed by cascade.
    pub async fn delete(&mut self, id: &str) -> Result<usize, Error> {
        diesel::delete(tenants::table.find(id))
            .execute(self.db)
            .await
    }

    /// Tenants the user is an enabled member of, with the user's role
    pub async fn find_user_tenants(&mut self, user_id: &str) -> Result<Vec<UserTenant>, Error> {
        let rows: Vec<(Tenant, i16)> = tenant_users::table
            .inner_join(tenants::table)
            .filter(tenant_users::user_id.eq(user_id))
            .filter(tenant_users::disabled.eq(false))
            .select((Tenant::as_select(), tenant_users::role_type))
            .order_by(tenant_users::joined_at.asc())
            .load(self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(tenant, role_type)| UserTenant { tenant, role_type })
            .collect())
    }

    pub async fn find_membership(
        &mut self,
        tenant_id: &str,
        user_id: &str,
    ) -> Result<Option<TenantUser>, Error> {
        tenant_users::table
            .filter(tenant_users::tenant_id.eq(tenant_id))
            .filter(tenant_users::user_id.eq(user_id))
            .select(TenantUser::as_select())
            .first(self.db)
            .await
            .optional()
    }

    /// All enabled memberships of a user
    pub async fn find_memberships(&mut self, user_id: &str) -> Result<Vec<TenantUser>, Error> {
        tenant_users::table
            .filter(tenant_users::user_id.eq(user_id))
            .filter(tenant_users::disabled.eq(false))
            .select(TenantUser::as_select())
            .load(self.db)
            .await
    }

    /// Update an existing membership, or insert a new one (member tier, enabled by default)
    pub async fn upsert_membership(
        &mut self,
        tenant_id: &str,
        user_id: &str,
        role_type: Option<RoleTier>,
        disabled: Option<bool>,
        created_by: &str,
    ) -> Result<TenantUser, Error> {
        match self.find_membership(tenant_id, user_id).await? {
            Some(existing) if role_type.is_none() && disabled.is_none() => Ok(existing),
            Some(existing) => {
                diesel::update(tenant_users::table.find(&existing.id))
                    .set(UpdateTenantUser {
                        role_type: role_type.map(RoleTier::as_i16),
                        disabled,
                    })
                    .returning(TenantUser::as_returning())
                    .get_result(self.db)
                    .await
            }
            None => {
                diesel::insert_into(tenant_users::table)
                    .values(NewTenantUser {
                        id: &new_id(),
                        tenant_id,
                        user_id,
                        role_type: role_type.unwrap_or(RoleTier::Member).as_i16(),
                        disabled: disabled.unwrap_or(false),
                        created_by,
                    })
                    .returning(TenantUser::as_returning())
                    .get_result(self.db)
                    .await
            }
        }
    }

    /// Memberships of a tenant joined with member profiles, newest first
    pub async fn find_members(
        &mut self,
        tenant_id: &str,
        page: Pagination,
    ) -> Result<Paginated<TenantMember>, Error> {
        let total: i64 = tenant_users::table
            .filter(tenant_users::tenant_id.eq(tenant_id))
            .count()
            .get_result(self.db)
            .await?;
        let items = tenant_users::table
            .inner_join(users::table)
            .filter(tenant_users::tenant_id.eq(tenant_id))
            .select((
                tenant_users::id,
                tenant_users::tenant_id,
                tenant_users::user_id,
                tenant_users::role_type,
                tenant_users::disabled,
                tenant_users::joined_at,
                users::username,
                users::email,
                users::avatar,
            ))
            .order_by(tenant_users::joined_at.desc())
            .offset(page.offset())
            .limit(page.limit())
            .load::<TenantMember>(self.db)
            .await?;

        Ok(Paginated { items, total })
    }
}
