use diesel::prelude::*;
use diesel::result::Error;
use diesel_async::RunQueryDsl;

use crate::{
    db::{
        models::{NewUser, UpdateUser, User, UserSearchResult},
        schema::{tenant_users, users},
        services::contains_pattern,
        DbConnection,
    },
    utils::{Paginated, Pagination},
};

pub struct UserDbService<'a> {
    pub db: &'a mut DbConnection,
}

impl<'a> UserDbService<'a> {
    pub fn new(db: &'a mut DbConnection) -> Self {
        UserDbService { db }
    }

    pub async fn find_by_id(&mut self, id: &str) -> Result<Option<User>, Error> {
        let user = users::table
            .filter(users::id.eq(id))
            .select(User::as_select())
            .first(self.db)
            .await
            .optional()?;

        Ok(user)
    }

    pub async fn find_by_account(&mut self, user_account: &str) -> Result<Option<User>, Error> {
        users::table
            .filter(users::user_account.eq(user_account))
            .select(User::as_select())
            .first(self.db)
            .await
            .optional()
    }

    pub async fn find_by_email(&mut self, email: &str) -> Result<Option<User>, Error> {
        users::table
            .filter(users::email.eq(email))
            .select(User::as_select())
            .first(self.db)
            .await
            .optional()
    }

    /// Find a user by any of the login identifiers: account, email or telephone
    pub async fn find_by_login(&mut self, login: &str) -> Result<Option<User>, Error> {
        users::table
            .filter(
                users::user_account
                    .eq(login)
                    .or(users::email.eq(login))
                    .or(users::telephone.eq(login)),
            )
            .select(User::as_select())
            .first(self.db)
            .await
            .optional()
    }

    pub async fn count_by_account(&mut self, user_account: &str) -> Result<i64, Error> {
        users::table
            .filter(users::user_account.eq(user_account))
            .count()
            .get_result(self.db)
            .await
    }

    pub async fn create(&mut self, user: NewUser<'_>) -> Result<User, Error> {
        diesel::insert_into(users::table)
            .values(user)
            .returning(User::as_returning())
            .get_result(self.db)
            .await
    }

    /// Partial update. Returns `NotFound` if the user doesn't exist.
    pub async fn update(&mut self, id: &str, data: UpdateUser<'_>) -> Result<User, Error> {
        diesel::update(users::table.find(id))
            .set(data)
            .returning(User::as_returning())
            .get_result(self.db)
            .await
    }

    /// Case-insensitive search on username, account, email and telephone. Each result
    /// is flagged with whether the user has an enabled membership in `tenant_id`.
    pub async fn search(
        &mut self,
        keyword: Option<&str>,
        tenant_id: &str,
        page: Pagination,
    ) -> Result<Paginated<UserSearchResult>, Error> {
        let pattern = keyword
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(contains_pattern);
        let search_query = || {
            let mut query = users::table.into_boxed();
            if let Some(pattern) = &pattern {
                query = query.filter(
                    users::username
                        .ilike(pattern.to_owned())
                        .or(users::user_account.ilike(pattern.to_owned()))
                        .or(users::email.ilike(pattern.to_owned()))
                        .or(users::telephone.ilike(pattern.to_owned())),
                );
            }
            query
        };

        let total: i64 = search_query().count().get_result(self.db).await?;
        let found: Vec<User> = search_query()
            .select(User::as_select())
            .order_by(users::created_at.desc())
            .offset(page.offset())
            .limit(page.limit())
            .load(self.db)
            .await?;

        let user_ids: Vec<&str> = found.iter().map(|u| u.id.as_str()).collect();
        let members: Vec<String> = tenant_users::table
            .filter(tenant_users::tenant_id.eq(tenant_id))
            .filter(tenant_users::user_id.eq_any(user_ids))
            .filter(tenant_users::disabled.eq(false))
            .select(tenant_users::user_id)
            .load(self.db)
            .await?;

        let items = found
            .into_iter()
            .map(|user| {
                let in_tenant = members.contains(&user.id);
                UserSearchResult { user, in_tenant }
            })
            .collect();

        Ok(Paginated { items, total })
    }
}
