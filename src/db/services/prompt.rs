use diesel::prelude::*;
use diesel::result::Error;
use diesel_async::RunQueryDsl;

use crate::{
    db::{
        models::{
            NewPromptCollection, NewTenantPrompt, PromptCategory, PromptCollection,
            PromptTemplate, TenantPrompt, UpdateTenantPrompt,
        },
        schema::{prompt_categories, prompt_collections, prompt_templates, tenant_prompts},
        services::contains_pattern,
        DbConnection,
    },
    utils::{Paginated, Pagination},
};

pub struct PromptDbService<'a> {
    pub db: &'a mut DbConnection,
}

impl<'a> PromptDbService<'a> {
    pub fn new(db: &'a mut DbConnection) -> Self {
        PromptDbService { db }
    }

    pub async fn list_categories(&mut self) -> Result<Vec<PromptCategory>, Error> {
        prompt_categories::table
            .select(PromptCategory::as_select())
            .order_by(prompt_categories::created_at.asc())
            .load(self.db)
            .await
    }

    /// Enabled templates, optionally filtered by category and a keyword on title/prompt
    pub async fn find_templates(
        &mut self,
        category_id: Option<&str>,
        keyword: Option<&str>,
        page: Pagination,
    ) -> Result<Paginated<PromptTemplate>, Error> {
        let pattern = keyword
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(contains_pattern);
        let template_query = || {
            let mut query = prompt_templates::table
                .filter(prompt_templates::disabled.eq(false))
                .into_boxed();
            if let Some(category_id) = category_id {
                query = query.filter(prompt_templates::category_id.eq(category_id));
            }
            if let Some(pattern) = &pattern {
                query = query.filter(
                    prompt_templates::title
                        .ilike(pattern.to_owned())
                        .or(prompt_templates::prompt.ilike(pattern.to_owned())),
                );
            }
            query
        };

        let total: i64 = template_query().count().get_result(self.db).await?;
        let items = template_query()
            .select(PromptTemplate::as_select())
            .order_by(prompt_templates::created_at.desc())
            .offset(page.offset())
            .limit(page.limit())
            .load(self.db)
            .await?;

        Ok(Paginated { items, total })
    }

    pub async fn find_template(&mut self, id: &str) -> Result<Option<PromptTemplate>, Error> {
        prompt_templates::table
            .find(id)
            .select(PromptTemplate::as_select())
            .first(self.db)
            .await
            .optional()
    }

    /// Add a favorite. An existing favorite of the same prompt is returned unchanged.
    pub async fn insert_collection(
        &mut self,
        collection: NewPromptCollection<'_>,
    ) -> Result<PromptCollection, Error> {
        diesel::insert_into(prompt_collections::table)
            .values(&collection)
            .on_conflict_do_nothing()
            .execute(self.db)
            .await?;

        prompt_collections::table
            .filter(prompt_collections::user_id.eq(collection.user_id))
            .filter(prompt_collections::tenant_id.eq(collection.tenant_id))
            .filter(prompt_collections::prompt_id.eq(collection.prompt_id))
            .select(PromptCollection::as_select())
            .first(self.db)
            .await
    }

    pub async fn delete_collection(
        &mut self,
        user_id: &str,
        tenant_id: &str,
        prompt_id: &str,
    ) -> Result<usize, Error> {
        diesel::delete(prompt_collections::table)
            .filter(prompt_collections::user_id.eq(user_id))
            .filter(prompt_collections::tenant_id.eq(tenant_id))
            .filter(prompt_collections::prompt_id.eq(prompt_id))
            .execute(self.db)
            .await
    }

    /// Distinct categories among the user's favorites in a tenant
    pub async fn find_collected_categories(
        &mut self,
        user_id: &str,
        tenant_id: &str,
    ) -> Result<Vec<PromptCategory>, Error> {
        let collected = prompt_collections::table
            .filter(prompt_collections::user_id.eq(user_id))
            .filter(prompt_collections::tenant_id.eq(tenant_id))
            .select(prompt_collections::category_id);

        prompt_categories::table
            .filter(prompt_categories::id.nullable().eq_any(collected))
            .select(PromptCategory::as_select())
            .order_by(prompt_categories::created_at.asc())
            .load(self.db)
            .await
    }

    /// The user's favorite templates in a tenant, most recently collected first
    pub async fn find_collected_templates(
        &mut self,
        user_id: &str,
        tenant_id: &str,
        category_id: Option<&str>,
        page: Pagination,
    ) -> Result<Paginated<PromptTemplate>, Error> {
        let collection_query = || {
            let mut query = prompt_collections::table
                .inner_join(prompt_templates::table)
                .filter(prompt_collections::user_id.eq(user_id))
                .filter(prompt_collections::tenant_id.eq(tenant_id))
                .into_boxed();
            if let Some(category_id) = category_id {
                query = query.filter(prompt_collections::category_id.eq(category_id));
            }
            query
        };

        let total: i64 = collection_query().count().get_result(self.db).await?;
        let items = collection_query()
            .select(PromptTemplate::as_select())
            .order_by(prompt_collections::created_at.desc())
            .offset(page.offset())
            .limit(page.limit())
            .load(self.db)
            .await?;

        Ok(Paginated { items, total })
    }

    pub async fn find_tenant_prompts(
        &mut self,
        tenant_id: &str,
        keyword: Option<&str>,
        page: Pagination,
    ) -> Result<Paginated<TenantPrompt>, Error> {
        let pattern = keyword
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(contains_pattern);
        let prompt_query = || {
            let mut query = tenant_prompts::table
                .filter(tenant_prompts::tenant_id.eq(tenant_id))
                .into_boxed();
            if let Some(pattern) = &pattern {
                query = query.filter(
                    tenant_prompts::title
                        .ilike(pattern.to_owned())
                        .or(tenant_prompts::content.ilike(pattern.to_owned())),
                );
            }
            query
        };

        let total: i64 = prompt_query().count().get_result(self.db).await?;
        let items = prompt_query()
            .select(TenantPrompt::as_select())
            .order_by(tenant_prompts::updated_at.desc())
            .offset(page.offset())
            .limit(page.limit())
            .load(self.db)
            .await?;

        Ok(Paginated { items, total })
    }

    pub async fn find_tenant_prompt(
        &mut self,
        tenant_id: &str,
        id: &str,
    ) -> Result<Option<TenantPrompt>, Error> {
        tenant_prompts::table
            .filter(tenant_prompts::id.eq(id))
            .filter(tenant_prompts::tenant_id.eq(tenant_id))
            .select(TenantPrompt::as_select())
            .first(self.db)
            .await
            .optional()
    }

    pub async fn create_tenant_prompt(
        &mut self,
        prompt: NewTenantPrompt<'_>,
    ) -> Result<TenantPrompt, Error> {
        diesel::insert_into(tenant_prompts::table)
            .values(prompt)
            .returning(TenantPrompt::as_returning())
            .get_result(self.db)
            .await
    }

    pub async fn update_tenant_prompt(
        &mut self,
        id: &str,
        data: UpdateTenantPrompt<'_>,
    ) -> Result<TenantPrompt, Error> {
        diesel::update(tenant_prompts::table.find(id))
            .set(data)
            .returning(TenantPrompt::as_returning())
            .get_result(self.db)
            .await
    }

    pub async fn delete_tenant_prompt(&mut self, id: &str) -> Result<usize, Error> {
        diesel::delete(tenant_prompts::table.find(id))
            .execute(self.db)
            .await
    }
}
