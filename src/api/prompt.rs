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
            new_id, NewPromptCollection, NewTenantPrompt, PromptCategory, PromptCollection,
            PromptTemplate, TenantPrompt, UpdateTenantPrompt,
        },
        services::PromptDbService,
        DbConnection,
    },
    errors::ApiError,
    utils::Pagination,
};

pub fn get_routes(settings: &OpenApiSettings) -> (Vec<Route>, OpenApi) {
    openapi_get_routes_spec![
        settings: get_prompt_category_list,
        get_system_prompt_list_by_category,
        insert_collect_prompt,
        delete_collect_prompt,
        get_my_collect_prompt_category,
        get_my_collect_prompt_list,
        list_tenant_prompts,
        create_tenant_prompt,
        update_tenant_prompt,
        delete_tenant_prompt
    ]
}

/// # Get prompt categories
#[openapi(tag = "Prompt")]
#[get("/getPromptCategoryList")]
async fn get_prompt_category_list(
    mut db: DbConnection,
) -> Result<ApiResult<Vec<PromptCategory>>, ApiError> {
    let categories = PromptDbService::new(&mut db).list_categories().await?;

    Ok(ResultEntity::list(categories))
}

/// # Get system prompts
/// Enabled prompt templates, optionally filtered by category and keyword
#[openapi(tag = "Prompt")]
#[get("/getSystemPromptListByCategory?<category_id>&<keyword>&<page_num>&<page_size>")]
async fn get_system_prompt_list_by_category(
    mut db: DbConnection,
    category_id: Option<&str>,
    keyword: Option<&str>,
    page_num: Option<i64>,
    page_size: Option<i64>,
) -> Result<ApiResult<Vec<PromptTemplate>>, ApiError> {
    let page = PromptDbService::new(&mut db)
        .find_templates(category_id, keyword, Pagination::new(page_num, page_size))
        .await?;

    Ok(ResultEntity::page(page))
}

/// # Add favorite prompt
#[openapi(tag = "Prompt")]
#[post("/insertCollectPrompt/<tenant_id>/<prompt_id>")]
async fn insert_collect_prompt(
    user: CurrentUser,
    mut db: DbConnection,
    tenant_id: &str,
    prompt_id: &str,
) -> Result<ApiResult<PromptCollection>, ApiError> {
    TenantAccess::load(&mut db, &user.id)
        .await?
        .require_member(tenant_id)?;

    let mut prompt_service = PromptDbService::new(&mut db);
    let template = prompt_service
        .find_template(prompt_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Prompt not found"))?;
    let collection = prompt_service
        .insert_collection(NewPromptCollection {
            id: &new_id(),
            prompt_id,
            category_id: template.category_id.as_deref(),
            tenant_id,
            user_id: &user.id,
        })
        .await?;

    Ok(ResultEntity::success(collection))
}

/// # Remove favorite prompt
/// Returns the number of removed favorites
#[openapi(tag = "Prompt")]
#[delete("/deleteCollectPrompt/<tenant_id>/<prompt_id>")]
async fn delete_collect_prompt(
    user: CurrentUser,
    mut db: DbConnection,
    tenant_id: &str,
    prompt_id: &str,
) -> Result<ApiResult<usize>, ApiError> {
    let deleted = PromptDbService::new(&mut db)
        .delete_collection(&user.id, tenant_id, prompt_id)
        .await?;

    Ok(ResultEntity::success(deleted))
}

/// # Get favorite categories
/// Categories of the current user's favorite prompts in a tenant
#[openapi(tag = "Prompt")]
#[get("/getMyCollectPromptCategory?<tenant_id>")]
async fn get_my_collect_prompt_category(
    user: CurrentUser,
    mut db: DbConnection,
    tenant_id: &str,
) -> Result<ApiResult<Vec<PromptCategory>>, ApiError> {
    let categories = PromptDbService::new(&mut db)
        .find_collected_categories(&user.id, tenant_id)
        .await?;

    Ok(ResultEntity::list(categories))
}

/// # Get favorite prompts
#[openapi(tag = "Prompt")]
#[get("/getMyCollectPromptList?<tenant_id>&<category_id>&<page_num>&<page_size>")]
async fn get_my_collect_prompt_list(
    user: CurrentUser,
    mut db: DbConnection,
    tenant_id: &str,
    category_id: Option<&str>,
    page_num: Option<i64>,
    page_size: Option<i64>,
) -> Result<ApiResult<Vec<PromptTemplate>>, ApiError> {
    let page = PromptDbService::new(&mut db)
        .find_collected_templates(
            &user.id,
            tenant_id,
            category_id,
            Pagination::new(page_num, page_size),
        )
        .await?;

    Ok(ResultEntity::page(page))
}

/// # List tenant prompts
/// Prompts authored inside a tenant
#[openapi(tag = "Prompt")]
#[get("/tenants/<tenant_id>/prompts?<keyword>&<page_num>&<page_size>")]
async fn list_tenant_prompts(
    user: CurrentUser,
    mut db: DbConnection,
    tenant_id: &str,
    keyword: Option<&str>,
    page_num: Option<i64>,
    page_size: Option<i64>,
) -> Result<ApiResult<Vec<TenantPrompt>>, ApiError> {
    TenantAccess::load(&mut db, &user.id)
        .await?
        .require_member(tenant_id)?;
    let page = PromptDbService::new(&mut db)
        .find_tenant_prompts(tenant_id, keyword, Pagination::new(page_num, page_size))
        .await?;

    Ok(ResultEntity::page(page))
}

#[derive(Debug, JsonSchema, Deserialize)]
struct TenantPromptInput {
    title: String,
    content: String,
    industry: Option<String>,
    tags: Option<String>,
}

/// # Create tenant prompt
#[openapi(tag = "Prompt")]
#[post("/tenants/<tenant_id>/prompts", data = "<input>")]
async fn create_tenant_prompt(
    user: CurrentUser,
    mut db: DbConnection,
    tenant_id: &str,
    input: Json<TenantPromptInput>,
) -> Result<ApiResult<TenantPrompt>, ApiError> {
    TenantAccess::load(&mut db, &user.id)
        .await?
        .require_member(tenant_id)?;
    let (title, content) = (input.title.trim(), input.content.trim());
    if title.is_empty() || content.is_empty() {
        return Err(ApiError::bad_request("Prompt title and content are required"));
    }

    let prompt = PromptDbService::new(&mut db)
        .create_tenant_prompt(NewTenantPrompt {
            id: &new_id(),
            tenant_id,
            user_id: &user.id,
            title,
            content,
            industry: input.industry.as_deref(),
            tags: input.tags.as_deref(),
            created_by: &user.id,
        })
        .await?;

    Ok(ResultEntity::success(prompt))
}

#[derive(Debug, JsonSchema, Deserialize)]
struct UpdateTenantPromptInput {
    title: Option<String>,
    content: Option<String>,
    disabled: Option<bool>,
    industry: Option<String>,
    tags: Option<String>,
}

/// Find a tenant prompt the caller may change: its author or a tenant administrator
async fn editable_prompt(
    db: &mut DbConnection,
    user_id: &str,
    tenant_id: &str,
    prompt_id: &str,
) -> Result<TenantPrompt, ApiError> {
    let access = TenantAccess::load(db, user_id).await?;
    access.require_member(tenant_id)?;
    let prompt = PromptDbService::new(db)
        .find_tenant_prompt(tenant_id, prompt_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Prompt not found"))?;
    if prompt.user_id != user_id && !access.is_tenant_admin(tenant_id) {
        return Err(ApiError::forbidden("Only the author or an administrator can change this prompt"));
    }
    Ok(prompt)
}

/// # Update tenant prompt
#[openapi(tag = "Prompt")]
#[put("/tenants/<tenant_id>/prompts/<prompt_id>", data = "<input>")]
async fn update_tenant_prompt(
    user: CurrentUser,
    mut db: DbConnection,
    tenant_id: &str,
    prompt_id: &str,
    input: Json<UpdateTenantPromptInput>,
) -> Result<ApiResult<TenantPrompt>, ApiError> {
    editable_prompt(&mut db, &user.id, tenant_id, prompt_id).await?;
    let prompt = PromptDbService::new(&mut db)
        .update_tenant_prompt(
            prompt_id,
            UpdateTenantPrompt {
                title: input.title.as_deref().map(str::trim).filter(|t| !t.is_empty()),
                content: input.content.as_deref().map(str::trim).filter(|c| !c.is_empty()),
                disabled: input.disabled,
                industry: input.industry.as_deref(),
                tags: input.tags.as_deref(),
                updated_by: Some(&user.id),
                updated_at: Some(chrono::Utc::now()),
            },
        )
        .await?;

    Ok(ResultEntity::success(prompt))
}

/// # Delete tenant prompt
#[openapi(tag = "Prompt")]
#[delete("/tenants/<tenant_id>/prompts/<prompt_id>")]
async fn delete_tenant_prompt(
    user: CurrentUser,
    mut db: DbConnection,
    tenant_id: &str,
    prompt_id: &str,
) -> Result<ApiResult<usize>, ApiError> {
    editable_prompt(&mut db, &user.id, tenant_id, prompt_id).await?;
    let deleted = PromptDbService::new(&mut db)
        .delete_tenant_prompt(prompt_id)
        .await?;

    Ok(ResultEntity::success(deleted))
}
