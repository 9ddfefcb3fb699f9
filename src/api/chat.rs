use std::pin::pin;

use diesel_async::{scoped_futures::ScopedFutureExt, AsyncConnection};
use fred::prelude::Pool;
use rocket::{
    delete, futures::{SinkExt, StreamExt}, get, patch, post, serde::json::Json, Route, State,
};
use rocket_okapi::{
    okapi::openapi3::OpenApi, openapi, openapi_get_routes_spec, settings::OpenApiSettings,
};
use rocket_ws::{Channel, Message, WebSocket};
use schemars::JsonSchema;
use serde::Deserialize;

use crate::{
    api::result::{ApiResult, ResultEntity},
    auth::{CurrentUser, TenantAccess},
    config::AppConfig,
    conversation::{
        session::ServerChatBackend, ChatParams, ChatSession, COMPLETED_SENTINEL,
    },
    db::{
        models::{
            new_id, ChatDirectory, ChatDocument, ChatHistory, ChatModelConfig, LlmProviderType,
            NewChatDocument, NewChatModelConfig, UpdateChatModelConfig, PUBLIC_DIRECTORY,
        },
        services::{ChatDbService, DocumentDbService, ModelConfigDbService},
        DbConnection, DbPool,
    },
    errors::ApiError,
    provider::{EmbeddingProvider, OllamaEmbedder},
    rag::{
        extract::DocumentKind,
        ingest::{ingest_document, ChunkMetadata},
        vector_store::PgVectorStore,
    },
    storage::{FileData, LocalStorage},
    utils::{Encryptor, Pagination},
};

pub fn get_routes(settings: &OpenApiSettings) -> (Vec<Route>, OpenApi) {
    let (mut routes, spec) = openapi_get_routes_spec![
        settings: get_model_list,
        create_model_config,
        update_model_config,
        delete_model_config,
        create_directory,
        list_directories,
        upload_doc,
        delete_doc,
        get_doc_list,
        get_chat_history
    ];
    routes.extend(rocket::routes![chat_ws]);

    (routes, spec)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// # Get chat models
/// Enabled chat models
#[openapi(tag = "Chat")]
#[get("/getModelList")]
async fn get_model_list(
    _user: CurrentUser,
    mut db: DbConnection,
) -> Result<ApiResult<Vec<ChatModelConfig>>, ApiError> {
    let models = ModelConfigDbService::new(&mut db).list_enabled().await?;

    Ok(ResultEntity::list(models))
}

#[derive(JsonSchema, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelConfigInput {
    provider_type: LlmProviderType,
    model_name: String,
    display_name: Option<String>,
    base_url: Option<String>,
    api_key: Option<String>,
    enabled: Option<bool>,
}

/// # Create chat model
/// Add a chat model. The API key is stored encrypted.
#[openapi(tag = "Chat")]
#[post("/models", data = "<input>")]
async fn create_model_config(
    user: CurrentUser,
    mut db: DbConnection,
    encryptor: &State<Encryptor>,
    input: Json<ModelConfigInput>,
) -> Result<ApiResult<ChatModelConfig>, ApiError> {
    TenantAccess::load(&mut db, &user.id)
        .await?
        .require_super_admin()?;
    let model_name = input.model_name.trim();
    if model_name.is_empty() {
        return Err(ApiError::bad_request("Model name must not be empty"));
    }

    let encrypted_key = non_empty(input.api_key.as_deref())
        .map(|key| encryptor.encrypt_string(key))
        .transpose()?;
    let model = ModelConfigDbService::new(&mut db)
        .create(NewChatModelConfig {
            provider_type: input.provider_type,
            model_name,
            display_name: input.display_name.as_deref(),
            base_url: non_empty(input.base_url.as_deref()),
            api_key_ciphertext: encrypted_key.as_ref().map(|(ciphertext, _)| ciphertext.as_slice()),
            api_key_nonce: encrypted_key.as_ref().map(|(_, nonce)| nonce.as_slice()),
            enabled: input.enabled.unwrap_or(true),
        })
        .await?;
    rocket::info!("User {} added chat model {}", user.id, model.model_name);

    Ok(ResultEntity::success(model))
}

#[derive(JsonSchema, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateModelConfigInput {
    provider_type: Option<LlmProviderType>,
    display_name: Option<String>,
    base_url: Option<String>,
    api_key: Option<String>,
    enabled: Option<bool>,
}

/// # Update chat model
#[openapi(tag = "Chat")]
#[patch("/models/<model_id>", data = "<input>")]
async fn update_model_config(
    user: CurrentUser,
    mut db: DbConnection,
    encryptor: &State<Encryptor>,
    model_id: i32,
    input: Json<UpdateModelConfigInput>,
) -> Result<ApiResult<ChatModelConfig>, ApiError> {
    TenantAccess::load(&mut db, &user.id)
        .await?
        .require_super_admin()?;

    let encrypted_key = non_empty(input.api_key.as_deref())
        .map(|key| encryptor.encrypt_string(key))
        .transpose()?;
    let model = ModelConfigDbService::new(&mut db)
        .update(
            model_id,
            UpdateChatModelConfig {
                provider_type: input.provider_type,
                display_name: input.display_name.as_deref(),
                base_url: input.base_url.as_deref(),
                api_key_ciphertext: encrypted_key.as_ref().map(|(c, _)| c.as_slice()),
                api_key_nonce: encrypted_key.as_ref().map(|(_, n)| n.as_slice()),
                enabled: input.enabled,
                updated_at: Some(chrono::Utc::now()),
            },
        )
        .await?;

    Ok(ResultEntity::success(model))
}

/// # Delete chat model
#[openapi(tag = "Chat")]
#[delete("/models/<model_id>")]
async fn delete_model_config(
    user: CurrentUser,
    mut db: DbConnection,
    model_id: i32,
) -> Result<ApiResult<i32>, ApiError> {
    TenantAccess::load(&mut db, &user.id)
        .await?
        .require_super_admin()?;
    let deleted_id = ModelConfigDbService::new(&mut db).delete(model_id).await?;

    Ok(ResultEntity::success(deleted_id))
}

#[derive(JsonSchema, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DirectoryInput {
    directory: String,
    #[serde(alias = "tenant_id")]
    tenant_id: Option<String>,
}

/// # Create directory
/// Create a document directory, or return the existing one with the same name
#[openapi(tag = "Documents")]
#[post("/directories", data = "<input>")]
async fn create_directory(
    user: CurrentUser,
    mut db: DbConnection,
    input: Json<DirectoryInput>,
) -> Result<ApiResult<ChatDirectory>, ApiError> {
    let directory = input.directory.trim();
    if directory.is_empty() {
        return Err(ApiError::bad_request("Directory name must not be empty"));
    }
    let directory = DocumentDbService::new(&mut db)
        .get_or_create_directory(&user.id, non_empty(input.tenant_id.as_deref()), directory)
        .await?;

    Ok(ResultEntity::success(directory))
}

/// # List directories
#[openapi(tag = "Documents")]
#[get("/directories?<tenant_id>")]
async fn list_directories(
    user: CurrentUser,
    mut db: DbConnection,
    tenant_id: Option<&str>,
) -> Result<ApiResult<Vec<ChatDirectory>>, ApiError> {
    let directories = DocumentDbService::new(&mut db)
        .list_directories(&user.id, non_empty(tenant_id))
        .await?;

    Ok(ResultEntity::list(directories))
}

/// Save the uploaded bytes and index their text. The chunk inserts share one transaction.
async fn store_and_index(
    db: &mut DbConnection,
    storage: &LocalStorage,
    embedder: &dyn EmbeddingProvider,
    document: &ChatDocument,
    kind: DocumentKind,
    bytes: &[u8],
) -> Result<usize, ApiError> {
    storage
        .save_document(&document.user_id, &document.id, &document.ext, bytes)
        .await?;
    let metadata = ChunkMetadata {
        doc_id: &document.id,
        user_id: &document.user_id,
        tenant_id: document.tenant_id.as_deref(),
        directory_id: &document.directory_id,
        filename: &document.name,
    };
    let chunks = db
        .transaction::<_, ApiError, _>(|conn| {
            async move {
                let mut store = PgVectorStore::new(conn);
                Ok(ingest_document(embedder, &mut store, kind, bytes, metadata).await?)
            }
            .scope_boxed()
        })
        .await?;

    Ok(chunks)
}

/// # Upload document
/// Upload a PDF or text document and index it for document chat
#[openapi(tag = "Documents")]
#[post("/uploadDoc?<name>&<directory_id>&<tenant_id>", data = "<file>")]
async fn upload_doc(
    user: CurrentUser,
    mut db: DbConnection,
    storage: &State<LocalStorage>,
    embedder: &State<OllamaEmbedder>,
    name: &str,
    directory_id: Option<&str>,
    tenant_id: Option<&str>,
    file: FileData,
) -> Result<ApiResult<ChatDocument>, ApiError> {
    let name = name.trim();
    let (kind, ext) = DocumentKind::from_filename(name)?;
    let directory_id = non_empty(directory_id).unwrap_or(PUBLIC_DIRECTORY);
    let tenant_id = non_empty(tenant_id);

    if let Some(tenant_id) = tenant_id {
        TenantAccess::load(&mut db, &user.id)
            .await?
            .require_member(tenant_id)?;
    }
    if directory_id != PUBLIC_DIRECTORY
        && DocumentDbService::new(&mut db)
            .find_directory(&user.id, directory_id)
            .await?
            .is_none()
    {
        return Err(ApiError::not_found("Directory not found"));
    }

    let document = DocumentDbService::new(&mut db)
        .create_document(NewChatDocument {
            id: &new_id(),
            user_id: &user.id,
            tenant_id,
            directory_id,
            name,
            ext: &ext,
        })
        .await?;

    match store_and_index(&mut db, storage, embedder.inner(), &document, kind, &file.bytes).await {
        Ok(chunks) => {
            rocket::info!("Uploaded document {} with {} chunks", document.id, chunks);
            Ok(ResultEntity::success(document))
        }
        Err(e) => {
            rocket::warn!("Upload of document {} failed, rolling back: {}", document.id, e);
            if let Err(remove_err) = storage
                .remove_document(&document.user_id, &document.id, &document.ext)
                .await
            {
                rocket::error!("Failed to remove file of document {}: {}", document.id, remove_err);
            }
            if let Err(delete_err) = DocumentDbService::new(&mut db)
                .delete_document(&document.id, &user.id)
                .await
            {
                rocket::error!("Failed to delete document {}: {}", document.id, delete_err);
            }
            Err(e)
        }
    }
}

/// # Delete document
/// Delete a document with its stored file and indexed chunks
#[openapi(tag = "Documents")]
#[delete("/deleteDoc/<doc_id>?<directory_id>")]
async fn delete_doc(
    user: CurrentUser,
    mut db: DbConnection,
    storage: &State<LocalStorage>,
    doc_id: &str,
    directory_id: Option<&str>,
) -> Result<ApiResult<usize>, ApiError> {
    let directory_id = non_empty(directory_id).unwrap_or(PUBLIC_DIRECTORY);
    let mut document_service = DocumentDbService::new(&mut db);
    let document = document_service
        .find_document(doc_id, &user.id, directory_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Document not found or no permission"))?;

    match storage
        .remove_document(&document.user_id, &document.id, &document.ext)
        .await
    {
        Ok(false) => rocket::warn!("File of document {} was already missing", document.id),
        Ok(true) => {}
        Err(e) => rocket::error!("Failed to remove file of document {}: {}", document.id, e),
    }
    let deleted = document_service
        .delete_document(&document.id, &user.id)
        .await?;

    Ok(ResultEntity::success(deleted))
}

/// # List documents
#[openapi(tag = "Documents")]
#[get("/getDocList?<tenant_id>")]
async fn get_doc_list(
    user: CurrentUser,
    mut db: DbConnection,
    tenant_id: Option<&str>,
) -> Result<ApiResult<Vec<ChatDocument>>, ApiError> {
    let documents = DocumentDbService::new(&mut db)
        .list_documents(&user.id, non_empty(tenant_id))
        .await?;

    Ok(ResultEntity::list(documents))
}

/// # Get chat history
/// The current user's conversation turns, newest first
#[openapi(tag = "Chat")]
#[get("/getChatHistory?<chat_id>&<page_num>&<page_size>")]
async fn get_chat_history(
    user: CurrentUser,
    mut db: DbConnection,
    chat_id: Option<&str>,
    page_num: Option<i64>,
    page_size: Option<i64>,
) -> Result<ApiResult<Vec<ChatHistory>>, ApiError> {
    let page = ChatDbService::new(&mut db)
        .get_history(&user.id, non_empty(chat_id), Pagination::new(page_num, page_size))
        .await?;

    Ok(ResultEntity::page(page))
}

/// Chat over a WebSocket. Each text message is a JSON [ChatParams]; the response is
/// streamed as text messages ending with `[completed]`.
#[get("/ws")]
#[allow(clippy::too_many_arguments)]
fn chat_ws<'r>(
    ws: WebSocket,
    user: CurrentUser,
    db_pool: &'r State<DbPool>,
    redis: &'r State<Pool>,
    encryptor: &'r State<Encryptor>,
    http_client: &'r State<reqwest::Client>,
    embedder: &'r State<OllamaEmbedder>,
    app_config: &'r State<AppConfig>,
) -> Channel<'r> {
    ws.channel(move |mut stream| {
        Box::pin(async move {
            let backend = ServerChatBackend {
                db_pool,
                encryptor,
                http_client,
                embedder: embedder.inner(),
                default_ollama_url: app_config.ollama_base_url(),
            };
            let session = ChatSession::new(
                &user.id,
                app_config.system_prompt(),
                &backend,
                redis.inner(),
            );
            rocket::info!("Chat connection opened for user {}", user.id);

            while let Some(message) = stream.next().await {
                let text = match message? {
                    Message::Text(text) => text,
                    Message::Close(_) => break,
                    _ => continue,
                };
                let params: ChatParams = match serde_json::from_str(&text) {
                    Ok(params) => params,
                    Err(e) => {
                        rocket::info!("Invalid chat request: {}", e);
                        stream
                            .send(Message::text(format!("Error occurred: invalid request: {}", e)))
                            .await?;
                        stream.send(Message::text(COMPLETED_SENTINEL)).await?;
                        continue;
                    }
                };

                let mut frames = pin!(session.respond(params));
                while let Some(frame) = frames.next().await {
                    stream.send(Message::text(frame)).await?;
                }
            }

            rocket::info!("Chat connection closed for user {}", user.id);
            Ok(())
        })
    })
}
