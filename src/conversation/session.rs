use async_stream::stream;
use rocket::{
    async_trait,
    futures::{Stream, StreamExt},
};
use schemars::JsonSchema;
use serde::Deserialize;

use crate::{
    conversation::{
        memory::ConversationMemory,
        think::{split_think, THINK_CLOSE, THINK_OPEN},
        HistoryStore,
    },
    db::{
        models::{NewChatHistory, PUBLIC_DIRECTORY},
        services::ModelConfigDbService,
        DbConnection, DbPool,
    },
    errors::ApiError,
    provider::{
        build_llm_provider_api, EmbeddingProvider, LlmApiProvider, LlmMessage, LlmProviderOptions,
        LlmStreamChunk,
    },
    rag::{
        context::build_context,
        vector_store::{PgVectorStore, SearchFilter},
    },
    utils::{save_history, Encryptor},
};

/// Sent after the last frame of every response
pub const COMPLETED_SENTINEL: &str = "[completed]";
const NO_DOCUMENTS_MESSAGE: &str = "Sorry, no relevant documents were found.";
const DOCUMENT_CHAT_TYPE: &str = "document";

fn default_directory() -> String {
    PUBLIC_DIRECTORY.to_owned()
}

/// A chat request received over the WebSocket
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatParams {
    pub prompt: String,
    #[serde(alias = "chat_id")]
    pub chat_id: String,
    #[serde(alias = "model_name")]
    pub model_name: String,
    /// Ask the model to stream its reasoning
    #[serde(default, alias = "show_think")]
    pub show_think: bool,
    /// Documents directory searched for context (`"public"` by default)
    #[serde(default = "default_directory", alias = "directory_id")]
    pub directory_id: String,
    #[serde(default, alias = "tenant_id")]
    pub tenant_id: Option<String>,
    /// `"document"` answers from the user's documents
    #[serde(default, rename = "type")]
    pub chat_type: Option<String>,
    /// Preferred answer language
    #[serde(default)]
    pub language: Option<String>,
    /// Names of files attached to the message, stored with the history
    #[serde(default)]
    pub files: Option<String>,
}

impl ChatParams {
    fn is_document_chat(&self) -> bool {
        self.chat_type.as_deref() == Some(DOCUMENT_CHAT_TYPE)
    }
}

/// What a chat session needs from the rest of the server
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Runtime client for an enabled chat model, `None` if the model is unknown
    async fn model_provider(
        &self,
        model_name: &str,
    ) -> Result<Option<Box<dyn LlmApiProvider>>, ApiError>;

    /// Context retrieved from the user's documents, empty if nothing matches
    async fn document_context(&self, query: &str, filter: &SearchFilter) -> String;

    /// Store a completed turn without waiting for it
    fn persist_history(&self, entry: NewChatHistory);
}

/// A user's conversation over a WebSocket connection
pub struct ChatSession<'a> {
    user_id: String,
    system_prompt: &'a str,
    backend: &'a dyn ChatBackend,
    history_store: &'a dyn HistoryStore,
}

impl<'a> ChatSession<'a> {
    pub fn new(
        user_id: &str,
        system_prompt: &'a str,
        backend: &'a dyn ChatBackend,
        history_store: &'a dyn HistoryStore,
    ) -> Self {
        Self {
            user_id: user_id.to_owned(),
            system_prompt,
            backend,
            history_store,
        }
    }

    /// Answer one chat request. Yields text frames and always ends with [COMPLETED_SENTINEL].
    pub fn respond(&self, params: ChatParams) -> impl Stream<Item = String> + Send + '_ {
        stream! {
            let memory = ConversationMemory::new(self.history_store, &self.user_id, &params.chat_id);
            let history = memory.load().await;

            let provider = match self.backend.model_provider(&params.model_name).await {
                Ok(Some(provider)) => provider,
                Ok(None) => {
                    yield format!("Error: unsupported model {}", params.model_name);
                    yield COMPLETED_SENTINEL.to_owned();
                    return;
                }
                Err(e) => {
                    rocket::error!("Failed to build chat model {}: {}", params.model_name, e);
                    yield format!("Error occurred: {}", e);
                    yield COMPLETED_SENTINEL.to_owned();
                    return;
                }
            };

            let mut user_turn = params.prompt.clone();
            if params.is_document_chat() {
                let filter = SearchFilter::from_scope(
                    &self.user_id,
                    Some(&params.directory_id),
                    params.tenant_id.as_deref(),
                );
                let context = self.backend.document_context(&params.prompt, &filter).await;
                if context.is_empty() {
                    yield NO_DOCUMENTS_MESSAGE.to_owned();
                    yield COMPLETED_SENTINEL.to_owned();
                    return;
                }
                user_turn = format!(
                    "Please refer to the following content: {}\n\nAnswer the question: {}",
                    context, params.prompt
                );
            }

            let messages = self.build_messages(&params, &history, user_turn);
            let options = LlmProviderOptions {
                model: params.model_name.clone(),
                think: params.show_think,
            };
            let mut llm_stream = match provider.chat_stream(messages, &options).await {
                Ok(llm_stream) => llm_stream,
                Err(e) => {
                    rocket::warn!("Chat model {} failed: {}", params.model_name, e);
                    yield format!("Error occurred: {}", e);
                    yield COMPLETED_SENTINEL.to_owned();
                    return;
                }
            };

            let mut full_text = String::new();
            let mut in_think = false;
            while let Some(chunk) = llm_stream.next().await {
                match chunk {
                    Ok(LlmStreamChunk::Thinking(text)) => {
                        if !in_think {
                            in_think = true;
                            full_text.push_str(THINK_OPEN);
                            yield THINK_OPEN.to_owned();
                        }
                        full_text.push_str(&text);
                        yield text;
                    }
                    Ok(LlmStreamChunk::Text(text)) => {
                        if in_think {
                            in_think = false;
                            full_text.push_str(THINK_CLOSE);
                            yield THINK_CLOSE.to_owned();
                        }
                        if !text.is_empty() {
                            full_text.push_str(&text);
                            yield text;
                        }
                    }
                    Ok(LlmStreamChunk::Usage(usage)) => {
                        rocket::debug!("Chat {} usage: {:?}", params.chat_id, usage);
                    }
                    Err(e) => {
                        rocket::warn!("Stream error in chat {}: {}", params.chat_id, e);
                        yield format!("Error occurred: {}", e);
                        yield COMPLETED_SENTINEL.to_owned();
                        return;
                    }
                }
            }
            if in_think {
                full_text.push_str(THINK_CLOSE);
                yield THINK_CLOSE.to_owned();
            }

            if let Err(e) = memory.append_turn(history, &params.prompt, &full_text).await {
                rocket::error!("Failed to save conversation history {}: {}", params.chat_id, e);
            }
            yield COMPLETED_SENTINEL.to_owned();

            let (think_content, response_content) = split_think(&full_text);
            self.backend.persist_history(NewChatHistory {
                user_id: self.user_id.clone(),
                chat_id: params.chat_id,
                model_name: params.model_name,
                files: params.files,
                prompt: params.prompt,
                content: full_text,
                think_content,
                response_content,
            });
        }
    }

    /// System prompt, then the rolling history, then the new user turn
    fn build_messages(
        &self,
        params: &ChatParams,
        history: &[LlmMessage],
        user_turn: String,
    ) -> Vec<LlmMessage> {
        let system_prompt = match params.language.as_deref().map(str::trim) {
            Some(language) if !language.is_empty() => {
                format!("{}\nAnswer in the language: {}", self.system_prompt, language)
            }
            _ => self.system_prompt.to_owned(),
        };

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(LlmMessage::system(system_prompt));
        messages.extend(history.iter().cloned());
        messages.push(LlmMessage::user(user_turn));
        messages
    }
}

/// [ChatBackend] backed by the database pool and the configured runtimes
pub struct ServerChatBackend<'a> {
    pub db_pool: &'a DbPool,
    pub encryptor: &'a Encryptor,
    pub http_client: &'a reqwest::Client,
    pub embedder: &'a dyn EmbeddingProvider,
    pub default_ollama_url: &'a str,
}

impl ServerChatBackend<'_> {
    async fn connection(&self) -> Result<DbConnection, ApiError> {
        self.db_pool.get().await.map(DbConnection).map_err(|e| {
            rocket::error!("Couldn't get database connection: {}", e);
            ApiError::Internal("Database unavailable".into())
        })
    }
}

#[async_trait]
impl ChatBackend for ServerChatBackend<'_> {
    async fn model_provider(
        &self,
        model_name: &str,
    ) -> Result<Option<Box<dyn LlmApiProvider>>, ApiError> {
        let mut db = self.connection().await?;
        let Some(config) = ModelConfigDbService::new(&mut db)
            .find_enabled_by_name(model_name)
            .await?
        else {
            return Ok(None);
        };

        let api_key = match (&config.api_key_ciphertext, &config.api_key_nonce) {
            (Some(ciphertext), Some(nonce)) => Some(self.encryptor.decrypt_string(ciphertext, nonce)?),
            _ => None,
        };
        let provider = build_llm_provider_api(
            config.provider_type,
            config.base_url.as_deref(),
            api_key.as_deref(),
            self.default_ollama_url,
            self.http_client,
        )?;

        Ok(Some(provider))
    }

    async fn document_context(&self, query: &str, filter: &SearchFilter) -> String {
        let mut db = match self.connection().await {
            Ok(db) => db,
            Err(_) => return String::new(),
        };
        let mut store = PgVectorStore::new(&mut db);
        build_context(self.embedder, &mut store, query, filter).await
    }

    fn persist_history(&self, entry: NewChatHistory) {
        save_history(self.db_pool, entry);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::{
        conversation::memory::tests::InMemoryHistoryStore,
        provider::{lorem::LoremProvider, LlmError},
    };

    #[derive(Default)]
    struct FakeBackend {
        context: String,
        failing_model: bool,
        last_filter: Mutex<Option<SearchFilter>>,
        persisted: Mutex<Vec<NewChatHistory>>,
    }

    #[async_trait]
    impl ChatBackend for FakeBackend {
        async fn model_provider(
            &self,
            model_name: &str,
        ) -> Result<Option<Box<dyn LlmApiProvider>>, ApiError> {
            match model_name {
                "lorem" if self.failing_model => Err(LlmError::MissingApiKey.into()),
                "lorem" => Ok(Some(Box::new(LoremProvider { interval_ms: 1 }))),
                _ => Ok(None),
            }
        }

        async fn document_context(&self, _query: &str, filter: &SearchFilter) -> String {
            *self.last_filter.lock().unwrap() = Some(filter.clone());
            self.context.clone()
        }

        fn persist_history(&self, entry: NewChatHistory) {
            self.persisted.lock().unwrap().push(entry);
        }
    }

    fn params(json: serde_json::Value) -> ChatParams {
        serde_json::from_value(json).unwrap()
    }

    async fn collect_frames(session: &ChatSession<'_>, params: ChatParams) -> Vec<String> {
        session.respond(params).collect().await
    }

    #[test]
    fn params_accept_camel_and_snake_case() {
        let camel = params(serde_json::json!({
            "prompt": "hi", "chatId": "c1", "modelName": "m", "showThink": true, "type": "document"
        }));
        assert_eq!(camel.chat_id, "c1");
        assert!(camel.show_think);
        assert_eq!(camel.directory_id, "public");
        assert!(camel.is_document_chat());

        let snake = params(serde_json::json!({
            "prompt": "hi", "chat_id": "c2", "model_name": "m", "directory_id": "d1", "tenant_id": "t1"
        }));
        assert_eq!(snake.chat_id, "c2");
        assert_eq!(snake.directory_id, "d1");
        assert_eq!(snake.tenant_id.as_deref(), Some("t1"));
        assert!(!snake.show_think);
        assert!(!snake.is_document_chat());
    }

    #[tokio::test]
    async fn streams_answer_and_saves_turn() {
        let backend = FakeBackend::default();
        let store = InMemoryHistoryStore::default();
        let session = ChatSession::new("u1", "system", &backend, &store);

        let frames = collect_frames(
            &session,
            params(serde_json::json!({ "prompt": "hello", "chatId": "c1", "modelName": "lorem" })),
        )
        .await;

        assert_eq!(frames.last().map(String::as_str), Some(COMPLETED_SENTINEL));
        let answer: String = frames[..frames.len() - 1].concat();
        assert!(answer.starts_with("Lorem ipsum"));

        let history: Vec<LlmMessage> =
            serde_json::from_str(&store.value("chat_history:u1:c1").unwrap()).unwrap();
        assert_eq!(history, vec![LlmMessage::user("hello"), LlmMessage::assistant(answer.clone())]);

        let persisted = backend.persisted.lock().unwrap();
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].prompt, "hello");
        assert_eq!(persisted[0].content, answer);
        assert_eq!(persisted[0].think_content, None);
        assert_eq!(persisted[0].response_content.as_deref(), Some(answer.as_str()));
    }

    #[tokio::test]
    async fn thinking_is_wrapped_in_tags() {
        let backend = FakeBackend::default();
        let store = InMemoryHistoryStore::default();
        let session = ChatSession::new("u1", "system", &backend, &store);

        let frames = collect_frames(
            &session,
            params(serde_json::json!({
                "prompt": "why?", "chatId": "c1", "modelName": "lorem", "showThink": true
            })),
        )
        .await;

        assert_eq!(frames[0], THINK_OPEN);
        let close = frames.iter().position(|f| f == THINK_CLOSE).unwrap();
        assert!(close > 1);
        assert!(frames[close + 1].starts_with("Lorem"));

        let persisted = backend.persisted.lock().unwrap();
        let think = persisted[0].think_content.as_deref().unwrap();
        assert!(think.starts_with(THINK_OPEN) && think.ends_with(THINK_CLOSE));
        assert!(persisted[0]
            .response_content
            .as_deref()
            .unwrap()
            .starts_with("Lorem"));
    }

    #[tokio::test]
    async fn unknown_model_is_reported() {
        let backend = FakeBackend::default();
        let store = InMemoryHistoryStore::default();
        let session = ChatSession::new("u1", "system", &backend, &store);

        let frames = collect_frames(
            &session,
            params(serde_json::json!({ "prompt": "hello", "chatId": "c1", "modelName": "gpt-x" })),
        )
        .await;

        assert_eq!(frames, vec!["Error: unsupported model gpt-x", COMPLETED_SENTINEL]);
        assert!(store.value("chat_history:u1:c1").is_none());
        assert!(backend.persisted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn model_errors_are_reported_and_not_saved() {
        let backend = FakeBackend {
            failing_model: true,
            ..Default::default()
        };
        let store = InMemoryHistoryStore::default();
        let session = ChatSession::new("u1", "system", &backend, &store);

        let frames = collect_frames(
            &session,
            params(serde_json::json!({ "prompt": "hello", "chatId": "c1", "modelName": "lorem" })),
        )
        .await;

        assert_eq!(frames.len(), 2);
        assert!(frames[0].starts_with("Error occurred: "));
        assert_eq!(frames[1], COMPLETED_SENTINEL);
        assert!(backend.persisted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn document_chat_without_context() {
        let backend = FakeBackend::default();
        let store = InMemoryHistoryStore::default();
        let session = ChatSession::new("u1", "system", &backend, &store);

        let frames = collect_frames(
            &session,
            params(serde_json::json!({
                "prompt": "what?", "chatId": "c1", "modelName": "lorem",
                "type": "document", "directoryId": "d1", "tenantId": "t1"
            })),
        )
        .await;

        assert_eq!(frames, vec![NO_DOCUMENTS_MESSAGE, COMPLETED_SENTINEL]);
        assert_eq!(
            backend.last_filter.lock().unwrap().clone(),
            Some(SearchFilter::from_scope("u1", Some("d1"), Some("t1")))
        );
    }

    #[tokio::test]
    async fn document_chat_keeps_raw_prompt_in_history() {
        let backend = FakeBackend {
            context: "From a.txt (page 1):\nfacts\n".into(),
            ..Default::default()
        };
        let store = InMemoryHistoryStore::default();
        let session = ChatSession::new("u1", "system", &backend, &store);

        let frames = collect_frames(
            &session,
            params(serde_json::json!({
                "prompt": "what?", "chatId": "c1", "modelName": "lorem", "type": "document"
            })),
        )
        .await;
        assert_eq!(frames.last().map(String::as_str), Some(COMPLETED_SENTINEL));

        let history: Vec<LlmMessage> =
            serde_json::from_str(&store.value("chat_history:u1:c1").unwrap()).unwrap();
        assert_eq!(history[0], LlmMessage::user("what?"));
        assert_eq!(backend.persisted.lock().unwrap()[0].prompt, "what?");
    }

    #[test]
    fn messages_include_history_and_language() {
        let backend = FakeBackend::default();
        let store = InMemoryHistoryStore::default();
        let session = ChatSession::new("u1", "Be helpful.", &backend, &store);
        let chat = params(serde_json::json!({
            "prompt": "hi", "chatId": "c1", "modelName": "lorem", "language": "en"
        }));
        let history = vec![LlmMessage::user("q"), LlmMessage::assistant("a")];

        let messages = session.build_messages(&chat, &history, "hi".into());
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].content, "Be helpful.\nAnswer in the language: en");
        assert_eq!(messages[1], LlmMessage::user("q"));
        assert_eq!(messages[3], LlmMessage::user("hi"));
    }
}
