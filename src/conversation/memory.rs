use fred::{
    prelude::{KeysInterface, Pool},
    types::{Expiration, SetOptions},
};
use rocket::async_trait;

use crate::provider::LlmMessage;

/// Messages kept per conversation (10 user/assistant turns)
pub const MAX_HISTORY_MESSAGES: usize = 20;
/// Conversations expire 180 days after the last turn
pub const HISTORY_TTL_SECS: i64 = 180 * 24 * 60 * 60;

/// Key-value cache holding serialized conversation histories
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn load(&self, key: &str) -> Result<Option<String>, fred::error::Error>;
    async fn save(&self, key: &str, value: String, ttl_secs: i64) -> Result<(), fred::error::Error>;
}

#[async_trait]
impl HistoryStore for Pool {
    async fn load(&self, key: &str) -> Result<Option<String>, fred::error::Error> {
        self.get::<Option<String>, _>(key).await
    }

    async fn save(&self, key: &str, value: String, ttl_secs: i64) -> Result<(), fred::error::Error> {
        self.set::<(), _, _>(
            key,
            value,
            Some(Expiration::EX(ttl_secs)),
            None::<SetOptions>,
            false,
        )
        .await
    }
}

/// Short-term memory of a single conversation
pub struct ConversationMemory<'a> {
    store: &'a dyn HistoryStore,
    key: String,
}

impl<'a> ConversationMemory<'a> {
    pub fn new(store: &'a dyn HistoryStore, user_id: &str, chat_id: &str) -> Self {
        Self {
            store,
            key: history_key(user_id, chat_id),
        }
    }

    /// Previous messages of the conversation, oldest first. Cache failures and
    /// malformed values are logged and treated as an empty history.
    pub async fn load(&self) -> Vec<LlmMessage> {
        let value = match self.store.load(&self.key).await {
            Ok(Some(value)) => value,
            Ok(None) => return Vec::new(),
            Err(e) => {
                rocket::warn!("Failed to load conversation history {}: {}", self.key, e);
                return Vec::new();
            }
        };
        match serde_json::from_str::<Vec<LlmMessage>>(&value) {
            Ok(messages) => messages,
            Err(e) => {
                rocket::warn!("Ignoring malformed conversation history {}: {}", self.key, e);
                Vec::new()
            }
        }
    }

    /// Append a completed turn and store the trimmed history, refreshing its expiry
    pub async fn append_turn(
        &self,
        mut history: Vec<LlmMessage>,
        user_message: &str,
        assistant_message: &str,
    ) -> Result<(), fred::error::Error> {
        history.push(LlmMessage::user(user_message));
        history.push(LlmMessage::assistant(assistant_message));
        let history = trim_history(history, MAX_HISTORY_MESSAGES);

        let value = serde_json::to_string(&history)
            .map_err(|e| fred::error::Error::new(fred::error::ErrorKind::Parse, e.to_string()))?;
        self.store.save(&self.key, value, HISTORY_TTL_SECS).await
    }
}

fn history_key(user_id: &str, chat_id: &str) -> String {
    format!("chat_history:{user_id}:{chat_id}")
}

/// Keep only the most recent `max` messages
pub fn trim_history(mut history: Vec<LlmMessage>, max: usize) -> Vec<LlmMessage> {
    if history.len() > max {
        history.drain(..history.len() - max);
    }
    history
}

#[cfg(test)]
pub(crate) mod tests {
    use std::{collections::HashMap, sync::Mutex};

    use super::*;

    /// In-memory cache recording the TTL of each write
    #[derive(Default)]
    pub struct InMemoryHistoryStore {
        pub entries: Mutex<HashMap<String, (String, i64)>>,
    }

    impl InMemoryHistoryStore {
        pub fn value(&self, key: &str) -> Option<String> {
            self.entries.lock().unwrap().get(key).map(|(v, _)| v.clone())
        }
    }

    #[async_trait]
    impl HistoryStore for InMemoryHistoryStore {
        async fn load(&self, key: &str) -> Result<Option<String>, fred::error::Error> {
            Ok(self.value(key))
        }

        async fn save(&self, key: &str, value: String, ttl_secs: i64) -> Result<(), fred::error::Error> {
            self.entries
                .lock()
                .unwrap()
                .insert(key.to_owned(), (value, ttl_secs));
            Ok(())
        }
    }

    #[test]
    fn key_format() {
        assert_eq!(history_key("u1", "c1"), "chat_history:u1:c1");
    }

    #[test]
    fn trims_to_most_recent_messages() {
        let history: Vec<_> = (0..25).map(|i| LlmMessage::user(i.to_string())).collect();
        let trimmed = trim_history(history, MAX_HISTORY_MESSAGES);
        assert_eq!(trimmed.len(), 20);
        assert_eq!(trimmed[0].content, "5");
        assert_eq!(trimmed[19].content, "24");
    }

    #[tokio::test]
    async fn appends_turns_and_sets_expiry() {
        let store = InMemoryHistoryStore::default();
        let memory = ConversationMemory::new(&store, "u1", "c1");
        assert!(memory.load().await.is_empty());

        memory.append_turn(Vec::new(), "hi", "hello").await.unwrap();
        let history = memory.load().await;
        assert_eq!(history, vec![LlmMessage::user("hi"), LlmMessage::assistant("hello")]);

        let entries = store.entries.lock().unwrap();
        assert_eq!(entries["chat_history:u1:c1"].1, HISTORY_TTL_SECS);
    }

    #[tokio::test]
    async fn keeps_ten_turns() {
        let store = InMemoryHistoryStore::default();
        let memory = ConversationMemory::new(&store, "u1", "c1");
        for i in 0..12 {
            let history = memory.load().await;
            memory
                .append_turn(history, &format!("q{i}"), &format!("a{i}"))
                .await
                .unwrap();
        }
        let history = memory.load().await;
        assert_eq!(history.len(), MAX_HISTORY_MESSAGES);
        assert_eq!(history[0], LlmMessage::user("q2"));
        assert_eq!(history[19], LlmMessage::assistant("a11"));
    }

    #[tokio::test]
    async fn malformed_history_is_ignored() {
        let store = InMemoryHistoryStore::default();
        store
            .save("chat_history:u1:c1", "{not json".into(), 10)
            .await
            .unwrap();
        let memory = ConversationMemory::new(&store, "u1", "c1");
        assert!(memory.load().await.is_empty());
    }
}
