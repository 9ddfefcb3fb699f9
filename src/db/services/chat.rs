use diesel::prelude::*;
use diesel::result::Error;
use diesel_async::RunQueryDsl;

use crate::{
    db::{
        models::{ChatHistory, NewChatHistory},
        schema::chat_history,
        DbConnection,
    },
    utils::{Paginated, Pagination},
};

pub struct ChatDbService<'a> {
    pub db: &'a mut DbConnection,
}

impl<'a> ChatDbService<'a> {
    pub fn new(db: &'a mut DbConnection) -> Self {
        ChatDbService { db }
    }

    pub async fn save_history(&mut self, entry: NewChatHistory) -> Result<ChatHistory, Error> {
        diesel::insert_into(chat_history::table)
            .values(entry)
            .returning(ChatHistory::as_returning())
            .get_result(self.db)
            .await
    }

    /// Newest first. `total` counts every row matching the same filter.
    pub async fn get_history(
        &mut self,
        user_id: &str,
        chat_id: Option<&str>,
        page: Pagination,
    ) -> Result<Paginated<ChatHistory>, Error> {
        let history_query = || {
            let mut query = chat_history::table
                .filter(chat_history::user_id.eq(user_id))
                .into_boxed();
            if let Some(chat_id) = chat_id {
                query = query.filter(chat_history::chat_id.eq(chat_id));
            }
            query
        };

        let total: i64 = history_query().count().get_result(self.db).await?;
        let items = history_query()
            .select(ChatHistory::as_select())
            .order_by((chat_history::created_at.desc(), chat_history::id.desc()))
            .offset(page.offset())
            .limit(page.limit())
            .load(self.db)
            .await?;

        Ok(Paginated { items, total })
    }
}
