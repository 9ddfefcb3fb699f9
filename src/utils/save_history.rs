use crate::db::{models::NewChatHistory, services::ChatDbService, DbConnection, DbPool};

/// Spawns a task that appends a completed conversation turn to the history log.
/// Failures are only logged.
pub fn save_history(pool: &DbPool, entry: NewChatHistory) {
    let pool = pool.clone();

    tokio::spawn(async move {
        let Ok(conn) = pool.get().await else {
            rocket::error!("Couldn't get database connection");
            return;
        };
        let mut db = DbConnection(conn);
        match ChatDbService::new(&mut db).save_history(entry).await {
            Ok(saved) => {
                rocket::info!("Saved history {} of chat {}", saved.id, saved.chat_id);
            }
            Err(e) => {
                rocket::error!("Error saving chat history: {}", e);
            }
        }
    });
}
