use diesel::prelude::*;
use diesel::result::Error;
use diesel_async::RunQueryDsl;

use crate::db::{
    models::{new_id, ChatDirectory, ChatDocument, NewChatDirectory, NewChatDocument},
    schema::{chat_directories, chat_documents},
    DbConnection,
};

pub struct DocumentDbService<'a> {
    pub db: &'a mut DbConnection,
}

impl<'a> DocumentDbService<'a> {
    pub fn new(db: &'a mut DbConnection) -> Self {
        DocumentDbService { db }
    }

    /// Directory names are unique per (user, tenant), so creating an existing
    /// directory returns the existing row.
    pub async fn get_or_create_directory(
        &mut self,
        user_id: &str,
        tenant_id: Option<&str>,
        directory: &str,
    ) -> Result<ChatDirectory, Error> {
        diesel::insert_into(chat_directories::table)
            .values(NewChatDirectory {
                id: &new_id(),
                user_id,
                tenant_id,
                directory,
            })
            .on_conflict_do_nothing()
            .execute(self.db)
            .await?;

        let mut query = chat_directories::table
            .filter(chat_directories::user_id.eq(user_id))
            .filter(chat_directories::directory.eq(directory))
            .into_boxed();
        query = match tenant_id {
            Some(tenant_id) => query.filter(chat_directories::tenant_id.eq(tenant_id)),
            None => query.filter(chat_directories::tenant_id.is_null()),
        };
        query
            .select(ChatDirectory::as_select())
            .first(self.db)
            .await
    }

    pub async fn find_directory(
        &mut self,
        user_id: &str,
        directory_id: &str,
    ) -> Result<Option<ChatDirectory>, Error> {
        chat_directories::table
            .filter(chat_directories::id.eq(directory_id))
            .filter(chat_directories::user_id.eq(user_id))
            .select(ChatDirectory::as_select())
            .first(self.db)
            .await
            .optional()
    }

    pub async fn list_directories(
        &mut self,
        user_id: &str,
        tenant_id: Option<&str>,
    ) -> Result<Vec<ChatDirectory>, Error> {
        let mut query = chat_directories::table
            .filter(chat_directories::user_id.eq(user_id))
            .into_boxed();
        query = match tenant_id {
            Some(tenant_id) => query.filter(chat_directories::tenant_id.eq(tenant_id)),
            None => query.filter(chat_directories::tenant_id.is_null()),
        };
        query
            .select(ChatDirectory::as_select())
            .order_by(chat_directories::created_at.asc())
            .load(self.db)
            .await
    }

    pub async fn create_document(
        &mut self,
        document: NewChatDocument<'_>,
    ) -> Result<ChatDocument, Error> {
        diesel::insert_into(chat_documents::table)
            .values(document)
            .returning(ChatDocument::as_returning())
            .get_result(self.db)
            .await
    }

    pub async fn find_document(
        &mut self,
        doc_id: &str,
        user_id: &str,
        directory_id: &str,
    ) -> Result<Option<ChatDocument>, Error> {
        chat_documents::table
            .filter(chat_documents::id.eq(doc_id))
            .filter(chat_documents::user_id.eq(user_id))
            .filter(chat_documents::directory_id.eq(directory_id))
            .select(ChatDocument::as_select())
            .first(self.db)
            .await
            .optional()
    }

    /// Delete the document row. Its indexed chunks are removed by cascade.
    pub async fn delete_document(&mut self, doc_id: &str, user_id: &str) -> Result<usize, Error> {
        diesel::delete(chat_documents::table.find(doc_id))
            .filter(chat_documents::user_id.eq(user_id))
            .execute(self.db)
            .await
    }

    /// The user's documents, all of them or only those of one tenant
    pub async fn list_documents(
        &mut self,
        user_id: &str,
        tenant_id: Option<&str>,
    ) -> Result<Vec<ChatDocument>, Error> {
        let mut query = chat_documents::table
            .filter(chat_documents::user_id.eq(user_id))
            .into_boxed();
        if let Some(tenant_id) = tenant_id {
            query = query.filter(chat_documents::tenant_id.eq(tenant_id));
        }
        query
            .select(ChatDocument::as_select())
            .order_by(chat_documents::created_at.desc())
            .load(self.db)
            .await
    }
}
