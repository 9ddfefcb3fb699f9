use diesel::prelude::*;
use diesel::result::Error;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use pgvector::{Vector, VectorExpressionMethods};
use rocket::async_trait;

use crate::db::{
    models::{ChunkHit, NewDocumentChunk},
    schema::document_chunks,
};

/// Equality filters for similarity search. Only the fields that are set apply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilter {
    pub user_id: Option<String>,
    pub directory_id: Option<String>,
    pub tenant_id: Option<String>,
}

impl SearchFilter {
    /// Build a filter from a chat scope, ignoring empty values
    pub fn from_scope(user_id: &str, directory_id: Option<&str>, tenant_id: Option<&str>) -> Self {
        let non_empty = |value: Option<&str>| {
            value
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_owned)
        };
        Self {
            user_id: non_empty(Some(user_id)),
            directory_id: non_empty(directory_id),
            tenant_id: non_empty(tenant_id),
        }
    }
}

/// Storage and nearest-neighbour search of embedded document chunks
#[async_trait]
pub trait VectorStore: Send {
    async fn add_chunks(&mut self, chunks: Vec<NewDocumentChunk<'_>>) -> Result<usize, Error>;

    /// The `k` chunks closest to `embedding` by cosine distance
    async fn similarity_search(
        &mut self,
        embedding: Vec<f32>,
        filter: &SearchFilter,
        k: i64,
    ) -> Result<Vec<ChunkHit>, Error>;
}

/// Vector store backed by the `document_chunks` table (pgvector)
pub struct PgVectorStore<'a> {
    pub db: &'a mut AsyncPgConnection,
}

impl<'a> PgVectorStore<'a> {
    pub fn new(db: &'a mut AsyncPgConnection) -> Self {
        PgVectorStore { db }
    }
}

#[async_trait]
impl VectorStore for PgVectorStore<'_> {
    async fn add_chunks(&mut self, chunks: Vec<NewDocumentChunk<'_>>) -> Result<usize, Error> {
        if chunks.is_empty() {
            return Ok(0);
        }
        diesel::insert_into(document_chunks::table)
            .values(chunks)
            .execute(self.db)
            .await
    }

    async fn similarity_search(
        &mut self,
        embedding: Vec<f32>,
        filter: &SearchFilter,
        k: i64,
    ) -> Result<Vec<ChunkHit>, Error> {
        let mut query = document_chunks::table.into_boxed();
        if let Some(user_id) = &filter.user_id {
            query = query.filter(document_chunks::user_id.eq(user_id));
        }
        if let Some(directory_id) = &filter.directory_id {
            query = query.filter(document_chunks::directory_id.eq(directory_id));
        }
        if let Some(tenant_id) = &filter.tenant_id {
            query = query.filter(document_chunks::tenant_id.eq(tenant_id));
        }

        query
            .select(ChunkHit::as_select())
            .order(document_chunks::embedding.cosine_distance(Vector::from(embedding)))
            .limit(k)
            .load(self.db)
            .await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    /// In-memory store that records inserted chunks and returns canned hits
    #[derive(Default, Clone)]
    pub struct FakeVectorStore {
        pub inserted: Arc<Mutex<Vec<(String, i32, usize)>>>,
        /// Number of chunks in each `add_chunks` call
        pub batches: Arc<Mutex<Vec<usize>>>,
        pub hits: Vec<ChunkHit>,
        pub last_filter: Arc<Mutex<Option<SearchFilter>>>,
        pub fail: bool,
    }

    #[async_trait]
    impl VectorStore for FakeVectorStore {
        async fn add_chunks(&mut self, chunks: Vec<NewDocumentChunk<'_>>) -> Result<usize, Error> {
            if self.fail {
                return Err(Error::RollbackTransaction);
            }
            let count = chunks.len();
            self.batches.lock().unwrap().push(count);
            let mut inserted = self.inserted.lock().unwrap();
            for chunk in chunks {
                inserted.push((
                    chunk.content.to_owned(),
                    chunk.page,
                    chunk.embedding.as_slice().len(),
                ));
            }
            Ok(count)
        }

        async fn similarity_search(
            &mut self,
            _embedding: Vec<f32>,
            filter: &SearchFilter,
            k: i64,
        ) -> Result<Vec<ChunkHit>, Error> {
            if self.fail {
                return Err(Error::RollbackTransaction);
            }
            *self.last_filter.lock().unwrap() = Some(filter.clone());
            Ok(self.hits.iter().take(k as usize).cloned().collect())
        }
    }

    #[test]
    fn filter_ignores_empty_scope_values() {
        let filter = SearchFilter::from_scope("u1", Some(""), None);
        assert_eq!(
            filter,
            SearchFilter {
                user_id: Some("u1".into()),
                directory_id: None,
                tenant_id: None,
            }
        );
    }

    #[test]
    fn filter_keeps_all_set_scope_values() {
        let filter = SearchFilter::from_scope("u1", Some("public"), Some("t1"));
        assert_eq!(filter.directory_id.as_deref(), Some("public"));
        assert_eq!(filter.tenant_id.as_deref(), Some("t1"));
    }
}
