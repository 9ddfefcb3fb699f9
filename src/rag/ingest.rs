use pgvector::Vector;
use uuid::Uuid;

use crate::{
    db::models::NewDocumentChunk,
    provider::EmbeddingProvider,
    rag::{
        chunker::{chunk_text, CHUNK_OVERLAP, CHUNK_SIZE},
        extract::{extract_text, DocumentKind},
        vector_store::VectorStore,
        IngestError,
    },
};

/// Chunks per embedding request and per insert. An insert binds 9 parameters
/// per chunk and Postgres allows at most 65 535 per statement.
pub const INDEX_BATCH_SIZE: usize = 256;

/// Where an indexed document belongs
#[derive(Debug, Clone, Copy)]
pub struct ChunkMetadata<'a> {
    pub doc_id: &'a str,
    pub user_id: &'a str,
    pub tenant_id: Option<&'a str>,
    pub directory_id: &'a str,
    pub filename: &'a str,
}

/// Extract the text of an uploaded document and index it. Returns the number of stored chunks.
pub async fn ingest_document(
    embedder: &dyn EmbeddingProvider,
    store: &mut dyn VectorStore,
    kind: DocumentKind,
    bytes: &[u8],
    metadata: ChunkMetadata<'_>,
) -> Result<usize, IngestError> {
    let text = extract_text(kind, bytes)?;
    index_text(embedder, store, &text, metadata).await
}

/// Chunk the text, then embed and store the chunks with their metadata in batches
/// of [INDEX_BATCH_SIZE]. Chunk `i` is stored with page `i + 1`.
pub async fn index_text(
    embedder: &dyn EmbeddingProvider,
    store: &mut dyn VectorStore,
    text: &str,
    metadata: ChunkMetadata<'_>,
) -> Result<usize, IngestError> {
    let chunks = chunk_text(text, CHUNK_SIZE, CHUNK_OVERLAP);
    if chunks.is_empty() {
        return Err(IngestError::EmptyContent);
    }

    let mut stored = 0;
    for (batch_index, batch) in chunks.chunks(INDEX_BATCH_SIZE).enumerate() {
        let embeddings = embedder.embed(batch).await?;
        if embeddings.len() != batch.len() {
            return Err(IngestError::Index(format!(
                "{} chunks but {} embeddings",
                batch.len(),
                embeddings.len()
            )));
        }

        let first_page = batch_index * INDEX_BATCH_SIZE + 1;
        let new_chunks = batch
            .iter()
            .zip(embeddings)
            .enumerate()
            .map(|(i, (content, embedding))| NewDocumentChunk {
                id: Uuid::new_v4(),
                doc_id: metadata.doc_id,
                user_id: metadata.user_id,
                tenant_id: metadata.tenant_id,
                directory_id: metadata.directory_id,
                filename: metadata.filename,
                page: (first_page + i) as i32,
                content: content.as_str(),
                embedding: Vector::from(embedding),
            })
            .collect::<Vec<_>>();

        stored += store
            .add_chunks(new_chunks)
            .await
            .map_err(|e| IngestError::Index(e.to_string()))?;
    }
    rocket::info!(
        "Indexed {} chunks of document {} ({})",
        stored,
        metadata.doc_id,
        metadata.filename
    );

    Ok(stored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        provider::embedding::tests::FakeEmbedder, rag::vector_store::tests::FakeVectorStore,
    };

    const METADATA: ChunkMetadata<'static> = ChunkMetadata {
        doc_id: "d1",
        user_id: "u1",
        tenant_id: Some("t1"),
        directory_id: "public",
        filename: "notes.txt",
    };

    #[tokio::test]
    async fn indexes_chunks_with_page_numbers() {
        let mut store = FakeVectorStore::default();
        let text = "z".repeat(1800);
        let count = index_text(&FakeEmbedder::default(), &mut store, &text, METADATA)
            .await
            .unwrap();

        assert_eq!(count, 2);
        let inserted = store.inserted.lock().unwrap();
        assert_eq!(inserted[0].1, 1);
        assert_eq!(inserted[1].1, 2);
        assert_eq!(inserted[1].0.chars().count(), 1000);
        assert!(inserted.iter().all(|(_, _, dims)| *dims == 3));
    }

    #[tokio::test]
    async fn large_documents_are_indexed_in_batches() {
        let embedder = FakeEmbedder::default();
        let mut store = FakeVectorStore::default();
        // 600 windows of 1000 chars with a step of 800
        let text = "y".repeat(800 * 599 + 1000);
        let count = index_text(&embedder, &mut store, &text, METADATA)
            .await
            .unwrap();

        assert_eq!(count, 600);
        assert_eq!(*embedder.requests.lock().unwrap(), vec![256, 256, 88]);
        assert_eq!(*store.batches.lock().unwrap(), vec![256, 256, 88]);
        let inserted = store.inserted.lock().unwrap();
        let pages: Vec<i32> = inserted.iter().map(|(_, page, _)| *page).collect();
        assert_eq!(pages, (1..=600).collect::<Vec<i32>>());
    }

    #[tokio::test]
    async fn ingests_text_document() {
        let mut store = FakeVectorStore::default();
        let count = ingest_document(
            &FakeEmbedder::default(),
            &mut store,
            DocumentKind::Txt,
            b"Rust is a systems language.",
            METADATA,
        )
        .await
        .unwrap();

        assert_eq!(count, 1);
        assert_eq!(store.inserted.lock().unwrap()[0].0, "Rust is a systems language.");
    }

    #[tokio::test]
    async fn empty_document_is_rejected_before_embedding() {
        let mut store = FakeVectorStore::default();
        let failing = FakeEmbedder {
            fail: true,
            ..Default::default()
        };
        let err = ingest_document(&failing, &mut store, DocumentKind::Txt, b"  \n", METADATA)
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::EmptyContent));
        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn embedding_failure_is_a_server_error() {
        let mut store = FakeVectorStore::default();
        let failing = FakeEmbedder {
            fail: true,
            ..Default::default()
        };
        let err = index_text(&failing, &mut store, "some text", METADATA)
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Embedding(_)));
        assert!(!err.is_client_error());
        assert!(store.inserted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn store_failure_is_an_index_error() {
        let mut store = FakeVectorStore {
            fail: true,
            ..Default::default()
        };
        let err = index_text(&FakeEmbedder::default(), &mut store, "some text", METADATA)
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Index(_)));
    }
}
