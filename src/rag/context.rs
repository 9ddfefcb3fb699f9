use crate::{
    db::models::ChunkHit,
    provider::EmbeddingProvider,
    rag::vector_store::{SearchFilter, VectorStore},
};

pub const CONTEXT_TOP_K: i64 = 4;
pub const MAX_CONTEXT_CHARS: usize = 3000;
const TRUNCATION_MARKER: &str = "... [truncated]";

/// Retrieve the chunks most similar to `query` within the filter's scope and
/// format them as a context string. Returns an empty string when nothing is
/// found or retrieval fails.
pub async fn build_context(
    embedder: &dyn EmbeddingProvider,
    store: &mut dyn VectorStore,
    query: &str,
    filter: &SearchFilter,
) -> String {
    let embedding = match embedder.embed(&[query.to_owned()]).await {
        Ok(mut embeddings) if !embeddings.is_empty() => embeddings.swap_remove(0),
        Ok(_) => {
            rocket::error!("Error building context: no embedding for query");
            return String::new();
        }
        Err(e) => {
            rocket::error!("Error building context from documents: {}", e);
            return String::new();
        }
    };

    match store.similarity_search(embedding, filter, CONTEXT_TOP_K).await {
        Ok(hits) => format_context(&hits),
        Err(e) => {
            rocket::error!("Error building context from documents: {}", e);
            String::new()
        }
    }
}

/// Format hits as `"From {filename} (page {page}):\n{content}\n"` joined by newlines,
/// truncated to [MAX_CONTEXT_CHARS] characters.
pub fn format_context(hits: &[ChunkHit]) -> String {
    if hits.is_empty() {
        return String::new();
    }
    let context = hits
        .iter()
        .map(|hit| format!("From {} (page {}):\n{}\n", hit.filename, hit.page, hit.content))
        .collect::<Vec<_>>()
        .join("\n");

    if context.chars().count() > MAX_CONTEXT_CHARS {
        let mut truncated: String = context.chars().take(MAX_CONTEXT_CHARS).collect();
        truncated.push_str(TRUNCATION_MARKER);
        truncated
    } else {
        context
    }
}
