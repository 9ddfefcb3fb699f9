//! Retrieval-augmented generation: document ingestion and context retrieval

pub mod chunker;
pub mod context;
pub mod extract;
pub mod ingest;
pub mod vector_store;

use crate::provider::LlmError;

/// Document ingestion errors
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("File name must not be empty")]
    EmptyFilename,
    #[error("Only pdf and txt documents can be uploaded")]
    UnsupportedExtension,
    #[error("Unable to extract text from PDF")]
    NoPdfText,
    #[error("Text file is not valid UTF-8")]
    InvalidUtf8,
    #[error("Content must not be empty")]
    EmptyContent,
    #[error("PDF error: {0}")]
    Pdf(String),
    #[error(transparent)]
    Embedding(#[from] LlmError),
    #[error("Index error: {0}")]
    Index(String),
}

impl IngestError {
    /// Whether the error is caused by the uploaded file rather than the server
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            IngestError::EmptyFilename
                | IngestError::UnsupportedExtension
                | IngestError::NoPdfText
                | IngestError::InvalidUtf8
                | IngestError::EmptyContent
        )
    }
}
