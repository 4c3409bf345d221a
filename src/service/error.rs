use crate::storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Model error: {0}")]
    Llm(String),
}
