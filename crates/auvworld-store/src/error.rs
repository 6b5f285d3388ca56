//! Error types for dataset storage and fetching.

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No subset service or reader is registered for this source.
    #[error("unknown source key: {0}")]
    UnknownSourceKey(String),

    #[error("{path}: I/O error: {message}")]
    Io { path: String, message: String },

    #[error("{path}: parse error: {message}")]
    Parse { path: String, message: String },

    #[error("malformed dataset: {0}")]
    Malformed(String),

    #[error("fetch failed for {dataset_id}: {message}")]
    Fetch { dataset_id: String, message: String },

    #[error("unsupported dataset format: {0}")]
    Unsupported(String),
}

impl StoreError {
    pub(crate) fn io(path: impl std::fmt::Display, err: impl std::fmt::Display) -> Self {
        Self::Io {
            path: path.to_string(),
            message: err.to_string(),
        }
    }

    pub(crate) fn parse(path: impl std::fmt::Display, err: impl std::fmt::Display) -> Self {
        Self::Parse {
            path: path.to_string(),
            message: err.to_string(),
        }
    }
}
