use auvworld_kernel::{DatasetTagError, KernelError};

/// Failure of a whole catalog backend. Aborts the search.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("{path}: I/O error: {message}")]
    Io { path: String, message: String },

    #[error("{path}: parse error: {message}")]
    Parse { path: String, message: String },

    #[error("catalog request to {url} failed: {message}")]
    Fetch { url: String, message: String },

    #[error(transparent)]
    Kernel(#[from] KernelError),
}

impl CatalogError {
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

/// Why one catalog entry was not matched. Logged and skipped.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MatchRejection {
    #[error("variable {0} is not an alias of any required parameter")]
    NoAlias(String),

    #[error("interim dataset")]
    Interim,

    #[error("depth axis is absent or single-level")]
    FlatDepth,

    #[error("bbox {0:?} does not contain the extent")]
    OutsideBbox([f64; 4]),

    #[error("time coverage does not contain the extent")]
    OutsideTime,

    #[error("no time coordinate")]
    NoTime,

    #[error("no valid latitude/longitude values")]
    NoCoordinates,

    #[error(transparent)]
    Tags(#[from] DatasetTagError),

    #[error("unreadable dataset: {0}")]
    Unreadable(String),
}
