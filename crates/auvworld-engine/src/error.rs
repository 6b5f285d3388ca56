//! Engine errors: configuration and input problems plus every stage's
//! own error.

use auvworld_catalog::CatalogError;
use auvworld_interp::InterpError;
use auvworld_kernel::KernelError;
use auvworld_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid config: {0}")]
    Config(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    ParseToml {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("{path}:{line}: invalid track point: {source}")]
    Trajectory {
        path: String,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Kernel(#[from] KernelError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Interp(#[from] InterpError),
}

impl EngineError {
    pub(crate) fn io(path: impl std::fmt::Display, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_string(),
            source,
        }
    }
}
