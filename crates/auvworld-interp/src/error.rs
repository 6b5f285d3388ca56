use auvworld_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum InterpError {
    /// The dataset's source has no configured priority.
    #[error("unknown source key: {0}")]
    UnknownSourceKey(String),

    /// NaN below the surface layer, where no default applies.
    #[error("no data for {canonical} at depth {depth} m (lat {lat}, lon {lon}, {time})")]
    NullData {
        canonical: String,
        lat: f64,
        lon: f64,
        depth: f64,
        time: String,
    },

    #[error("no interpolator for required variable {0}")]
    MissingInterpolator(String),

    #[error("{data_id}: {canonical} is degenerate: {reason}")]
    Degenerate {
        canonical: String,
        data_id: String,
        reason: String,
    },

    #[error("grid error: {0}")]
    Grid(String),

    #[error("{path}: interpolator cache error: {message}")]
    Cache { path: String, message: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl InterpError {
    pub(crate) fn cache(path: impl std::fmt::Display, err: impl std::fmt::Display) -> Self {
        Self::Cache {
            path: path.to_string(),
            message: err.to_string(),
        }
    }
}
