//! Error types for kernel operations.

/// Errors arising from malformed kernel values or lookups.
#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    /// An extent or margin is outside its admissible range.
    #[error("validation failure: {field}: {message}")]
    Validation { field: &'static str, message: String },

    /// A canonical parameter name is not in the inventory.
    #[error("unknown parameter: {0}")]
    UnknownParameter(String),

    /// A parameter table could not be decoded.
    #[error("invalid parameter table: {0}")]
    ParameterTable(String),
}

impl KernelError {
    pub(crate) fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }
}
