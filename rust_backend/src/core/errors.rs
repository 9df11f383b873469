//! Error taxonomy shared by every estimation stage.
//!
//! Settings problems surface as [`EstimationError::Configuration`] before any
//! inference call is made. Degenerate case series surface as
//! [`EstimationError::Data`] when no safe fallback exists. Inference failures
//! and timeouts are captured per region by the orchestrator and only appear
//! here when a caller asks for a region's outcome as a `Result`.

/// Result type for estimation operations
pub type EstimationResult<T> = Result<T, EstimationError>;

/// Error type for estimation operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EstimationError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Data error: {0}")]
    Data(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Timeout: {0}")]
    Timeout(String),
}

impl EstimationError {
    /// Shorthand used by the builders when a setting fails validation.
    pub fn config(msg: impl Into<String>) -> Self {
        EstimationError::Configuration(msg.into())
    }

    /// Shorthand used when a case series cannot support estimation.
    pub fn data(msg: impl Into<String>) -> Self {
        EstimationError::Data(msg.into())
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, EstimationError::Configuration(_))
    }
}

impl From<toml::de::Error> for EstimationError {
    fn from(err: toml::de::Error) -> Self {
        EstimationError::Configuration(format!("Failed to parse settings: {}", err))
    }
}

impl From<serde_path_to_error::Error<toml::de::Error>> for EstimationError {
    fn from(err: serde_path_to_error::Error<toml::de::Error>) -> Self {
        let path = err.path().to_string();
        EstimationError::Configuration(format!("Invalid setting '{}': {}", path, err.into_inner()))
    }
}
