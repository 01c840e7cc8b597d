//! Error types for the fraud routing pipeline.

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors that cross a stage boundary.
///
/// Missing or malformed fields are not errors: the parser substitutes
/// neutral defaults and the dispatcher reports routing anomalies through
/// its classification result instead.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The payload is not a JSON object and cannot carry a risk score
    #[error("Malformed payload: {reason}")]
    MalformedPayload { reason: String },

    /// Configuration values failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A routed record could not be delivered to its destination
    #[error("Failed to publish to {destination}: {reason}")]
    Publish { destination: String, reason: String },
}

impl PipelineError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        PipelineError::MalformedPayload {
            reason: reason.into(),
        }
    }
}
