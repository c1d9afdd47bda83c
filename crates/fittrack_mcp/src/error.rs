//! Error type for the application layer and its surfaces.

use fittrack_core::TrackerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum McpError {
    #[error(transparent)]
    Tracker(#[from] TrackerError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A collaborator that this call needs is not configured.
    #[error("Unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl McpError {
    /// HTTP status for the REST layer.
    pub fn status_code(&self) -> u16 {
        match self {
            McpError::Validation(_) => 400,
            McpError::NotFound(_) => 404,
            McpError::Unavailable(_) => 503,
            McpError::Internal(_) => 500,
            McpError::Tracker(e) => match e {
                TrackerError::InvalidInput(_) => 400,
                TrackerError::NotFound(_) => 404,
                TrackerError::Http(_) | TrackerError::Inference(_) => 502,
                TrackerError::Config(_) => 503,
                TrackerError::Io(_) | TrackerError::Serialization(_) => 500,
            },
        }
    }
}

impl From<String> for McpError {
    fn from(err: String) -> Self {
        McpError::Internal(err)
    }
}

impl From<McpError> for String {
    fn from(err: McpError) -> Self {
        err.to_string()
    }
}

pub type McpResult<T> = Result<T, McpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_input_maps_to_bad_request() {
        let err: McpError = TrackerError::InvalidInput("weight is required".into()).into();
        assert_eq!(err.status_code(), 400);
        assert_eq!(String::from(err), "invalid input: weight is required");
    }

    #[test]
    fn missing_inference_is_unavailable() {
        assert_eq!(McpError::Unavailable("no key".into()).status_code(), 503);
        assert_eq!(McpError::NotFound("meal".into()).status_code(), 404);
    }
}
