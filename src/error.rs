//! Error types for the resource directory

use thiserror::Error;

/// Result type alias for directory operations
pub type Result<T> = std::result::Result<T, DirectoryError>;

/// Errors that can occur in directory operations
#[derive(Error, Debug)]
pub enum DirectoryError {
    /// Missing or invalid field on create/update, or an invalid filter value
    #[error("{0}")]
    Validation(String),

    /// Resource not found
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Missing, unknown or expired session token, or bad credentials
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// External model call failed or produced an unusable reply
    #[error("Classifier error: {0}")]
    Classifier(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DirectoryError {
    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if the caller, not the server, is at fault
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::NotFound(_) | Self::Unauthorized(_)
        )
    }
}

#[cfg(feature = "persistence")]
impl From<sled::Error> for DirectoryError {
    fn from(err: sled::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<reqwest::Error> for DirectoryError {
    fn from(err: reqwest::Error) -> Self {
        Self::Classifier(err.to_string())
    }
}

#[cfg(feature = "server")]
mod http {
    use axum::{
        http::StatusCode,
        response::{IntoResponse, Response},
        Json,
    };
    use serde_json::json;

    use super::DirectoryError;

    impl DirectoryError {
        /// HTTP status this error is reported with
        pub fn status_code(&self) -> StatusCode {
            match self {
                Self::Validation(_) => StatusCode::BAD_REQUEST,
                Self::NotFound(_) => StatusCode::NOT_FOUND,
                Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
                Self::Classifier(_)
                | Self::Storage(_)
                | Self::Serialization(_)
                | Self::Io(_)
                | Self::Config(_)
                | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            }
        }
    }

    impl IntoResponse for DirectoryError {
        fn into_response(self) -> Response {
            let status = self.status_code();
            if status.is_server_error() {
                tracing::error!("Request failed: {}", self);
            }

            (status, Json(json!({ "message": self.to_string() }))).into_response()
        }
    }
}
