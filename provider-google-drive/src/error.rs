//! Error types for Google Drive provider

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Google Drive provider errors
#[derive(Error, Debug)]
pub enum GoogleDriveError {
    /// Quota exhausted (403 or 429) and the retry budget is spent
    #[error("Google Drive rate limit (status {status_code}) after {attempts} attempts: {message}")]
    RateLimited {
        status_code: u16,
        attempts: u32,
        message: String,
    },

    /// API request returned an error
    #[error("Google Drive API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    /// File not found
    #[error("File not found: {name}")]
    FileNotFound { name: String },

    /// Failed to parse API response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Bridge error
    #[error(transparent)]
    BridgeError(#[from] BridgeError),
}

/// Result type for Google Drive operations
pub type Result<T> = std::result::Result<T, GoogleDriveError>;

impl From<GoogleDriveError> for BridgeError {
    fn from(error: GoogleDriveError) -> Self {
        match error {
            GoogleDriveError::RateLimited {
                status_code,
                attempts,
                message,
            } => BridgeError::RateLimited {
                status: status_code,
                message: format!("after {} attempts: {}", attempts, message),
            },
            GoogleDriveError::ApiError {
                status_code: 404,
                message,
            } => BridgeError::NotFound(message),
            GoogleDriveError::ApiError {
                status_code,
                message,
            } => BridgeError::OperationFailed(format!(
                "Drive API error (status {}): {}",
                status_code, message
            )),
            GoogleDriveError::FileNotFound { name } => {
                BridgeError::NotFound(format!("Drive file {}", name))
            }
            GoogleDriveError::ParseError(msg) => {
                BridgeError::OperationFailed(format!("Parse error: {}", msg))
            }
            GoogleDriveError::BridgeError(e) => e,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::ErrorKind;

    #[test]
    fn test_error_display() {
        let error = GoogleDriveError::ApiError {
            status_code: 500,
            message: "Backend Error".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "Google Drive API error (status 500): Backend Error"
        );
    }

    #[test]
    fn test_error_conversion_keeps_classification() {
        let rate_limited: BridgeError = GoogleDriveError::RateLimited {
            status_code: 403,
            attempts: 4,
            message: "userRateLimitExceeded".to_string(),
        }
        .into();
        assert_eq!(rate_limited.kind(), ErrorKind::RateLimited);

        let missing: BridgeError = GoogleDriveError::FileNotFound {
            name: "IMG_0001.jpg".to_string(),
        }
        .into();
        assert_eq!(missing.kind(), ErrorKind::NotFound);

        let other: BridgeError = GoogleDriveError::ParseError("bad json".to_string()).into();
        assert_eq!(other.kind(), ErrorKind::Other);
    }
}
