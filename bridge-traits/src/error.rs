use thiserror::Error;

/// Coarse classification of a bridge failure.
///
/// Callers branch on this instead of inspecting provider-native errors:
/// rate limits feed retry and cooldown logic, `NotFound` drives
/// create-versus-update decisions, everything else is a plain failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    RateLimited,
    NotFound,
    Other,
}

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    #[error("Rate limited by upstream (HTTP {status}): {message}")]
    RateLimited { status: u16, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Object {path} is {size} bytes, above the {limit} byte limit")]
    TooLarge { path: String, size: u64, limit: u64 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BridgeError::RateLimited { .. } => ErrorKind::RateLimited,
            BridgeError::NotFound(_) => ErrorKind::NotFound,
            BridgeError::Io(e) if e.kind() == std::io::ErrorKind::NotFound => ErrorKind::NotFound,
            _ => ErrorKind::Other,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        self.kind() == ErrorKind::RateLimited
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        let limited = BridgeError::RateLimited {
            status: 429,
            message: "slow down".to_string(),
        };
        assert_eq!(limited.kind(), ErrorKind::RateLimited);
        assert!(limited.is_rate_limited());

        assert_eq!(
            BridgeError::NotFound("abc".to_string()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            BridgeError::OperationFailed("boom".to_string()).kind(),
            ErrorKind::Other
        );
    }

    #[test]
    fn test_io_not_found_maps_to_not_found() {
        let err = BridgeError::from(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "missing",
        ));
        assert!(err.is_not_found());
    }
}
