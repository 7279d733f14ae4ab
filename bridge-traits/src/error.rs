//! Error type shared by every bridge trait

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    /// The host does not provide this capability
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    /// The remote end could not be reached
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Whether the same call may succeed if repeated later
    pub fn is_transient(&self) -> bool {
        matches!(self, BridgeError::Timeout(_) | BridgeError::Connection(_))
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors() {
        assert!(BridgeError::Timeout("GET /api/stream/t1".to_string()).is_transient());
        assert!(BridgeError::Connection("refused".to_string()).is_transient());
        assert!(!BridgeError::OperationFailed("HTTP 404".to_string()).is_transient());
        assert!(!BridgeError::NotAvailable("quota".to_string()).is_transient());
    }
}
