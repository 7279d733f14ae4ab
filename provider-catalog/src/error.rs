//! Error types for the catalog provider

use bridge_traits::error::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    /// Non-2xx response
    #[error("Catalog API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// The stream endpoint answered without a usable URL
    #[error("No stream URL returned for track {track_id}")]
    MissingStreamUrl { track_id: String },

    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

pub type Result<T> = std::result::Result<T, CatalogError>;

impl From<CatalogError> for BridgeError {
    fn from(error: CatalogError) -> Self {
        match error {
            CatalogError::ApiError {
                status_code,
                message,
            } => BridgeError::OperationFailed(format!(
                "API error (status {}): {}",
                status_code, message
            )),
            CatalogError::ParseError(msg) => {
                BridgeError::OperationFailed(format!("Parse error: {}", msg))
            }
            CatalogError::MissingStreamUrl { track_id } => BridgeError::OperationFailed(format!(
                "No stream URL returned for track {}",
                track_id
            )),
            CatalogError::Bridge(e) => e,
        }
    }
}
