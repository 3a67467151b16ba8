//! Error types for backend file helpers

use thiserror::Error;

/// Result type alias using AssetError
pub type Result<T> = std::result::Result<T, AssetError>;

#[derive(Debug, Error)]
pub enum AssetError {
    /// Query parameters could not be encoded
    #[error("Failed to encode query: {0}")]
    Encode(#[from] serde_urlencoded::ser::Error),

    /// An uploader record holds inline data rather than a server file
    #[error("'{0}' is inline data, not a server file")]
    NotAFile(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },
}
