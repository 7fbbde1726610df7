//! Error types for credential resolution, endpoint discovery and storage calls.

use thiserror::Error;

/// Result alias used across the `cos` module.
pub type Result<T> = std::result::Result<T, CosError>;

/// Errors surfaced to callers of the access layer.
///
/// None of these are retried internally; the caller decides whether to retry,
/// report or degrade.
#[derive(Error, Debug)]
pub enum CosError {
    /// The credential bundle carries neither an API key nor an HMAC key pair.
    #[error("No usable authentication material: {0}")]
    Credential(String),

    /// A client handle could not be constructed.
    #[error("Failed to construct storage client: {0}")]
    ClientConstruction(String),

    /// The endpoint directory could not be reached.
    #[error("Failed to fetch endpoint directory from {url}: {message}")]
    DirectoryFetch { url: String, message: String },

    /// The endpoint directory answered with a bad status or an unexpected body.
    #[error("Failed to parse endpoint directory from {url}: {message}")]
    DirectoryParse { url: String, message: String },

    /// A location constraint with no hyphen, so no region can be derived.
    #[error("Cannot derive a region from location constraint '{constraint}' of bucket '{bucket}'")]
    MalformedLocation { bucket: String, constraint: String },

    /// No locality class in the directory lists the region.
    #[error("Region '{0}' not found in endpoint directory")]
    RegionNotFound(String),

    /// The region entry exists but publishes no public endpoint.
    #[error("Region '{0}' has no public endpoint")]
    NoPublicEndpoint(String),

    /// The extended bucket listing returned nothing for the bucket name.
    #[error("Bucket not found: {0}")]
    BucketNotFound(String),

    /// Exchanging the API key for a bearer token failed.
    #[error("IAM token request failed: {0}")]
    Token(String),

    /// A storage API call failed.
    #[error("{operation} failed: {message}")]
    Storage {
        operation: &'static str,
        message: String,
    },

    /// Settings or credential files could not be read.
    #[error("Settings error: {0}")]
    Settings(String),
}

impl CosError {
    pub(crate) fn storage(operation: &'static str, err: impl std::fmt::Display) -> Self {
        CosError::Storage {
            operation,
            message: err.to_string(),
        }
    }
}
