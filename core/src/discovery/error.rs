//! Error types for credential discovery and identity lookup.

use thiserror::Error;

use crate::store::StoreError;

/// Errors returned by discovery operations.
///
/// Not-found results from the store never show up here as `Internal`;
/// inside the probe they are ordinary negative branches.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscoveryError {
    /// The request body could not be decoded.
    #[error("malformed request body: {0}")]
    MalformedRequest(String),

    /// The identifier was empty.
    #[error("must specify identifier")]
    MissingIdentifier,

    /// The method filter was neither empty, `password`, nor `oidc`.
    #[error("method must be either 'password' or 'oidc', got {0:?}")]
    InvalidMethod(String),

    /// Lookup target does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// The address exists but has not been verified.
    #[error("email is unverified")]
    Unverified,

    /// A collaborator failed for a reason other than "not found".
    #[error("internal error: {0}")]
    Internal(#[from] StoreError),
}

impl DiscoveryError {
    /// Whether the caller sent something unusable.
    pub fn is_bad_request(&self) -> bool {
        matches!(
            self,
            DiscoveryError::MalformedRequest(_)
                | DiscoveryError::MissingIdentifier
                | DiscoveryError::InvalidMethod(_)
        )
    }

    /// HTTP status code this error maps to.
    pub fn status_code(&self) -> u16 {
        match self {
            DiscoveryError::MalformedRequest(_)
            | DiscoveryError::MissingIdentifier
            | DiscoveryError::InvalidMethod(_) => 400,
            DiscoveryError::NotFound(_) | DiscoveryError::Unverified => 404,
            DiscoveryError::Internal(_) => 500,
        }
    }
}
