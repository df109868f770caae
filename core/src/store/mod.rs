//! # Store Module
//!
//! Collaborator interfaces the core reads identities and addresses
//! through, plus an in-memory implementation.
//!
//! ```text
//! AddressStore   find_verifiable_address_by_value(via, value)
//! IdentityStore  get_identity_confidential(id)
//!                find_by_credentials_identifier(type, identifier)
//! ```
//!
//! Lookups are synchronous and read-only from the core's point of view.
//! `StoreError::NotFound` is the one error the core treats as an answer
//! rather than a failure; see [`StoreResultExt::optional`].

pub mod memory;

use thiserror::Error;
use uuid::Uuid;

use crate::identity::{AddressVia, Credentials, CredentialsType, Identity, VerifiableAddress};

pub use memory::MemoryStore;

// ---------------------------------------------------------------------------
// Error Type
// ---------------------------------------------------------------------------

/// Errors that can occur during store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Turns "not found" into `None`, leaving real failures alone.
pub trait StoreResultExt<T> {
    fn optional(self) -> StoreResult<Option<T>>;
}

impl<T> StoreResultExt<T> for StoreResult<T> {
    fn optional(self) -> StoreResult<Option<T>> {
        match self {
            Ok(v) => Ok(Some(v)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Collaborator Traits
// ---------------------------------------------------------------------------

/// Address lookups.
pub trait AddressStore {
    /// The address with this `(via, value)`. Implementations compare
    /// normalized values.
    fn find_verifiable_address_by_value(
        &self,
        via: AddressVia,
        value: &str,
    ) -> StoreResult<VerifiableAddress>;
}

/// Identity lookups, including credential payloads.
pub trait IdentityStore {
    /// The identity with its credentials (configs included).
    fn get_identity_confidential(&self, id: Uuid) -> StoreResult<Identity>;

    /// The identity owning a credential of `kind` that lists `identifier`,
    /// matched verbatim.
    fn find_by_credentials_identifier(
        &self,
        kind: CredentialsType,
        identifier: &str,
    ) -> StoreResult<(Identity, Credentials)>;
}

/// Everything discovery needs from storage.
pub trait IdentityPool: AddressStore + IdentityStore {}

impl<T: AddressStore + IdentityStore + ?Sized> IdentityPool for T {}
