//! Resolve a verified email address to its identity.

use tracing::debug;

use super::error::DiscoveryError;
use crate::identity::{AddressVia, Identity};
use crate::store::{IdentityPool, StoreResultExt};

/// The identity owning `email`, provided that address has been verified.
///
/// Credential configurations are stripped from the result. Unknown
/// addresses and dangling address records are both `NotFound`.
pub fn lookup_verified_identity<S: IdentityPool + ?Sized>(
    store: &S,
    email: &str,
) -> Result<Identity, DiscoveryError> {
    if email.is_empty() {
        return Err(DiscoveryError::MissingIdentifier);
    }

    let address = store
        .find_verifiable_address_by_value(AddressVia::Email, email)
        .optional()?
        .ok_or_else(|| DiscoveryError::NotFound("email".into()))?;

    if !address.verified {
        debug!(address = %address.id, "lookup of unverified address");
        return Err(DiscoveryError::Unverified);
    }

    let identity = store
        .get_identity_confidential(address.identity_id)
        .optional()?
        .ok_or_else(|| DiscoveryError::NotFound("identity".into()))?;

    Ok(identity.without_credential_configs())
}
