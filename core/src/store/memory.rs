//! # MemoryStore: In-Memory Identity Pool
//!
//! A map-backed implementation of the store traits, used by tests and by
//! the admin server (seeded from a JSON fixture).
//!
//! ## Indexes
//!
//! | Index         | Key                                  | Value         |
//! |---------------|--------------------------------------|---------------|
//! | `identities`  | identity ID                          | `Identity`    |
//! | `addresses`   | `(via, normalized value)`            | identity ID   |
//! | `credentials` | `(credentials type, identifier)`     | identity ID   |
//!
//! Every write validates uniqueness against the indexes before touching
//! anything, so a rejected write changes nothing.
//!
//! # Thread Safety
//!
//! All state sits behind one `parking_lot::RwLock`. Guards never outlive a
//! method call, so callers can hold a `MemoryStore` across other locks
//! without ordering concerns.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;
use uuid::Uuid;

use super::{AddressStore, IdentityStore, StoreError, StoreResult};
use crate::identity::{
    normalize_address, AddressVia, Credentials, CredentialsType, Identity, VerifiableAddress,
};

type AddressKey = (AddressVia, String);
type CredentialKey = (CredentialsType, String);

#[derive(Debug, Default)]
struct Indexes {
    identities: HashMap<Uuid, Identity>,
    addresses: HashMap<AddressKey, Uuid>,
    credentials: HashMap<CredentialKey, Uuid>,
}

impl Indexes {
    fn address_keys(identity: &Identity) -> Vec<AddressKey> {
        identity
            .verifiable_addresses
            .iter()
            .map(|a| (a.via, normalize_address(&a.value)))
            .collect()
    }

    fn credential_keys(identity: &Identity) -> Vec<CredentialKey> {
        identity
            .credentials
            .values()
            .flat_map(|c| c.identifiers.iter().map(move |i| (c.kind, i.clone())))
            .collect()
    }

    /// Reject `identity` if any of its keys belongs to another identity.
    fn check_unique(&self, identity: &Identity) -> StoreResult<()> {
        for key in Self::address_keys(identity) {
            if let Some(owner) = self.addresses.get(&key) {
                if *owner != identity.id {
                    return Err(StoreError::Conflict(format!(
                        "{} address {} already belongs to identity {}",
                        key.0, key.1, owner
                    )));
                }
            }
        }
        for key in Self::credential_keys(identity) {
            if let Some(owner) = self.credentials.get(&key) {
                if *owner != identity.id {
                    return Err(StoreError::Conflict(format!(
                        "{} identifier {} already belongs to identity {}",
                        key.0, key.1, owner
                    )));
                }
            }
        }
        Ok(())
    }

    fn index(&mut self, identity: &Identity) {
        for key in Self::address_keys(identity) {
            self.addresses.insert(key, identity.id);
        }
        for key in Self::credential_keys(identity) {
            self.credentials.insert(key, identity.id);
        }
    }

    fn unindex(&mut self, identity: &Identity) {
        for key in Self::address_keys(identity) {
            self.addresses.remove(&key);
        }
        for key in Self::credential_keys(identity) {
            self.credentials.remove(&key);
        }
    }
}

/// In-memory identity pool.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Indexes>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store holding `identities`. Fails on the first uniqueness
    /// conflict.
    pub fn from_identities<I: IntoIterator<Item = Identity>>(identities: I) -> StoreResult<Self> {
        let store = Self::new();
        for identity in identities {
            store.insert_identity(identity)?;
        }
        Ok(store)
    }

    /// Parse a JSON fixture file holding an array of identities.
    pub fn read_fixture<P: AsRef<Path>>(path: P) -> StoreResult<Vec<Identity>> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            StoreError::Backend(format!("reading {}: {}", path.as_ref().display(), e))
        })?;
        serde_json::from_str(&text).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Number of identities held.
    pub fn len(&self) -> usize {
        self.inner.read().identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add a new identity.
    pub fn insert_identity(&self, identity: Identity) -> StoreResult<()> {
        let mut inner = self.inner.write();
        if inner.identities.contains_key(&identity.id) {
            return Err(StoreError::Conflict(format!(
                "identity {} already exists",
                identity.id
            )));
        }
        inner.check_unique(&identity)?;
        inner.index(&identity);
        debug!(identity = %identity.id, "identity inserted");
        inner.identities.insert(identity.id, identity);
        Ok(())
    }

    /// Replace an existing identity, re-indexing its addresses and
    /// credential identifiers.
    pub fn update_identity(&self, identity: Identity) -> StoreResult<()> {
        let mut inner = self.inner.write();
        let previous = inner
            .identities
            .get(&identity.id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("identity {}", identity.id)))?;
        inner.check_unique(&identity)?;
        inner.unindex(&previous);
        inner.index(&identity);
        debug!(identity = %identity.id, "identity updated");
        inner.identities.insert(identity.id, identity);
        Ok(())
    }

    /// Overwrite one address of its owning identity (matched by address
    /// ID), e.g. after successful verification.
    pub fn update_verifiable_address(&self, address: &VerifiableAddress) -> StoreResult<()> {
        let mut inner = self.inner.write();
        let identity = inner
            .identities
            .get_mut(&address.identity_id)
            .ok_or_else(|| StoreError::NotFound(format!("identity {}", address.identity_id)))?;
        let slot = identity
            .verifiable_address_mut(address.id)
            .ok_or_else(|| StoreError::NotFound(format!("verifiable address {}", address.id)))?;
        if !slot.same_address(address) {
            return Err(StoreError::Conflict(format!(
                "address {} cannot change its value",
                address.id
            )));
        }
        *slot = address.clone();
        Ok(())
    }
}

impl AddressStore for MemoryStore {
    fn find_verifiable_address_by_value(
        &self,
        via: AddressVia,
        value: &str,
    ) -> StoreResult<VerifiableAddress> {
        let inner = self.inner.read();
        let key = (via, normalize_address(value));
        inner
            .addresses
            .get(&key)
            .and_then(|owner| inner.identities.get(owner))
            .and_then(|identity| {
                identity
                    .verifiable_addresses
                    .iter()
                    .find(|a| a.via == via && normalize_address(&a.value) == key.1)
                    .cloned()
            })
            .ok_or_else(|| StoreError::NotFound(format!("{} address", via)))
    }
}

impl IdentityStore for MemoryStore {
    fn get_identity_confidential(&self, id: Uuid) -> StoreResult<Identity> {
        self.inner
            .read()
            .identities
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("identity {}", id)))
    }

    fn find_by_credentials_identifier(
        &self,
        kind: CredentialsType,
        identifier: &str,
    ) -> StoreResult<(Identity, Credentials)> {
        let inner = self.inner.read();
        inner
            .credentials
            .get(&(kind, identifier.to_string()))
            .and_then(|owner| inner.identities.get(owner))
            .and_then(|identity| {
                identity
                    .get_credentials(kind)
                    .map(|creds| (identity.clone(), creds.clone()))
            })
            .ok_or_else(|| StoreError::NotFound(format!("{} credentials", kind)))
    }
}
