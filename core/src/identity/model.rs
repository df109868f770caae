//! The identity record, as far as verification and discovery care about it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use uuid::Uuid;

use super::address::VerifiableAddress;
use super::credentials::{Credentials, CredentialsType};
use super::extension::{ValidationError, VerificationExtension};
use super::schema::TraitSchema;

/// An identity: traits document, verifiable addresses, credentials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,

    /// ID of the traits schema the `traits` document is validated against.
    #[serde(default)]
    pub schema_id: String,

    /// Schema-validated trait document (email, name, ...).
    #[serde(default)]
    pub traits: serde_json::Value,

    /// Authoritative address list, rebuilt on every trait validation.
    #[serde(default)]
    pub verifiable_addresses: Vec<VerifiableAddress>,

    /// Credential records keyed by type. At most one record per type.
    #[serde(default)]
    pub credentials: BTreeMap<CredentialsType, Credentials>,
}

impl Identity {
    pub fn new(schema_id: impl Into<String>, traits: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            schema_id: schema_id.into(),
            traits,
            verifiable_addresses: Vec::new(),
            credentials: BTreeMap::new(),
        }
    }

    /// The credential record of the given type, if the identity has one.
    pub fn get_credentials(&self, kind: CredentialsType) -> Option<&Credentials> {
        self.credentials.get(&kind)
    }

    /// Attach (or replace) the credential record of its type.
    pub fn set_credentials(&mut self, credentials: Credentials) {
        self.credentials.insert(credentials.kind, credentials);
    }

    /// The address with the given ID.
    pub fn verifiable_address_mut(&mut self, id: Uuid) -> Option<&mut VerifiableAddress> {
        self.verifiable_addresses.iter_mut().find(|a| a.id == id)
    }

    /// Validate this identity's own traits against `schema` with a fresh
    /// reconciler, replacing `verifiable_addresses` on success.
    ///
    /// On any field error the address list is left exactly as it was.
    pub fn reconcile_addresses(
        &mut self,
        schema: &TraitSchema,
        lifespan: Duration,
    ) -> Result<(), Vec<ValidationError>> {
        let traits = self.traits.clone();
        schema.validate(&traits, VerificationExtension::new(self, lifespan))
    }

    /// Copy of this identity with every credential configuration removed.
    pub fn without_credential_configs(&self) -> Self {
        Self {
            credentials: self
                .credentials
                .iter()
                .map(|(kind, creds)| (*kind, creds.without_config()))
                .collect(),
            ..self.clone()
        }
    }
}
