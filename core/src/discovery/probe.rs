//! # Known-Credentials Probe
//!
//! Given an identifier and an optional method filter, answer whether the
//! identifier is registered and through which sign-in method(s).
//!
//! ## Decision procedure
//!
//! ```text
//! identifier ──► address by value (email) ──► identity by ID
//!                      │ not found = none          │ not found = none
//!                      ▼                           ▼
//!            password branch (filter: "" | password)
//!              1. credential identifier == identifier  → password
//!              2. identity has password identifiers    → password + username
//!              3. identity has no password, no oidc    → none
//!            oidc branch (filter: "" | oidc)
//!              1. identity has oidc credentials        → oidc per provider
//!              2. no oidc, no password, not yet found  → none
//! ```
//!
//! Branch order is fixed, so the same store state always yields the same
//! response. An identity with no credentials at all is reported as
//! `none` under every filter, which does disclose that the identity exists.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::error::DiscoveryError;
use crate::identity::{AddressVia, CredentialsType};
use crate::store::{IdentityPool, StoreResultExt};

// ---------------------------------------------------------------------------
// Wire Types
// ---------------------------------------------------------------------------

/// Request body of the known-credentials probe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KnownCredentialsRequest {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub identifier: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub method: String,
}

/// `null` decodes like an absent field.
fn null_as_empty<'de, D: serde::Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Option::<String>::deserialize(d).map(Option::unwrap_or_default)
}

impl KnownCredentialsRequest {
    /// Strict decode: unknown fields and wrong types are malformed, while
    /// `null` counts as empty.
    pub fn from_json(body: &[u8]) -> Result<Self, DiscoveryError> {
        serde_json::from_slice(body).map_err(|e| DiscoveryError::MalformedRequest(e.to_string()))
    }
}

/// One way the identifier can sign in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownCredentialsMethod {
    pub method: CredentialsType,

    /// Login identifier to suggest when it differs from the probed one.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub username: String,

    /// OIDC provider name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub provider: String,
}

impl KnownCredentialsMethod {
    fn plain(method: CredentialsType) -> Self {
        Self {
            method,
            username: String::new(),
            provider: String::new(),
        }
    }
}

/// Response of the known-credentials probe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownCredentialsResponse {
    pub found: bool,
    #[serde(default)]
    pub methods: Vec<KnownCredentialsMethod>,
}

impl KnownCredentialsResponse {
    fn push(&mut self, method: KnownCredentialsMethod) {
        self.found = true;
        self.methods.push(method);
    }
}

// ---------------------------------------------------------------------------
// Method Filter
// ---------------------------------------------------------------------------

/// Which branches of the probe run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodFilter {
    Any,
    Password,
    Oidc,
}

impl MethodFilter {
    /// `""` → any, `password`, `oidc`; everything else is rejected.
    pub fn parse(method: &str) -> Result<Self, DiscoveryError> {
        match method {
            "" => Ok(MethodFilter::Any),
            "password" => Ok(MethodFilter::Password),
            "oidc" => Ok(MethodFilter::Oidc),
            other => Err(DiscoveryError::InvalidMethod(other.to_string())),
        }
    }

    fn includes_password(self) -> bool {
        matches!(self, MethodFilter::Any | MethodFilter::Password)
    }

    fn includes_oidc(self) -> bool {
        matches!(self, MethodFilter::Any | MethodFilter::Oidc)
    }
}

// ---------------------------------------------------------------------------
// CredentialProbe
// ---------------------------------------------------------------------------

/// The discovery decision procedure over an identity pool.
pub struct CredentialProbe<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: IdentityPool + ?Sized> CredentialProbe<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Decode a raw request body and probe.
    pub fn handle(&self, body: &[u8]) -> Result<KnownCredentialsResponse, DiscoveryError> {
        let request = KnownCredentialsRequest::from_json(body).map_err(|e| {
            warn!(error = %e, "rejecting known-credentials request");
            e
        })?;
        self.probe(&request.identifier, &request.method)
    }

    /// Run the decision procedure.
    ///
    /// Input is validated before any lookup. Store failures other than
    /// "not found" abort the probe with no partial result.
    pub fn probe(
        &self,
        identifier: &str,
        method: &str,
    ) -> Result<KnownCredentialsResponse, DiscoveryError> {
        if identifier.is_empty() {
            warn!("known-credentials probe without identifier");
            return Err(DiscoveryError::MissingIdentifier);
        }
        let filter = MethodFilter::parse(method).map_err(|e| {
            warn!(method, "known-credentials probe with invalid method");
            e
        })?;

        let address = self
            .store
            .find_verifiable_address_by_value(AddressVia::Email, identifier)
            .optional()?;

        // The address may vanish between the two reads; that is "no identity".
        let identity = match &address {
            Some(address) => self
                .store
                .get_identity_confidential(address.identity_id)
                .optional()?,
            None => None,
        };

        let password = identity
            .as_ref()
            .and_then(|i| i.get_credentials(CredentialsType::Password));
        let oidc = identity
            .as_ref()
            .and_then(|i| i.get_credentials(CredentialsType::Oidc));

        let mut result = KnownCredentialsResponse::default();

        if filter.includes_password() {
            let direct = self
                .store
                .find_by_credentials_identifier(CredentialsType::Password, identifier)
                .optional()?;

            if direct.is_some() {
                result.push(KnownCredentialsMethod::plain(CredentialsType::Password));
            } else if identity.is_some() {
                match (password, oidc) {
                    (Some(password), _) => {
                        // Registered under a different login; hint it.
                        if let Some(username) = password.first_identifier() {
                            result.push(KnownCredentialsMethod {
                                method: CredentialsType::Password,
                                username: username.to_string(),
                                provider: String::new(),
                            });
                        }
                    }
                    (None, None) => {
                        result.push(KnownCredentialsMethod::plain(CredentialsType::None));
                    }
                    (None, Some(_)) => {}
                }
            }
        }

        if filter.includes_oidc() && identity.is_some() {
            if let Some(oidc) = oidc {
                result.found = true;
                for provider in oidc.oidc_providers() {
                    result.methods.push(KnownCredentialsMethod {
                        method: CredentialsType::Oidc,
                        username: String::new(),
                        provider,
                    });
                }
            } else if password.is_none() && !result.found {
                result.push(KnownCredentialsMethod::plain(CredentialsType::None));
            }
        }

        debug!(
            ?filter,
            address_found = address.is_some(),
            identity_found = identity.is_some(),
            found = result.found,
            methods = result.methods.len(),
            "known-credentials probe"
        );
        Ok(result)
    }
}
