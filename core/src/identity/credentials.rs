//! Credential records attached to an identity.
//!
//! The set of credential types is closed. Discovery branches over it
//! exhaustively, so an unknown type string is a deserialization error
//! rather than something to be string-matched later.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Discriminant of a credential record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialsType {
    /// Identifier + password.
    Password,
    /// Federated sign-in through one or more OpenID Connect providers.
    Oidc,
    /// The identity exists but has not set up any sign-in method yet.
    None,
}

impl CredentialsType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialsType::Password => "password",
            CredentialsType::Oidc => "oidc",
            CredentialsType::None => "none",
        }
    }
}

impl fmt::Display for CredentialsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CredentialsType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "password" => Ok(CredentialsType::Password),
            "oidc" => Ok(CredentialsType::Oidc),
            "none" => Ok(CredentialsType::None),
            other => Err(other.to_string()),
        }
    }
}

/// One credential record of an identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(rename = "type")]
    pub kind: CredentialsType,

    /// Human-readable identifiers this credential signs in with
    /// (usernames, emails, provider subjects).
    #[serde(default)]
    pub identifiers: Vec<String>,

    /// Type-specific configuration. Opaque to everything except the
    /// strategy that owns the type.
    #[serde(default)]
    pub config: serde_json::Value,
}

impl Credentials {
    pub fn new(kind: CredentialsType, identifiers: Vec<String>, config: serde_json::Value) -> Self {
        Self {
            kind,
            identifiers,
            config,
        }
    }

    /// First recorded identifier, if any.
    pub fn first_identifier(&self) -> Option<&str> {
        self.identifiers.first().map(String::as_str)
    }

    /// Provider names embedded in an OIDC configuration payload
    /// (`providers[].provider`), in payload order.
    ///
    /// Lenient by construction: a missing or non-array `providers` yields
    /// nothing, and an entry without a string `provider` yields `""`.
    pub fn oidc_providers(&self) -> Vec<String> {
        self.config
            .get("providers")
            .and_then(|p| p.as_array())
            .map(|entries| {
                entries
                    .iter()
                    .map(|e| {
                        e.get("provider")
                            .and_then(|p| p.as_str())
                            .unwrap_or_default()
                            .to_string()
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Same record with the configuration payload removed, for responses
    /// that must not leak hashes or provider tokens.
    pub fn without_config(&self) -> Self {
        Self {
            kind: self.kind,
            identifiers: self.identifiers.clone(),
            config: serde_json::Value::Null,
        }
    }
}
