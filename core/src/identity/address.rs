//! Verifiable addresses: contact channels attached to an identity.
//!
//! Two addresses are the *same address* when their normalized values and
//! `via` match.
//! Everything else on the struct (id, status, timestamps) is bookkeeping
//! that reconciliation carries over untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::config::VIA_EMAIL;

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

/// The channel an address is verified through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressVia {
    Email,
}

impl AddressVia {
    pub fn as_str(&self) -> &'static str {
        match self {
            AddressVia::Email => VIA_EMAIL,
        }
    }
}

impl fmt::Display for AddressVia {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AddressVia {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            VIA_EMAIL => Ok(AddressVia::Email),
            other => Err(other.to_string()),
        }
    }
}

/// Verification progress of an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressStatus {
    #[default]
    Pending,
    Completed,
}

// ---------------------------------------------------------------------------
// VerifiableAddress
// ---------------------------------------------------------------------------

/// A contact address of an identity, with its verification state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiableAddress {
    /// Unique address ID.
    pub id: Uuid,

    /// Normalized address value (trimmed, lower-cased email). Normalized
    /// again on deserialization.
    #[serde(deserialize_with = "deserialize_normalized")]
    pub value: String,

    /// Whether the holder has proven control over this address.
    ///
    /// Monotonic: nothing in this crate ever resets it to `false`.
    pub verified: bool,

    /// Channel the address is verified through.
    pub via: AddressVia,

    /// Verification progress.
    #[serde(default)]
    pub status: AddressStatus,

    /// When the address was verified, if it has been.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<DateTime<Utc>>,

    /// The identity owning this address.
    pub identity_id: Uuid,
}

impl VerifiableAddress {
    /// A fresh, unverified email address for the given identity.
    pub fn new_email(value: &str, identity_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            value: normalize_address(value),
            verified: false,
            via: AddressVia::Email,
            status: AddressStatus::Pending,
            verified_at: None,
            identity_id,
        }
    }

    /// `(value, via)` equality on normalized values, the only notion of
    /// sameness that matters for reconciliation and deduplication.
    pub fn same_address(&self, other: &VerifiableAddress) -> bool {
        self.via == other.via && normalize_address(&self.value) == normalize_address(&other.value)
    }

    /// Record successful verification. Idempotent: the first `verified_at`
    /// is kept.
    pub fn mark_verified(&mut self, now: DateTime<Utc>) {
        if !self.verified {
            self.verified_at = Some(now);
        }
        self.verified = true;
        self.status = AddressStatus::Completed;
    }
}

/// Canonical form of an address value: surrounding whitespace removed,
/// lower-cased.
pub fn normalize_address(value: &str) -> String {
    value.trim().to_lowercase()
}

fn deserialize_normalized<'de, D: serde::Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    String::deserialize(d).map(|v| normalize_address(&v))
}

/// Find the entry in `haystack` that is the same address as `needle`.
pub fn find_same<'a>(
    haystack: &'a [VerifiableAddress],
    needle: &VerifiableAddress,
) -> Option<&'a VerifiableAddress> {
    haystack.iter().find(|a| a.same_address(needle))
}

/// Structural email check, equivalent in strictness to the schema
/// validator's `email` format: one `@`, a non-empty local part of at most
/// 64 bytes, a non-empty domain of dot-separated non-empty labels, and no
/// whitespace, control characters or angle brackets anywhere.
pub fn is_valid_email(value: &str) -> bool {
    if value.is_empty() || value.len() > 254 {
        return false;
    }
    if value
        .chars()
        .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '<' | '>' | ',' | ';'))
    {
        return false;
    }

    let Some((local, domain)) = value.rsplit_once('@') else {
        return false;
    };
    if local.is_empty() || local.len() > 64 || local.contains('@') {
        return false;
    }
    if local.starts_with('.') || local.ends_with('.') || local.contains("..") {
        return false;
    }
    if domain.is_empty() || domain.starts_with('-') {
        return false;
    }

    domain.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && label
                .chars()
                .all(|c| c.is_alphanumeric() || c == '-')
    })
}
