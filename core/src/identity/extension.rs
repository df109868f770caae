//! # Verification Schema Extension
//!
//! Hook invoked by the trait validator for every field whose schema carries
//! a verification extension. Over one validation pass it collects the
//! identity's verifiable addresses, then on [`SchemaExtension::finish`]
//! replaces the identity's address list with what it collected.
//!
//! ## Reconciliation rules
//!
//! - An address already on the identity (same `value` and `via`) is carried
//!   over as-is, keeping its ID and `verified` flag.
//! - A new address enters unverified.
//! - The same address reached through two fields is kept once.
//! - Addresses the traits no longer mention are dropped by the full replace.
//!
//! One extension instance serves exactly one pass over one identity; build
//! a new one per validation call.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use super::address::{find_same, is_valid_email, VerifiableAddress};
use super::model::Identity;
use crate::config::VIA_EMAIL;

// ---------------------------------------------------------------------------
// Extension contract
// ---------------------------------------------------------------------------

/// Per-field extension settings as they appear in a traits schema:
/// `{"verification": {"via": "email"}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionConfig {
    #[serde(default)]
    pub verification: VerificationFieldConfig,
}

/// The `verification` block of a field's extension settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationFieldConfig {
    /// Channel the field's value is verified through. Empty means "not a
    /// verification source".
    #[serde(default)]
    pub via: String,
}

impl ExtensionConfig {
    pub fn verification_via(via: impl Into<String>) -> Self {
        Self {
            verification: VerificationFieldConfig { via: via.into() },
        }
    }
}

/// A field-level schema violation reported by an extension.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The value does not conform to the format the channel requires.
    #[error("{path}: {value} is not valid \"{format}\"")]
    Format {
        path: String,
        value: String,
        format: &'static str,
    },

    /// The field names a verification channel nobody knows how to handle.
    #[error("{path}: verification.via has unknown value {via:?}")]
    UnknownChannel { path: String, via: String },
}

/// Two-phase hook driven by a structural validator: `run` zero or more
/// times during the pass, then `finish` exactly once.
///
/// `run` takes `&self` so a validator is free to visit fields from several
/// threads; implementations serialize internally. `finish` consumes the
/// extension, which is what keeps it single-pass.
pub trait SchemaExtension {
    fn run(
        &self,
        path: &str,
        config: &ExtensionConfig,
        value: &serde_json::Value,
    ) -> Result<(), ValidationError>;

    fn finish(self) -> Result<(), ValidationError>
    where
        Self: Sized;
}

// ---------------------------------------------------------------------------
// VerificationExtension
// ---------------------------------------------------------------------------

/// Address reconciler for one validation pass over one identity.
pub struct VerificationExtension<'a> {
    identity: &'a mut Identity,
    lifespan: Duration,
    pending: Mutex<Vec<VerifiableAddress>>,
}

impl<'a> VerificationExtension<'a> {
    pub fn new(identity: &'a mut Identity, lifespan: Duration) -> Self {
        Self {
            identity,
            lifespan,
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Verification lifespan configured for this pass.
    pub fn lifespan(&self) -> Duration {
        self.lifespan
    }

    /// Addresses collected so far.
    pub fn pending(&self) -> Vec<VerifiableAddress> {
        self.pending.lock().clone()
    }

    fn visit_email(&self, path: &str, value: &serde_json::Value) -> Result<(), ValidationError> {
        let raw = match value.as_str() {
            Some(s) if is_valid_email(s) => s,
            _ => {
                return Err(ValidationError::Format {
                    path: path.to_string(),
                    value: value.to_string(),
                    format: VIA_EMAIL,
                })
            }
        };

        let candidate = VerifiableAddress::new_email(raw, self.identity.id);
        let mut pending = self.pending.lock();

        if let Some(existing) = find_same(&self.identity.verifiable_addresses, &candidate) {
            if find_same(&pending, &candidate).is_none() {
                debug!(
                    identity = %self.identity.id,
                    address = %existing.id,
                    verified = existing.verified,
                    "carrying over existing address"
                );
                pending.push(existing.clone());
            }
            return Ok(());
        }

        if find_same(&pending, &candidate).is_none() {
            debug!(identity = %self.identity.id, address = %candidate.id, "new verifiable address");
            pending.push(candidate);
        }
        Ok(())
    }
}

impl SchemaExtension for VerificationExtension<'_> {
    fn run(
        &self,
        path: &str,
        config: &ExtensionConfig,
        value: &serde_json::Value,
    ) -> Result<(), ValidationError> {
        match config.verification.via.as_str() {
            VIA_EMAIL => self.visit_email(path, value),
            "" => Ok(()),
            other => Err(ValidationError::UnknownChannel {
                path: path.to_string(),
                via: other.to_string(),
            }),
        }
    }

    fn finish(self) -> Result<(), ValidationError> {
        let Self {
            identity, pending, ..
        } = self;
        let pending = pending.into_inner();
        debug!(
            identity = %identity.id,
            before = identity.verifiable_addresses.len(),
            after = pending.len(),
            "replacing verifiable addresses"
        );
        identity.verifiable_addresses = pending;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    const LIFESPAN: Duration = Duration::from_secs(600);

    fn email() -> ExtensionConfig {
        ExtensionConfig::verification_via("email")
    }

    fn identity_with(addresses: &[(&str, bool)]) -> Identity {
        let mut identity = Identity::new("default", json!({}));
        for (value, verified) in addresses {
            let mut addr = VerifiableAddress::new_email(value, identity.id);
            if *verified {
                addr.mark_verified(Utc::now());
            }
            identity.verifiable_addresses.push(addr);
        }
        identity
    }

    #[test]
    fn new_address_is_unverified() {
        let mut identity = identity_with(&[]);
        let ext = VerificationExtension::new(&mut identity, LIFESPAN);
        ext.run("/email", &email(), &json!("Alice@Example.com")).unwrap();
        ext.finish().unwrap();

        assert_eq!(identity.verifiable_addresses.len(), 1);
        let addr = &identity.verifiable_addresses[0];
        assert_eq!(addr.value, "alice@example.com");
        assert!(!addr.verified);
        assert_eq!(addr.identity_id, identity.id);
    }

    #[test]
    fn existing_verified_address_is_carried_over() {
        let mut identity = identity_with(&[("alice@example.com", true)]);
        let original_id = identity.verifiable_addresses[0].id;

        let ext = VerificationExtension::new(&mut identity, LIFESPAN);
        ext.run("/email", &email(), &json!("alice@example.com")).unwrap();
        ext.finish().unwrap();

        assert_eq!(identity.verifiable_addresses.len(), 1);
        assert!(identity.verifiable_addresses[0].verified);
        assert_eq!(identity.verifiable_addresses[0].id, original_id);
    }

    #[test]
    fn dropped_address_is_removed() {
        let mut identity = identity_with(&[("old@example.com", true)]);
        let ext = VerificationExtension::new(&mut identity, LIFESPAN);
        ext.run("/email", &email(), &json!("new@example.com")).unwrap();
        ext.finish().unwrap();

        let values: Vec<_> = identity
            .verifiable_addresses
            .iter()
            .map(|a| a.value.as_str())
            .collect();
        assert_eq!(values, vec!["new@example.com"]);
        assert!(!identity.verifiable_addresses[0].verified);
    }

    #[test]
    fn duplicate_fields_collapse() {
        let mut identity = identity_with(&[]);
        let ext = VerificationExtension::new(&mut identity, LIFESPAN);
        ext.run("/email", &email(), &json!("a@example.com")).unwrap();
        ext.run("/recovery_email", &email(), &json!("A@example.com")).unwrap();
        ext.finish().unwrap();
        assert_eq!(identity.verifiable_addresses.len(), 1);
    }

    #[test]
    fn duplicate_fields_collapse_for_existing() {
        let mut identity = identity_with(&[("a@example.com", true)]);
        let ext = VerificationExtension::new(&mut identity, LIFESPAN);
        ext.run("/email", &email(), &json!("a@example.com")).unwrap();
        ext.run("/backup", &email(), &json!("a@example.com")).unwrap();
        assert_eq!(ext.pending().len(), 1);
        ext.finish().unwrap();
        assert_eq!(identity.verifiable_addresses.len(), 1);
        assert!(identity.verifiable_addresses[0].verified);
    }

    #[test]
    fn invalid_email_rejected() {
        let mut identity = identity_with(&[]);
        let ext = VerificationExtension::new(&mut identity, LIFESPAN);
        let err = ext.run("/email", &email(), &json!("not-an-email")).unwrap_err();
        assert!(matches!(err, ValidationError::Format { format: "email", .. }));
        assert!(err.to_string().contains("/email"));

        let err = ext.run("/email", &email(), &json!(42)).unwrap_err();
        assert!(matches!(err, ValidationError::Format { .. }));
        assert!(ext.pending().is_empty());
    }

    #[test]
    fn empty_via_is_noop() {
        let mut identity = identity_with(&[]);
        let ext = VerificationExtension::new(&mut identity, LIFESPAN);
        ext.run("/name", &ExtensionConfig::default(), &json!("whatever"))
            .unwrap();
        assert!(ext.pending().is_empty());
    }

    #[test]
    fn unknown_via_rejected() {
        let mut identity = identity_with(&[]);
        let ext = VerificationExtension::new(&mut identity, LIFESPAN);
        let err = ext
            .run("/phone", &ExtensionConfig::verification_via("sms"), &json!("+15550100"))
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnknownChannel {
                path: "/phone".into(),
                via: "sms".into()
            }
        );
    }

    #[test]
    fn concurrent_visits_are_serialized() {
        let mut identity = identity_with(&[]);
        let ext = VerificationExtension::new(&mut identity, LIFESPAN);
        let config = email();

        std::thread::scope(|s| {
            for t in 0..4 {
                let ext = &ext;
                let config = &config;
                s.spawn(move || {
                    for i in 0..25 {
                        // Every thread also hits one shared address.
                        ext.run("/emails", config, &json!("shared@example.com")).unwrap();
                        let own = format!("user{}-{}@example.com", t, i);
                        ext.run("/emails", config, &json!(own)).unwrap();
                    }
                });
            }
        });

        assert_eq!(ext.pending().len(), 101);
        ext.finish().unwrap();
        assert_eq!(identity.verifiable_addresses.len(), 101);
    }

    #[test]
    fn reconcile_twice_is_idempotent() {
        let mut identity = identity_with(&[("kept@example.com", true)]);
        let traits = json!({
            "email": "kept@example.com",
            "backup": ["new@example.com", "Kept@example.com"]
        });
        let pass = |identity: &mut Identity| {
            let ext = VerificationExtension::new(identity, LIFESPAN);
            ext.run("/email", &email(), &traits["email"]).unwrap();
            for item in traits["backup"].as_array().unwrap() {
                ext.run("/backup", &email(), item).unwrap();
            }
            ext.finish().unwrap();
        };

        pass(&mut identity);
        let first = identity.verifiable_addresses.clone();
        pass(&mut identity);

        assert_eq!(first.len(), 2);
        assert_eq!(identity.verifiable_addresses, first);
        assert!(identity.verifiable_addresses[0].verified);
        assert!(!identity.verifiable_addresses[1].verified);
    }

    #[test]
    fn lifespan_is_exposed() {
        let mut identity = identity_with(&[]);
        let ext = VerificationExtension::new(&mut identity, LIFESPAN);
        assert_eq!(ext.lifespan(), LIFESPAN);
    }

    #[test]
    fn extension_config_json() {
        let config: ExtensionConfig =
            serde_json::from_value(json!({"verification": {"via": "email"}})).unwrap();
        assert_eq!(config, email());
        let empty: ExtensionConfig = serde_json::from_value(json!({})).unwrap();
        assert!(empty.verification.via.is_empty());
    }
}
