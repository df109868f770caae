//! # Verification Tokens
//!
//! One token per verification attempt. A token carries either a bearer
//! link value (32 alphanumeric characters) or a code secret (160 random
//! bits, hex-encoded) from which the day's six-digit code is derived.
//!
//! The raw token value is never serialized. It is readable through
//! [`VerificationToken::token`] for the store and the mailer, and nowhere
//! else.
//!
//! Consumption (single use) is the owning flow's business. A token only
//! knows whether it has expired.

use chrono::{DateTime, Duration, Utc};
use rand::distributions::Alphanumeric;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::code;
use super::error::VerificationError;
use crate::config::{VerificationSettings, CODE_SECRET_BYTES, LINK_TOKEN_LENGTH};
use crate::identity::VerifiableAddress;

/// A single verification attempt for one verifiable address.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationToken {
    /// Unique token ID.
    pub id: Uuid,

    /// Link value or code secret. Never leaves the service.
    #[serde(skip_serializing, default)]
    token: String,

    /// The address this attempt verifies. The address itself belongs to
    /// the identity; the token only points at it.
    pub verifiable_address_id: Uuid,

    /// When the token was issued (UTC).
    pub issued_at: DateTime<Utc>,

    /// When the token stops being valid (UTC). Always after `issued_at`.
    pub expires_at: DateTime<Utc>,

    /// The verification flow that issued this token, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_id: Option<Uuid>,
}

impl VerificationToken {
    /// Mint a token for `address` the way `settings` prescribe: a code
    /// secret or a link token, valid for the configured lifespan.
    pub fn issue(
        settings: &VerificationSettings,
        address: &VerifiableAddress,
        flow_id: Option<Uuid>,
    ) -> Result<Self, VerificationError> {
        Self::new(
            settings.use_code,
            address,
            flow_id,
            settings.lifespan_chrono(),
        )
    }

    /// Mint a token for `address`, issued now.
    pub fn new(
        use_code: bool,
        address: &VerifiableAddress,
        flow_id: Option<Uuid>,
        expires_in: Duration,
    ) -> Result<Self, VerificationError> {
        Self::new_at(use_code, address, flow_id, expires_in, Utc::now())
    }

    /// Mint a token for `address`, issued at `now`.
    ///
    /// Every call draws fresh randomness, so two attempts for the same
    /// address never share a secret.
    pub fn new_at(
        use_code: bool,
        address: &VerifiableAddress,
        flow_id: Option<Uuid>,
        expires_in: Duration,
        now: DateTime<Utc>,
    ) -> Result<Self, VerificationError> {
        if expires_in <= Duration::zero() {
            return Err(VerificationError::InvalidLifespan(expires_in.num_seconds()));
        }

        let expires_at = now
            .checked_add_signed(expires_in)
            .ok_or(VerificationError::InvalidLifespan(expires_in.num_seconds()))?;

        let token = if use_code {
            random_code_secret()
        } else {
            random_link_token()
        };

        Ok(Self {
            id: Uuid::new_v4(),
            token,
            verifiable_address_id: address.id,
            issued_at: now,
            expires_at,
            flow_id,
        })
    }

    /// The raw token value (link value or code secret).
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Today's code for this token.
    pub fn get_code(&self, service_secret: &str) -> String {
        code::derive_code(service_secret, &self.token)
    }

    /// The code for the window containing `at`.
    pub fn get_code_at(&self, service_secret: &str, at: DateTime<Utc>) -> String {
        code::derive_code_at(service_secret, &self.token, at)
    }

    /// `Ok` while `now < expires_at`, [`VerificationError::FlowExpired`]
    /// from `expires_at` on.
    pub fn is_valid(&self, now: DateTime<Utc>) -> Result<(), VerificationError> {
        if now >= self.expires_at {
            return Err(VerificationError::FlowExpired {
                expires_at: self.expires_at,
            });
        }
        Ok(())
    }
}

impl fmt::Debug for VerificationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerificationToken")
            .field("id", &self.id)
            .field("token", &"<redacted>")
            .field("verifiable_address_id", &self.verifiable_address_id)
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .field("flow_id", &self.flow_id)
            .finish()
    }
}

/// Check a submitted code against a raw token value, so a stored token row
/// can be checked without hydrating it.
pub fn verify_token_code(service_secret: &str, token: &str, submitted: &str) -> bool {
    code::verify_code(service_secret, token, submitted)
}

fn random_code_secret() -> String {
    let mut bytes = [0u8; CODE_SECRET_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn random_link_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(LINK_TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MAX_TOKEN_LENGTH;

    const SECRET: &str = "service-secret";

    fn address() -> VerifiableAddress {
        VerifiableAddress::new_email("alice@example.com", Uuid::new_v4())
    }

    #[test]
    fn code_token_shape() {
        let addr = address();
        let token = VerificationToken::new(true, &addr, None, Duration::hours(1)).unwrap();
        assert_eq!(token.token().len(), CODE_SECRET_BYTES * 2);
        assert!(token.token().len() <= MAX_TOKEN_LENGTH);
        assert!(hex::decode(token.token()).is_ok());
        assert_eq!(token.verifiable_address_id, addr.id);
    }

    #[test]
    fn link_token_shape() {
        let token = VerificationToken::new(false, &address(), None, Duration::hours(1)).unwrap();
        assert_eq!(token.token().len(), LINK_TOKEN_LENGTH);
        assert!(token.token().chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn timestamps_and_flow() {
        let now = Utc::now();
        let flow = Uuid::new_v4();
        let token =
            VerificationToken::new_at(true, &address(), Some(flow), Duration::minutes(15), now)
                .unwrap();
        assert_eq!(token.issued_at, now);
        assert_eq!(token.expires_at, now + Duration::minutes(15));
        assert!(token.expires_at > token.issued_at);
        assert_eq!(token.flow_id, Some(flow));
    }

    #[test]
    fn non_positive_lifespan_rejected() {
        let addr = address();
        assert_eq!(
            VerificationToken::new(true, &addr, None, Duration::zero()).unwrap_err(),
            VerificationError::InvalidLifespan(0)
        );
        assert!(VerificationToken::new(true, &addr, None, Duration::seconds(-5)).is_err());
    }

    #[test]
    fn unrepresentable_expiry_rejected() {
        let settings = VerificationSettings {
            lifespan: std::time::Duration::from_secs(u64::MAX),
            ..VerificationSettings::with_secret(SECRET)
        };
        let err =
            VerificationToken::new(true, &address(), None, settings.lifespan_chrono()).unwrap_err();
        assert!(matches!(err, VerificationError::InvalidLifespan(_)));
        assert!(VerificationToken::issue(&settings, &address(), None).is_err());
    }

    #[test]
    fn issue_follows_settings() {
        let mut settings = VerificationSettings {
            lifespan: std::time::Duration::from_secs(120),
            ..VerificationSettings::with_secret(SECRET)
        };
        let code = VerificationToken::issue(&settings, &address(), None).unwrap();
        assert_eq!(code.token().len(), CODE_SECRET_BYTES * 2);
        assert_eq!(code.expires_at - code.issued_at, Duration::seconds(120));

        settings.use_code = false;
        let link = VerificationToken::issue(&settings, &address(), None).unwrap();
        assert_eq!(link.token().len(), LINK_TOKEN_LENGTH);
    }

    #[test]
    fn each_attempt_gets_fresh_secret() {
        let addr = address();
        let a = VerificationToken::new(true, &addr, None, Duration::hours(1)).unwrap();
        let b = VerificationToken::new(true, &addr, None, Duration::hours(1)).unwrap();
        assert_ne!(a.token(), b.token());
        assert_ne!(a.id, b.id);

        let c = VerificationToken::new(false, &addr, None, Duration::hours(1)).unwrap();
        let d = VerificationToken::new(false, &addr, None, Duration::hours(1)).unwrap();
        assert_ne!(c.token(), d.token());
    }

    #[test]
    fn code_roundtrip_through_raw_token() {
        let token = VerificationToken::new(true, &address(), None, Duration::hours(1)).unwrap();
        let code = token.get_code(SECRET);
        assert!(verify_token_code(SECRET, token.token(), &code));
        assert!(!verify_token_code("other-secret", token.token(), &code));
    }

    #[test]
    fn validity_boundary() {
        let now = Utc::now();
        let token =
            VerificationToken::new_at(true, &address(), None, Duration::minutes(10), now).unwrap();

        assert!(token.is_valid(now).is_ok());
        assert!(token.is_valid(token.expires_at - Duration::seconds(1)).is_ok());
        assert_eq!(
            token.is_valid(token.expires_at),
            Err(VerificationError::FlowExpired {
                expires_at: token.expires_at
            })
        );
        assert!(token.is_valid(token.expires_at + Duration::days(1)).is_err());
    }

    #[test]
    fn raw_token_never_serialized_or_printed() {
        let token = VerificationToken::new(false, &address(), None, Duration::hours(1)).unwrap();
        let json = serde_json::to_string(&token).unwrap();
        assert!(!json.contains(token.token()));
        assert!(!format!("{:?}", token).contains(token.token()));
    }

    #[test]
    fn stored_row_deserializes_with_token() {
        let addr_id = Uuid::new_v4();
        let json = serde_json::json!({
            "id": Uuid::new_v4(),
            "token": "abcdef",
            "verifiable_address_id": addr_id,
            "issued_at": "2026-03-10T12:00:00Z",
            "expires_at": "2026-03-10T13:00:00Z"
        });
        let token: VerificationToken = serde_json::from_value(json).unwrap();
        assert_eq!(token.token(), "abcdef");
        assert_eq!(token.verifiable_address_id, addr_id);
        assert!(token.flow_id.is_none());
    }
}
