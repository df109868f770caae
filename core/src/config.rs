//! # Verification Configuration & Constants
//!
//! Every magic number of the verification subsystem lives here. The code
//! engine's parameters in particular are part of the contract with codes
//! that are already sitting in someone's inbox: change the step or the
//! digit count and every outstanding code stops verifying.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Code Engine Parameters
// ---------------------------------------------------------------------------

/// Number of decimal digits in a verification code.
pub const CODE_DIGITS: u32 = 6;

/// Time step of the one-time code, in seconds. One code per UTC day.
pub const CODE_STEP_SECS: i64 = 86_400;

/// Random bytes behind a code-based token secret. 160 bits, hex-encoded to
/// 40 characters so it still fits the 64-character token column.
pub const CODE_SECRET_BYTES: usize = 20;

/// Length of a link-based bearer token. Alphanumeric characters only so the
/// value can be dropped into a URL without escaping.
pub const LINK_TOKEN_LENGTH: usize = 32;

/// Upper bound on any stored token value.
pub const MAX_TOKEN_LENGTH: usize = 64;

// ---------------------------------------------------------------------------
// Lifespans
// ---------------------------------------------------------------------------

/// How long a verification token stays valid when nothing else is configured.
pub const DEFAULT_VERIFICATION_LIFESPAN: Duration = Duration::from_secs(3_600);

// ---------------------------------------------------------------------------
// Channels
// ---------------------------------------------------------------------------

/// The only verification channel currently recognized.
pub const VIA_EMAIL: &str = "email";

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Service-wide verification settings.
///
/// The code secret is threaded explicitly into every call that needs it.
/// Nothing in this crate reads it from global state, so rotating it is a
/// matter of constructing new settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationSettings {
    /// Service-wide secret mixed into every verification code.
    pub code_secret: String,

    /// Lifespan of newly issued verification tokens.
    #[serde(with = "duration_secs")]
    pub lifespan: Duration,

    /// Issue numeric codes (`true`) or bearer links (`false`).
    pub use_code: bool,
}

impl Default for VerificationSettings {
    fn default() -> Self {
        Self {
            code_secret: String::new(),
            lifespan: DEFAULT_VERIFICATION_LIFESPAN,
            use_code: true,
        }
    }
}

impl VerificationSettings {
    /// Settings with the given secret and default lifespan/mode.
    pub fn with_secret(code_secret: impl Into<String>) -> Self {
        Self {
            code_secret: code_secret.into(),
            ..Self::default()
        }
    }

    /// Lifespan as a chrono duration, clamped to what chrono can represent.
    pub fn lifespan_chrono(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.lifespan).unwrap_or(chrono::Duration::MAX)
    }
}

impl fmt::Debug for VerificationSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerificationSettings")
            .field("code_secret", &"<redacted>")
            .field("lifespan", &self.lifespan)
            .field("use_code", &self.use_code)
            .finish()
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}
