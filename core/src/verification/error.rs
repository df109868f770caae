//! Error types for verification tokens.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors raised by verification tokens.
///
/// An incorrect code is not an error: code checks return `bool`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    /// The token (and with it the flow that issued it) is past its expiry.
    /// Callers surface this as an expired flow and may offer a resend.
    #[error("verification flow expired at {expires_at}")]
    FlowExpired {
        /// When the token stopped being valid.
        expires_at: DateTime<Utc>,
    },

    /// A token was requested with a non-positive lifespan, or one whose
    /// expiry is not representable.
    #[error("verification lifespan of {0}s is not positive or overflows the expiry time")]
    InvalidLifespan(i64),
}
