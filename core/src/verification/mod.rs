//! # Verification Module
//!
//! Proof that an identity controls an address.
//!
//! ```text
//!   VerifiableAddress ──► VerificationToken::issue(settings, ..)
//!                              │
//!                 ┌────────────┴────────────┐
//!            link token                code secret
//!          (bearer value)                  │
//!                                get_code(service_secret)
//!                                          │
//!                              VerificationCodeMessage ──► courier
//!                                          │
//!                   verify_token_code(service_secret, raw, code)
//! ```
//!
//! - **code**: The day-windowed HMAC-SHA256 one-time code engine.
//! - **token**: Verification tokens and their expiry check.
//! - **message**: The courier payload for code emails.

pub mod code;
pub mod message;
pub mod token;

mod error;

pub use code::{derive_code, derive_code_at, verify_code, verify_code_at};
pub use error::VerificationError;
pub use message::VerificationCodeMessage;
pub use token::{verify_token_code, VerificationToken};
