//! # Verification Code Engine
//!
//! Day-windowed one-time codes bound to a token secret and the service
//! secret. The construction is TOTP (RFC 6238) over HMAC-SHA256 with a
//! 24-hour step and six decimal digits, keyed with
//! `token_secret ++ service_secret` (token first; the order is part of the
//! contract with codes already issued).
//!
//! Verification accepts the current day's window and the window one day
//! earlier, so a code mailed at 23:59 UTC still works at 00:01. Nothing
//! older is accepted.
//!
//! The `*_at` functions are pure. [`derive_code`] and [`verify_code`] read
//! the wall clock.

use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::config::{CODE_DIGITS, CODE_STEP_SECS};

type HmacSha256 = Hmac<Sha256>;

/// Seed of the one-time code. Token secret first, then service secret.
fn combine_secret(service_secret: &str, token_secret: &str) -> Vec<u8> {
    let mut seed = Vec::with_capacity(token_secret.len() + service_secret.len());
    seed.extend_from_slice(token_secret.as_bytes());
    seed.extend_from_slice(service_secret.as_bytes());
    seed
}

/// Window counter for a point in time. Times before the epoch fold into
/// window zero.
fn time_counter(at: DateTime<Utc>) -> u64 {
    at.timestamp().div_euclid(CODE_STEP_SECS).max(0) as u64
}

/// HOTP (RFC 4226) with HMAC-SHA256 and dynamic truncation.
fn hotp(key: &[u8], counter: u64, digits: u32) -> String {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    let offset = (digest[digest.len() - 1] & 0x0f) as usize;
    let binary = u32::from_be_bytes([
        digest[offset] & 0x7f,
        digest[offset + 1],
        digest[offset + 2],
        digest[offset + 3],
    ]);

    let modulus = 10u32.pow(digits);
    format!("{:0width$}", binary % modulus, width = digits as usize)
}

/// Code for the window containing `at`.
pub fn derive_code_at(service_secret: &str, token_secret: &str, at: DateTime<Utc>) -> String {
    hotp(
        &combine_secret(service_secret, token_secret),
        time_counter(at),
        CODE_DIGITS,
    )
}

/// Code for the current window.
pub fn derive_code(service_secret: &str, token_secret: &str) -> String {
    derive_code_at(service_secret, token_secret, Utc::now())
}

/// Check `submitted` against the windows of `now` and `now - 1 day`.
///
/// Anything that is not exactly six ASCII digits is simply a mismatch.
pub fn verify_code_at(
    service_secret: &str,
    token_secret: &str,
    submitted: &str,
    now: DateTime<Utc>,
) -> bool {
    if submitted.len() != CODE_DIGITS as usize || !submitted.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }

    let key = combine_secret(service_secret, token_secret);
    [now, now - Duration::days(1)].iter().any(|at| {
        let expected = hotp(&key, time_counter(*at), CODE_DIGITS);
        bool::from(expected.as_bytes().ct_eq(submitted.as_bytes()))
    })
}

/// [`verify_code_at`] against the wall clock.
pub fn verify_code(service_secret: &str, token_secret: &str, submitted: &str) -> bool {
    verify_code_at(service_secret, token_secret, submitted, Utc::now())
}
