//! Courier payload for code-based verification emails.
//!
//! Rendering the subject and body is the courier's job; this is the model
//! it renders from.

use serde::{Deserialize, Serialize};

use super::token::VerificationToken;
use crate::identity::VerifiableAddress;

/// Path of the verification flow, relative to the public base URL.
pub const VERIFICATION_PATH: &str = "/self-service/verification";

/// Template model for a "here is your verification code" email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationCodeMessage {
    /// Recipient address.
    pub to: String,
    /// Where the recipient enters the code.
    pub verification_url: String,
    /// The six-digit code.
    pub code: String,
}

impl VerificationCodeMessage {
    /// Build the message for `token`, addressed to `address`.
    ///
    /// The URL points at the verification flow (`?flow=<id>` when the token
    /// belongs to one). The code travels only in `code`, never in the URL.
    pub fn new(
        token: &VerificationToken,
        address: &VerifiableAddress,
        public_base_url: &str,
        service_secret: &str,
    ) -> Self {
        let base = public_base_url.trim_end_matches('/');
        let verification_url = match token.flow_id {
            Some(flow) => format!("{}{}?flow={}", base, VERIFICATION_PATH, flow),
            None => format!("{}{}", base, VERIFICATION_PATH),
        };

        Self {
            to: address.value.clone(),
            verification_url,
            code: token.get_code(service_secret),
        }
    }

    pub fn recipient(&self) -> &str {
        &self.to
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
