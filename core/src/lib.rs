// Copyright (c) 2026 Verity Contributors. MIT License.
// See LICENSE for details.

//! # Verity Core Library
//!
//! The verification subsystem of an identity service. It answers three
//! questions, and answers them the same way every time:
//!
//! 1. Does the holder of this identity actually control this email address?
//!    (time-windowed one-time codes and bearer links, see `verification`)
//! 2. Which addresses of this identity are verifiable, and which of them are
//!    already verified? (schema-driven reconciliation, see `identity`)
//! 3. Is this identifier registered, and through which sign-in method?
//!    (credential discovery, see `discovery`)
//!
//! ## Architecture
//!
//! - **config**: Constants and the service-wide verification settings.
//! - **identity**: Identities, verifiable addresses, credentials, and the
//!   schema extension that reconciles addresses from traits.
//! - **verification**: The code engine, verification tokens, and the
//!   courier payload for code emails.
//! - **discovery**: The known-credentials probe and verified-email lookup.
//! - **store**: Collaborator traits for identity/address lookups plus an
//!   in-memory implementation.
//!
//! ## Ground Rules
//!
//! 1. The service secret is passed in, never read from ambient state.
//! 2. "Not found" from a store is a branch, not a failure.
//! 3. A verified address stays verified across trait revalidation.
//! 4. Secrets, tokens and codes never reach the logs.

pub mod config;
pub mod discovery;
pub mod identity;
pub mod store;
pub mod verification;

pub use config::VerificationSettings;
pub use discovery::{CredentialProbe, DiscoveryError, KnownCredentialsResponse};
pub use identity::{Credentials, CredentialsType, Identity, VerifiableAddress};
pub use store::{MemoryStore, StoreError};
pub use verification::{VerificationError, VerificationToken};
