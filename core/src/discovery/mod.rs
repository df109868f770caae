//! # Discovery Module
//!
//! Read-only questions about who is registered.
//!
//! - **probe**: "Is this identifier registered, and how does it sign in?"
//! - **lookup**: "Which identity owns this verified email?"
//!
//! Both run against any [`IdentityPool`](crate::store::IdentityPool) and
//! never write.

pub mod lookup;
pub mod probe;

mod error;

pub use error::DiscoveryError;
pub use lookup::lookup_verified_identity;
pub use probe::{
    CredentialProbe, KnownCredentialsMethod, KnownCredentialsRequest, KnownCredentialsResponse,
    MethodFilter,
};
