//! # Identity Module
//!
//! The slice of the identity model that verification and discovery need:
//!
//! 1. **Address**: Verifiable contact addresses and their verification
//!    state. Equality is `(value, via)`, nothing else.
//! 2. **Credentials**: Typed credential records (password, OIDC, none)
//!    with an opaque per-type configuration payload.
//! 3. **Model**: The identity itself: traits, addresses, credentials.
//! 4. **Extension**: The schema extension that reconciles an identity's
//!    addresses from its traits on every validation pass.
//! 5. **Schema**: A minimal host that drives extensions over a traits
//!    document.

pub mod address;
pub mod credentials;
pub mod extension;
pub mod model;
pub mod schema;

pub use address::{normalize_address, AddressStatus, AddressVia, VerifiableAddress};
pub use credentials::{Credentials, CredentialsType};
pub use extension::{ExtensionConfig, SchemaExtension, ValidationError, VerificationExtension};
pub use model::Identity;
pub use schema::{TraitField, TraitSchema};
