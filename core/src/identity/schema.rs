//! Minimal trait-schema host.
//!
//! Full JSON-schema validation lives elsewhere. What this module keeps is
//! the part of the validator's contract that extensions depend on: which
//! fields carry which extension settings, `run` once per present value,
//! and `finish` once at the end of a clean pass.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::extension::{ExtensionConfig, SchemaExtension, ValidationError};

/// A trait field tagged with extension settings, addressed by JSON pointer
/// (`/email`, `/contact/emails`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraitField {
    pub pointer: String,
    #[serde(default)]
    pub extension: ExtensionConfig,
}

/// The extension-bearing fields of a traits schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraitSchema {
    #[serde(default)]
    pub fields: Vec<TraitField>,
}

impl TraitSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schema with a single `/email` trait verified by email.
    pub fn email_only() -> Self {
        Self::new().field("/email", ExtensionConfig::verification_via("email"))
    }

    /// Builder-style field registration.
    pub fn field(mut self, pointer: impl Into<String>, extension: ExtensionConfig) -> Self {
        self.fields.push(TraitField {
            pointer: pointer.into(),
            extension,
        });
        self
    }

    /// Walk `traits`, feeding every present field value to `extension`.
    ///
    /// Absent and `null` fields are skipped. An array field is visited once
    /// per element. All field errors of the pass are collected; `finish` is
    /// only called when there are none, so a failed pass leaves the
    /// extension's target untouched.
    pub fn validate<E: SchemaExtension>(
        &self,
        traits: &serde_json::Value,
        extension: E,
    ) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        for field in &self.fields {
            match traits.pointer(&field.pointer) {
                None | Some(serde_json::Value::Null) => {}
                Some(serde_json::Value::Array(items)) => {
                    for (i, item) in items.iter().enumerate() {
                        let path = format!("{}/{}", field.pointer, i);
                        if let Err(e) = extension.run(&path, &field.extension, item) {
                            errors.push(e);
                        }
                    }
                }
                Some(value) => {
                    if let Err(e) = extension.run(&field.pointer, &field.extension, value) {
                        errors.push(e);
                    }
                }
            }
        }

        if !errors.is_empty() {
            warn!(errors = errors.len(), "trait validation failed");
            return Err(errors);
        }

        extension.finish().map_err(|e| vec![e])
    }
}
