//! Error types for the custody ledger core.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Canonicalization failures.
///
/// These indicate a record type that cannot be represented in the canonical
/// value model. They are programming errors, not runtime conditions.
#[derive(Debug, Error)]
pub enum CanonicalError {
    #[error("record is not representable as a canonical value: {0}")]
    NotRepresentable(String),
}

/// Errors from key and signature handling.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("invalid signature")]
    InvalidSignature,

    #[error("key encoding error: {0}")]
    Encoding(String),
}

/// One failing field in an inbound record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// An inbound record failed the parse-or-fail boundary.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// The record did not deserialize into the expected shape.
    #[error("malformed record: {0}")]
    Malformed(String),

    /// The record deserialized but one or more fields are invalid.
    #[error("invalid fields: {}", join_fields(.0))]
    Fields(Vec<FieldError>),
}

impl ValidationError {
    /// Every failing field, if the record got far enough to be checked.
    pub fn fields(&self) -> &[FieldError] {
        match self {
            ValidationError::Malformed(_) => &[],
            ValidationError::Fields(fields) => fields,
        }
    }
}

fn join_fields(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
