//! Error types for the protocol layer.
//!
//! Every failure below the workflow boundary is translated into a
//! [`WorkflowError`], and every `WorkflowError` maps onto one code of the
//! closed [`ErrorCode`] vocabulary.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use custody_ledger_core::{CanonicalError, FieldError, ServiceDomain, ServiceType, ValidationError};
use custody_ledger_store::StoreError;

use crate::directory::DirectoryError;
use crate::ledger::LedgerError;
use crate::pricing::PricingError;
use crate::registry::CustodyStage;

/// The closed vocabulary of failure codes exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    QuoteNotFound,
    CustodyTokenNotFound,
    ChallengeNotFound,
    ProviderInvalidOrRevoked,
    ProviderLicenseMismatch,
    InvalidProviderSignature,
    CustodyStateConflict,
    RegistrationConflict,
    IdempotencyConflict,
    LedgerUnavailable,
    DirectoryUnavailable,
    RegistryUnavailable,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::QuoteNotFound => "QUOTE_NOT_FOUND",
            ErrorCode::CustodyTokenNotFound => "CUSTODY_TOKEN_NOT_FOUND",
            ErrorCode::ChallengeNotFound => "CHALLENGE_NOT_FOUND",
            ErrorCode::ProviderInvalidOrRevoked => "PROVIDER_INVALID_OR_REVOKED",
            ErrorCode::ProviderLicenseMismatch => "PROVIDER_LICENSE_MISMATCH",
            ErrorCode::InvalidProviderSignature => "INVALID_PROVIDER_SIGNATURE",
            ErrorCode::CustodyStateConflict => "CUSTODY_STATE_CONFLICT",
            ErrorCode::RegistrationConflict => "REGISTRATION_CONFLICT",
            ErrorCode::IdempotencyConflict => "IDEMPOTENCY_CONFLICT",
            ErrorCode::LedgerUnavailable => "LEDGER_UNAVAILABLE",
            ErrorCode::DirectoryUnavailable => "DIRECTORY_UNAVAILABLE",
            ErrorCode::RegistryUnavailable => "REGISTRY_UNAVAILABLE",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Conventional HTTP status for hosts that serve the protocol over HTTP.
    pub fn http_status(self) -> u16 {
        match self {
            ErrorCode::ValidationError | ErrorCode::ProviderLicenseMismatch => 400,
            ErrorCode::InvalidProviderSignature => 401,
            ErrorCode::ProviderInvalidOrRevoked => 403,
            ErrorCode::QuoteNotFound
            | ErrorCode::CustodyTokenNotFound
            | ErrorCode::ChallengeNotFound => 404,
            ErrorCode::CustodyStateConflict
            | ErrorCode::RegistrationConflict
            | ErrorCode::IdempotencyConflict => 409,
            ErrorCode::InternalError => 500,
            ErrorCode::LedgerUnavailable
            | ErrorCode::DirectoryUnavailable
            | ErrorCode::RegistryUnavailable => 503,
        }
    }

    /// Whether the same request may succeed if retried later.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorCode::LedgerUnavailable
                | ErrorCode::DirectoryUnavailable
                | ErrorCode::RegistryUnavailable
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur during a workflow.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("quote not found: {0}")]
    QuoteNotFound(String),

    #[error("custody token not found: {0}")]
    CustodyTokenNotFound(String),

    #[error("challenge not found: {0}")]
    ChallengeNotFound(String),

    /// Unknown, or known but not active. The two are not distinguished.
    #[error("provider {0} is unknown or not active")]
    ProviderInvalidOrRevoked(String),

    #[error("provider {provider_id} holds no license for {domain}/{service_type}")]
    ProviderLicenseMismatch {
        provider_id: String,
        domain: ServiceDomain,
        service_type: ServiceType,
    },

    #[error("signature from provider {0} does not verify")]
    InvalidProviderSignature(String),

    #[error("custody token {custody_token_id} is {current}, cannot move to {attempted}")]
    CustodyStateConflict {
        custody_token_id: String,
        current: CustodyStage,
        attempted: CustodyStage,
    },

    #[error("{registry} key {key} is already registered with a different value")]
    RegistrationConflict { registry: &'static str, key: String },

    #[error("idempotency key {0} was already used for a different request")]
    IdempotencyConflict(String),

    #[error("ledger unavailable: {0}")]
    LedgerUnavailable(String),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error("registry unavailable: {0}")]
    Registry(#[from] StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<LedgerError> for WorkflowError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Unavailable(detail) => WorkflowError::LedgerUnavailable(detail),
            LedgerError::IdempotencyConflict(key) => WorkflowError::IdempotencyConflict(key),
            LedgerError::Canonical(e) => WorkflowError::Internal(e.to_string()),
        }
    }
}

impl From<CanonicalError> for WorkflowError {
    fn from(err: CanonicalError) -> Self {
        WorkflowError::Internal(err.to_string())
    }
}

impl From<PricingError> for WorkflowError {
    fn from(err: PricingError) -> Self {
        WorkflowError::Internal(err.to_string())
    }
}

impl WorkflowError {
    pub fn code(&self) -> ErrorCode {
        match self {
            WorkflowError::Validation(_) => ErrorCode::ValidationError,
            WorkflowError::QuoteNotFound(_) => ErrorCode::QuoteNotFound,
            WorkflowError::CustodyTokenNotFound(_) => ErrorCode::CustodyTokenNotFound,
            WorkflowError::ChallengeNotFound(_) => ErrorCode::ChallengeNotFound,
            WorkflowError::ProviderInvalidOrRevoked(_) => ErrorCode::ProviderInvalidOrRevoked,
            WorkflowError::ProviderLicenseMismatch { .. } => ErrorCode::ProviderLicenseMismatch,
            WorkflowError::InvalidProviderSignature(_) => ErrorCode::InvalidProviderSignature,
            WorkflowError::CustodyStateConflict { .. } => ErrorCode::CustodyStateConflict,
            WorkflowError::RegistrationConflict { .. } => ErrorCode::RegistrationConflict,
            WorkflowError::IdempotencyConflict(_) => ErrorCode::IdempotencyConflict,
            WorkflowError::LedgerUnavailable(_) => ErrorCode::LedgerUnavailable,
            WorkflowError::Directory(_) => ErrorCode::DirectoryUnavailable,
            WorkflowError::Registry(_) => ErrorCode::RegistryUnavailable,
            WorkflowError::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// The caller-facing `{error, details}` body.
    pub fn to_response(&self) -> ErrorResponse {
        let fields = match self {
            WorkflowError::Validation(e) => e.fields().to_vec(),
            _ => Vec::new(),
        };
        ErrorResponse {
            error: self.code(),
            details: Some(self.to_string()),
            fields,
        }
    }
}

/// Serializable failure body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Every failing field, for validation errors.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldError>,
}

/// Result type for protocol workflows.
pub type Result<T> = std::result::Result<T, WorkflowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ErrorCode::QuoteNotFound.http_status(), 404);
        assert_eq!(ErrorCode::ProviderInvalidOrRevoked.http_status(), 403);
        assert_eq!(ErrorCode::ProviderLicenseMismatch.http_status(), 400);
        assert_eq!(ErrorCode::InvalidProviderSignature.http_status(), 401);
        assert_eq!(ErrorCode::LedgerUnavailable.http_status(), 503);
    }

    #[test]
    fn test_ledger_errors_map_to_codes() {
        let unavailable: WorkflowError = LedgerError::Unavailable("down".into()).into();
        assert_eq!(unavailable.code(), ErrorCode::LedgerUnavailable);
        assert!(unavailable.code().is_retryable());

        let conflict: WorkflowError = LedgerError::IdempotencyConflict("k".into()).into();
        assert_eq!(conflict.code(), ErrorCode::IdempotencyConflict);
        assert!(!conflict.code().is_retryable());
    }

    #[test]
    fn test_validation_response_lists_fields() {
        let err = WorkflowError::Validation(ValidationError::Fields(vec![
            FieldError::new("term_days", "must be between 1 and 3650"),
            FieldError::new("asset_id", "must not be empty"),
        ]));
        let body = serde_json::to_value(err.to_response()).unwrap();

        assert_eq!(body["error"], "VALIDATION_ERROR");
        assert_eq!(body["fields"].as_array().unwrap().len(), 2);
        assert_eq!(body["fields"][0]["field"], "term_days");
    }

    #[test]
    fn test_codes_serialize_as_wire_names() {
        for code in [ErrorCode::CustodyStateConflict, ErrorCode::RegistryUnavailable] {
            let json = serde_json::to_value(code).unwrap();
            assert_eq!(json, code.as_str());
        }
    }
}
