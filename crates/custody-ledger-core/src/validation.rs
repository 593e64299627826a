//! Record validation: the parse-or-fail boundary.
//!
//! Untyped input becomes a typed record here or is rejected with every
//! failing field listed. Nothing past this boundary re-checks shape.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{FieldError, ValidationError};
use crate::records::{
    CustodyTokenRecord, DeliveryReceiptRecord, EventMeta, HandoffAcceptanceRecord,
    HandoffChallengeRecord, PolicyBindRequest, PricingContextRecord, QuoteRequest, ServiceRecord,
};
use crate::types::SCHEMA_VERSION;

/// Maximum identifier length in bytes.
pub const MAX_ID_LEN: usize = 256;

/// Longest accepted quote term.
pub const MAX_TERM_DAYS: u32 = 3650;

/// Field-level checks for a deserialized record.
pub trait Validate {
    /// Push one entry per failing field.
    fn validate(&self, errors: &mut Vec<FieldError>);
}

/// Parse untyped input into a validated record.
///
/// This performs:
/// - Shape check (deserialization into `T`)
/// - Explicit `null` rejection (absent optional fields are omitted)
/// - Unknown top-level field rejection
/// - Field rules from `T`'s [`Validate`] impl
pub fn parse_record<T>(input: Value) -> Result<T, ValidationError>
where
    T: DeserializeOwned + Serialize + Validate,
{
    let mut errors = Vec::new();
    let input_keys: Vec<String> = match &input {
        Value::Object(map) => map
            .iter()
            .filter_map(|(key, value)| {
                if value.is_null() {
                    errors.push(FieldError::new(key.clone(), "must not be null"));
                    None
                } else {
                    Some(key.clone())
                }
            })
            .collect(),
        _ => return Err(ValidationError::Malformed("expected a JSON object".into())),
    };

    let record: T =
        serde_json::from_value(input).map_err(|e| ValidationError::Malformed(e.to_string()))?;

    reject_unknown_fields(&input_keys, &record, &mut errors);
    record.validate(&mut errors);

    if errors.is_empty() {
        Ok(record)
    } else {
        Err(ValidationError::Fields(errors))
    }
}

/// Any input key that does not survive a serialize round trip is unknown.
fn reject_unknown_fields<T: Serialize>(input_keys: &[String], record: &T, errors: &mut Vec<FieldError>) {
    let Ok(Value::Object(known)) = serde_json::to_value(record) else {
        return;
    };
    for key in input_keys {
        if !known.contains_key(key) {
            errors.push(FieldError::new(key.clone(), "unknown field"));
        }
    }
}

fn check_id(errors: &mut Vec<FieldError>, field: &str, value: &str) {
    if value.is_empty() {
        errors.push(FieldError::new(field, "must not be empty"));
    } else if value.len() > MAX_ID_LEN {
        errors.push(FieldError::new(field, format!("longer than {MAX_ID_LEN} bytes")));
    } else if value.chars().any(char::is_control) {
        errors.push(FieldError::new(field, "contains control characters"));
    }
}

fn check_timestamp(errors: &mut Vec<FieldError>, field: &str, value: &str) {
    if chrono::DateTime::parse_from_rfc3339(value).is_err() {
        errors.push(FieldError::new(field, "not an RFC 3339 timestamp"));
    }
}

impl Validate for EventMeta {
    fn validate(&self, errors: &mut Vec<FieldError>) {
        check_id(errors, "correlation_id", &self.correlation_id);
        check_id(errors, "idempotency_key", &self.idempotency_key);
        check_timestamp(errors, "created_at", &self.created_at);
        if self.schema_version != SCHEMA_VERSION {
            errors.push(FieldError::new(
                "schema_version",
                format!("unsupported version {:?}, expected {SCHEMA_VERSION}", self.schema_version),
            ));
        }
    }
}

impl Validate for QuoteRequest {
    fn validate(&self, errors: &mut Vec<FieldError>) {
        check_id(errors, "asset_id", &self.asset_id);
        if self.term_days == 0 || self.term_days > MAX_TERM_DAYS {
            errors.push(FieldError::new(
                "term_days",
                format!("must be between 1 and {MAX_TERM_DAYS}"),
            ));
        }
        self.meta.validate(errors);
    }
}

impl Validate for PolicyBindRequest {
    fn validate(&self, errors: &mut Vec<FieldError>) {
        check_id(errors, "quote_id", &self.quote_id);
        self.meta.validate(errors);
    }
}

impl Validate for PricingContextRecord {
    fn validate(&self, errors: &mut Vec<FieldError>) {
        check_id(errors, "asset_id", &self.asset_id);
        check_id(errors, "pricing_version", &self.pricing_version);
        self.meta.validate(errors);
    }
}

impl Validate for CustodyTokenRecord {
    fn validate(&self, errors: &mut Vec<FieldError>) {
        check_id(errors, "custody_token_id", &self.custody_token_id);
        check_id(errors, "asset_id", &self.asset_id);
        check_id(errors, "custodian_id", &self.custodian_id);
        self.meta.validate(errors);
    }
}

impl Validate for HandoffChallengeRecord {
    fn validate(&self, errors: &mut Vec<FieldError>) {
        check_id(errors, "challenge_id", &self.challenge_id);
        check_id(errors, "custody_token_id", &self.custody_token_id);
        check_id(errors, "to_custodian_id", &self.to_custodian_id);
        self.meta.validate(errors);
    }
}

impl Validate for HandoffAcceptanceRecord {
    fn validate(&self, errors: &mut Vec<FieldError>) {
        check_id(errors, "acceptance_id", &self.acceptance_id);
        check_id(errors, "challenge_id", &self.challenge_id);
        self.meta.validate(errors);
    }
}

impl Validate for DeliveryReceiptRecord {
    fn validate(&self, errors: &mut Vec<FieldError>) {
        check_id(errors, "custody_token_id", &self.custody_token_id);
        check_id(errors, "received_by", &self.received_by);
        self.meta.validate(errors);
    }
}

impl Validate for ServiceRecord {
    fn validate(&self, errors: &mut Vec<FieldError>) {
        check_id(errors, "provider_id", &self.provider_id);
        check_id(errors, "asset_id", &self.asset_id);
        if let Some(work_order_id) = &self.work_order_id {
            check_id(errors, "work_order_id", work_order_id);
        }
        check_timestamp(errors, "performed_at", &self.performed_at);
        let sig = &self.provider_signature;
        if sig.len() != 128 || !sig.bytes().all(|b| b.is_ascii_hexdigit()) {
            errors.push(FieldError::new("provider_signature", "must be 128 hex characters"));
        }
        self.meta.validate(errors);
    }
}
