//! Inbound record shapes, one per workflow.
//!
//! These are the typed results of the validation boundary (see
//! [`crate::validation`]). The protocol layer only ever sees these types,
//! never raw input.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::canonical::{canonical_bytes, strip};
use crate::error::CanonicalError;
use crate::license::{ServiceDomain, ServiceType};
use crate::types::Micros;

/// Field carrying the detached provider signature on a service record.
pub const SIGNATURE_FIELD: &str = "provider_signature";

/// Caller-supplied metadata carried by every record onto its ledger event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMeta {
    /// Links events belonging to one business transaction.
    pub correlation_id: String,
    /// Identifies one logical write so retries do not duplicate it.
    pub idempotency_key: String,
    /// Caller-asserted RFC 3339 timestamp. Untrusted.
    pub created_at: String,
    pub schema_version: String,
}

/// Records that carry [`EventMeta`].
pub trait HasMeta {
    fn meta(&self) -> &EventMeta;
}

macro_rules! impl_has_meta {
    ($($ty:ty),* $(,)?) => {
        $(impl HasMeta for $ty {
            fn meta(&self) -> &EventMeta {
                &self.meta
            }
        })*
    };
}

/// Request for a priced offer on an asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub asset_id: String,
    pub term_days: u32,
    #[serde(flatten)]
    pub meta: EventMeta,
}

/// A priced offer, bound to the exact request that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteResponse {
    pub quote_id: String,
    pub premium_micros: Micros,
    pub currency: String,
    pub pricing_version: String,
    /// SHA-256 hex of the canonical quote request.
    pub inputs_snapshot_hash: String,
    pub risk_bps: u32,
    pub reasons: Vec<String>,
    /// RFC 3339. Expiry is logical; nothing enforces it at bind time.
    pub expires_at: String,
}

/// Acceptance of a previously issued quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyBindRequest {
    pub quote_id: String,
    #[serde(flatten)]
    pub meta: EventMeta,
}

/// Pricing inputs observed for an asset, recorded for later audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingContextRecord {
    pub asset_id: String,
    pub pricing_version: String,
    /// Free-form pricing factors.
    pub factors: Map<String, Value>,
    #[serde(flatten)]
    pub meta: EventMeta,
}

/// Issuance of custody over an asset in transit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustodyTokenRecord {
    pub custody_token_id: String,
    pub asset_id: String,
    /// Party holding custody once the token is issued.
    pub custodian_id: String,
    #[serde(flatten)]
    pub meta: EventMeta,
}

/// A pending handoff of a custody token to another party.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoffChallengeRecord {
    pub challenge_id: String,
    pub custody_token_id: String,
    pub to_custodian_id: String,
    #[serde(flatten)]
    pub meta: EventMeta,
}

/// The receiving party's acceptance of a handoff challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoffAcceptanceRecord {
    pub acceptance_id: String,
    pub challenge_id: String,
    #[serde(flatten)]
    pub meta: EventMeta,
}

/// Final delivery of an asset at the end of the custody chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReceiptRecord {
    pub custody_token_id: String,
    pub received_by: String,
    #[serde(flatten)]
    pub meta: EventMeta,
}

/// A service performed on an asset, signed by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub provider_id: String,
    pub asset_id: String,
    pub service_domain: ServiceDomain,
    pub service_type: ServiceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_order_id: Option<String>,
    /// RFC 3339 time the work was performed.
    pub performed_at: String,
    /// Free-form service details (parts, readings, notes).
    pub details: Map<String, Value>,
    /// Hex Ed25519 signature over the canonical record minus this field.
    pub provider_signature: String,
    #[serde(flatten)]
    pub meta: EventMeta,
}

impl ServiceRecord {
    /// The record as a value with the signature field removed.
    pub fn unsigned_value(&self) -> Result<Value, CanonicalError> {
        let value =
            serde_json::to_value(self).map_err(|e| CanonicalError::NotRepresentable(e.to_string()))?;
        Ok(strip(&value, &[SIGNATURE_FIELD]))
    }

    /// The exact bytes the provider signs.
    pub fn signing_bytes(&self) -> Result<Vec<u8>, CanonicalError> {
        Ok(canonical_bytes(&self.unsigned_value()?))
    }
}

impl_has_meta!(
    QuoteRequest,
    PolicyBindRequest,
    PricingContextRecord,
    CustodyTokenRecord,
    HandoffChallengeRecord,
    HandoffAcceptanceRecord,
    DeliveryReceiptRecord,
    ServiceRecord,
);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meta() -> EventMeta {
        EventMeta {
            correlation_id: "corr-1".into(),
            idempotency_key: "idem-1".into(),
            created_at: "2026-01-01T00:00:00Z".into(),
            schema_version: "1.0.0".into(),
        }
    }

    fn service_record() -> ServiceRecord {
        ServiceRecord {
            provider_id: "provider-1".into(),
            asset_id: "asset-1".into(),
            service_domain: ServiceDomain::Automotive,
            service_type: ServiceType::Repair,
            work_order_id: None,
            performed_at: "2026-01-01T00:00:00Z".into(),
            details: Map::new(),
            provider_signature: "00".repeat(64),
            meta: meta(),
        }
    }

    #[test]
    fn test_meta_is_flattened() {
        let request = QuoteRequest {
            asset_id: "asset-1".into(),
            term_days: 10,
            meta: meta(),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["idempotency_key"], json!("idem-1"));
        assert!(value.get("meta").is_none());
    }

    #[test]
    fn test_signing_bytes_ignore_signature() {
        let a = service_record();
        let mut b = service_record();
        b.provider_signature = "ff".repeat(64);
        assert_eq!(a.signing_bytes().unwrap(), b.signing_bytes().unwrap());
    }

    #[test]
    fn test_signing_bytes_cover_content() {
        let a = service_record();
        let mut b = service_record();
        b.details.insert("odometer".into(), json!(1));
        assert_ne!(a.signing_bytes().unwrap(), b.signing_bytes().unwrap());
    }

    #[test]
    fn test_unsigned_value_omits_absent_work_order() {
        let value = service_record().unsigned_value().unwrap();
        assert!(value.get("work_order_id").is_none());
        assert!(value.get(SIGNATURE_FIELD).is_none());
        assert_eq!(value["service_domain"], json!("AUTOMOTIVE"));
    }
}
