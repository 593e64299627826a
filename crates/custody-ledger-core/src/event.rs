//! Ledger events: a closed taxonomy with payloads bound to their tag.
//!
//! [`EventBody`] is the only way to put a payload on an event, so a payload
//! cannot be appended under the wrong type. On the wire the body becomes the
//! `type` and `payload` fields of the event.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::canonical::{canonical_hash, canonicalize};
use crate::crypto::Sha256Hash;
use crate::error::CanonicalError;
use crate::records::{
    CustodyTokenRecord, DeliveryReceiptRecord, EventMeta, HandoffAcceptanceRecord,
    HandoffChallengeRecord, PolicyBindRequest, PricingContextRecord, QuoteRequest, QuoteResponse,
    ServiceRecord,
};

/// Payload of a quote-created event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteCreated {
    pub request: QuoteRequest,
    pub response: QuoteResponse,
}

/// Payload of a policy-bound event: the acceptance next to the offer it accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyBound {
    pub policy_id: String,
    pub request: PolicyBindRequest,
    pub quote: QuoteResponse,
}

/// Payload of a pricing-context event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingContextRecorded {
    pub pricing_context_id: String,
    pub record: PricingContextRecord,
}

/// Payload of a handoff-completed event.
///
/// The acceptance only names its challenge; the token it resolved to is
/// recorded alongside so the event stands on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoffCompleted {
    pub custody_token_id: String,
    pub record: HandoffAcceptanceRecord,
}

/// Payload of a service-recorded event.
///
/// Carries the hash of the signed canonical bytes so the entry can be checked
/// without the live provider directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRecorded {
    pub service_record_id: String,
    pub record: ServiceRecord,
    pub canonical_hash_hex: String,
}

/// The type tag and payload of a ledger event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum EventBody {
    #[serde(rename = "PROTECT_QUOTE_CREATED")]
    QuoteCreated(QuoteCreated),
    #[serde(rename = "POLICY_BOUND")]
    PolicyBound(PolicyBound),
    #[serde(rename = "PROTECT_PRICING_CONTEXT_RECORDED")]
    PricingContextRecorded(PricingContextRecorded),
    #[serde(rename = "TRANSIT_CUSTODY_TOKEN_ISSUED")]
    CustodyTokenIssued(CustodyTokenRecord),
    #[serde(rename = "TRANSIT_HANDOFF_CHALLENGED")]
    HandoffChallenged(HandoffChallengeRecord),
    #[serde(rename = "TRANSIT_HANDOFF_COMPLETED")]
    HandoffCompleted(HandoffCompleted),
    #[serde(rename = "TRANSIT_DELIVERY_RECORDED")]
    DeliveryRecorded(DeliveryReceiptRecord),
    #[serde(rename = "SERVICE_RECORDED")]
    ServiceRecorded(ServiceRecorded),
}

/// Fieldless mirror of [`EventBody`] for logging and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    QuoteCreated,
    PolicyBound,
    PricingContextRecorded,
    CustodyTokenIssued,
    HandoffChallenged,
    HandoffCompleted,
    DeliveryRecorded,
    ServiceRecorded,
}

impl EventType {
    /// The wire tag.
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::QuoteCreated => "PROTECT_QUOTE_CREATED",
            EventType::PolicyBound => "POLICY_BOUND",
            EventType::PricingContextRecorded => "PROTECT_PRICING_CONTEXT_RECORDED",
            EventType::CustodyTokenIssued => "TRANSIT_CUSTODY_TOKEN_ISSUED",
            EventType::HandoffChallenged => "TRANSIT_HANDOFF_CHALLENGED",
            EventType::HandoffCompleted => "TRANSIT_HANDOFF_COMPLETED",
            EventType::DeliveryRecorded => "TRANSIT_DELIVERY_RECORDED",
            EventType::ServiceRecorded => "SERVICE_RECORDED",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The workflow-specific key an event is filed under besides its asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecondaryKey {
    CustodyTokenId(String),
    PolicyId(String),
    WorkOrderId(String),
}

impl EventBody {
    pub fn event_type(&self) -> EventType {
        match self {
            EventBody::QuoteCreated(_) => EventType::QuoteCreated,
            EventBody::PolicyBound(_) => EventType::PolicyBound,
            EventBody::PricingContextRecorded(_) => EventType::PricingContextRecorded,
            EventBody::CustodyTokenIssued(_) => EventType::CustodyTokenIssued,
            EventBody::HandoffChallenged(_) => EventType::HandoffChallenged,
            EventBody::HandoffCompleted(_) => EventType::HandoffCompleted,
            EventBody::DeliveryRecorded(_) => EventType::DeliveryRecorded,
            EventBody::ServiceRecorded(_) => EventType::ServiceRecorded,
        }
    }

    /// The secondary key this payload implies, if any.
    pub fn secondary_key(&self) -> Option<SecondaryKey> {
        match self {
            EventBody::QuoteCreated(_) | EventBody::PricingContextRecorded(_) => None,
            EventBody::PolicyBound(p) => Some(SecondaryKey::PolicyId(p.policy_id.clone())),
            EventBody::CustodyTokenIssued(r) => {
                Some(SecondaryKey::CustodyTokenId(r.custody_token_id.clone()))
            }
            EventBody::HandoffChallenged(r) => {
                Some(SecondaryKey::CustodyTokenId(r.custody_token_id.clone()))
            }
            EventBody::HandoffCompleted(c) => {
                Some(SecondaryKey::CustodyTokenId(c.custody_token_id.clone()))
            }
            EventBody::DeliveryRecorded(r) => {
                Some(SecondaryKey::CustodyTokenId(r.custody_token_id.clone()))
            }
            EventBody::ServiceRecorded(s) => {
                s.record.work_order_id.clone().map(SecondaryKey::WorkOrderId)
            }
        }
    }
}

/// The unit of durable record.
///
/// Built once, immediately before append, and never mutated. Secondary keys
/// are derived from the body, so they cannot disagree with the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerEvent {
    #[serde(flatten)]
    body: EventBody,
    asset_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    custody_token_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    policy_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    work_order_id: Option<String>,
    correlation_id: String,
    idempotency_key: String,
    created_at: String,
    schema_version: String,
}

impl LedgerEvent {
    /// Build an event for `asset_id`, copying the caller's metadata.
    pub fn new(asset_id: impl Into<String>, body: EventBody, meta: &EventMeta) -> Self {
        let (mut custody_token_id, mut policy_id, mut work_order_id) = (None, None, None);
        match body.secondary_key() {
            Some(SecondaryKey::CustodyTokenId(id)) => custody_token_id = Some(id),
            Some(SecondaryKey::PolicyId(id)) => policy_id = Some(id),
            Some(SecondaryKey::WorkOrderId(id)) => work_order_id = Some(id),
            None => {}
        }

        Self {
            body,
            asset_id: asset_id.into(),
            custody_token_id,
            policy_id,
            work_order_id,
            correlation_id: meta.correlation_id.clone(),
            idempotency_key: meta.idempotency_key.clone(),
            created_at: meta.created_at.clone(),
            schema_version: meta.schema_version.clone(),
        }
    }

    pub fn body(&self) -> &EventBody {
        &self.body
    }

    pub fn event_type(&self) -> EventType {
        self.body.event_type()
    }

    pub fn asset_id(&self) -> &str {
        &self.asset_id
    }

    pub fn custody_token_id(&self) -> Option<&str> {
        self.custody_token_id.as_deref()
    }

    pub fn policy_id(&self) -> Option<&str> {
        self.policy_id.as_deref()
    }

    pub fn work_order_id(&self) -> Option<&str> {
        self.work_order_id.as_deref()
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    pub fn idempotency_key(&self) -> &str {
        &self.idempotency_key
    }

    pub fn created_at(&self) -> &str {
        &self.created_at
    }

    pub fn schema_version(&self) -> &str {
        &self.schema_version
    }

    /// Deterministic CBOR encoding of the whole event.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, CanonicalError> {
        canonicalize(self)
    }

    /// SHA-256 over [`Self::canonical_bytes`].
    pub fn canonical_hash(&self) -> Result<Sha256Hash, CanonicalError> {
        canonical_hash(self)
    }
}
