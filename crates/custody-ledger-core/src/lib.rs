//! # Custody Ledger Core
//!
//! Pure primitives for the custody ledger: canonical encoding, hashing,
//! signatures, the license gate, inbound records and the event taxonomy.
//!
//! This crate contains no I/O, no storage, no networking.
//!
//! ## Key Types
//!
//! - [`LedgerEvent`] - The unit of durable record, tagged by [`EventBody`]
//! - [`LedgerReceipt`] - Integrity receipt for a committed event
//! - [`LedgerEventId`] - Content-addressed event identifier (Blake3)
//! - [`MonotonicIndex`] - Ledger position, serialized as a decimal string
//!
//! ## Canonicalization
//!
//! Events and signed records are encoded as deterministic CBOR and hashed
//! with SHA-256. See the [`canonical`] module.

pub mod canonical;
pub mod crypto;
pub mod error;
pub mod event;
pub mod license;
pub mod receipt;
pub mod records;
pub mod types;
pub mod validation;

pub use canonical::{canonical_bytes, canonical_hash, canonicalize, content_hash, strip};
pub use crypto::{verify_signature, Ed25519PublicKey, Ed25519Signature, Keypair, Sha256Hash};
pub use error::{CanonicalError, CryptoError, FieldError, ValidationError};
pub use event::{
    EventBody, EventType, HandoffCompleted, LedgerEvent, PolicyBound, PricingContextRecorded,
    QuoteCreated, SecondaryKey, ServiceRecorded,
};
pub use license::{is_licensed, ServiceDomain, ServiceType};
pub use receipt::LedgerReceipt;
pub use records::{
    CustodyTokenRecord, DeliveryReceiptRecord, EventMeta, HandoffAcceptanceRecord,
    HandoffChallengeRecord, HasMeta, PolicyBindRequest, PricingContextRecord, QuoteRequest,
    QuoteResponse, ServiceRecord,
};
pub use types::{LedgerEventId, Micros, MonotonicIndex, SCHEMA_VERSION};
pub use validation::{parse_record, Validate};
