//! # Custody Ledger
//!
//! Event-integrity and custody-handoff protocol. Every domain action becomes
//! a canonical, content-addressed, idempotent ledger event, and custody of an
//! asset in transit moves through a checked chain of handoffs.
//!
//! ## Overview
//!
//! - **Quotes**: priced offers bound to the exact request that produced them
//! - **Policies**: acceptance of a registered quote
//! - **Custody chain**: token issuance, handoff challenge, acceptance, delivery
//! - **Service records**: provider-signed work, gated on status, license and
//!   signature
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use custody_ledger::{Protocol, ProtocolConfig, Registries, StaticDirectory};
//! use custody_ledger::core::parse_record;
//! use custody_ledger::store::MemoryLedger;
//!
//! async fn example(body: serde_json::Value) {
//!     let protocol = Protocol::new(
//!         ProtocolConfig::default(),
//!         Arc::new(MemoryLedger::new()),
//!         Arc::new(StaticDirectory::new()),
//!         Registries::in_memory(),
//!     );
//!
//!     match parse_record(body) {
//!         Ok(request) => {
//!             let outcome = protocol.create_quote(request).await;
//!             // ...
//!         }
//!         Err(e) => {
//!             // Reject before the protocol layer
//!         }
//!     }
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `custody_ledger::core` - Canonical encoding, records, events, receipts
//! - `custody_ledger::store` - Ledger store and registry traits

pub mod config;
pub mod custody;
pub mod directory;
pub mod error;
pub mod ledger;
pub mod pricing;
pub mod protocol;
pub mod quote;
pub mod registry;
pub mod service;

// Re-export component crates
pub use custody_ledger_core as core;
pub use custody_ledger_store as store;

// Re-export main types for convenience
pub use config::{PricingConfig, ProtocolConfig};
pub use custody::{AcceptanceOutcome, ChallengeOutcome, CustodyTokenOutcome, DeliveryOutcome};
pub use directory::{DirectoryError, Provider, ProviderDirectory, ProviderStatus, StaticDirectory};
pub use error::{ErrorCode, ErrorResponse, Result, WorkflowError};
pub use ledger::{LedgerClient, LedgerError};
pub use pricing::{verify_inputs_snapshot, FlatRatePremium, PremiumModel};
pub use protocol::Protocol;
pub use quote::{BindOutcome, PricingContextOutcome, QuoteOutcome};
pub use registry::{ChallengeEntry, CustodyEntry, CustodyStage, QuoteEntry, Registries};
pub use service::ServiceOutcome;
