//! # Custody Ledger Testkit
//!
//! Testing utilities for the custody ledger.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Pinned canonical bytes and hashes for known inputs
//! - **Generators**: Proptest strategies for JSON values and service records
//! - **Fixtures**: A protocol over in-memory collaborators, signing providers,
//!   and record builders
//! - **Fakes**: Ledgers and directories that fail on demand
//!
//! ## Golden Vectors
//!
//! ```rust
//! use custody_ledger_testkit::vectors::verify_all_vectors;
//!
//! assert!(verify_all_vectors().is_empty());
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use custody_ledger_core::{ServiceDomain, ServiceType};
//! use custody_ledger_testkit::fixtures::{TestFixture, TestProvider};
//!
//! # async fn example() {
//! let fixture = TestFixture::new();
//! let provider = TestProvider::new("provider-1", &["ASE_MASTER"]);
//! fixture.register(&provider);
//!
//! let record = provider.signed_record("asset-1", ServiceDomain::Automotive, ServiceType::Repair, "key-1");
//! let outcome = fixture.protocol.record_service(record).await;
//! # }
//! ```

pub mod fakes;
pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fakes::{FlakyLedger, UnreachableDirectory};
pub use fixtures::{TestFixture, TestProvider};
