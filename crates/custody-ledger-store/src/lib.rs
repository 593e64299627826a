//! # Custody Ledger Store
//!
//! Storage abstraction for the custody ledger: the append-only event ledger
//! and the correlation registries that link later calls to earlier ones.
//!
//! ## Key Types
//!
//! - [`LedgerStore`] - Async trait for the event ledger
//! - [`CorrelationStore`] - Async trait for keyed registries
//! - [`MemoryLedger`] - In-memory ledger with idempotent appends
//! - [`MemoryRegistry`] - In-memory registry backed by `DashMap`
//!
//! ## Design Notes
//!
//! - **Idempotent appends**: Appending the same event twice returns `Duplicate`
//!   with the original receipt
//! - **Conflict detection**: Reusing an idempotency key for different content
//!   is an error
//! - **No silent overwrite**: Registries reject conflicting re-registration

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::{MemoryLedger, MemoryRegistry};
pub use traits::{AppendOutcome, CorrelationStore, LedgerStore, PutResult, StoredEvent, SwapResult};
