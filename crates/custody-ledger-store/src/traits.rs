//! Store traits: the abstract interfaces for the ledger and the registries.
//!
//! The protocol layer is storage-agnostic. Implementations here are
//! in-memory; a database or remote ledger service slots in behind the same
//! traits.

use async_trait::async_trait;
use custody_ledger_core::{LedgerEvent, LedgerReceipt};

use crate::error::Result;

/// Result of appending an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendOutcome {
    /// The event was new and has been committed.
    Committed(LedgerReceipt),
    /// The same event was already committed under this idempotency key.
    /// Carries the original receipt; no new index was assigned.
    Duplicate(LedgerReceipt),
}

impl AppendOutcome {
    pub fn receipt(&self) -> &LedgerReceipt {
        match self {
            AppendOutcome::Committed(r) | AppendOutcome::Duplicate(r) => r,
        }
    }

    pub fn into_receipt(self) -> LedgerReceipt {
        match self {
            AppendOutcome::Committed(r) | AppendOutcome::Duplicate(r) => r,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, AppendOutcome::Duplicate(_))
    }
}

/// A committed event together with its receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEvent {
    pub event: LedgerEvent,
    pub receipt: LedgerReceipt,
}

/// Append-only event ledger.
///
/// # Design Notes
///
/// - **Idempotent appends**: the same idempotency key with the same canonical
///   bytes returns `Duplicate` with the original receipt.
/// - **Conflict detection**: the same key with different canonical bytes is
///   rejected with `StoreError::IdempotencyConflict`.
/// - **Monotonic index**: assigned atomically with the insert, starting at 1,
///   never reused.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Make the store ready for appends. Idempotent.
    async fn open(&self) -> Result<()>;

    /// Stop accepting appends. Reads of committed history remain possible
    /// only if the implementation allows it.
    async fn close(&self) -> Result<()>;

    /// Append an event.
    ///
    /// # Arguments
    /// - `event`: The event to append.
    /// - `canonical`: The event's canonical bytes (cached to avoid recomputation).
    async fn append(&self, event: &LedgerEvent, canonical: &[u8]) -> Result<AppendOutcome>;

    /// Look up the event committed under an idempotency key.
    async fn find_by_idempotency_key(&self, idempotency_key: &str) -> Result<Option<StoredEvent>>;

    /// All events for an asset, in append order. A fresh snapshot per call.
    async fn events_for_asset(&self, asset_id: &str) -> Result<Vec<StoredEvent>>;
}

/// Result of registering a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PutResult<V> {
    /// The key was new.
    Inserted,
    /// The key already holds an equal value (idempotent, not an error).
    AlreadyExists,
    /// The key already holds a different value. Nothing was written.
    Conflict { existing: V },
}

/// Result of a compare-and-swap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwapResult<V> {
    Swapped,
    /// The current value did not match. `None` if the key is absent.
    Mismatch { current: Option<V> },
}

/// Key-value registry letting a later call recover state from an earlier one.
///
/// Nothing is silently replaced: `put` never overwrites, and updates go
/// through `compare_and_swap` against the value the caller last read.
#[async_trait]
pub trait CorrelationStore<V>: Send + Sync
where
    V: Clone + PartialEq + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> Result<Option<V>>;

    async fn put(&self, key: &str, value: V) -> Result<PutResult<V>>;

    async fn compare_and_swap(&self, key: &str, expected: &V, new: V) -> Result<SwapResult<V>>;

    /// Remove a key, returning the value it held.
    async fn delete(&self, key: &str) -> Result<Option<V>>;
}
