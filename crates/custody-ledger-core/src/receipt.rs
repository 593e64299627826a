//! Ledger receipt: proof that an event was committed.
//!
//! A receipt is issued once per logical event. Replaying an append returns
//! the original receipt unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CanonicalError;
use crate::event::LedgerEvent;
use crate::types::{LedgerEventId, MonotonicIndex};

/// Integrity receipt returned by a successful append.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerReceipt {
    /// Content address of the committed event.
    pub ledger_event_id: LedgerEventId,
    /// Ledger-assigned commit time. Unlike `created_at`, this is trusted.
    pub committed_at: DateTime<Utc>,
    pub monotonic_index: MonotonicIndex,
    /// SHA-256 hex of the event's canonical bytes.
    pub canonical_hash_hex: String,
}

impl LedgerReceipt {
    /// Build the receipt for canonical event bytes committed at `index`.
    pub fn issue(canonical_event: &[u8], index: MonotonicIndex, committed_at: DateTime<Utc>) -> Self {
        Self {
            ledger_event_id: LedgerEventId::derive(canonical_event),
            committed_at,
            monotonic_index: index,
            canonical_hash_hex: crate::canonical::content_hash(canonical_event).to_hex(),
        }
    }

    /// Check that this receipt certifies exactly `event`.
    ///
    /// Recomputes the canonical form and compares both the content hash and
    /// the derived event id.
    pub fn certifies(&self, event: &LedgerEvent) -> Result<bool, CanonicalError> {
        let bytes = event.canonical_bytes()?;
        Ok(self.ledger_event_id == LedgerEventId::derive(&bytes)
            && self.canonical_hash_hex == crate::canonical::content_hash(&bytes).to_hex())
    }
}
