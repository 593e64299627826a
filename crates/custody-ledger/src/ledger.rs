//! Ledger client: canonicalize, append, log.
//!
//! Wraps a [`LedgerStore`] and narrows its failures to the two outcomes the
//! protocol distinguishes: the ledger is unreachable, or the idempotency key
//! was reused. Nothing is retried here; retry policy belongs to the caller.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use custody_ledger_core::{CanonicalError, LedgerEvent, LedgerReceipt};
use custody_ledger_store::{AppendOutcome, LedgerStore, StoreError, StoredEvent};

/// Errors surfaced by the ledger client.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The backing store failed or is closed.
    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    /// The idempotency key was already used for a different event.
    #[error("idempotency key {0} was already used for a different event")]
    IdempotencyConflict(String),

    /// The event could not be canonicalized.
    #[error(transparent)]
    Canonical(#[from] CanonicalError),
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::IdempotencyConflict { idempotency_key, .. } => {
                LedgerError::IdempotencyConflict(idempotency_key)
            }
            other => LedgerError::Unavailable(other.to_string()),
        }
    }
}

/// Result type for ledger client operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Appends events to a ledger store and reads them back.
pub struct LedgerClient<L: LedgerStore> {
    store: Arc<L>,
}

impl<L: LedgerStore> Clone for LedgerClient<L> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<L: LedgerStore> LedgerClient<L> {
    pub fn new(store: Arc<L>) -> Self {
        Self { store }
    }

    /// Get the store reference.
    pub fn store(&self) -> &L {
        &self.store
    }

    pub async fn open(&self) -> Result<()> {
        Ok(self.store.open().await?)
    }

    pub async fn close(&self) -> Result<()> {
        Ok(self.store.close().await?)
    }

    /// Append an event and return its receipt.
    ///
    /// A replay of an already committed event returns the original receipt.
    pub async fn append_event(&self, event: &LedgerEvent) -> Result<LedgerReceipt> {
        let canonical = event.canonical_bytes()?;

        match self.store.append(event, &canonical).await {
            Ok(AppendOutcome::Committed(receipt)) => {
                info!(
                    asset_id = event.asset_id(),
                    event_type = %event.event_type(),
                    monotonic_index = %receipt.monotonic_index,
                    "ledger event committed"
                );
                Ok(receipt)
            }
            Ok(AppendOutcome::Duplicate(receipt)) => {
                debug!(
                    asset_id = event.asset_id(),
                    event_type = %event.event_type(),
                    monotonic_index = %receipt.monotonic_index,
                    "ledger append replayed"
                );
                Ok(receipt)
            }
            Err(err) => {
                warn!(
                    asset_id = event.asset_id(),
                    event_type = %event.event_type(),
                    error = %err,
                    "ledger append failed"
                );
                Err(err.into())
            }
        }
    }

    /// The event committed under an idempotency key, if any.
    pub async fn find_by_idempotency_key(&self, idempotency_key: &str) -> Result<Option<StoredEvent>> {
        Ok(self.store.find_by_idempotency_key(idempotency_key).await?)
    }

    /// Events for an asset in append order. Each call is a fresh read.
    pub async fn event_stream(&self, asset_id: &str) -> Result<Vec<StoredEvent>> {
        Ok(self.store.events_for_asset(asset_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use custody_ledger_core::{EventBody, EventMeta, PricingContextRecord, PricingContextRecorded};
    use custody_ledger_store::MemoryLedger;
    use serde_json::Map;

    fn event(pricing_version: &str) -> LedgerEvent {
        let meta = EventMeta {
            correlation_id: "corr-1".into(),
            idempotency_key: "idem-1".into(),
            created_at: "2026-01-01T00:00:00Z".into(),
            schema_version: "1.0.0".into(),
        };
        let record = PricingContextRecord {
            asset_id: "asset-1".into(),
            pricing_version: pricing_version.into(),
            factors: Map::new(),
            meta: meta.clone(),
        };
        let body = EventBody::PricingContextRecorded(PricingContextRecorded {
            pricing_context_id: "pc-1".into(),
            record,
        });
        LedgerEvent::new("asset-1", body, &meta)
    }

    #[tokio::test]
    async fn test_append_returns_reproducible_hash() {
        let client = LedgerClient::new(Arc::new(MemoryLedger::new()));
        let e = event("v1");
        let receipt = client.append_event(&e).await.unwrap();

        assert!(receipt.certifies(&e).unwrap());
        assert_eq!(
            receipt.canonical_hash_hex,
            e.canonical_hash().unwrap().to_hex()
        );
    }

    #[tokio::test]
    async fn test_replay_returns_original_receipt() {
        let client = LedgerClient::new(Arc::new(MemoryLedger::new()));
        let first = client.append_event(&event("v1")).await.unwrap();
        let second = client.append_event(&event("v1")).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(client.event_stream("asset-1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_key_reuse_maps_to_idempotency_conflict() {
        let client = LedgerClient::new(Arc::new(MemoryLedger::new()));
        client.append_event(&event("v1")).await.unwrap();

        let err = client.append_event(&event("v2")).await.unwrap_err();
        assert!(matches!(err, LedgerError::IdempotencyConflict(key) if key == "idem-1"));
    }

    #[tokio::test]
    async fn test_closed_store_maps_to_unavailable() {
        let client = LedgerClient::new(Arc::new(MemoryLedger::new()));
        client.close().await.unwrap();

        let err = client.append_event(&event("v1")).await.unwrap_err();
        assert!(matches!(err, LedgerError::Unavailable(_)));
    }
}
