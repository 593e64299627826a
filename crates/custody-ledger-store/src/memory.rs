//! In-memory implementations of the store traits.
//!
//! Process-local stand-ins for a durable ledger and keyed registries. They
//! enforce the same idempotency and conflict rules a real backing would.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use custody_ledger_core::{content_hash, LedgerEvent, LedgerReceipt, MonotonicIndex};

use crate::error::{Result, StoreError};
use crate::traits::{AppendOutcome, CorrelationStore, LedgerStore, PutResult, StoredEvent, SwapResult};

/// In-memory ledger.
///
/// All data is lost when the ledger is dropped. The index is assigned under
/// the same lock as the insert, so concurrent appends never share or skip an
/// index.
pub struct MemoryLedger {
    inner: Mutex<MemoryLedgerInner>,
}

struct MemoryLedgerInner {
    open: bool,
    /// Committed events in append order.
    events: Vec<StoredEvent>,
    /// idempotency_key -> position in `events`.
    by_key: HashMap<String, usize>,
    /// asset_id -> positions in `events`.
    by_asset: HashMap<String, Vec<usize>>,
    /// `None` once the index space is exhausted.
    next_index: Option<MonotonicIndex>,
}

impl MemoryLedger {
    /// Create a new, open, empty ledger.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MemoryLedgerInner {
                open: true,
                events: Vec::new(),
                by_key: HashMap::new(),
                by_asset: HashMap::new(),
                next_index: Some(MonotonicIndex::FIRST),
            }),
        }
    }

    /// Number of committed events.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.events.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    async fn open(&self) -> Result<()> {
        self.inner.lock().await.open = true;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.inner.lock().await.open = false;
        Ok(())
    }

    async fn append(&self, event: &LedgerEvent, canonical: &[u8]) -> Result<AppendOutcome> {
        let mut inner = self.inner.lock().await;
        if !inner.open {
            return Err(StoreError::Closed);
        }

        let hash = content_hash(canonical).to_hex();
        let key = event.idempotency_key();

        if let Some(&pos) = inner.by_key.get(key) {
            let existing = &inner.events[pos].receipt;
            if existing.canonical_hash_hex == hash {
                debug!(
                    idempotency_key = key,
                    monotonic_index = %existing.monotonic_index,
                    "duplicate append"
                );
                return Ok(AppendOutcome::Duplicate(existing.clone()));
            }
            warn!(idempotency_key = key, "idempotency key reused with different content");
            return Err(StoreError::IdempotencyConflict {
                idempotency_key: key.to_string(),
                existing_hash: existing.canonical_hash_hex.clone(),
                attempted_hash: hash,
            });
        }

        let index = inner.next_index.ok_or(StoreError::IndexExhausted)?;
        let receipt = LedgerReceipt::issue(canonical, index, Utc::now());

        let pos = inner.events.len();
        inner.events.push(StoredEvent {
            event: event.clone(),
            receipt: receipt.clone(),
        });
        inner.by_key.insert(key.to_string(), pos);
        inner
            .by_asset
            .entry(event.asset_id().to_string())
            .or_default()
            .push(pos);
        inner.next_index = index.next();

        Ok(AppendOutcome::Committed(receipt))
    }

    async fn find_by_idempotency_key(&self, idempotency_key: &str) -> Result<Option<StoredEvent>> {
        let inner = self.inner.lock().await;
        if !inner.open {
            return Err(StoreError::Closed);
        }
        Ok(inner
            .by_key
            .get(idempotency_key)
            .map(|&pos| inner.events[pos].clone()))
    }

    async fn events_for_asset(&self, asset_id: &str) -> Result<Vec<StoredEvent>> {
        let inner = self.inner.lock().await;
        if !inner.open {
            return Err(StoreError::Closed);
        }
        Ok(inner
            .by_asset
            .get(asset_id)
            .map(|positions| positions.iter().map(|&pos| inner.events[pos].clone()).collect())
            .unwrap_or_default())
    }
}

/// In-memory correlation registry backed by a concurrent map.
pub struct MemoryRegistry<V> {
    entries: DashMap<String, V>,
}

impl<V> MemoryRegistry<V> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V> Default for MemoryRegistry<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<V> CorrelationStore<V> for MemoryRegistry<V>
where
    V: Clone + PartialEq + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> Result<Option<V>> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    async fn put(&self, key: &str, value: V) -> Result<PutResult<V>> {
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(existing) if *existing.get() == value => Ok(PutResult::AlreadyExists),
            Entry::Occupied(existing) => Ok(PutResult::Conflict {
                existing: existing.get().clone(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(value);
                Ok(PutResult::Inserted)
            }
        }
    }

    async fn compare_and_swap(&self, key: &str, expected: &V, new: V) -> Result<SwapResult<V>> {
        match self.entries.get_mut(key) {
            Some(mut current) if *current.value() == *expected => {
                *current.value_mut() = new;
                Ok(SwapResult::Swapped)
            }
            Some(current) => Ok(SwapResult::Mismatch {
                current: Some(current.value().clone()),
            }),
            None => Ok(SwapResult::Mismatch { current: None }),
        }
    }

    async fn delete(&self, key: &str) -> Result<Option<V>> {
        Ok(self.entries.remove(key).map(|(_, v)| v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use custody_ledger_core::{DeliveryReceiptRecord, EventBody, EventMeta};
    use std::collections::BTreeSet;
    use std::sync::Arc;

    fn make_event(asset_id: &str, key: &str, received_by: &str) -> (LedgerEvent, Vec<u8>) {
        let meta = EventMeta {
            correlation_id: "corr-1".into(),
            idempotency_key: key.into(),
            created_at: "2026-01-01T00:00:00Z".into(),
            schema_version: "1.0.0".into(),
        };
        let record = DeliveryReceiptRecord {
            custody_token_id: "ct-1".into(),
            received_by: received_by.into(),
            meta: meta.clone(),
        };
        let event = LedgerEvent::new(asset_id, EventBody::DeliveryRecorded(record), &meta);
        let canonical = event.canonical_bytes().unwrap();
        (event, canonical)
    }

    #[tokio::test]
    async fn test_append_assigns_increasing_index() {
        let ledger = MemoryLedger::new();

        let (e1, c1) = make_event("asset-1", "k1", "alice");
        let (e2, c2) = make_event("asset-1", "k2", "alice");
        let r1 = ledger.append(&e1, &c1).await.unwrap();
        let r2 = ledger.append(&e2, &c2).await.unwrap();

        assert_eq!(r1.receipt().monotonic_index, MonotonicIndex(1));
        assert_eq!(r2.receipt().monotonic_index, MonotonicIndex(2));
        assert!(!r1.is_duplicate());
    }

    #[tokio::test]
    async fn test_append_idempotent() {
        let ledger = MemoryLedger::new();
        let (event, canonical) = make_event("asset-1", "k1", "alice");

        let first = ledger.append(&event, &canonical).await.unwrap();
        let second = ledger.append(&event, &canonical).await.unwrap();

        assert!(second.is_duplicate());
        assert_eq!(first.receipt(), second.receipt());
        assert_eq!(ledger.len().await, 1);
    }

    #[tokio::test]
    async fn test_append_key_reuse_conflicts() {
        let ledger = MemoryLedger::new();
        let (e1, c1) = make_event("asset-1", "k1", "alice");
        let (e2, c2) = make_event("asset-1", "k1", "mallory");

        ledger.append(&e1, &c1).await.unwrap();
        let err = ledger.append(&e2, &c2).await.unwrap_err();

        assert!(matches!(err, StoreError::IdempotencyConflict { .. }));
        assert_eq!(ledger.len().await, 1);
    }

    #[tokio::test]
    async fn test_events_for_asset_in_append_order() {
        let ledger = MemoryLedger::new();
        for (asset, key) in [("a", "k1"), ("b", "k2"), ("a", "k3")] {
            let (event, canonical) = make_event(asset, key, "alice");
            ledger.append(&event, &canonical).await.unwrap();
        }

        let events = ledger.events_for_asset("a").await.unwrap();
        let keys: Vec<&str> = events.iter().map(|s| s.event.idempotency_key()).collect();
        assert_eq!(keys, vec!["k1", "k3"]);
        assert!(ledger.events_for_asset("missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_closed_ledger_rejects_appends() {
        let ledger = MemoryLedger::new();
        let (event, canonical) = make_event("asset-1", "k1", "alice");

        ledger.close().await.unwrap();
        assert_eq!(ledger.append(&event, &canonical).await, Err(StoreError::Closed));

        ledger.open().await.unwrap();
        assert!(ledger.append(&event, &canonical).await.is_ok());
    }

    #[tokio::test]
    async fn test_find_by_idempotency_key() {
        let ledger = MemoryLedger::new();
        let (event, canonical) = make_event("asset-1", "k1", "alice");
        let outcome = ledger.append(&event, &canonical).await.unwrap();

        let stored = ledger.find_by_idempotency_key("k1").await.unwrap().unwrap();
        assert_eq!(stored.event, event);
        assert_eq!(&stored.receipt, outcome.receipt());
        assert!(ledger.find_by_idempotency_key("k2").await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_appends_no_gaps() {
        let ledger = Arc::new(MemoryLedger::new());
        let mut handles = Vec::new();
        for i in 0..64 {
            let ledger = Arc::clone(&ledger);
            handles.push(tokio::spawn(async move {
                let (event, canonical) = make_event("asset-1", &format!("k{}", i % 16), "alice");
                ledger.append(&event, &canonical).await.unwrap().into_receipt()
            }));
        }

        let mut indexes = BTreeSet::new();
        for handle in handles {
            indexes.insert(handle.await.unwrap().monotonic_index.get());
        }

        assert_eq!(indexes, (1..=16).collect::<BTreeSet<u64>>());
        assert_eq!(ledger.len().await, 16);
    }

    #[tokio::test]
    async fn test_registry_put_semantics() {
        let registry: MemoryRegistry<String> = MemoryRegistry::new();

        assert_eq!(registry.put("k", "a".into()).await.unwrap(), PutResult::Inserted);
        assert_eq!(registry.put("k", "a".into()).await.unwrap(), PutResult::AlreadyExists);
        assert_eq!(
            registry.put("k", "b".into()).await.unwrap(),
            PutResult::Conflict { existing: "a".into() }
        );
        assert_eq!(registry.get("k").await.unwrap(), Some("a".into()));
    }

    #[tokio::test]
    async fn test_registry_compare_and_swap() {
        let registry: MemoryRegistry<u32> = MemoryRegistry::new();
        registry.put("k", 1).await.unwrap();

        assert_eq!(registry.compare_and_swap("k", &1, 2).await.unwrap(), SwapResult::Swapped);
        assert_eq!(
            registry.compare_and_swap("k", &1, 3).await.unwrap(),
            SwapResult::Mismatch { current: Some(2) }
        );
        assert_eq!(
            registry.compare_and_swap("missing", &1, 3).await.unwrap(),
            SwapResult::Mismatch { current: None }
        );
    }

    #[tokio::test]
    async fn test_registry_delete() {
        let registry: MemoryRegistry<u32> = MemoryRegistry::new();
        registry.put("k", 7).await.unwrap();

        assert_eq!(registry.delete("k").await.unwrap(), Some(7));
        assert_eq!(registry.get("k").await.unwrap(), None);
        assert_eq!(registry.delete("k").await.unwrap(), None);
    }

    proptest::proptest! {
        #[test]
        fn one_entry_per_distinct_key(keys in proptest::collection::vec(0u8..8, 1..40)) {
            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let (len, max_index) = runtime.block_on(async {
                let ledger = MemoryLedger::new();
                let mut max_index = 0;
                for k in &keys {
                    let (event, canonical) = make_event("asset-1", &format!("k{k}"), "alice");
                    let receipt = ledger.append(&event, &canonical).await.unwrap().into_receipt();
                    max_index = max_index.max(receipt.monotonic_index.get());
                }
                (ledger.len().await, max_index)
            });

            let distinct: BTreeSet<u8> = keys.iter().copied().collect();
            proptest::prop_assert_eq!(len, distinct.len());
            proptest::prop_assert_eq!(max_index as usize, distinct.len());
        }
    }
}
