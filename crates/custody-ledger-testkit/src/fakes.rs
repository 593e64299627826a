//! Fault-injecting collaborators.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use custody_ledger::{DirectoryError, Provider, ProviderDirectory};
use custody_ledger_core::LedgerEvent;
use custody_ledger_store::{AppendOutcome, LedgerStore, MemoryLedger, Result, StoreError, StoredEvent};

/// A memory ledger that can be switched to fail every call.
///
/// While down, every operation returns `StoreError::Unavailable` and
/// nothing is written.
#[derive(Default)]
pub struct FlakyLedger {
    inner: MemoryLedger,
    down: AtomicBool,
}

impl FlakyLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start failing (`true`) or recover (`false`).
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    pub fn inner(&self) -> &MemoryLedger {
        &self.inner
    }

    fn check(&self) -> Result<()> {
        if self.down.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected outage".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for FlakyLedger {
    async fn open(&self) -> Result<()> {
        self.check()?;
        self.inner.open().await
    }

    async fn close(&self) -> Result<()> {
        self.inner.close().await
    }

    async fn append(&self, event: &LedgerEvent, canonical: &[u8]) -> Result<AppendOutcome> {
        self.check()?;
        self.inner.append(event, canonical).await
    }

    async fn find_by_idempotency_key(&self, idempotency_key: &str) -> Result<Option<StoredEvent>> {
        self.check()?;
        self.inner.find_by_idempotency_key(idempotency_key).await
    }

    async fn events_for_asset(&self, asset_id: &str) -> Result<Vec<StoredEvent>> {
        self.check()?;
        self.inner.events_for_asset(asset_id).await
    }
}

/// A directory that is always unreachable.
pub struct UnreachableDirectory;

#[async_trait]
impl ProviderDirectory for UnreachableDirectory {
    async fn resolve(&self, _provider_id: &str) -> std::result::Result<Option<Provider>, DirectoryError> {
        Err(DirectoryError::Unavailable("connection refused".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_down_ledger_refuses_reads() {
        let ledger = FlakyLedger::new();
        ledger.set_down(true);
        let err = ledger.events_for_asset("a").await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));

        ledger.set_down(false);
        assert!(ledger.events_for_asset("a").await.unwrap().is_empty());
    }
}
