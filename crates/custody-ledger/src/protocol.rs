//! The Protocol: the workflows over ledger, registries and directory.
//!
//! Every workflow takes an already validated record, resolves whatever
//! earlier state it continues, appends exactly one ledger event, and only
//! then registers the state it creates.
//!
//! Workflows live in [`crate::quote`], [`crate::custody`] and
//! [`crate::service`].

use std::sync::Arc;

use tracing::debug;

use custody_ledger_core::{EventBody, LedgerReceipt};
use custody_ledger_store::{LedgerStore, StoredEvent};

use crate::config::ProtocolConfig;
use crate::directory::ProviderDirectory;
use crate::error::{Result, WorkflowError};
use crate::ledger::LedgerClient;
use crate::pricing::{FlatRatePremium, PremiumModel};
use crate::registry::{KeyedLocks, Registries};

/// The custody and quote protocol.
///
/// Collaborators are injected; nothing is global. Clone the `Arc`s you pass
/// in to share a ledger or directory with other components.
pub struct Protocol<L: LedgerStore, D: ProviderDirectory> {
    pub(crate) config: ProtocolConfig,
    pub(crate) ledger: LedgerClient<L>,
    pub(crate) directory: Arc<D>,
    pub(crate) registries: Registries,
    pub(crate) premium: Arc<dyn PremiumModel>,
    /// Serializes transitions of one custody token.
    pub(crate) token_locks: KeyedLocks,
    /// Serializes challenge registration across tokens. Always taken after
    /// the token lock.
    pub(crate) challenge_locks: KeyedLocks,
    /// Serializes calls sharing an idempotency key in workflows that
    /// generate ids.
    pub(crate) idempotency_locks: KeyedLocks,
}

impl<L: LedgerStore, D: ProviderDirectory> Protocol<L, D> {
    /// Create a protocol instance with the flat-rate premium from `config`.
    pub fn new(config: ProtocolConfig, ledger: Arc<L>, directory: Arc<D>, registries: Registries) -> Self {
        let premium = Arc::new(FlatRatePremium::new(config.pricing.base_premium_micros_per_day));
        Self {
            config,
            ledger: LedgerClient::new(ledger),
            directory,
            registries,
            premium,
            token_locks: KeyedLocks::new(),
            challenge_locks: KeyedLocks::new(),
            idempotency_locks: KeyedLocks::new(),
        }
    }

    /// Replace the premium model.
    pub fn with_premium_model(mut self, premium: Arc<dyn PremiumModel>) -> Self {
        self.premium = premium;
        self
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    pub fn ledger(&self) -> &LedgerClient<L> {
        &self.ledger
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    pub fn registries(&self) -> &Registries {
        &self.registries
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Open the ledger for appends.
    pub async fn open(&self) -> Result<()> {
        Ok(self.ledger.open().await?)
    }

    /// Close the ledger. Later workflows fail with `LEDGER_UNAVAILABLE`.
    pub async fn shutdown(&self) -> Result<()> {
        Ok(self.ledger.close().await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Read path
    // ─────────────────────────────────────────────────────────────────────────

    /// Events for an asset with their receipts, in append order.
    pub async fn event_stream(&self, asset_id: &str) -> Result<Vec<StoredEvent>> {
        Ok(self.ledger.event_stream(asset_id).await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Shared steps
    // ─────────────────────────────────────────────────────────────────────────

    /// Find a prior commit under `idempotency_key` and hand its body to
    /// `matches`.
    ///
    /// Returns the extracted output and receipt if `matches` accepts the
    /// stored body, `None` if nothing is stored under the key, and
    /// `IdempotencyConflict` if something else is.
    pub(crate) async fn replay<T>(
        &self,
        idempotency_key: &str,
        matches: impl FnOnce(&EventBody) -> Option<T>,
    ) -> Result<Option<(T, LedgerReceipt)>> {
        let Some(stored) = self.ledger.find_by_idempotency_key(idempotency_key).await? else {
            return Ok(None);
        };

        match matches(stored.event.body()) {
            Some(output) => {
                debug!(
                    idempotency_key,
                    event_type = %stored.event.event_type(),
                    monotonic_index = %stored.receipt.monotonic_index,
                    "replaying committed workflow"
                );
                Ok(Some((output, stored.receipt)))
            }
            None => Err(WorkflowError::IdempotencyConflict(idempotency_key.to_string())),
        }
    }
}

/// Fresh identifier for generated ids.
pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
