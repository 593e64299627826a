//! Correlation registries and per-key locking.
//!
//! The registries let a later, independently authenticated call prove it
//! continues an earlier transaction: a bind names a quote, an acceptance
//! names a challenge, and the registry recovers the rest.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::{Mutex, OwnedMutexGuard};

use custody_ledger_core::QuoteResponse;
use custody_ledger_store::{CorrelationStore, MemoryRegistry};

/// A registered quote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteEntry {
    pub asset_id: String,
    pub quote: QuoteResponse,
}

/// Position of a custody token in the handoff chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CustodyStage {
    CustodyIssued,
    ChallengePending,
    HandoffCompleted,
    /// Terminal.
    Delivered,
}

impl CustodyStage {
    pub fn as_str(self) -> &'static str {
        match self {
            CustodyStage::CustodyIssued => "CUSTODY_ISSUED",
            CustodyStage::ChallengePending => "CHALLENGE_PENDING",
            CustodyStage::HandoffCompleted => "HANDOFF_COMPLETED",
            CustodyStage::Delivered => "DELIVERED",
        }
    }

    /// The stage this one must directly follow. `None` for issuance.
    pub fn predecessor(self) -> Option<CustodyStage> {
        match self {
            CustodyStage::CustodyIssued => None,
            CustodyStage::ChallengePending => Some(CustodyStage::CustodyIssued),
            CustodyStage::HandoffCompleted => Some(CustodyStage::ChallengePending),
            CustodyStage::Delivered => Some(CustodyStage::HandoffCompleted),
        }
    }
}

impl fmt::Display for CustodyStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One applied transition: the stage reached and the idempotency key of the
/// call that reached it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub stage: CustodyStage,
    pub idempotency_key: String,
}

/// A registered custody token and the transitions applied to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustodyEntry {
    pub asset_id: String,
    /// Party currently holding custody.
    pub custodian_id: String,
    /// The challenge awaiting acceptance, while in `ChallengePending`.
    pub pending_challenge_id: Option<String>,
    /// Applied transitions, oldest first. Never empty.
    pub transitions: Vec<Transition>,
}

impl CustodyEntry {
    /// A freshly issued token.
    pub fn issued(asset_id: &str, custodian_id: &str, idempotency_key: &str) -> Self {
        Self {
            asset_id: asset_id.to_string(),
            custodian_id: custodian_id.to_string(),
            pending_challenge_id: None,
            transitions: vec![Transition {
                stage: CustodyStage::CustodyIssued,
                idempotency_key: idempotency_key.to_string(),
            }],
        }
    }

    pub fn stage(&self) -> CustodyStage {
        self.transitions
            .last()
            .map(|t| t.stage)
            .unwrap_or(CustodyStage::CustodyIssued)
    }

    /// Whether `stage` was already reached by a call with this key.
    pub fn applied(&self, stage: CustodyStage, idempotency_key: &str) -> bool {
        self.transitions
            .iter()
            .any(|t| t.stage == stage && t.idempotency_key == idempotency_key)
    }

    /// The entry after advancing to `stage`.
    pub fn advanced(&self, stage: CustodyStage, idempotency_key: &str) -> Self {
        let mut next = self.clone();
        next.transitions.push(Transition {
            stage,
            idempotency_key: idempotency_key.to_string(),
        });
        next
    }
}

/// A registered handoff challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeEntry {
    pub custody_token_id: String,
    pub to_custodian_id: String,
}

/// The three registries the protocol consults.
#[derive(Clone)]
pub struct Registries {
    pub quotes: Arc<dyn CorrelationStore<QuoteEntry>>,
    pub custody: Arc<dyn CorrelationStore<CustodyEntry>>,
    pub challenges: Arc<dyn CorrelationStore<ChallengeEntry>>,
}

impl Registries {
    /// Process-local registries.
    pub fn in_memory() -> Self {
        Self {
            quotes: Arc::new(MemoryRegistry::new()),
            custody: Arc::new(MemoryRegistry::new()),
            challenges: Arc::new(MemoryRegistry::new()),
        }
    }
}

impl Default for Registries {
    fn default() -> Self {
        Self::in_memory()
    }
}

/// Async mutual exclusion per string key.
///
/// Locks are created on first use and kept for the life of the map.
#[derive(Default)]
pub struct KeyedLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`.
    pub async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        // The shard guard is released before awaiting.
        let lock = Arc::clone(self.locks.entry(key.to_string()).or_default().value());
        lock.lock_owned().await
    }
}
