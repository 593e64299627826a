//! Custody chain workflows.
//!
//! ```text
//! NONE --issue_custody_token--> CUSTODY_ISSUED
//! CUSTODY_ISSUED --issue_handoff_challenge--> CHALLENGE_PENDING
//! CHALLENGE_PENDING --accept_handoff--> HANDOFF_COMPLETED
//! HANDOFF_COMPLETED --record_delivery--> DELIVERED
//! ```
//!
//! Each transition holds the token's lock across resolve, append and
//! register. Issuing a challenge also holds the challenge id's lock, taken
//! after the token lock. Repeating an applied transition with its original idempotency
//! key replays the append and returns the original receipt.

use serde::Serialize;
use tracing::{debug, info, warn};

use custody_ledger_core::{
    CustodyTokenRecord, DeliveryReceiptRecord, EventBody, HandoffAcceptanceRecord,
    HandoffChallengeRecord, HandoffCompleted, HasMeta, LedgerEvent, LedgerReceipt,
};
use custody_ledger_store::{LedgerStore, PutResult, SwapResult};

use crate::directory::ProviderDirectory;
use crate::error::{Result, WorkflowError};
use crate::protocol::Protocol;
use crate::registry::{ChallengeEntry, CustodyEntry, CustodyStage};

/// Output of [`Protocol::issue_custody_token`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustodyTokenOutcome {
    pub custody_token_id: String,
    pub ledger_receipt: LedgerReceipt,
}

/// Output of [`Protocol::issue_handoff_challenge`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChallengeOutcome {
    pub challenge_id: String,
    pub custody_token_id: String,
    pub ledger_receipt: LedgerReceipt,
}

/// Output of [`Protocol::accept_handoff`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AcceptanceOutcome {
    pub acceptance_id: String,
    pub custody_token_id: String,
    /// The asset bound at token issuance.
    pub asset_id: String,
    pub ledger_receipt: LedgerReceipt,
}

/// Output of [`Protocol::record_delivery`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryOutcome {
    pub custody_token_id: String,
    pub ledger_receipt: LedgerReceipt,
}

/// What to do with a transition request given the token's current entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    /// The transition was already applied under this key.
    Replay,
    /// The token is at the required predecessor stage.
    Apply,
}

fn plan(
    custody_token_id: &str,
    entry: &CustodyEntry,
    target: CustodyStage,
    idempotency_key: &str,
) -> Result<Step> {
    if entry.applied(target, idempotency_key) {
        return Ok(Step::Replay);
    }
    let current = entry.stage();
    if target.predecessor() == Some(current) {
        return Ok(Step::Apply);
    }
    warn!(
        custody_token_id,
        current = %current,
        attempted = %target,
        "custody transition out of order"
    );
    Err(WorkflowError::CustodyStateConflict {
        custody_token_id: custody_token_id.to_string(),
        current,
        attempted: target,
    })
}

impl<L: LedgerStore, D: ProviderDirectory> Protocol<L, D> {
    /// Issue custody of an asset to its first custodian.
    pub async fn issue_custody_token(&self, record: CustodyTokenRecord) -> Result<CustodyTokenOutcome> {
        let token_id = record.custody_token_id.clone();
        let key = record.meta().idempotency_key.clone();
        let _guard = self.token_locks.lock(&token_id).await;

        let fresh = CustodyEntry::issued(&record.asset_id, &record.custodian_id, &key);
        let existing = self.registries.custody.get(&token_id).await?;
        if let Some(entry) = &existing {
            let same_issue = entry.asset_id == fresh.asset_id
                && entry.transitions.first() == fresh.transitions.first();
            if !same_issue {
                warn!(custody_token_id = %token_id, "custody token id already issued");
                return Err(WorkflowError::RegistrationConflict {
                    registry: "custody",
                    key: token_id,
                });
            }
        }

        let asset_id = record.asset_id.clone();
        let meta = record.meta().clone();
        let event = LedgerEvent::new(&asset_id, EventBody::CustodyTokenIssued(record), &meta);
        let ledger_receipt = self.ledger.append_event(&event).await?;

        if existing.is_none() {
            match self.registries.custody.put(&token_id, fresh).await? {
                PutResult::Inserted | PutResult::AlreadyExists => {}
                PutResult::Conflict { .. } => {
                    return Err(WorkflowError::RegistrationConflict {
                        registry: "custody",
                        key: token_id,
                    })
                }
            }
            info!(%asset_id, custody_token_id = %token_id, "custody token issued");
        }

        Ok(CustodyTokenOutcome {
            custody_token_id: token_id,
            ledger_receipt,
        })
    }

    /// Open a handoff of a custody token to another party.
    pub async fn issue_handoff_challenge(&self, record: HandoffChallengeRecord) -> Result<ChallengeOutcome> {
        let token_id = record.custody_token_id.clone();
        let challenge_id = record.challenge_id.clone();
        let key = record.meta().idempotency_key.clone();
        let _guard = self.token_locks.lock(&token_id).await;
        // Held through check, append and put so two tokens cannot both claim one id.
        let _challenge_guard = self.challenge_locks.lock(&challenge_id).await;

        let entry = self.resolve_token(&token_id).await?;
        let step = plan(&token_id, &entry, CustodyStage::ChallengePending, &key)?;

        let challenge = ChallengeEntry {
            custody_token_id: token_id.clone(),
            to_custodian_id: record.to_custodian_id.clone(),
        };
        if let Step::Apply = step {
            if let Some(existing) = self.registries.challenges.get(&challenge_id).await? {
                if existing != challenge {
                    warn!(%challenge_id, "challenge id already registered");
                    return Err(WorkflowError::RegistrationConflict {
                        registry: "challenge",
                        key: challenge_id,
                    });
                }
            }
        }

        let meta = record.meta().clone();
        let event = LedgerEvent::new(&entry.asset_id, EventBody::HandoffChallenged(record), &meta);
        let ledger_receipt = self.ledger.append_event(&event).await?;

        if let Step::Apply = step {
            if let PutResult::Conflict { .. } = self.registries.challenges.put(&challenge_id, challenge).await? {
                return Err(WorkflowError::RegistrationConflict {
                    registry: "challenge",
                    key: challenge_id,
                });
            }
            let mut next = entry.advanced(CustodyStage::ChallengePending, &key);
            next.pending_challenge_id = Some(challenge_id.clone());
            self.swap_entry(&token_id, &entry, next, CustodyStage::ChallengePending)
                .await?;
            info!(asset_id = %entry.asset_id, custody_token_id = %token_id, %challenge_id, "handoff challenged");
        }

        Ok(ChallengeOutcome {
            challenge_id,
            custody_token_id: token_id,
            ledger_receipt,
        })
    }

    /// Accept a pending handoff. Custody passes to the challenged party.
    pub async fn accept_handoff(&self, record: HandoffAcceptanceRecord) -> Result<AcceptanceOutcome> {
        let Some(challenge) = self.registries.challenges.get(&record.challenge_id).await? else {
            debug!(challenge_id = %record.challenge_id, "challenge not found");
            return Err(WorkflowError::ChallengeNotFound(record.challenge_id));
        };
        let token_id = challenge.custody_token_id.clone();
        let key = record.meta().idempotency_key.clone();
        let _guard = self.token_locks.lock(&token_id).await;

        let entry = self.resolve_token(&token_id).await?;
        let step = plan(&token_id, &entry, CustodyStage::HandoffCompleted, &key)?;
        if let Step::Apply = step {
            if entry.pending_challenge_id.as_deref() != Some(record.challenge_id.as_str()) {
                warn!(custody_token_id = %token_id, challenge_id = %record.challenge_id, "challenge is not the pending one");
                return Err(WorkflowError::CustodyStateConflict {
                    custody_token_id: token_id,
                    current: entry.stage(),
                    attempted: CustodyStage::HandoffCompleted,
                });
            }
        }

        let acceptance_id = record.acceptance_id.clone();
        let meta = record.meta().clone();
        let body = EventBody::HandoffCompleted(HandoffCompleted {
            custody_token_id: token_id.clone(),
            record,
        });
        let event = LedgerEvent::new(&entry.asset_id, body, &meta);
        let ledger_receipt = self.ledger.append_event(&event).await?;

        if let Step::Apply = step {
            let mut next = entry.advanced(CustodyStage::HandoffCompleted, &key);
            next.custodian_id = challenge.to_custodian_id.clone();
            next.pending_challenge_id = None;
            self.swap_entry(&token_id, &entry, next, CustodyStage::HandoffCompleted)
                .await?;
            info!(
                asset_id = %entry.asset_id,
                custody_token_id = %token_id,
                custodian_id = %challenge.to_custodian_id,
                "handoff completed"
            );
        }

        Ok(AcceptanceOutcome {
            acceptance_id,
            custody_token_id: token_id,
            asset_id: entry.asset_id,
            ledger_receipt,
        })
    }

    /// Record final delivery. Terminal for the token.
    pub async fn record_delivery(&self, record: DeliveryReceiptRecord) -> Result<DeliveryOutcome> {
        let token_id = record.custody_token_id.clone();
        let key = record.meta().idempotency_key.clone();
        let _guard = self.token_locks.lock(&token_id).await;

        let entry = self.resolve_token(&token_id).await?;
        let step = plan(&token_id, &entry, CustodyStage::Delivered, &key)?;

        let meta = record.meta().clone();
        let event = LedgerEvent::new(&entry.asset_id, EventBody::DeliveryRecorded(record), &meta);
        let ledger_receipt = self.ledger.append_event(&event).await?;

        if let Step::Apply = step {
            let next = entry.advanced(CustodyStage::Delivered, &key);
            self.swap_entry(&token_id, &entry, next, CustodyStage::Delivered)
                .await?;
            info!(asset_id = %entry.asset_id, custody_token_id = %token_id, "delivery recorded");
        }

        Ok(DeliveryOutcome {
            custody_token_id: token_id,
            ledger_receipt,
        })
    }

    /// Current registry entry for a custody token.
    pub async fn custody_entry(&self, custody_token_id: &str) -> Result<Option<CustodyEntry>> {
        Ok(self.registries.custody.get(custody_token_id).await?)
    }

    async fn resolve_token(&self, custody_token_id: &str) -> Result<CustodyEntry> {
        match self.registries.custody.get(custody_token_id).await? {
            Some(entry) => Ok(entry),
            None => {
                debug!(custody_token_id, "custody token not found");
                Err(WorkflowError::CustodyTokenNotFound(custody_token_id.to_string()))
            }
        }
    }

    /// Commit a transition. The token lock is held, so a mismatch means the
    /// registry was changed by something outside this protocol instance.
    async fn swap_entry(
        &self,
        custody_token_id: &str,
        expected: &CustodyEntry,
        next: CustodyEntry,
        attempted: CustodyStage,
    ) -> Result<()> {
        match self
            .registries
            .custody
            .compare_and_swap(custody_token_id, expected, next)
            .await?
        {
            SwapResult::Swapped => Ok(()),
            SwapResult::Mismatch { current } => {
                warn!(custody_token_id, "custody entry changed concurrently");
                Err(WorkflowError::CustodyStateConflict {
                    custody_token_id: custody_token_id.to_string(),
                    current: current.map(|e| e.stage()).unwrap_or(expected.stage()),
                    attempted,
                })
            }
        }
    }
}
