//! Pricing workflows: quote, bind, pricing context.

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use custody_ledger_core::{
    EventBody, HasMeta, LedgerEvent, LedgerReceipt, PolicyBindRequest, PolicyBound,
    PricingContextRecord, PricingContextRecorded, QuoteCreated, QuoteRequest, QuoteResponse,
};
use custody_ledger_store::{LedgerStore, PutResult};

use crate::directory::ProviderDirectory;
use crate::error::{Result, WorkflowError};
use crate::pricing::build_quote;
use crate::protocol::{new_id, Protocol};
use crate::registry::QuoteEntry;

/// Output of [`Protocol::create_quote`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuoteOutcome {
    pub quote: QuoteResponse,
    pub ledger_receipt: LedgerReceipt,
}

/// Output of [`Protocol::bind_policy`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BindOutcome {
    pub policy_id: String,
    pub quote_id: String,
    pub ledger_receipt: LedgerReceipt,
}

/// Output of [`Protocol::record_pricing_context`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PricingContextOutcome {
    pub pricing_context_id: String,
    pub ledger_receipt: LedgerReceipt,
}

impl<L: LedgerStore, D: ProviderDirectory> Protocol<L, D> {
    /// Price a request, commit the quote, and register it for binding.
    pub async fn create_quote(&self, request: QuoteRequest) -> Result<QuoteOutcome> {
        let key = request.meta().idempotency_key.clone();
        let _guard = self.idempotency_locks.lock(&key).await;

        let replayed = self
            .replay(&key, |body| match body {
                EventBody::QuoteCreated(created) if created.request == request => {
                    Some(created.response.clone())
                }
                _ => None,
            })
            .await?;
        if let Some((quote, ledger_receipt)) = replayed {
            // Registration may not have happened if the first attempt
            // stopped right after the append.
            self.register_quote(&request.asset_id, &quote).await?;
            return Ok(QuoteOutcome { quote, ledger_receipt });
        }

        let quote = build_quote(
            &self.config.pricing,
            self.premium.as_ref(),
            &request,
            new_id(),
            Utc::now(),
        )?;
        debug!(asset_id = %request.asset_id, quote_id = %quote.quote_id, "quote priced");

        let body = EventBody::QuoteCreated(QuoteCreated {
            request: request.clone(),
            response: quote.clone(),
        });
        let event = LedgerEvent::new(&request.asset_id, body, request.meta());
        let ledger_receipt = self.ledger.append_event(&event).await?;

        self.register_quote(&request.asset_id, &quote).await?;

        info!(
            asset_id = %request.asset_id,
            quote_id = %quote.quote_id,
            premium_micros = %quote.premium_micros,
            "quote created"
        );
        Ok(QuoteOutcome { quote, ledger_receipt })
    }

    async fn register_quote(&self, asset_id: &str, quote: &QuoteResponse) -> Result<()> {
        let entry = QuoteEntry {
            asset_id: asset_id.to_string(),
            quote: quote.clone(),
        };
        match self.registries.quotes.put(&quote.quote_id, entry).await? {
            PutResult::Inserted | PutResult::AlreadyExists => Ok(()),
            PutResult::Conflict { .. } => {
                warn!(quote_id = %quote.quote_id, "quote id already registered");
                Err(WorkflowError::RegistrationConflict {
                    registry: "quote",
                    key: quote.quote_id.clone(),
                })
            }
        }
    }

    /// Accept a registered quote.
    ///
    /// The event carries the bind request next to the original quote, so the
    /// link between offer and acceptance is auditable from the ledger alone.
    /// Expiry is not enforced here.
    pub async fn bind_policy(&self, request: PolicyBindRequest) -> Result<BindOutcome> {
        let key = request.meta().idempotency_key.clone();
        let _guard = self.idempotency_locks.lock(&key).await;

        let replayed = self
            .replay(&key, |body| match body {
                EventBody::PolicyBound(bound) if bound.request == request => {
                    Some(bound.policy_id.clone())
                }
                _ => None,
            })
            .await?;
        if let Some((policy_id, ledger_receipt)) = replayed {
            return Ok(BindOutcome {
                policy_id,
                quote_id: request.quote_id,
                ledger_receipt,
            });
        }

        let Some(entry) = self.registries.quotes.get(&request.quote_id).await? else {
            debug!(quote_id = %request.quote_id, "quote not found");
            return Err(WorkflowError::QuoteNotFound(request.quote_id));
        };

        let policy_id = new_id();
        let quote_id = request.quote_id.clone();
        let body = EventBody::PolicyBound(PolicyBound {
            policy_id: policy_id.clone(),
            request: request.clone(),
            quote: entry.quote,
        });
        let event = LedgerEvent::new(&entry.asset_id, body, request.meta());
        let ledger_receipt = self.ledger.append_event(&event).await?;

        info!(asset_id = %entry.asset_id, %quote_id, %policy_id, "policy bound");
        Ok(BindOutcome {
            policy_id,
            quote_id,
            ledger_receipt,
        })
    }

    /// Record the pricing inputs observed for an asset.
    pub async fn record_pricing_context(
        &self,
        record: PricingContextRecord,
    ) -> Result<PricingContextOutcome> {
        let key = record.meta().idempotency_key.clone();
        let _guard = self.idempotency_locks.lock(&key).await;

        let replayed = self
            .replay(&key, |body| match body {
                EventBody::PricingContextRecorded(recorded) if recorded.record == record => {
                    Some(recorded.pricing_context_id.clone())
                }
                _ => None,
            })
            .await?;
        if let Some((pricing_context_id, ledger_receipt)) = replayed {
            return Ok(PricingContextOutcome {
                pricing_context_id,
                ledger_receipt,
            });
        }

        let pricing_context_id = new_id();
        let asset_id = record.asset_id.clone();
        let meta = record.meta().clone();
        let body = EventBody::PricingContextRecorded(PricingContextRecorded {
            pricing_context_id: pricing_context_id.clone(),
            record,
        });
        let event = LedgerEvent::new(&asset_id, body, &meta);
        let ledger_receipt = self.ledger.append_event(&event).await?;

        info!(%asset_id, %pricing_context_id, "pricing context recorded");
        Ok(PricingContextOutcome {
            pricing_context_id,
            ledger_receipt,
        })
    }
}
