//! Signed service records.
//!
//! Gate order: provider resolves and is active, provider is licensed for the
//! claimed domain and service type, signature verifies over the canonical
//! record without its signature field. Only then is anything appended. The
//! event embeds the hash of the signed bytes so it can be checked without
//! the live directory.

use serde::Serialize;
use tracing::{debug, info, warn};

use custody_ledger_core::{
    content_hash, is_licensed, verify_signature, EventBody, HasMeta, LedgerEvent, LedgerReceipt,
    ServiceRecord, ServiceRecorded,
};
use custody_ledger_store::LedgerStore;

use crate::directory::ProviderDirectory;
use crate::error::{Result, WorkflowError};
use crate::protocol::{new_id, Protocol};

/// Output of [`Protocol::record_service`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceOutcome {
    pub service_record_id: String,
    /// SHA-256 hex of the canonical record minus its signature.
    pub canonical_hash_hex: String,
    pub ledger_receipt: LedgerReceipt,
}

impl<L: LedgerStore, D: ProviderDirectory> Protocol<L, D> {
    /// Verify and record a provider-signed service record.
    pub async fn record_service(&self, record: ServiceRecord) -> Result<ServiceOutcome> {
        let key = record.meta().idempotency_key.clone();
        let _guard = self.idempotency_locks.lock(&key).await;

        let replayed = self
            .replay(&key, |body| match body {
                EventBody::ServiceRecorded(recorded) if recorded.record == record => Some((
                    recorded.service_record_id.clone(),
                    recorded.canonical_hash_hex.clone(),
                )),
                _ => None,
            })
            .await?;
        if let Some(((service_record_id, canonical_hash_hex), ledger_receipt)) = replayed {
            return Ok(ServiceOutcome {
                service_record_id,
                canonical_hash_hex,
                ledger_receipt,
            });
        }

        let canonical_hash_hex = self.verify_service_record(&record).await?;

        let service_record_id = new_id();
        let asset_id = record.asset_id.clone();
        let meta = record.meta().clone();
        let body = EventBody::ServiceRecorded(ServiceRecorded {
            service_record_id: service_record_id.clone(),
            record,
            canonical_hash_hex: canonical_hash_hex.clone(),
        });
        let event = LedgerEvent::new(&asset_id, body, &meta);
        let ledger_receipt = self.ledger.append_event(&event).await?;

        info!(%asset_id, %service_record_id, "service recorded");
        Ok(ServiceOutcome {
            service_record_id,
            canonical_hash_hex,
            ledger_receipt,
        })
    }

    /// Run the trust gates and return the hash of the signed bytes.
    pub async fn verify_service_record(&self, record: &ServiceRecord) -> Result<String> {
        let provider_id = record.provider_id.as_str();

        let provider = match self.directory.resolve(provider_id).await? {
            Some(provider) if provider.is_active() => provider,
            Some(provider) => {
                warn!(provider_id, status = ?provider.status, "provider not active");
                return Err(WorkflowError::ProviderInvalidOrRevoked(provider_id.to_string()));
            }
            None => {
                warn!(provider_id, "provider not found");
                return Err(WorkflowError::ProviderInvalidOrRevoked(provider_id.to_string()));
            }
        };

        if !is_licensed(record.service_domain, record.service_type, &provider.license_list()) {
            warn!(
                provider_id,
                domain = %record.service_domain,
                service_type = %record.service_type,
                "provider not licensed"
            );
            return Err(WorkflowError::ProviderLicenseMismatch {
                provider_id: provider_id.to_string(),
                domain: record.service_domain,
                service_type: record.service_type,
            });
        }

        let signed = record.signing_bytes()?;
        if !verify_signature(&provider.public_key_pem, &signed, &record.provider_signature) {
            warn!(provider_id, "provider signature rejected");
            return Err(WorkflowError::InvalidProviderSignature(provider_id.to_string()));
        }

        debug!(provider_id, "service record verified");
        Ok(content_hash(&signed).to_hex())
    }
}
