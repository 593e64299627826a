//! Test fixtures and helpers.
//!
//! Common setup code for integration tests: a protocol over in-memory
//! collaborators, signing providers, and record builders.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::Map;

use custody_ledger::{Protocol, ProtocolConfig, Provider, ProviderStatus, Registries, StaticDirectory};
use custody_ledger_core::{
    CustodyTokenRecord, DeliveryReceiptRecord, EventMeta, HandoffAcceptanceRecord,
    HandoffChallengeRecord, Keypair, PolicyBindRequest, PricingContextRecord, QuoteRequest,
    ServiceDomain, ServiceRecord, ServiceType, SCHEMA_VERSION,
};
use custody_ledger_store::{LedgerStore, MemoryLedger};

/// Fixed timestamp used for caller-asserted times.
pub const TEST_TIME: &str = "2026-01-01T00:00:00Z";

/// A protocol wired to an in-memory directory and registries.
pub struct TestFixture<L: LedgerStore = MemoryLedger> {
    pub ledger: Arc<L>,
    pub directory: Arc<StaticDirectory>,
    pub protocol: Protocol<L, StaticDirectory>,
}

impl TestFixture<MemoryLedger> {
    /// Create a fixture over a fresh memory ledger.
    pub fn new() -> Self {
        Self::with_ledger(Arc::new(MemoryLedger::new()))
    }
}

impl Default for TestFixture<MemoryLedger> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: LedgerStore> TestFixture<L> {
    /// Create a fixture over the given ledger with default config.
    pub fn with_ledger(ledger: Arc<L>) -> Self {
        Self::with_config(ProtocolConfig::default(), ledger)
    }

    pub fn with_config(config: ProtocolConfig, ledger: Arc<L>) -> Self {
        init_tracing();
        let directory = Arc::new(StaticDirectory::new());
        let protocol = Protocol::new(
            config,
            Arc::clone(&ledger),
            Arc::clone(&directory),
            Registries::in_memory(),
        );
        Self {
            ledger,
            directory,
            protocol,
        }
    }

    /// Make a provider resolvable.
    pub fn register(&self, provider: &TestProvider) {
        self.directory.insert(provider.provider.clone());
    }
}

/// A provider together with the key it signs with.
#[derive(Debug, Clone)]
pub struct TestProvider {
    pub keypair: Keypair,
    pub provider: Provider,
}

impl TestProvider {
    /// An active provider with a random keypair.
    pub fn new(provider_id: &str, licenses: &[&str]) -> Self {
        Self::from_keypair(provider_id, licenses, Keypair::generate())
    }

    /// An active provider with a deterministic keypair.
    pub fn with_seed(provider_id: &str, licenses: &[&str], seed: [u8; 32]) -> Self {
        Self::from_keypair(provider_id, licenses, Keypair::from_seed(&seed))
    }

    fn from_keypair(provider_id: &str, licenses: &[&str], keypair: Keypair) -> Self {
        let public_key_pem = keypair
            .public_key_pem()
            .expect("ed25519 public key encodes as PEM");
        let provider = Provider {
            provider_id: provider_id.to_string(),
            public_key_pem,
            status: ProviderStatus::Active,
            licenses: licenses.iter().map(|l| l.to_string()).collect::<BTreeSet<_>>(),
        };
        Self { keypair, provider }
    }

    /// Same provider with a different directory status.
    pub fn with_status(mut self, status: ProviderStatus) -> Self {
        self.provider.status = status;
        self
    }

    pub fn provider_id(&self) -> &str {
        &self.provider.provider_id
    }

    /// Sign a record in place over its canonical unsigned form.
    pub fn sign(&self, record: &mut ServiceRecord) {
        let bytes = record
            .signing_bytes()
            .expect("service records are representable");
        record.provider_signature = self.keypair.sign(&bytes).to_hex();
    }

    /// A service record by this provider, signed.
    pub fn signed_record(
        &self,
        asset_id: &str,
        domain: ServiceDomain,
        service_type: ServiceType,
        idempotency_key: &str,
    ) -> ServiceRecord {
        let mut record = service_record(self.provider_id(), asset_id, domain, service_type, idempotency_key);
        self.sign(&mut record);
        record
    }
}

/// Route protocol logs to the test harness. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Event metadata with a fixed timestamp and the current schema version.
pub fn meta(idempotency_key: &str) -> EventMeta {
    EventMeta {
        correlation_id: format!("corr-{idempotency_key}"),
        idempotency_key: idempotency_key.to_string(),
        created_at: TEST_TIME.to_string(),
        schema_version: SCHEMA_VERSION.to_string(),
    }
}

pub fn quote_request(asset_id: &str, term_days: u32, idempotency_key: &str) -> QuoteRequest {
    QuoteRequest {
        asset_id: asset_id.to_string(),
        term_days,
        meta: meta(idempotency_key),
    }
}

pub fn bind_request(quote_id: &str, idempotency_key: &str) -> PolicyBindRequest {
    PolicyBindRequest {
        quote_id: quote_id.to_string(),
        meta: meta(idempotency_key),
    }
}

pub fn pricing_context(asset_id: &str, idempotency_key: &str) -> PricingContextRecord {
    let mut factors = Map::new();
    factors.insert("mileage".into(), 42_000.into());
    factors.insert("region".into(), "us-west".into());
    PricingContextRecord {
        asset_id: asset_id.to_string(),
        pricing_version: "v1".to_string(),
        factors,
        meta: meta(idempotency_key),
    }
}

pub fn custody_token(
    custody_token_id: &str,
    asset_id: &str,
    custodian_id: &str,
    idempotency_key: &str,
) -> CustodyTokenRecord {
    CustodyTokenRecord {
        custody_token_id: custody_token_id.to_string(),
        asset_id: asset_id.to_string(),
        custodian_id: custodian_id.to_string(),
        meta: meta(idempotency_key),
    }
}

pub fn challenge(
    challenge_id: &str,
    custody_token_id: &str,
    to_custodian_id: &str,
    idempotency_key: &str,
) -> HandoffChallengeRecord {
    HandoffChallengeRecord {
        challenge_id: challenge_id.to_string(),
        custody_token_id: custody_token_id.to_string(),
        to_custodian_id: to_custodian_id.to_string(),
        meta: meta(idempotency_key),
    }
}

pub fn acceptance(acceptance_id: &str, challenge_id: &str, idempotency_key: &str) -> HandoffAcceptanceRecord {
    HandoffAcceptanceRecord {
        acceptance_id: acceptance_id.to_string(),
        challenge_id: challenge_id.to_string(),
        meta: meta(idempotency_key),
    }
}

pub fn delivery(custody_token_id: &str, received_by: &str, idempotency_key: &str) -> DeliveryReceiptRecord {
    DeliveryReceiptRecord {
        custody_token_id: custody_token_id.to_string(),
        received_by: received_by.to_string(),
        meta: meta(idempotency_key),
    }
}

/// An unsigned service record with a small details section.
pub fn service_record(
    provider_id: &str,
    asset_id: &str,
    domain: ServiceDomain,
    service_type: ServiceType,
    idempotency_key: &str,
) -> ServiceRecord {
    let mut details = Map::new();
    details.insert("notes".into(), "replaced brake pads".into());
    details.insert("odometer".into(), 42_118.into());
    ServiceRecord {
        provider_id: provider_id.to_string(),
        asset_id: asset_id.to_string(),
        service_domain: domain,
        service_type,
        work_order_id: None,
        performed_at: TEST_TIME.to_string(),
        details,
        provider_signature: String::new(),
        meta: meta(idempotency_key),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use custody_ledger_core::verify_signature;

    #[test]
    fn test_seeded_provider_is_deterministic() {
        let a = TestProvider::with_seed("p", &[], [7; 32]);
        let b = TestProvider::with_seed("p", &[], [7; 32]);
        assert_eq!(a.provider.public_key_pem, b.provider.public_key_pem);
    }

    #[test]
    fn test_signed_record_verifies() {
        let provider = TestProvider::with_seed("p", &["ASE_MASTER"], [1; 32]);
        let record = provider.signed_record("asset-1", ServiceDomain::Automotive, ServiceType::Repair, "k");
        let bytes = record.signing_bytes().unwrap();
        assert!(verify_signature(
            &provider.provider.public_key_pem,
            &bytes,
            &record.provider_signature
        ));
    }

    #[tokio::test]
    async fn test_fixture_resolves_registered_provider() {
        use custody_ledger::ProviderDirectory;

        let fixture = TestFixture::new();
        let provider = TestProvider::new("p", &[]);
        fixture.register(&provider);
        let resolved = fixture.directory.resolve("p").await.unwrap();
        assert_eq!(resolved, Some(provider.provider));
    }
}
