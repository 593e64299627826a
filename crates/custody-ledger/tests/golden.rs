//! Golden vectors for canonical encoding, hashing and signing.
//!
//! Every implementation that hashes or signs records must reproduce these
//! bytes exactly. Ed25519 signatures are deterministic, so the signature
//! over a fixed record under a fixed seed is pinned too.

use proptest::prelude::*;
use serde_json::json;

use custody_ledger::pricing::build_quote;
use custody_ledger::{verify_inputs_snapshot, FlatRatePremium, PricingConfig};
use custody_ledger_core::{
    canonical_bytes, canonical_hash, parse_record, verify_signature, Keypair, QuoteRequest,
    ServiceDomain, ServiceRecord, ServiceType,
};
use custody_ledger_testkit::fixtures::{quote_request, TestProvider};
use custody_ledger_testkit::generators::{json_value, object_entries, object_from_entries, ServiceParams};
use custody_ledger_testkit::vectors::{all_vectors, encode_vector, verify_all_vectors};

const SEED: [u8; 32] = [0x42; 32];

const SERVICE_SIGNING_BYTES: &str = "aa6764657461696c73a2656e6f746573737265706c61636564206272616b652070616473686f646f6d6574657219a4866861737365745f69646761737365742d316a637265617465645f617474323032362d30312d30315430303a30303a30305a6b70726f76696465725f69646a70726f76696465722d316c706572666f726d65645f617474323032362d30312d30315430303a30303a30305a6c736572766963655f74797065665245504149526e636f7272656c6174696f6e5f69646a636f72722d7376632d316e736368656d615f76657273696f6e65312e302e306e736572766963655f646f6d61696e6a4155544f4d4f544956456f6964656d706f74656e63795f6b6579657376632d31";
const SERVICE_HASH: &str = "17bb0700d7abe9006a7c03c0df4097bac3eda6d0e0bbab2155aa4ccb41dd5948";
const SERVICE_SIGNATURE: &str = "a0868031834d84536fe4135d4b262b90c265cbb9aa9ca838dff64b9f3229bb2f3946679484c2faa15dd6d6c10a2a229cff89eeae473b9bc40630dd90a444580d";
const PUBLIC_KEY_HEX: &str = "2152f8d19b791d24453242e15f2eab6cb7cffa7b6a5ed30097960e069881db12";
const QUOTE_REQUEST_HASH: &str = "de7ea0674be1f7f88358d40de3691c038169c619197c311df916a067e26085bb";

#[test]
fn test_canonical_vectors() {
    for v in all_vectors() {
        let (canonical, hash) = encode_vector(&v);
        assert_eq!(canonical, v.expected_canonical, "canonical bytes for {}", v.name);
        assert_eq!(hash, v.expected_hash, "hash for {}", v.name);
    }
    assert!(verify_all_vectors().is_empty());
}

#[test]
fn test_seed_public_key() {
    assert_eq!(Keypair::from_seed(&SEED).public_key().to_hex(), PUBLIC_KEY_HEX);
}

#[test]
fn test_service_record_signature_vector() {
    let provider = TestProvider::with_seed("provider-1", &["ASE_MASTER"], SEED);
    let record = provider.signed_record("asset-1", ServiceDomain::Automotive, ServiceType::Repair, "svc-1");

    let bytes = record.signing_bytes().unwrap();
    assert_eq!(hex::encode(&bytes), SERVICE_SIGNING_BYTES);
    assert_eq!(canonical_hash(&record.unsigned_value().unwrap()).unwrap().to_hex(), SERVICE_HASH);
    assert_eq!(record.provider_signature, SERVICE_SIGNATURE);

    // Both key encodings verify.
    assert!(verify_signature(&provider.provider.public_key_pem, &bytes, SERVICE_SIGNATURE));
    assert!(verify_signature(PUBLIC_KEY_HEX, &bytes, SERVICE_SIGNATURE));
}

#[test]
fn test_service_record_parsed_from_wire_matches_vector() {
    let input = json!({
        "schema_version": "1.0.0",
        "created_at": "2026-01-01T00:00:00Z",
        "idempotency_key": "svc-1",
        "correlation_id": "corr-svc-1",
        "details": { "odometer": 42118, "notes": "replaced brake pads" },
        "performed_at": "2026-01-01T00:00:00Z",
        "service_type": "REPAIR",
        "service_domain": "AUTOMOTIVE",
        "asset_id": "asset-1",
        "provider_id": "provider-1",
        "provider_signature": SERVICE_SIGNATURE,
    });
    let record: ServiceRecord = parse_record(input).unwrap();
    assert_eq!(hex::encode(record.signing_bytes().unwrap()), SERVICE_SIGNING_BYTES);
}

#[test]
fn test_wire_null_is_rejected_before_signature_check() {
    let input = json!({
        "schema_version": "1.0.0",
        "created_at": "2026-01-01T00:00:00Z",
        "idempotency_key": "svc-1",
        "correlation_id": "corr-svc-1",
        "details": { "odometer": 42118, "notes": "replaced brake pads" },
        "performed_at": "2026-01-01T00:00:00Z",
        "service_type": "REPAIR",
        "service_domain": "AUTOMOTIVE",
        "asset_id": "asset-1",
        "provider_id": "provider-1",
        "work_order_id": null,
        "provider_signature": SERVICE_SIGNATURE,
    });
    let err = parse_record::<ServiceRecord>(input).unwrap_err();
    let fields: Vec<&str> = err.fields().iter().map(|f| f.field.as_str()).collect();
    assert_eq!(fields, vec!["work_order_id"]);
}

#[test]
fn test_inputs_snapshot_vector() {
    let request = quote_request("asset-1", 10, "quote-1");
    assert_eq!(canonical_hash(&request).unwrap().to_hex(), QUOTE_REQUEST_HASH);

    let config = PricingConfig::default();
    let premium = FlatRatePremium::new(config.base_premium_micros_per_day);
    let quote = build_quote(&config, &premium, &request, "q-1".into(), chrono::Utc::now()).unwrap();
    assert_eq!(quote.inputs_snapshot_hash, QUOTE_REQUEST_HASH);
    assert!(verify_inputs_snapshot(&request, &quote));
}

#[test]
fn test_snapshot_ignores_wire_key_order() {
    let forward: QuoteRequest = parse_record(json!({
        "asset_id": "asset-1",
        "term_days": 10,
        "correlation_id": "corr-quote-1",
        "idempotency_key": "quote-1",
        "created_at": "2026-01-01T00:00:00Z",
        "schema_version": "1.0.0",
    }))
    .unwrap();
    let backward: QuoteRequest = parse_record(json!({
        "schema_version": "1.0.0",
        "created_at": "2026-01-01T00:00:00Z",
        "idempotency_key": "quote-1",
        "correlation_id": "corr-quote-1",
        "term_days": 10,
        "asset_id": "asset-1",
    }))
    .unwrap();
    assert_eq!(canonical_hash(&forward).unwrap().to_hex(), QUOTE_REQUEST_HASH);
    assert_eq!(canonical_hash(&backward).unwrap().to_hex(), QUOTE_REQUEST_HASH);
}

proptest! {
    #[test]
    fn canonical_encoding_ignores_insertion_order(entries in object_entries()) {
        let forward = object_from_entries(entries.iter());
        let backward = object_from_entries(entries.iter().rev());
        prop_assert_eq!(canonical_bytes(&forward), canonical_bytes(&backward));
    }

    #[test]
    fn nested_values_encode_inside_any_object(value in json_value(), entries in object_entries()) {
        let mut with_value = entries.clone();
        with_value.push(("~nested".to_string(), value.clone()));
        let forward = object_from_entries(with_value.iter());
        let backward = object_from_entries(with_value.iter().rev());
        prop_assert_eq!(canonical_bytes(&forward), canonical_bytes(&backward));
    }

    #[test]
    fn any_signed_record_verifies_and_any_edit_breaks_it(params: ServiceParams) {
        let provider = TestProvider::with_seed("provider-1", &[], SEED);
        let mut record = custody_ledger_testkit::fixtures::service_record(
            "provider-1",
            &params.asset_id,
            params.domain,
            params.service_type,
            "svc-1",
        );
        record.details = params.details;
        provider.sign(&mut record);

        let bytes = record.signing_bytes().unwrap();
        prop_assert!(verify_signature(PUBLIC_KEY_HEX, &bytes, &record.provider_signature));

        record.asset_id.push('x');
        let edited = record.signing_bytes().unwrap();
        prop_assert!(!verify_signature(PUBLIC_KEY_HEX, &edited, &record.provider_signature));
    }
}
