//! Golden vectors for canonical encoding.
//!
//! Each vector pins the exact canonical bytes and SHA-256 of a JSON input.
//! Any implementation that signs or hashes records must reproduce them.

use custody_ledger_core::{canonical_bytes, content_hash};
use serde_json::Value;

/// A golden test vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// JSON input, in whatever key order.
    pub json: &'static str,
    /// Expected canonical bytes (hex).
    pub expected_canonical: &'static str,
    /// Expected SHA-256 of the canonical bytes (hex).
    pub expected_hash: &'static str,
}

/// Get all golden test vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "empty object",
            json: "{}",
            expected_canonical: "a0",
            expected_hash: "c19a797fa1fd590cd2e5b42d1cf5f246e29b91684e2f87404b81dc345c7a56a0",
        },
        GoldenVector {
            name: "keys sort by encoded length first",
            json: r#"{"bb":1,"a":2,"c":3}"#,
            expected_canonical: "a361610261630362626201",
            expected_hash: "f64172303767fb8505114254806f92c016335b64145a02ecafbfc2fb97a88e03",
        },
        GoldenVector {
            name: "nested maps and arrays",
            json: r#"{"z":[1,2,{"y":null,"x":true}],"a":{"b":"c"}}"#,
            expected_canonical: "a26161a161626163617a830102a26178f56179f6",
            expected_hash: "35f4c76d5946226850d399cfec62cf1cb06aa9cd33d5600a8455336fb920189e",
        },
        GoldenVector {
            name: "integral float collapses to integer",
            json: r#"{"premium":10.0,"term":-1}"#,
            expected_canonical: "a2647465726d20677072656d69756d0a",
            expected_hash: "51d9955bce68d895428543211f8b197aa5e64a279e89687434983d26fbe3dc0a",
        },
        GoldenVector {
            name: "non-integral float is binary64",
            json: r#"{"rate":1.5}"#,
            expected_canonical: "a16472617465fb3ff8000000000000",
            expected_hash: "a6a4a931e4793992ba021096b44749b9175d2fe43f3d087b6b6942a429c1089d",
        },
        GoldenVector {
            name: "utf-8 text",
            json: r#"{"name":"café"}"#,
            expected_canonical: "a1646e616d6565636166c3a9",
            expected_hash: "eef5686488a550f1d832b0946532b3a78421db2452d0b7124e42e845c3ba2c8f",
        },
        GoldenVector {
            name: "integer width boundaries",
            json: "[23,24,255,256,65535,65536,4294967296]",
            expected_canonical: "8717181818ff19010019ffff1a000100001b0000000100000000",
            expected_hash: "5a38dc750240294c79fff7945c5d04115b5ee4ba6985c13e95f46f614896a89d",
        },
    ]
}

/// Canonical bytes and hash produced for a vector's input.
pub fn encode_vector(vector: &GoldenVector) -> (String, String) {
    let value: Value = serde_json::from_str(vector.json).unwrap_or(Value::Null);
    let bytes = canonical_bytes(&value);
    (hex::encode(&bytes), content_hash(&bytes).to_hex())
}

/// Verify all vectors, returning the names of those that fail.
pub fn verify_all_vectors() -> Vec<&'static str> {
    all_vectors()
        .into_iter()
        .filter(|v| {
            let (canonical, hash) = encode_vector(v);
            canonical != v.expected_canonical || hash != v.expected_hash
        })
        .map(|v| v.name)
        .collect()
}
