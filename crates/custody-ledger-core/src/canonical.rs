//! Canonical CBOR encoding for deterministic hashing and signing.
//!
//! Records are converted to a JSON value model and encoded following
//! RFC 8949 Core Deterministic Encoding:
//! - Map keys sorted by encoded byte comparison
//! - Integers use smallest valid encoding
//! - Definite lengths only
//! - Integral floats collapse to integers; other floats are binary64
//!
//! The canonical encoding is what gets hashed and signed. Two records with the
//! same logical content produce identical bytes regardless of how they were
//! built (field order, key insertion order, `10` vs `10.0`).

use serde::Serialize;
use serde_json::{Map, Number, Value};

use crate::crypto::Sha256Hash;
use crate::error::CanonicalError;

/// Encode a JSON value to canonical bytes.
pub fn canonical_bytes(value: &Value) -> Vec<u8> {
    let mut buf = Vec::new();
    encode_value(&mut buf, value);
    buf
}

/// Canonicalize any serializable record.
///
/// Fails only if the record cannot be represented as a JSON value
/// (e.g. a map with non-string keys), which is a bug in the record type.
pub fn canonicalize<T: Serialize + ?Sized>(record: &T) -> Result<Vec<u8>, CanonicalError> {
    let value = serde_json::to_value(record).map_err(|e| CanonicalError::NotRepresentable(e.to_string()))?;
    Ok(canonical_bytes(&value))
}

/// SHA-256 of the canonical form of a record.
pub fn canonical_hash<T: Serialize + ?Sized>(record: &T) -> Result<Sha256Hash, CanonicalError> {
    Ok(content_hash(&canonicalize(record)?))
}

/// Hash canonical bytes.
pub fn content_hash(bytes: &[u8]) -> Sha256Hash {
    Sha256Hash::hash(bytes)
}

/// Copy of `value` with the named top-level fields removed.
///
/// Used to recover the exact content that was signed before a detached
/// signature field was attached. Non-object values are returned unchanged.
pub fn strip(value: &Value, fields: &[&str]) -> Value {
    match value {
        Value::Object(map) => {
            let stripped: Map<String, Value> = map
                .iter()
                .filter(|(k, _)| !fields.contains(&k.as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            Value::Object(stripped)
        }
        other => other.clone(),
    }
}

/// Recursively encode a value.
fn encode_value(buf: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Null => buf.push(0xf6),
        Value::Bool(b) => buf.push(if *b { 0xf5 } else { 0xf4 }),
        Value::Number(n) => encode_number(buf, n),
        Value::String(s) => encode_text(buf, s),
        Value::Array(arr) => encode_array(buf, arr),
        Value::Object(map) => encode_map(buf, map),
    }
}

/// Encode a JSON number.
///
/// Integers (and floats with an exact integral value) use major types 0/1.
fn encode_number(buf: &mut Vec<u8>, n: &Number) {
    if let Some(u) = n.as_u64() {
        encode_uint(buf, 0, u);
    } else if let Some(i) = n.as_i64() {
        encode_integer(buf, i as i128);
    } else if let Some(f) = n.as_f64() {
        if f.fract() == 0.0 && f >= i64::MIN as f64 && f < u64::MAX as f64 {
            encode_integer(buf, f as i128);
        } else {
            encode_float(buf, f);
        }
    }
}

/// Encode a signed integer (major types 0 and 1).
fn encode_integer(buf: &mut Vec<u8>, n: i128) {
    if n >= 0 {
        encode_uint(buf, 0, n as u64);
    } else {
        // CBOR encodes -1 as 0, -2 as 1, etc.
        encode_uint(buf, 1, (-1 - n) as u64);
    }
}

/// Encode an unsigned integer with the given major type.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffffffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

/// Encode a non-integral float as binary64.
fn encode_float(buf: &mut Vec<u8>, f: f64) {
    // -0.0 has a zero fraction and is caught by the integer path.
    buf.push(0xfb);
    buf.extend_from_slice(&f.to_bits().to_be_bytes());
}

/// Encode a text string (major type 3).
fn encode_text(buf: &mut Vec<u8>, s: &str) {
    encode_uint(buf, 3, s.len() as u64);
    buf.extend_from_slice(s.as_bytes());
}

/// Encode an array (major type 4). Element order is significant.
fn encode_array(buf: &mut Vec<u8>, arr: &[Value]) {
    encode_uint(buf, 4, arr.len() as u64);
    for item in arr {
        encode_value(buf, item);
    }
}

/// Encode a map canonically (major type 5).
///
/// Keys are sorted by their encoded byte comparison.
fn encode_map(buf: &mut Vec<u8>, map: &Map<String, Value>) {
    let mut entries: Vec<(Vec<u8>, &Value)> = map
        .iter()
        .map(|(k, v)| {
            let mut key_buf = Vec::with_capacity(k.len() + 9);
            encode_text(&mut key_buf, k);
            (key_buf, v)
        })
        .collect();

    entries.sort_by(|a, b| a.0.cmp(&b.0));

    encode_uint(buf, 5, entries.len() as u64);
    for (key_bytes, value) in entries {
        buf.extend_from_slice(&key_bytes);
        encode_value(buf, value);
    }
}
