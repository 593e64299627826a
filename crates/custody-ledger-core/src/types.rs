//! Strong type definitions for the custody ledger.
//!
//! Identifiers and exact-precision integers are newtypes so they cannot be
//! mixed up at compile time. Integers that leave the process are rendered as
//! decimal strings to avoid rounding in consumers with lossy number types.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::crypto::Blake3Hash;

/// The event schema version written on every ledger event.
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Domain separation prefix for ledger event ids.
pub const EVENT_ID_DOMAIN: &[u8] = b"custody-ledger/event-id/v1";

/// A 32-byte ledger event identifier.
///
/// Computed as Blake3(EVENT_ID_DOMAIN || canonical_event_bytes), so two
/// appends of the same logical event share one id.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LedgerEventId(pub [u8; 32]);

impl LedgerEventId {
    /// Derive the id from canonical event bytes.
    pub fn derive(canonical_event: &[u8]) -> Self {
        Self(Blake3Hash::hash_with_domain(EVENT_ID_DOMAIN, canonical_event).0)
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| hex::FromHexError::InvalidStringLength)?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for LedgerEventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LedgerEventId({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for LedgerEventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for LedgerEventId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for LedgerEventId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(de::Error::custom)
    }
}

/// Position of an event in one ledger stream.
///
/// Strictly increasing per ledger instance, starting at 1. Serialized as a
/// decimal string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MonotonicIndex(pub u64);

impl MonotonicIndex {
    /// The first index a ledger assigns.
    pub const FIRST: Self = Self(1);

    /// The index following this one, or `None` on exhaustion.
    pub fn next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for MonotonicIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for MonotonicIndex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for MonotonicIndex {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(IntStringVisitor).and_then(|n| {
            u64::try_from(n)
                .map(Self)
                .map_err(|_| de::Error::custom("monotonic index out of range"))
        })
    }
}

/// An amount in millionths of a currency unit.
///
/// Exact integer arithmetic; serialized as a decimal string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Micros(pub u128);

impl Micros {
    pub const fn get(self) -> u128 {
        self.0
    }

    pub fn checked_mul(self, factor: u128) -> Option<Self> {
        self.0.checked_mul(factor).map(Self)
    }
}

impl fmt::Display for Micros {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Micros {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u128>().map(Self)
    }
}

impl Serialize for Micros {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Micros {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(IntStringVisitor).map(Self)
    }
}

/// Accepts a non-negative integer given as a decimal string or a number.
struct IntStringVisitor;

impl<'de> Visitor<'de> for IntStringVisitor {
    type Value = u128;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a non-negative integer or decimal integer string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<u128, E> {
        Ok(v as u128)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<u128, E> {
        u128::try_from(v).map_err(|_| E::custom("negative integer"))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<u128, E> {
        if v.is_empty() || !v.bytes().all(|b| b.is_ascii_digit()) {
            return Err(E::custom(format!("not a decimal integer string: {v:?}")));
        }
        v.parse::<u128>().map_err(E::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_id_hex_roundtrip() {
        let id = LedgerEventId::from_bytes([0x42; 32]);
        assert_eq!(LedgerEventId::from_hex(&id.to_hex()).unwrap(), id);
    }

    #[test]
    fn test_event_id_is_content_address() {
        assert_eq!(LedgerEventId::derive(b"abc"), LedgerEventId::derive(b"abc"));
        assert_ne!(LedgerEventId::derive(b"abc"), LedgerEventId::derive(b"abd"));
    }

    #[test]
    fn test_monotonic_index_serializes_as_string() {
        let json = serde_json::to_string(&MonotonicIndex(u64::MAX)).unwrap();
        assert_eq!(json, "\"18446744073709551615\"");
        let back: MonotonicIndex = serde_json::from_str(&json).unwrap();
        assert_eq!(back, MonotonicIndex(u64::MAX));
    }

    #[test]
    fn test_monotonic_index_next() {
        assert_eq!(MonotonicIndex::FIRST.next(), Some(MonotonicIndex(2)));
        assert_eq!(MonotonicIndex(u64::MAX).next(), None);
    }

    #[test]
    fn test_micros_rejects_signed_and_fractional_strings() {
        assert!(serde_json::from_str::<Micros>("\"-5\"").is_err());
        assert!(serde_json::from_str::<Micros>("\"1.5\"").is_err());
        assert_eq!(
            serde_json::from_str::<Micros>("\"25000000\"").unwrap(),
            Micros(25_000_000)
        );
    }
}
