//! Protocol configuration.
//!
//! Deserializable so a host can embed it in its own config file. Every field
//! has a default.

use serde::Deserialize;

use custody_ledger_core::Micros;

/// Configuration for the [`Protocol`](crate::Protocol).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    pub pricing: PricingConfig,
}

/// Parameters of the default flat-rate quote.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// Premium charged per day of term, in micros.
    pub base_premium_micros_per_day: Micros,
    pub currency: String,
    pub pricing_version: String,
    /// Risk score in basis points reported on every quote.
    pub risk_bps: u32,
    pub reasons: Vec<String>,
    /// How long a quote stays valid after issuance.
    pub quote_ttl_secs: u64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            base_premium_micros_per_day: Micros(2_500_000),
            currency: "USD".into(),
            pricing_version: "v1".into(),
            risk_bps: 120,
            reasons: vec!["INITIAL_RISK_MODEL".into()],
            quote_ttl_secs: 7 * 24 * 60 * 60,
        }
    }
}
