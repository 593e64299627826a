//! Quote pricing.
//!
//! A quote is bound to the exact request that produced it through
//! `inputs_snapshot_hash`, the SHA-256 of the canonical request. Anyone
//! holding the request can recompute it.

use chrono::{DateTime, Duration, SecondsFormat, Utc};

use custody_ledger_core::{canonical_hash, CanonicalError, Micros, QuoteRequest, QuoteResponse};

use crate::config::PricingConfig;

/// Computes the premium for a quote request.
pub trait PremiumModel: Send + Sync {
    /// The premium in micros, or `None` if it cannot be represented.
    fn premium(&self, request: &QuoteRequest) -> Option<Micros>;
}

/// Flat daily rate times term length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlatRatePremium {
    pub micros_per_day: Micros,
}

impl FlatRatePremium {
    pub fn new(micros_per_day: Micros) -> Self {
        Self { micros_per_day }
    }
}

impl PremiumModel for FlatRatePremium {
    fn premium(&self, request: &QuoteRequest) -> Option<Micros> {
        self.micros_per_day.checked_mul(u128::from(request.term_days))
    }
}

/// Why a quote could not be built.
#[derive(Debug, thiserror::Error)]
pub enum PricingError {
    #[error("premium overflows for term of {0} days")]
    Overflow(u32),

    #[error("quote expiry out of range")]
    ExpiryOutOfRange,

    #[error(transparent)]
    Canonical(#[from] CanonicalError),
}

/// Build the quote for `request`.
pub fn build_quote(
    config: &PricingConfig,
    model: &dyn PremiumModel,
    request: &QuoteRequest,
    quote_id: String,
    now: DateTime<Utc>,
) -> Result<QuoteResponse, PricingError> {
    let premium_micros = model
        .premium(request)
        .ok_or(PricingError::Overflow(request.term_days))?;

    let ttl = i64::try_from(config.quote_ttl_secs)
        .ok()
        .and_then(Duration::try_seconds)
        .ok_or(PricingError::ExpiryOutOfRange)?;
    let expires_at = now
        .checked_add_signed(ttl)
        .ok_or(PricingError::ExpiryOutOfRange)?;

    Ok(QuoteResponse {
        quote_id,
        premium_micros,
        currency: config.currency.clone(),
        pricing_version: config.pricing_version.clone(),
        inputs_snapshot_hash: canonical_hash(request)?.to_hex(),
        risk_bps: config.risk_bps,
        reasons: config.reasons.clone(),
        expires_at: expires_at.to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

/// Check that `quote` was computed from exactly `request`.
pub fn verify_inputs_snapshot(request: &QuoteRequest, quote: &QuoteResponse) -> bool {
    canonical_hash(request)
        .map(|hash| hash.to_hex() == quote.inputs_snapshot_hash)
        .unwrap_or(false)
}
