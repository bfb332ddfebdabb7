// Entity Models
//
// Three record kinds, each with a persisted shape and an input shape:
// - EvSpec            (editable via partial update, never deleted)
// - MarketPrice       (immutable once created)
// - EvValueEstimation (append-only)

pub mod ev_spec;
pub mod market_price;
pub mod estimation;

pub use ev_spec::{EvSpec, EvSpecUpdate, NewEvSpec};
pub use market_price::{MarketPrice, MarketType, NewMarketPrice, PriceQuery, MAX_PRICE_QUERY_LIMIT};
pub use estimation::{EvValueEstimation, NewEstimation};

use crate::error::ValidationError;

/// Reject NaN, infinities and values <= 0
pub(crate) fn require_positive(field: &str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::new(field, "must be a finite number"));
    }
    if value <= 0.0 {
        return Err(ValidationError::new(field, "must be positive"));
    }
    Ok(())
}

pub(crate) fn require_finite(field: &str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::new(field, "must be a finite number"))
    }
}
