// 📈 Market Price Observations
//
// One price point per (segment, observation time). Prices are EUR/MWh and
// signed: negative day-ahead and imbalance prices are real and must be kept.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::require_finite;
use crate::error::ValidationError;

/// Upper bound for `PriceQuery::limit`
pub const MAX_PRICE_QUERY_LIMIT: usize = 1000;

// ============================================================================
// MARKET TYPE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketType {
    /// Clears one day before delivery
    DayAhead,

    /// Continuous trading closer to delivery
    Intraday,

    /// Settlement of grid balancing deviations
    Imbalance,
}

impl MarketType {
    pub const ALL: [MarketType; 3] = [MarketType::DayAhead, MarketType::Intraday, MarketType::Imbalance];

    pub fn as_str(&self) -> &'static str {
        match self {
            MarketType::DayAhead => "day_ahead",
            MarketType::Intraday => "intraday",
            MarketType::Imbalance => "imbalance",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MarketType::DayAhead => "Day-ahead",
            MarketType::Intraday => "Intraday",
            MarketType::Imbalance => "Imbalance",
        }
    }
}

impl fmt::Display for MarketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MarketType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "day_ahead" => Ok(MarketType::DayAhead),
            "intraday" => Ok(MarketType::Intraday),
            "imbalance" => Ok(MarketType::Imbalance),
            other => Err(ValidationError::new(
                "market_type",
                format!("unknown market type '{}' (expected day_ahead, intraday or imbalance)", other),
            )),
        }
    }
}

// ============================================================================
// RECORDS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketPrice {
    pub id: i64,
    pub market_type: MarketType,
    pub price_eur_per_mwh: f64,
    /// When the price applies (not when it was recorded)
    pub timestamp: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMarketPrice {
    pub market_type: MarketType,
    pub price_eur_per_mwh: f64,
    pub timestamp: DateTime<Utc>,
}

impl NewMarketPrice {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_finite("price_eur_per_mwh", self.price_eur_per_mwh)
    }
}

// ============================================================================
// QUERY
// ============================================================================

/// Filter for listing prices; every field is optional and they combine with AND
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceQuery {
    #[serde(default)]
    pub market_type: Option<MarketType>,
    /// Inclusive lower bound on observation time
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on observation time
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl PriceQuery {
    pub fn for_market(market_type: MarketType) -> Self {
        Self {
            market_type: Some(market_type),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(limit) = self.limit {
            if limit == 0 || limit > MAX_PRICE_QUERY_LIMIT {
                return Err(ValidationError::new(
                    "limit",
                    format!("must be between 1 and {}", MAX_PRICE_QUERY_LIMIT),
                ));
            }
        }
        Ok(())
    }

    pub fn matches(&self, price: &MarketPrice) -> bool {
        if let Some(market_type) = self.market_type {
            if price.market_type != market_type {
                return false;
            }
        }
        if let Some(from) = self.from {
            if price.timestamp < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if price.timestamp > to {
                return false;
            }
        }
        true
    }
}
