// 📊 Price Aggregator
//
// Rolling mean over the most recent N observations of one market segment.
// "Recent" means by observation timestamp, not insertion order, and N is a
// count of price points rather than a time span.

use serde::Serialize;
use tracing::debug;

use crate::entities::{MarketPrice, MarketType};
use crate::error::Result;
use crate::store::PriceReader;

/// Number of price points averaged per segment
pub const DEFAULT_WINDOW_SIZE: usize = 24;

pub struct PriceAggregator<'a, P: PriceReader + ?Sized> {
    source: &'a P,
}

impl<'a, P: PriceReader + ?Sized> PriceAggregator<'a, P> {
    pub fn new(source: &'a P) -> Self {
        Self { source }
    }

    /// Mean of the latest `window_size` prices, or `default_value` when the
    /// segment has no history. Only a failing store is an error.
    pub fn average_price(
        &self,
        market_type: MarketType,
        window_size: usize,
        default_value: f64,
    ) -> Result<f64> {
        let prices = self.source.list_recent_prices(market_type, window_size)?;
        let window = &prices[..prices.len().min(window_size)];

        match mean(window.iter().map(|p| p.price_eur_per_mwh)) {
            Some(avg) => {
                debug!(market = %market_type, points = window.len(), avg, "averaged market prices");
                Ok(avg)
            }
            None => {
                debug!(market = %market_type, default_value, "no price history, using default");
                Ok(default_value)
            }
        }
    }
}

/// Unweighted arithmetic mean; `None` for an empty input
pub fn mean<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0.0_f64, 0_usize), |(sum, count), v| (sum + v, count + 1));

    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Descriptive numbers for a list of prices (used by the CLI and TUI views)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

pub fn summarize(prices: &[MarketPrice]) -> Option<PriceStats> {
    let avg = mean(prices.iter().map(|p| p.price_eur_per_mwh))?;
    let min = prices
        .iter()
        .map(|p| p.price_eur_per_mwh)
        .fold(f64::INFINITY, f64::min);
    let max = prices
        .iter()
        .map(|p| p.price_eur_per_mwh)
        .fold(f64::NEG_INFINITY, f64::max);

    Some(PriceStats {
        count: prices.len(),
        min,
        max,
        mean: avg,
    })
}
