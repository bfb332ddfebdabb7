// Record Store capabilities
//
// The estimator only needs three narrow operations from persistence. They
// are split into traits so the SQLite store (db.rs) and the in-memory store
// below can stand in for each other.

use chrono::Utc;
use std::sync::RwLock;

use crate::entities::{
    EvSpec, EvSpecUpdate, EvValueEstimation, MarketPrice, MarketType, NewEstimation, NewEvSpec,
    NewMarketPrice, PriceQuery,
};
use crate::error::{Error, Result};

// ============================================================================
// CAPABILITIES
// ============================================================================

pub trait SpecReader {
    /// `Ok(None)` when no spec has this id
    fn get_ev_spec(&self, id: i64) -> Result<Option<EvSpec>>;
}

pub trait PriceReader {
    /// Up to `limit` observations of one segment, newest observation first
    fn list_recent_prices(&self, market_type: MarketType, limit: usize) -> Result<Vec<MarketPrice>>;
}

pub trait EstimationWriter {
    /// Append one estimation, returning it with id and created_at assigned
    fn insert_estimation(&self, record: NewEstimation) -> Result<EvValueEstimation>;
}

/// Everything the estimator touches
pub trait RecordStore: SpecReader + PriceReader + EstimationWriter {}

impl<T: SpecReader + PriceReader + EstimationWriter + ?Sized> RecordStore for T {}

/// Newest observation first; equal timestamps fall back to the later insert
pub(crate) fn newest_first(a: &MarketPrice, b: &MarketPrice) -> std::cmp::Ordering {
    b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id))
}

// ============================================================================
// IN-MEMORY STORE
// ============================================================================

#[derive(Debug, Default)]
struct Tables {
    specs: Vec<EvSpec>,
    prices: Vec<MarketPrice>,
    estimations: Vec<EvValueEstimation>,
    last_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }
}

/// Process-local store with the same contract as the SQLite one
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| Error::storage("memory store lock poisoned"))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| Error::storage("memory store lock poisoned"))
    }

    pub fn create_ev_spec(&self, input: NewEvSpec) -> Result<EvSpec> {
        input.validate()?;
        let mut tables = self.write()?;
        let spec = EvSpec {
            id: tables.next_id(),
            model: input.model.trim().to_string(),
            battery_capacity_kwh: input.battery_capacity_kwh,
            efficiency_kwh_per_100km: input.efficiency_kwh_per_100km,
            max_charging_power_kw: input.max_charging_power_kw,
            created_at: Utc::now(),
        };
        tables.specs.push(spec.clone());
        Ok(spec)
    }

    pub fn update_ev_spec(&self, id: i64, update: &EvSpecUpdate) -> Result<EvSpec> {
        update.validate()?;
        let mut tables = self.write()?;
        let spec = tables
            .specs
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| Error::not_found("EV specification", id))?;
        update.apply_to(spec);
        Ok(spec.clone())
    }

    pub fn create_market_price(&self, input: NewMarketPrice) -> Result<MarketPrice> {
        input.validate()?;
        let mut tables = self.write()?;
        let price = MarketPrice {
            id: tables.next_id(),
            market_type: input.market_type,
            price_eur_per_mwh: input.price_eur_per_mwh,
            timestamp: input.timestamp,
            created_at: Utc::now(),
        };
        tables.prices.push(price.clone());
        Ok(price)
    }

    pub fn list_market_prices(&self, query: &PriceQuery) -> Result<Vec<MarketPrice>> {
        query.validate()?;
        let tables = self.read()?;
        let mut prices: Vec<MarketPrice> = tables
            .prices
            .iter()
            .filter(|p| query.matches(p))
            .cloned()
            .collect();
        prices.sort_by(newest_first);
        if let Some(limit) = query.limit {
            prices.truncate(limit);
        }
        Ok(prices)
    }

    pub fn list_estimations(&self) -> Result<Vec<EvValueEstimation>> {
        let tables = self.read()?;
        let mut estimations = tables.estimations.clone();
        estimations.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(estimations)
    }

    pub fn count_estimations(&self) -> Result<i64> {
        Ok(self.read()?.estimations.len() as i64)
    }
}

impl SpecReader for MemoryStore {
    fn get_ev_spec(&self, id: i64) -> Result<Option<EvSpec>> {
        Ok(self.read()?.specs.iter().find(|s| s.id == id).cloned())
    }
}

impl PriceReader for MemoryStore {
    fn list_recent_prices(&self, market_type: MarketType, limit: usize) -> Result<Vec<MarketPrice>> {
        let tables = self.read()?;
        let mut prices: Vec<MarketPrice> = tables
            .prices
            .iter()
            .filter(|p| p.market_type == market_type)
            .cloned()
            .collect();
        prices.sort_by(newest_first);
        prices.truncate(limit);
        Ok(prices)
    }
}

impl EstimationWriter for MemoryStore {
    fn insert_estimation(&self, record: NewEstimation) -> Result<EvValueEstimation> {
        let mut tables = self.write()?;
        let id = tables.next_id();
        let estimation = record.into_record(id, Utc::now());
        tables.estimations.push(estimation.clone());
        Ok(estimation)
    }
}
