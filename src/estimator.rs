// 🔌 Value Estimator
//
// Annual value (EUR/year) an EV brings to a retailer across three markets:
//
//   day-ahead  = annual MWh * avg day-ahead price * day_ahead_share
//   intraday   = annual MWh * (avg intraday - avg day-ahead) * intraday_share
//   imbalance  = min(battery MWh, charging MW) * avg imbalance * imbalance_utilization
//   total      = sum of the three
//
// The intraday component goes negative when intraday prices average below
// day-ahead. It is kept as computed (not clamped); whether that is the
// intended product behaviour is an open review item.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::entities::{EvSpec, EvValueEstimation, MarketType, NewEstimation};
use crate::error::{Error, Result, ValidationError};
use crate::pricing::{PriceAggregator, DEFAULT_WINDOW_SIZE};
use crate::store::RecordStore;

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Reference prices (EUR/MWh) used when a segment has no history yet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultPrices {
    pub day_ahead: f64,
    pub intraday: f64,
    pub imbalance: f64,
}

impl Default for DefaultPrices {
    fn default() -> Self {
        Self {
            day_ahead: 50.0,
            intraday: 55.0,
            imbalance: 60.0,
        }
    }
}

impl DefaultPrices {
    pub fn for_market(&self, market_type: MarketType) -> f64 {
        match market_type {
            MarketType::DayAhead => self.day_ahead,
            MarketType::Intraday => self.intraday,
            MarketType::Imbalance => self.imbalance,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Price points averaged per segment
    pub window_size: usize,
    pub default_prices: DefaultPrices,
    /// Cost reduction from shifting charging into cheap day-ahead hours
    pub day_ahead_share: f64,
    /// Volume re-optimized on the intraday market
    pub intraday_share: f64,
    /// Utilization of the flexible capacity for balancing services
    pub imbalance_utilization: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            default_prices: DefaultPrices::default(),
            day_ahead_share: 0.20,
            intraday_share: 0.10,
            imbalance_utilization: 0.05,
        }
    }
}

impl EstimatorConfig {
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.window_size == 0 {
            return Err(ValidationError::new("estimation.window_size", "must be at least 1"));
        }
        let numbers = [
            ("estimation.default_prices.day_ahead", self.default_prices.day_ahead),
            ("estimation.default_prices.intraday", self.default_prices.intraday),
            ("estimation.default_prices.imbalance", self.default_prices.imbalance),
            ("estimation.day_ahead_share", self.day_ahead_share),
            ("estimation.intraday_share", self.intraday_share),
            ("estimation.imbalance_utilization", self.imbalance_utilization),
        ];
        for (field, value) in numbers {
            if !value.is_finite() {
                return Err(ValidationError::new(field, "must be a finite number"));
            }
        }
        Ok(())
    }
}

// ============================================================================
// PURE COMPUTATION
// ============================================================================

/// Average price per segment (EUR/MWh) feeding one estimation
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SegmentAverages {
    pub day_ahead: f64,
    pub intraday: f64,
    pub imbalance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ValueBreakdown {
    pub annual_energy_mwh: f64,
    pub day_ahead_value: f64,
    pub intraday_value: f64,
    pub imbalance_value: f64,
    pub total: f64,
}

/// Annual energy drawn from the grid for driving, in MWh
pub fn annual_energy_mwh(annual_km: f64, efficiency_kwh_per_100km: f64) -> f64 {
    (annual_km / 100.0) * efficiency_kwh_per_100km / 1000.0
}

pub fn compute_breakdown(
    spec: &EvSpec,
    annual_km: i64,
    averages: &SegmentAverages,
    config: &EstimatorConfig,
) -> ValueBreakdown {
    let energy_mwh = annual_energy_mwh(annual_km as f64, spec.efficiency_kwh_per_100km);
    let battery_capacity_mwh = spec.battery_capacity_kwh / 1000.0;
    let max_charging_power_mw = spec.max_charging_power_kw / 1000.0;

    let day_ahead_value = energy_mwh * averages.day_ahead * config.day_ahead_share;
    let intraday_value = energy_mwh * (averages.intraday - averages.day_ahead) * config.intraday_share;
    let imbalance_value = battery_capacity_mwh.min(max_charging_power_mw)
        * averages.imbalance
        * config.imbalance_utilization;

    ValueBreakdown {
        annual_energy_mwh: energy_mwh,
        day_ahead_value,
        intraday_value,
        imbalance_value,
        total: day_ahead_value + intraday_value + imbalance_value,
    }
}

// ============================================================================
// ESTIMATOR
// ============================================================================

pub struct ValueEstimator<'a, S: RecordStore + ?Sized> {
    store: &'a S,
    config: &'a EstimatorConfig,
}

impl<'a, S: RecordStore + ?Sized> ValueEstimator<'a, S> {
    pub fn new(store: &'a S, config: &'a EstimatorConfig) -> Self {
        Self { store, config }
    }

    pub fn segment_averages(&self) -> Result<SegmentAverages> {
        let aggregator = PriceAggregator::new(self.store);
        let window = self.config.window_size;
        let defaults = &self.config.default_prices;

        Ok(SegmentAverages {
            day_ahead: aggregator.average_price(
                MarketType::DayAhead,
                window,
                defaults.for_market(MarketType::DayAhead),
            )?,
            intraday: aggregator.average_price(
                MarketType::Intraday,
                window,
                defaults.for_market(MarketType::Intraday),
            )?,
            imbalance: aggregator.average_price(
                MarketType::Imbalance,
                window,
                defaults.for_market(MarketType::Imbalance),
            )?,
        })
    }

    /// Validate, compute and append exactly one estimation.
    ///
    /// Nothing is written unless every read succeeded.
    pub fn estimate(&self, ev_spec_id: i64, annual_km: i64) -> Result<EvValueEstimation> {
        if annual_km <= 0 {
            return Err(Error::invalid("annual_km", "must be a positive number of kilometres"));
        }
        if ev_spec_id <= 0 {
            return Err(Error::invalid("ev_spec_id", "must be a positive identifier"));
        }

        let spec = self
            .store
            .get_ev_spec(ev_spec_id)?
            .ok_or_else(|| Error::not_found("EV specification", ev_spec_id))?;

        let averages = self.segment_averages()?;
        let breakdown = compute_breakdown(&spec, annual_km, &averages, self.config);
        debug!(?averages, ?breakdown, model = %spec.model, "computed value breakdown");

        let saved = self.store.insert_estimation(NewEstimation {
            annual_km,
            ev_spec_id,
            estimated_value_eur_per_year: breakdown.total,
            day_ahead_value: breakdown.day_ahead_value,
            intraday_value: breakdown.intraday_value,
            imbalance_value: breakdown.imbalance_value,
        })?;

        info!(
            estimation_id = saved.id,
            ev_spec_id,
            annual_km,
            total = saved.estimated_value_eur_per_year,
            "stored EV value estimation"
        );
        Ok(saved)
    }
}

/// Request-layer entry point: one estimation against `store`
pub fn estimate_value<S: RecordStore + ?Sized>(
    store: &S,
    config: &EstimatorConfig,
    ev_spec_id: i64,
    annual_km: i64,
) -> Result<EvValueEstimation> {
    ValueEstimator::new(store, config).estimate(ev_spec_id, annual_km)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{MarketPrice, NewEvSpec, NewMarketPrice};
    use crate::store::{EstimationWriter, MemoryStore, PriceReader, SpecReader};
    use chrono::{Duration, Utc};

    fn tesla(store: &MemoryStore) -> EvSpec {
        store
            .create_ev_spec(NewEvSpec {
                model: "Tesla Model 3".to_string(),
                battery_capacity_kwh: 75.0,
                efficiency_kwh_per_100km: 15.0,
                max_charging_power_kw: 250.0,
            })
            .unwrap()
    }

    fn seed_reference_prices(store: &MemoryStore) {
        let now = Utc::now();
        let hour_ago = now - Duration::hours(1);
        let rows = [
            (MarketType::DayAhead, 45.50, hour_ago),
            (MarketType::DayAhead, 55.75, now),
            (MarketType::Intraday, 48.25, hour_ago),
            (MarketType::Intraday, 62.00, now),
            (MarketType::Imbalance, 65.00, hour_ago),
            (MarketType::Imbalance, 70.50, now),
        ];
        for (market_type, price, timestamp) in rows {
            store
                .create_market_price(NewMarketPrice {
                    market_type,
                    price_eur_per_mwh: price,
                    timestamp,
                })
                .unwrap();
        }
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= 1e-9 * expected.abs().max(1.0),
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_reference_scenario() {
        let store = MemoryStore::new();
        let spec = tesla(&store);
        seed_reference_prices(&store);
        let config = EstimatorConfig::default();

        let result = estimate_value(&store, &config, spec.id, 15000).unwrap();

        assert_eq!(result.annual_km, 15000);
        assert_eq!(result.ev_spec_id, spec.id);
        assert_close(result.day_ahead_value, 22.78125);
        assert_close(result.intraday_value, 1.0125);
        assert_close(result.imbalance_value, 0.2540625);
        assert_close(result.estimated_value_eur_per_year, 24.0478125);
        assert_eq!(store.count_estimations().unwrap(), 1);
    }

    #[test]
    fn test_defaults_when_no_price_history() {
        let store = MemoryStore::new();
        let spec = tesla(&store);
        let config = EstimatorConfig::default();

        let estimator = ValueEstimator::new(&store, &config);
        let averages = estimator.segment_averages().unwrap();
        assert_eq!(averages.day_ahead, 50.0);
        assert_eq!(averages.intraday, 55.0);
        assert_eq!(averages.imbalance, 60.0);

        let result = estimator.estimate(spec.id, 15000).unwrap();
        assert_close(result.day_ahead_value, 22.5);
        assert_close(result.intraday_value, 1.125);
        assert_close(result.imbalance_value, 0.225);
        assert_close(result.estimated_value_eur_per_year, 23.85);
    }

    #[test]
    fn test_total_is_exact_sum_of_components() {
        let store = MemoryStore::new();
        let spec = tesla(&store);
        seed_reference_prices(&store);
        let config = EstimatorConfig::default();

        for km in [1, 999, 15000, 123_457, 1_000_000] {
            let r = estimate_value(&store, &config, spec.id, km).unwrap();
            assert_eq!(
                r.estimated_value_eur_per_year,
                r.day_ahead_value + r.intraday_value + r.imbalance_value
            );
        }
    }

    #[test]
    fn test_components_scale_with_distance_but_imbalance_does_not() {
        let store = MemoryStore::new();
        let spec = tesla(&store);
        seed_reference_prices(&store);
        let config = EstimatorConfig::default();

        let low = estimate_value(&store, &config, spec.id, 5000).unwrap();
        let high = estimate_value(&store, &config, spec.id, 25000).unwrap();

        assert!(high.day_ahead_value > low.day_ahead_value);
        assert!(high.intraday_value > low.intraday_value);
        assert!(high.estimated_value_eur_per_year > low.estimated_value_eur_per_year);
        assert_eq!(high.imbalance_value, low.imbalance_value);
    }

    #[test]
    fn test_negative_intraday_component_is_not_clamped() {
        let store = MemoryStore::new();
        let spec = tesla(&store);
        let config = EstimatorConfig {
            default_prices: DefaultPrices {
                day_ahead: 80.0,
                intraday: 60.0,
                imbalance: 60.0,
            },
            ..Default::default()
        };

        let result = estimate_value(&store, &config, spec.id, 15000).unwrap();
        // 2.25 MWh * (60 - 80) * 0.10
        assert_close(result.intraday_value, -4.5);
        assert_close(
            result.estimated_value_eur_per_year,
            result.day_ahead_value - 4.5 + result.imbalance_value,
        );
    }

    #[test]
    fn test_imbalance_uses_smaller_of_energy_and_power_limit() {
        let spec = EvSpec {
            id: 1,
            model: "Small battery, fast charger".to_string(),
            battery_capacity_kwh: 40.0,
            efficiency_kwh_per_100km: 16.0,
            max_charging_power_kw: 11.0,
            created_at: Utc::now(),
        };
        let averages = SegmentAverages {
            day_ahead: 50.0,
            intraday: 55.0,
            imbalance: 100.0,
        };
        let breakdown = compute_breakdown(&spec, 10000, &averages, &EstimatorConfig::default());

        // min(0.040 MWh, 0.011 MW) * 100 * 0.05
        assert_close(breakdown.imbalance_value, 0.055);
        assert_close(breakdown.annual_energy_mwh, 1.6);
    }

    #[test]
    fn test_missing_spec_is_not_found_and_writes_nothing() {
        let store = MemoryStore::new();
        seed_reference_prices(&store);
        let config = EstimatorConfig::default();

        let err = estimate_value(&store, &config, 99999, 15000).unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("99999"));
        assert_eq!(store.count_estimations().unwrap(), 0);
    }

    #[test]
    fn test_non_positive_inputs_rejected_before_lookup() {
        let store = MemoryStore::new();
        let spec = tesla(&store);
        let config = EstimatorConfig::default();

        assert!(estimate_value(&store, &config, spec.id, 0).unwrap_err().is_validation());
        assert!(estimate_value(&store, &config, spec.id, -10).unwrap_err().is_validation());
        // Would be NotFound if the lookup had happened
        assert!(estimate_value(&store, &config, 0, 15000).unwrap_err().is_validation());
        assert_eq!(store.count_estimations().unwrap(), 0);
    }

    /// Delegates to a MemoryStore but fails the chosen operation
    struct FlakyStore {
        inner: MemoryStore,
        fail_prices: bool,
        fail_insert: bool,
    }

    impl SpecReader for FlakyStore {
        fn get_ev_spec(&self, id: i64) -> Result<Option<EvSpec>> {
            self.inner.get_ev_spec(id)
        }
    }

    impl PriceReader for FlakyStore {
        fn list_recent_prices(&self, market_type: MarketType, limit: usize) -> Result<Vec<MarketPrice>> {
            if self.fail_prices {
                return Err(Error::storage("connection reset"));
            }
            self.inner.list_recent_prices(market_type, limit)
        }
    }

    impl EstimationWriter for FlakyStore {
        fn insert_estimation(&self, record: NewEstimation) -> Result<EvValueEstimation> {
            if self.fail_insert {
                return Err(Error::storage("constraint violation"));
            }
            self.inner.insert_estimation(record)
        }
    }

    #[test]
    fn test_storage_failures_propagate_without_persisting() {
        let config = EstimatorConfig::default();

        let read_failure = FlakyStore {
            inner: MemoryStore::new(),
            fail_prices: true,
            fail_insert: false,
        };
        let spec = tesla(&read_failure.inner);
        let err = estimate_value(&read_failure, &config, spec.id, 15000).unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
        assert_eq!(read_failure.inner.count_estimations().unwrap(), 0);

        let write_failure = FlakyStore {
            inner: MemoryStore::new(),
            fail_prices: false,
            fail_insert: true,
        };
        let spec = tesla(&write_failure.inner);
        let err = estimate_value(&write_failure, &config, spec.id, 15000).unwrap_err();
        assert!(err.to_string().contains("constraint violation"));
        assert_eq!(write_failure.inner.count_estimations().unwrap(), 0);
    }

    #[test]
    fn test_config_validation() {
        assert!(EstimatorConfig::default().validate().is_ok());

        let zero_window = EstimatorConfig {
            window_size: 0,
            ..Default::default()
        };
        assert_eq!(zero_window.validate().unwrap_err().field, "estimation.window_size");

        let nan_share = EstimatorConfig {
            intraday_share: f64::NAN,
            ..Default::default()
        };
        assert!(nan_share.validate().is_err());
    }
}
