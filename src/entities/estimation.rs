// 💶 EV Value Estimation - append-only result records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted estimation; the total is stored as computed, never re-derived
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvValueEstimation {
    pub id: i64,
    pub annual_km: i64,
    pub ev_spec_id: i64,
    pub estimated_value_eur_per_year: f64,
    pub day_ahead_value: f64,
    pub intraday_value: f64,
    pub imbalance_value: f64,
    pub created_at: DateTime<Utc>,
}

/// Everything the store needs to append an estimation (id and created_at are its job)
#[derive(Debug, Clone, PartialEq)]
pub struct NewEstimation {
    pub annual_km: i64,
    pub ev_spec_id: i64,
    pub estimated_value_eur_per_year: f64,
    pub day_ahead_value: f64,
    pub intraday_value: f64,
    pub imbalance_value: f64,
}

impl NewEstimation {
    pub fn into_record(self, id: i64, created_at: DateTime<Utc>) -> EvValueEstimation {
        EvValueEstimation {
            id,
            annual_km: self.annual_km,
            ev_spec_id: self.ev_spec_id,
            estimated_value_eur_per_year: self.estimated_value_eur_per_year,
            day_ahead_value: self.day_ahead_value,
            intraday_value: self.intraday_value,
            imbalance_value: self.imbalance_value,
            created_at,
        }
    }
}
