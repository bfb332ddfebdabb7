// 🚗 EV Specification - vehicle attributes the estimator reads
//
// Only model, battery capacity, efficiency and max charging power are
// editable; id and created_at are assigned by the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::require_positive;
use crate::error::ValidationError;

// ============================================================================
// PERSISTED RECORD
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvSpec {
    pub id: i64,

    /// Display name, e.g. "Tesla Model 3"
    pub model: String,

    /// Usable battery capacity (kWh)
    pub battery_capacity_kwh: f64,

    /// Energy consumed per 100 km driven (kWh/100km)
    pub efficiency_kwh_per_100km: f64,

    /// Maximum AC/DC charging power (kW)
    pub max_charging_power_kw: f64,

    pub created_at: DateTime<Utc>,
}

// ============================================================================
// INPUTS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEvSpec {
    pub model: String,
    pub battery_capacity_kwh: f64,
    pub efficiency_kwh_per_100km: f64,
    pub max_charging_power_kw: f64,
}

impl NewEvSpec {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.model.trim().is_empty() {
            return Err(ValidationError::new("model", "must not be empty"));
        }
        require_positive("battery_capacity_kwh", self.battery_capacity_kwh)?;
        require_positive("efficiency_kwh_per_100km", self.efficiency_kwh_per_100km)?;
        require_positive("max_charging_power_kw", self.max_charging_power_kw)?;
        Ok(())
    }
}

/// Partial update: `None` leaves the stored value untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvSpecUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery_capacity_kwh: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub efficiency_kwh_per_100km: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_charging_power_kw: Option<f64>,
}

impl EvSpecUpdate {
    pub fn is_empty(&self) -> bool {
        self.model.is_none()
            && self.battery_capacity_kwh.is_none()
            && self.efficiency_kwh_per_100km.is_none()
            && self.max_charging_power_kw.is_none()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(model) = &self.model {
            if model.trim().is_empty() {
                return Err(ValidationError::new("model", "must not be empty"));
            }
        }
        if let Some(value) = self.battery_capacity_kwh {
            require_positive("battery_capacity_kwh", value)?;
        }
        if let Some(value) = self.efficiency_kwh_per_100km {
            require_positive("efficiency_kwh_per_100km", value)?;
        }
        if let Some(value) = self.max_charging_power_kw {
            require_positive("max_charging_power_kw", value)?;
        }
        Ok(())
    }

    /// Copy every supplied field onto `spec`
    pub fn apply_to(&self, spec: &mut EvSpec) {
        if let Some(model) = &self.model {
            spec.model = model.trim().to_string();
        }
        if let Some(value) = self.battery_capacity_kwh {
            spec.battery_capacity_kwh = value;
        }
        if let Some(value) = self.efficiency_kwh_per_100km {
            spec.efficiency_kwh_per_100km = value;
        }
        if let Some(value) = self.max_charging_power_kw {
            spec.max_charging_power_kw = value;
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
