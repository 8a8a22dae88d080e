//! Published view of the sensor
//!
//! [`EntitySnapshot`] is what leaves the process: the formatted state plus
//! the four attributes, shaped for JSON consumers.

use crate::config::{Config, Currency, Region};
use crate::prices::{HourlyPricePoint, PriceSeries};
use crate::sensor::PriceSensor;
use chrono::SecondsFormat;
use serde::Serialize;

pub const ENTITY_NAME: &str = "nordpool";

/// Region and currency pair a sensor publishes for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorIdentity {
    pub region: Region,
    pub currency: Currency,
}

impl SensorIdentity {
    pub fn new(region: Region, currency: Currency) -> Self {
        Self { region, currency }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.region, config.currency)
    }

    pub fn unique_id(&self) -> String {
        format!("{}_{}_{}", ENTITY_NAME, self.region.as_str(), self.currency.as_str()).to_lowercase()
    }

    /// `öre/kWh`, `øre/kWh` or `c/kWh`
    pub fn unit_of_measurement(&self) -> String {
        format!("{}/kWh", self.currency.minor_unit())
    }
}

/// Three-decimal rendering used for the state and every attribute value
pub fn format_value(value: f64) -> String {
    format!("{:.3}", value)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormattedPoint {
    pub value: String,
    pub start: String,
    pub end: String,
}

impl From<&HourlyPricePoint> for FormattedPoint {
    fn from(point: &HourlyPricePoint) -> Self {
        Self {
            value: format_value(point.value()),
            start: point.start().to_rfc3339_opts(SecondsFormat::Secs, false),
            end: point.end().to_rfc3339_opts(SecondsFormat::Secs, false),
        }
    }
}

pub fn format_series(series: &PriceSeries) -> Vec<FormattedPoint> {
    series.iter().map(FormattedPoint::from).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityAttributes {
    pub avg_today: String,
    pub avg_tomorrow: String,
    pub today: Vec<FormattedPoint>,
    pub tomorrow: Vec<FormattedPoint>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntitySnapshot {
    pub name: String,
    pub unique_id: String,
    pub unit_of_measurement: String,
    /// Absent until a current value has been computed
    pub state: Option<String>,
    pub available: bool,
    pub attributes: EntityAttributes,
}

impl EntitySnapshot {
    pub fn build(identity: &SensorIdentity, sensor: &PriceSensor) -> Self {
        let state = sensor.state();
        Self {
            name: ENTITY_NAME.to_string(),
            unique_id: identity.unique_id(),
            unit_of_measurement: identity.unit_of_measurement(),
            state: state.current_value.map(format_value),
            available: state.available,
            attributes: EntityAttributes {
                avg_today: format_value(state.avg_today),
                avg_tomorrow: format_value(state.avg_tomorrow),
                today: format_series(sensor.today()),
                tomorrow: format_series(sensor.tomorrow()),
            },
        }
    }

    /// Snapshot of a sensor that has not fetched anything yet
    pub fn initial(identity: &SensorIdentity) -> Self {
        Self::build(identity, &PriceSensor::new())
    }
}
