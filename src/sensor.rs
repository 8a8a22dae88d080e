//! Cached price series and the state derived from them
//!
//! [`PriceSensor`] owns the two live series. Every mutation goes through
//! [`PriceSensor::replace_series`] or [`PriceSensor::rollover`], both of which
//! end with [`PriceSensor::recompute`], so the derived [`SensorState`] never lags
//! behind the series it describes.

use crate::prices::{DayAheadPrices, PriceSeries};
use chrono::{DateTime, TimeZone, Utc};

/// Values derived from the cached series
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SensorState {
    /// Price of the hour containing the last recompute instant
    pub current_value: Option<f64>,
    pub avg_today: f64,
    pub avg_tomorrow: f64,
    /// Set once a non-empty `today` has been fetched
    pub available: bool,
}

#[derive(Debug, Clone, Default)]
pub struct PriceSensor {
    today: PriceSeries,
    tomorrow: PriceSeries,
    state: SensorState,
}

impl PriceSensor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn today(&self) -> &PriceSeries {
        &self.today
    }

    pub fn tomorrow(&self) -> &PriceSeries {
        &self.tomorrow
    }

    pub fn state(&self) -> SensorState {
        self.state
    }

    /// Swap in a fresh fetch result and recompute
    pub fn replace_series<T: TimeZone>(&mut self, prices: DayAheadPrices, now: &DateTime<T>) {
        self.today = prices.today;
        self.tomorrow = prices.tomorrow;
        if !self.today.is_empty() {
            self.state.available = true;
        }
        self.recompute(now);
    }

    /// Promote `tomorrow` to `today` once `now` has passed the end of today.
    ///
    /// Returns whether the series were shifted. State is recomputed either way.
    pub fn rollover<T: TimeZone>(&mut self, now: &DateTime<T>) -> bool {
        let now_utc = now.with_timezone(&Utc);
        let rolled = match self.today.last_end() {
            Some(end) if now_utc >= end.with_timezone(&Utc) => {
                self.today = std::mem::take(&mut self.tomorrow);
                true
            }
            _ => false,
        };
        self.recompute(now);
        rolled
    }

    /// Refresh the current value and both averages.
    ///
    /// When no hour of `today` contains `now` the previous current value is kept.
    pub fn recompute<T: TimeZone>(&mut self, now: &DateTime<T>) {
        if let Some(point) = self.today.point_at(now) {
            self.state.current_value = Some(point.value());
        }
        self.state.avg_today = self.today.average();
        self.state.avg_tomorrow = self.tomorrow.average();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::localize;
    use chrono::{Duration, NaiveDate};
    use chrono_tz::Tz;

    fn midnight(d: u32) -> DateTime<Tz> {
        localize(
            NaiveDate::from_ymd_opt(2025, 6, d)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        )
    }

    fn loaded(now: &DateTime<Tz>) -> PriceSensor {
        let mut sensor = PriceSensor::new();
        sensor.replace_series(
            DayAheadPrices::new(
                PriceSeries::anchored(midnight(10), &[1.0; 24]),
                PriceSeries::anchored(midnight(11), &[2.0; 24]),
            ),
            now,
        );
        sensor
    }

    #[test]
    fn starts_unavailable_and_empty() {
        let sensor = PriceSensor::new();
        assert!(sensor.today().is_empty());
        assert!(sensor.tomorrow().is_empty());
        assert_eq!(sensor.state(), SensorState::default());
    }

    #[test]
    fn replace_series_recomputes() {
        let now = midnight(10) + Duration::hours(5);
        let sensor = loaded(&now);
        let state = sensor.state();
        assert!(state.available);
        assert_eq!(state.current_value, Some(1.0));
        assert_eq!(state.avg_today, 1.0);
        assert_eq!(state.avg_tomorrow, 2.0);
    }

    #[test]
    fn rollover_before_boundary_is_noop() {
        let now = midnight(10) + Duration::hours(23);
        let mut sensor = loaded(&now);
        assert!(!sensor.rollover(&now));
        assert!(!sensor.rollover(&now));
        assert_eq!(sensor.today().first().unwrap().start(), midnight(10));
        assert_eq!(sensor.tomorrow().len(), 24);
    }

    #[test]
    fn rollover_at_boundary_shifts_once() {
        let mut sensor = loaded(&(midnight(10) + Duration::hours(12)));
        let boundary = midnight(11);
        assert!(sensor.rollover(&boundary));
        assert_eq!(sensor.today().first().unwrap().start(), midnight(11));
        assert!(sensor.tomorrow().is_empty());
        assert_eq!(sensor.state().current_value, Some(2.0));
        assert_eq!(sensor.state().avg_tomorrow, 0.0);

        // Next tick within the new day has nothing to promote
        assert!(!sensor.rollover(&(boundary + Duration::hours(1))));
        assert_eq!(sensor.today().len(), 24);
    }

    #[test]
    fn rollover_with_empty_today_is_noop() {
        let mut sensor = PriceSensor::new();
        assert!(!sensor.rollover(&midnight(10)));
        assert!(!sensor.state().available);
    }

    #[test]
    fn stale_instant_keeps_previous_value() {
        let now = midnight(10) + Duration::hours(3);
        let mut sensor = loaded(&now);
        sensor.recompute(&(midnight(12) + Duration::hours(1)));
        assert_eq!(sensor.state().current_value, Some(1.0));
    }

    #[test]
    fn empty_fetch_keeps_availability() {
        let now = midnight(10) + Duration::hours(3);
        let mut sensor = loaded(&now);
        sensor.replace_series(DayAheadPrices::empty(), &now);
        assert!(sensor.today().is_empty());
        assert!(sensor.state().available);
        assert_eq!(sensor.state().avg_today, 0.0);
    }
}
