//! Hourly price points and day series

use chrono::{DateTime, Duration, TimeZone, Utc};
use chrono_tz::Tz;

/// Number of hourly points in a complete day series
pub const HOURS_PER_DAY: usize = 24;

/// Price of one delivery hour, in minor currency units per kWh
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HourlyPricePoint {
    start: DateTime<Tz>,
    end: DateTime<Tz>,
    value: f64,
}

impl HourlyPricePoint {
    pub fn new(start: DateTime<Tz>, value: f64) -> Self {
        Self {
            start,
            end: start + Duration::hours(1),
            value,
        }
    }

    pub fn start(&self) -> DateTime<Tz> {
        self.start
    }

    pub fn end(&self) -> DateTime<Tz> {
        self.end
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Whether `instant` lies in `[start, end)`
    pub fn contains<T: TimeZone>(&self, instant: &DateTime<T>) -> bool {
        let t = instant.with_timezone(&Utc);
        self.start.with_timezone(&Utc) <= t && t < self.end.with_timezone(&Utc)
    }
}

/// Chronological run of hourly points for one regional day
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSeries {
    points: Vec<HourlyPricePoint>,
}

impl PriceSeries {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Series of consecutive hours starting at `midnight`
    pub fn anchored(midnight: DateTime<Tz>, values: &[f64]) -> Self {
        let points = values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let offset = i64::try_from(i).unwrap_or(i64::MAX / 2);
                HourlyPricePoint::new(midnight + Duration::hours(offset), *v)
            })
            .collect();
        Self { points }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_complete(&self) -> bool {
        self.points.len() == HOURS_PER_DAY
    }

    pub fn iter(&self) -> std::slice::Iter<'_, HourlyPricePoint> {
        self.points.iter()
    }

    pub fn first(&self) -> Option<&HourlyPricePoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&HourlyPricePoint> {
        self.points.last()
    }

    /// End of the final hour, the day boundary this series rolls over at
    pub fn last_end(&self) -> Option<DateTime<Tz>> {
        self.points.last().map(HourlyPricePoint::end)
    }

    /// Point whose hour contains `instant`
    pub fn point_at<T: TimeZone>(&self, instant: &DateTime<T>) -> Option<&HourlyPricePoint> {
        self.points.iter().find(|p| p.contains(instant))
    }

    /// Arithmetic mean of the values, 0 for an empty series
    pub fn average(&self) -> f64 {
        if self.points.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.points.iter().map(HourlyPricePoint::value).sum();
        sum / self.points.len() as f64
    }

    /// Sorted, without gaps or overlaps
    pub fn is_contiguous(&self) -> bool {
        self.points.windows(2).all(|w| w[0].end == w[1].start)
    }
}

impl<'a> IntoIterator for &'a PriceSeries {
    type Item = &'a HourlyPricePoint;
    type IntoIter = std::slice::Iter<'a, HourlyPricePoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

impl FromIterator<HourlyPricePoint> for PriceSeries {
    fn from_iter<I: IntoIterator<Item = HourlyPricePoint>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

/// Result of one successful fetch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DayAheadPrices {
    pub today: PriceSeries,
    pub tomorrow: PriceSeries,
}

impl DayAheadPrices {
    pub fn new(today: PriceSeries, tomorrow: PriceSeries) -> Self {
        Self { today, tomorrow }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}
