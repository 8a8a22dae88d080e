//! Regional time helpers
//!
//! Every calendar decision (which day is "today", when midnight is, when the
//! daily fetch runs) is made in the price feed's own time zone, independent of
//! the host's local zone.

use chrono::{DateTime, Duration, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::sync::RwLock;

/// Zone the price feed uses for its date columns
pub const REGIONAL_TZ: Tz = chrono_tz::Europe::Stockholm;

/// Source of the current instant
pub trait Clock: Send + Sync {
    fn now_utc(&self) -> DateTime<Utc>;

    fn regional_now(&self) -> DateTime<Tz> {
        self.now_utc().with_timezone(&REGIONAL_TZ)
    }
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at a settable instant
#[derive(Debug)]
pub struct FixedClock {
    now: RwLock<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(now),
        }
    }

    /// Clock frozen at a regional wall-clock time
    pub fn at_regional(naive: NaiveDateTime) -> Self {
        Self::new(localize(naive).with_timezone(&Utc))
    }

    pub fn set(&self, now: DateTime<Utc>) {
        if let Ok(mut guard) = self.now.write() {
            *guard = now;
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut guard) = self.now.write() {
            *guard += by;
        }
    }
}

impl Clock for FixedClock {
    fn now_utc(&self) -> DateTime<Utc> {
        match self.now.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// Current instant in regional time
pub fn regional_now() -> DateTime<Tz> {
    SystemClock.regional_now()
}

/// Any instant expressed in regional time
pub fn to_regional<T: TimeZone>(instant: &DateTime<T>) -> DateTime<Tz> {
    instant.with_timezone(&REGIONAL_TZ)
}

/// Regional wall-clock time as an instant.
///
/// Ambiguous times resolve to the earlier instant. Times inside a DST gap are
/// moved forward by the gap length.
pub fn localize(naive: NaiveDateTime) -> DateTime<Tz> {
    if let Some(dt) = REGIONAL_TZ.from_local_datetime(&naive).earliest() {
        return dt;
    }
    if let Some(dt) = REGIONAL_TZ
        .from_local_datetime(&(naive + Duration::hours(1)))
        .earliest()
    {
        return dt;
    }
    REGIONAL_TZ.from_utc_datetime(&naive)
}

/// `instant` truncated to 00:00:00.000 regional time
pub fn regional_midnight<T: TimeZone>(instant: &DateTime<T>) -> DateTime<Tz> {
    let date = to_regional(instant).date_naive();
    localize(date.and_time(NaiveTime::MIN))
}

/// Midnight that starts the next regional calendar day.
///
/// One calendar day after `instant`, which is not always 24 hours away.
pub fn next_regional_midnight<T: TimeZone>(instant: &DateTime<T>) -> DateTime<Tz> {
    let midnight = regional_midnight(instant);
    match midnight.date_naive().succ_opt() {
        Some(date) => localize(date.and_time(NaiveTime::MIN)),
        None => midnight + Duration::days(1),
    }
}

/// `DD-MM-YYYY` of the regional calendar day, as the feed names its columns
pub fn feed_date_string<T: TimeZone>(instant: &DateTime<T>) -> String {
    to_regional(instant).format("%d-%m-%Y").to_string()
}

/// Next instant at which regional wall-clock time equals `at`.
///
/// An exact match with `now` counts as the next occurrence.
pub fn next_daily_occurrence<T: TimeZone>(instant: &DateTime<T>, at: NaiveTime) -> DateTime<Tz> {
    let now = to_regional(instant);
    let today = localize(now.date_naive().and_time(at));
    if today >= now {
        return today;
    }
    match now.date_naive().succ_opt() {
        Some(tomorrow) => localize(tomorrow.and_time(at)),
        None => today + Duration::days(1),
    }
}

/// Next top of the hour strictly after `instant`
pub fn next_top_of_hour<T: TimeZone>(instant: &DateTime<T>) -> DateTime<Utc> {
    // Regional offsets are whole hours, so the UTC hour boundary is the regional one
    let secs = instant.timestamp();
    let next = (secs.div_euclid(3600) + 1) * 3600;
    DateTime::from_timestamp(next, 0).unwrap_or_else(|| instant.with_timezone(&Utc) + Duration::hours(1))
}
