#![no_main]
use chrono::{TimeZone, Utc};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(table) = serde_json::from_slice::<dayahead::feed::FeedResponse>(data) else {
        return;
    };
    let Some(now) = Utc.with_ymd_and_hms(2025, 6, 10, 11, 0, 0).single() else {
        return;
    };
    if let Ok(prices) = dayahead::feed::build_series(&table, &now) {
        assert!(!prices.today.is_empty());
    }
});
