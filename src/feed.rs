//! Day-ahead price feed client
//!
//! One GET against the Nord Pool market data page returns a table whose rows are
//! delivery hours and whose columns are named after calendar dates. The client
//! picks today's and tomorrow's columns out of the first 24 rows and turns them
//! into two anchored [`PriceSeries`](crate::prices::PriceSeries).

use crate::config::{Config, Currency, Region};
use crate::error::{FetchError, Result};
use crate::logging::{LogContext, StructuredLogger, get_logger_with_context};
use crate::prices::{DayAheadPrices, HOURS_PER_DAY, HourlyPricePoint};
use crate::time::{feed_date_string, next_regional_midnight, regional_midnight, to_regional};
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone};
use chrono_tz::Tz;
use reqwest::header::{ACCEPT, USER_AGENT};
use serde::Deserialize;

/// Feed values are per MWh in major units; the sensor reports minor units per kWh
const FEED_UNIT_DIVISOR: f64 = 10.0;

#[derive(Debug, Deserialize)]
pub struct FeedResponse {
    pub data: FeedData,
}

#[derive(Debug, Deserialize)]
pub struct FeedData {
    #[serde(rename = "Rows")]
    pub rows: Vec<FeedRow>,
}

#[derive(Debug, Deserialize)]
pub struct FeedRow {
    #[serde(rename = "Columns")]
    pub columns: Vec<FeedColumn>,
}

#[derive(Debug, Deserialize)]
pub struct FeedColumn {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Value")]
    pub value: Option<String>,
}

/// Parse a feed cell such as `"1 234,56"` into minor units per kWh
pub fn parse_value(text: &str) -> std::result::Result<f64, FetchError> {
    let normalized: String = text
        .chars()
        .filter(|c| *c != ' ' && *c != '\u{a0}')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    let raw: f64 = normalized
        .parse()
        .map_err(|_| FetchError::parse(format!("invalid price value '{}'", text)))?;
    if !raw.is_finite() {
        return Err(FetchError::parse(format!("invalid price value '{}'", text)));
    }
    Ok(raw / FEED_UNIT_DIVISOR)
}

/// Reshape a feed table into today's and tomorrow's series as seen at `now`.
///
/// Only the first 24 rows are read. Any unparseable matching cell fails the
/// whole table; a table without a single cell for today is [`FetchError::NoData`].
pub fn build_series<T: TimeZone>(
    response: &FeedResponse,
    now: &DateTime<T>,
) -> std::result::Result<DayAheadPrices, FetchError> {
    let now = to_regional(now);
    let today_midnight = regional_midnight(&now);
    let tomorrow_midnight = next_regional_midnight(&now);
    let today_str = feed_date_string(&now);
    let tomorrow_str = feed_date_string(&tomorrow_midnight);

    let mut today = Vec::with_capacity(HOURS_PER_DAY);
    let mut tomorrow = Vec::with_capacity(HOURS_PER_DAY);

    for (i, row) in response.data.rows.iter().take(HOURS_PER_DAY).enumerate() {
        let offset = Duration::hours(i64::try_from(i).unwrap_or_default());
        for column in &row.columns {
            if column.name == today_str {
                today.push(point_from_column(column, today_midnight + offset)?);
            } else if column.name == tomorrow_str {
                tomorrow.push(point_from_column(column, tomorrow_midnight + offset)?);
            }
        }
    }

    if today.is_empty() {
        return Err(FetchError::no_data(today_str));
    }

    Ok(DayAheadPrices::new(
        today.into_iter().collect(),
        tomorrow.into_iter().collect(),
    ))
}

fn point_from_column(
    column: &FeedColumn,
    start: DateTime<Tz>,
) -> std::result::Result<HourlyPricePoint, FetchError> {
    let text = column
        .value
        .as_deref()
        .ok_or_else(|| FetchError::parse(format!("column {} has no value", column.name)))?;
    Ok(HourlyPricePoint::new(start, parse_value(text)?))
}

/// Source of day-ahead prices
#[async_trait]
pub trait PriceFetcher: Send + Sync {
    /// Fetch today's and tomorrow's prices as seen at `now`
    async fn fetch(&self, now: DateTime<Tz>) -> std::result::Result<DayAheadPrices, FetchError>;
}

/// HTTP client for the Nord Pool market data page
#[derive(Debug, Clone)]
pub struct NordpoolClient {
    http: reqwest::Client,
    endpoint: String,
    region: Region,
    currency: Currency,
    logger: StructuredLogger,
}

impl NordpoolClient {
    pub fn new(endpoint: &str, region: Region, currency: Currency) -> Result<Self> {
        let http = reqwest::Client::builder().build()?;
        let logger = get_logger_with_context(
            LogContext::new("feed")
                .with_region(region.as_str())
                .with_field("currency", currency.to_string()),
        );
        Ok(Self {
            http,
            endpoint: endpoint.trim().to_string(),
            region,
            currency,
            logger,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.feed.endpoint, config.region, config.currency)
    }

    async fn get_table(&self, end_date: &str) -> std::result::Result<FeedResponse, FetchError> {
        let resp = self
            .http
            .get(&self.endpoint)
            .query(&[
                ("currency", self.currency.as_str()),
                ("endDate", end_date),
                ("entityName", self.region.as_str()),
            ])
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, concat!("dayahead/", env!("APP_VERSION")))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::transport(format!("HTTP {}", status)));
        }

        let body = resp.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl PriceFetcher for NordpoolClient {
    async fn fetch(&self, now: DateTime<Tz>) -> std::result::Result<DayAheadPrices, FetchError> {
        let end_date = feed_date_string(&next_regional_midnight(&now));
        self.logger
            .debug(&format!("Fetching day-ahead prices, endDate={}", end_date));

        let table = self.get_table(&end_date).await?;
        let prices = build_series(&table, &now)?;

        self.logger.info(&format!(
            "Fetched {} prices for today and {} for tomorrow",
            prices.today.len(),
            prices.tomorrow.len()
        ));
        Ok(prices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::localize;
    use chrono::NaiveDate;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Tz> {
        localize(
            NaiveDate::from_ymd_opt(y, m, d)
                .unwrap()
                .and_hms_opt(h, 0, 0)
                .unwrap(),
        )
    }

    fn table(rows: usize, columns: &[(&str, &str)]) -> FeedResponse {
        FeedResponse {
            data: FeedData {
                rows: (0..rows)
                    .map(|_| FeedRow {
                        columns: columns
                            .iter()
                            .map(|(name, value)| FeedColumn {
                                name: (*name).to_string(),
                                value: Some((*value).to_string()),
                            })
                            .collect(),
                    })
                    .collect(),
            },
        }
    }

    #[test]
    fn parse_value_handles_separators() {
        assert!(close(parse_value("1 234,56").unwrap(), 123.456));
        assert!(close(parse_value("432,10").unwrap(), 43.21));
        assert!(close(parse_value("-12,5").unwrap(), -1.25));
        assert!(close(parse_value("1\u{a0}000,00").unwrap(), 100.0));
    }

    #[test]
    fn parse_value_rejects_garbage() {
        assert!(matches!(parse_value("-"), Err(FetchError::Parse { .. })));
        assert!(matches!(parse_value(""), Err(FetchError::Parse { .. })));
        assert!(matches!(parse_value("NaN"), Err(FetchError::Parse { .. })));
    }

    #[test]
    fn build_series_splits_today_and_tomorrow() {
        let now = at(2025, 6, 10, 13);
        let resp = table(24, &[("10-06-2025", "100,0"), ("11-06-2025", "200,0")]);
        let prices = build_series(&resp, &now).unwrap();

        assert_eq!(prices.today.len(), 24);
        assert_eq!(prices.tomorrow.len(), 24);
        assert!(prices.today.is_contiguous());
        assert!(prices.tomorrow.is_contiguous());
        assert_eq!(prices.today.first().unwrap().start(), at(2025, 6, 10, 0));
        assert_eq!(prices.tomorrow.first().unwrap().start(), at(2025, 6, 11, 0));
        assert_eq!(prices.today.last_end(), prices.tomorrow.first().map(|p| p.start()));
        assert!(close(prices.today.average(), 10.0));
        assert!(close(prices.tomorrow.average(), 20.0));
    }

    #[test]
    fn build_series_ignores_extra_rows_and_columns() {
        let now = at(2025, 6, 10, 8);
        let resp = table(
            26,
            &[("09-06-2025", "1,0"), ("10-06-2025", "5,0"), ("Max", "x")],
        );
        let prices = build_series(&resp, &now).unwrap();
        assert_eq!(prices.today.len(), 24);
        assert!(prices.tomorrow.is_empty());
    }

    #[test]
    fn build_series_without_today_is_no_data() {
        let now = at(2025, 6, 10, 8);
        let resp = table(24, &[("01-01-2020", "5,0")]);
        assert!(matches!(
            build_series(&resp, &now),
            Err(FetchError::NoData { .. })
        ));
    }

    #[test]
    fn build_series_discards_partial_results() {
        let now = at(2025, 6, 10, 8);
        let mut resp = table(24, &[("10-06-2025", "5,0")]);
        resp.data.rows[12].columns[0].value = Some("n/a".to_string());
        assert!(matches!(
            build_series(&resp, &now),
            Err(FetchError::Parse { .. })
        ));

        resp.data.rows[12].columns[0].value = None;
        assert!(matches!(
            build_series(&resp, &now),
            Err(FetchError::Parse { .. })
        ));
    }

    #[test]
    fn build_series_on_short_day_keeps_calendar_anchor() {
        // 2025-03-30 has 23 hours; tomorrow still starts at regional midnight
        let now = at(2025, 3, 30, 14);
        let resp = table(24, &[("30-03-2025", "1,0"), ("31-03-2025", "2,0")]);
        let prices = build_series(&resp, &now).unwrap();
        assert_eq!(prices.tomorrow.first().unwrap().start(), at(2025, 3, 31, 0));
    }

    #[test]
    fn build_series_late_evening_before_short_day() {
        let now = localize(
            NaiveDate::from_ymd_opt(2025, 3, 29)
                .unwrap()
                .and_hms_opt(23, 30, 0)
                .unwrap(),
        );
        let resp = table(24, &[("29-03-2025", "1,0"), ("30-03-2025", "2,0")]);
        let prices = build_series(&resp, &now).unwrap();
        assert_eq!(prices.today.len(), 24);
        assert_eq!(prices.tomorrow.len(), 24);
        assert_eq!(prices.tomorrow.first().unwrap().start(), at(2025, 3, 30, 0));
        assert!(close(prices.tomorrow.average(), 0.2));
    }

    #[test]
    fn deserializes_feed_shape() {
        let body = r#"{"data":{"Rows":[{"Columns":[{"Name":"10-06-2025","Value":"1 234,56","Index":0}],"IsExtraRow":false}],"Units":["SEK/MWh"]}}"#;
        let resp: FeedResponse = serde_json::from_str(body).unwrap();
        assert_eq!(resp.data.rows.len(), 1);
        assert_eq!(resp.data.rows[0].columns[0].name, "10-06-2025");
    }
}
