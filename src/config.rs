//! Configuration management for dayahead
//!
//! This module handles loading, validation, and management of the application
//! configuration from YAML files. Only `region` and `currency` matter to the
//! price sensor itself; the remaining sections tune the feed and the host.

use crate::error::{DayAheadError, Result};
use chrono::{Duration, NaiveTime};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Default Nord Pool market data page serving the hourly price table
pub const DEFAULT_ENDPOINT: &str = "https://www.nordpoolgroup.com/api/marketdata/page/29";

/// Regional time of the daily fetch; after publication, before the hourly tick
pub const DEFAULT_FETCH_TIME: &str = "12:51";

/// Delay before retrying a failed fetch
pub const DEFAULT_RETRY_DELAY_SECONDS: u64 = 300;

const MAX_RETRY_DELAY_SECONDS: u64 = 86_400;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Config {
    /// Price area the prices are fetched for
    pub region: Region,

    /// Currency the prices are quoted in
    pub currency: Currency,

    /// Price feed endpoint and schedule
    pub feed: FeedConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Web server binding configuration
    pub web: WebConfig,
}

/// Day-ahead bidding zone as named by the price feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum Region {
    #[serde(rename = "AT")]
    At,
    #[serde(rename = "BE")]
    Be,
    Bergen,
    #[serde(rename = "DE-LU")]
    DeLu,
    #[serde(rename = "DK1")]
    Dk1,
    #[serde(rename = "DK2")]
    Dk2,
    #[serde(rename = "EE")]
    Ee,
    #[serde(rename = "FI")]
    Fi,
    #[serde(rename = "FR")]
    Fr,
    #[serde(rename = "Kr.sand")]
    Kristiansand,
    #[serde(rename = "LT")]
    Lt,
    #[serde(rename = "LV")]
    Lv,
    Molde,
    #[serde(rename = "NL")]
    Nl,
    Oslo,
    #[serde(rename = "SE1")]
    Se1,
    #[serde(rename = "SE2")]
    Se2,
    #[serde(rename = "SE3")]
    Se3,
    #[serde(rename = "SE4")]
    Se4,
    #[serde(rename = "SYS")]
    System,
    #[serde(rename = "Tr.heim")]
    Trondheim,
    #[serde(rename = "Tromsø")]
    Tromso,
}

impl Region {
    pub const ALL: [Region; 22] = [
        Region::At,
        Region::Be,
        Region::Bergen,
        Region::DeLu,
        Region::Dk1,
        Region::Dk2,
        Region::Ee,
        Region::Fi,
        Region::Fr,
        Region::Kristiansand,
        Region::Lt,
        Region::Lv,
        Region::Molde,
        Region::Nl,
        Region::Oslo,
        Region::Se1,
        Region::Se2,
        Region::Se3,
        Region::Se4,
        Region::System,
        Region::Trondheim,
        Region::Tromso,
    ];

    /// Name used as `entityName` in feed requests
    pub fn as_str(&self) -> &'static str {
        match self {
            Region::At => "AT",
            Region::Be => "BE",
            Region::Bergen => "Bergen",
            Region::DeLu => "DE-LU",
            Region::Dk1 => "DK1",
            Region::Dk2 => "DK2",
            Region::Ee => "EE",
            Region::Fi => "FI",
            Region::Fr => "FR",
            Region::Kristiansand => "Kr.sand",
            Region::Lt => "LT",
            Region::Lv => "LV",
            Region::Molde => "Molde",
            Region::Nl => "NL",
            Region::Oslo => "Oslo",
            Region::Se1 => "SE1",
            Region::Se2 => "SE2",
            Region::Se3 => "SE3",
            Region::Se4 => "SE4",
            Region::System => "SYS",
            Region::Trondheim => "Tr.heim",
            Region::Tromso => "Tromsø",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Quote currency of the price feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Dkk,
    Eur,
    Nok,
    Sek,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Dkk => "DKK",
            Currency::Eur => "EUR",
            Currency::Nok => "NOK",
            Currency::Sek => "SEK",
        }
    }

    /// Display label of the hundredth unit the sensor reports in
    pub fn minor_unit(&self) -> &'static str {
        match self {
            Currency::Dkk | Currency::Nok => "øre",
            Currency::Sek => "öre",
            Currency::Eur => "c",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Price feed configuration
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct FeedConfig {
    /// Base URL of the price table endpoint
    pub endpoint: String,

    /// Regional time of day (HH:MM) of the daily fetch
    pub fetch_time: String,

    /// Delay before retrying a failed fetch, in seconds
    pub retry_delay_seconds: u64,
}

impl FeedConfig {
    /// Parsed daily fetch time
    pub fn fetch_time_of_day(&self) -> Result<NaiveTime> {
        Ok(NaiveTime::parse_from_str(self.fetch_time.trim(), "%H:%M")?)
    }

    /// Retry delay, capped at one day
    pub fn retry_delay(&self) -> Duration {
        let secs = self.retry_delay_seconds.min(MAX_RETRY_DELAY_SECONDS);
        Duration::seconds(i64::try_from(secs).unwrap_or(0))
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Optional console-specific level
    pub console_level: Option<String>,

    /// Optional file-specific level
    pub file_level: Option<String>,

    /// Path to log file (its directory receives the rotated files)
    pub file: String,

    /// Number of rotated files to keep
    pub backup_count: u32,

    /// Whether to log to console
    pub console_output: bool,

    /// Whether to use JSON format
    pub json_format: bool,
}

/// Web server configuration
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct WebConfig {
    /// Serve the sensor API
    pub enabled: bool,

    /// Bind address
    pub host: String,

    /// TCP port
    pub port: u16,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            fetch_time: DEFAULT_FETCH_TIME.to_string(),
            retry_delay_seconds: DEFAULT_RETRY_DELAY_SECONDS,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            console_level: None,
            file_level: None,
            file: "/tmp/dayahead.log".to_string(),
            backup_count: 5,
            console_output: true,
            json_format: false,
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "127.0.0.1".to_string(),
            port: 8089,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            region: Region::Se3,
            currency: Currency::Sek,
            feed: FeedConfig::default(),
            logging: LoggingConfig::default(),
            web: WebConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from the first default location that exists
    pub fn load() -> Result<Self> {
        let default_paths = [
            "dayahead.yaml",
            "/data/dayahead.yaml",
            "/etc/dayahead/config.yaml",
        ];

        for path in &default_paths {
            if Path::new(path).exists() {
                return Self::from_file(path);
            }
        }

        Ok(Config::default())
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let endpoint = self.feed.endpoint.trim();
        if endpoint.is_empty() {
            return Err(DayAheadError::validation(
                "feed.endpoint",
                "Endpoint cannot be empty",
            ));
        }
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(DayAheadError::validation(
                "feed.endpoint",
                "Endpoint must be an http(s) URL",
            ));
        }

        if self.feed.fetch_time_of_day().is_err() {
            return Err(DayAheadError::validation(
                "feed.fetch_time",
                "Must be a time of day in HH:MM format",
            ));
        }

        if self.feed.retry_delay_seconds == 0
            || self.feed.retry_delay_seconds > MAX_RETRY_DELAY_SECONDS
        {
            return Err(DayAheadError::validation(
                "feed.retry_delay_seconds",
                "Must be between 1 and 86400",
            ));
        }

        if crate::logging::parse_log_level(&self.logging.level).is_err() {
            return Err(DayAheadError::validation(
                "logging.level",
                "Unknown log level",
            ));
        }

        if self.web.enabled && self.web.port == 0 {
            return Err(DayAheadError::validation(
                "web.port",
                "Port must be greater than 0",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.region, Region::Se3);
        assert_eq!(config.currency, Currency::Sek);
        assert_eq!(config.feed.fetch_time, "12:51");
        assert_eq!(config.feed.retry_delay_seconds, 300);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.feed.fetch_time = "25:00".to_string();
        assert!(config.validate().is_err());

        config = Config::default();
        config.feed.retry_delay_seconds = 0;
        assert!(config.validate().is_err());

        config = Config::default();
        config.feed.endpoint = "ftp://example.com".to_string();
        assert!(config.validate().is_err());

        config = Config::default();
        config.logging.level = "LOUD".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_region_names_match_feed() {
        assert_eq!(Region::ALL.len(), 22);
        for region in Region::ALL {
            let yaml = serde_yaml::to_string(&region).unwrap();
            assert_eq!(yaml.trim().trim_matches('\''), region.as_str());
        }
        let region: Region = serde_yaml::from_str("Tromsø").unwrap();
        assert_eq!(region, Region::Tromso);
        let region: Region = serde_yaml::from_str("DE-LU").unwrap();
        assert_eq!(region, Region::DeLu);
    }

    #[test]
    fn test_currency_minor_units() {
        assert_eq!(Currency::Dkk.minor_unit(), "øre");
        assert_eq!(Currency::Nok.minor_unit(), "øre");
        assert_eq!(Currency::Sek.minor_unit(), "öre");
        assert_eq!(Currency::Eur.minor_unit(), "c");
        let currency: Currency = serde_yaml::from_str("EUR").unwrap();
        assert_eq!(currency, Currency::Eur);
        assert!(serde_yaml::from_str::<Currency>("USD").is_err());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: Config = serde_yaml::from_str("region: DK1\ncurrency: DKK\n").unwrap();
        assert_eq!(config.region, Region::Dk1);
        assert_eq!(config.currency, Currency::Dkk);
        assert_eq!(config.feed.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(
            config.feed.fetch_time_of_day().unwrap(),
            NaiveTime::from_hms_opt(12, 51, 0).unwrap()
        );
    }
}
