//! # dayahead - Nordic/Baltic day-ahead spot price sensor
//!
//! Fetches hourly day-ahead prices for one bidding zone and currency from the
//! Nord Pool market data feed, caches today's and tomorrow's series, and
//! publishes the price of the current hour with daily averages.
//!
//! ## Architecture
//!
//! - `config`: YAML configuration and validation
//! - `logging`: Structured logging and tracing
//! - `time`: Regional calendar helpers and the injectable clock
//! - `prices`: Hourly points and day series
//! - `feed`: Price feed client and table parsing
//! - `sensor`: Cached series and derived state
//! - `entity`: Published snapshot formatting
//! - `scheduler`: Timer tasks that post jobs to the event loop
//! - `service`: Fetch/rollover event loop
//! - `web`: HTTP API (feature `web`)

pub mod config;
pub mod entity;
pub mod error;
pub mod feed;
pub mod logging;
pub mod prices;
pub mod scheduler;
pub mod sensor;
pub mod service;
pub mod time;
#[cfg(feature = "web")]
pub mod web;

// Re-export commonly used types
pub use config::{Config, Currency, Region};
pub use entity::{EntitySnapshot, SensorIdentity};
pub use error::{DayAheadError, FetchError, Result};
pub use feed::{NordpoolClient, PriceFetcher};
pub use service::{FetchState, PriceService, ServiceCommand};
