//! Fetch/rollover event loop
//!
//! [`PriceService`] owns the sensor and is the only thing that mutates it.
//! Timers post [`Job`]s and the HTTP API posts [`ServiceCommand`]s; the service
//! handles them one at a time, reschedules the next fetch, and publishes an
//! [`EntitySnapshot`] after every change.

use crate::config::Config;
use crate::entity::{EntitySnapshot, SensorIdentity};
use crate::error::{FetchError, Result};
use crate::feed::{NordpoolClient, PriceFetcher};
use crate::logging::{LogContext, StructuredLogger, get_logger_with_context};
use crate::prices::DayAheadPrices;
use crate::scheduler::{Job, Scheduler};
use crate::sensor::PriceSensor;
use crate::time::{Clock, feed_date_string, next_daily_occurrence};
use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Where the fetch cycle currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    Uninitialized,
    FetchPending,
    FetchOk,
    FetchFailed,
}

/// When fetches happen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchSchedule {
    /// Regional time of the daily fetch
    pub fetch_time: NaiveTime,
    /// Delay before a failed fetch is retried
    pub retry_delay: Duration,
}

impl FetchSchedule {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            fetch_time: config.feed.fetch_time_of_day()?,
            retry_delay: config.feed.retry_delay(),
        })
    }
}

/// Requests from outside the event loop
#[derive(Debug)]
pub enum ServiceCommand {
    /// Tear the sensor down and start over with a new configuration
    Reload(Box<Config>),
}

/// Builds the price source for a configuration
pub type FetcherFactory = Arc<dyn Fn(&Config) -> Result<Arc<dyn PriceFetcher>> + Send + Sync>;

fn nordpool_factory() -> FetcherFactory {
    Arc::new(|config: &Config| {
        let client: Arc<dyn PriceFetcher> = Arc::new(NordpoolClient::from_config(config)?);
        Ok(client)
    })
}

fn service_logger(identity: &SensorIdentity) -> StructuredLogger {
    get_logger_with_context(
        LogContext::new("service")
            .with_region(identity.region.as_str())
            .with_field("currency", identity.currency.to_string()),
    )
}

pub struct PriceService {
    identity: SensorIdentity,
    fetcher: Arc<dyn PriceFetcher>,
    fetcher_factory: FetcherFactory,
    clock: Arc<dyn Clock>,
    schedule: FetchSchedule,
    sensor: PriceSensor,
    fetch_state: FetchState,
    /// Instant of the one fetch trigger currently armed
    pending_fetch: Option<DateTime<Utc>>,
    snapshot: watch::Sender<Arc<EntitySnapshot>>,
    commands_tx: mpsc::UnboundedSender<ServiceCommand>,
    commands_rx: mpsc::UnboundedReceiver<ServiceCommand>,
    logger: StructuredLogger,
}

impl PriceService {
    pub fn new(
        identity: SensorIdentity,
        fetcher: Arc<dyn PriceFetcher>,
        clock: Arc<dyn Clock>,
        schedule: FetchSchedule,
    ) -> Self {
        let (snapshot, _) = watch::channel(Arc::new(EntitySnapshot::initial(&identity)));
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let logger = service_logger(&identity);
        Self {
            identity,
            fetcher,
            fetcher_factory: nordpool_factory(),
            clock,
            schedule,
            sensor: PriceSensor::new(),
            fetch_state: FetchState::Uninitialized,
            pending_fetch: None,
            snapshot,
            commands_tx,
            commands_rx,
            logger,
        }
    }

    pub fn from_config(
        config: &Config,
        fetcher: Arc<dyn PriceFetcher>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        Ok(Self::new(
            SensorIdentity::from_config(config),
            fetcher,
            clock,
            FetchSchedule::from_config(config)?,
        ))
    }

    /// Replace how reloads build their price source
    pub fn with_fetcher_factory(mut self, factory: FetcherFactory) -> Self {
        self.fetcher_factory = factory;
        self
    }

    pub fn identity(&self) -> &SensorIdentity {
        &self.identity
    }

    pub fn sensor(&self) -> &PriceSensor {
        &self.sensor
    }

    pub fn fetch_state(&self) -> FetchState {
        self.fetch_state
    }

    /// Receiver that always holds the latest published snapshot
    pub fn subscribe(&self) -> watch::Receiver<Arc<EntitySnapshot>> {
        self.snapshot.subscribe()
    }

    pub fn command_sender(&self) -> mpsc::UnboundedSender<ServiceCommand> {
        self.commands_tx.clone()
    }

    /// Initial fetch, then the hourly tick
    pub async fn start(&mut self, scheduler: &mut dyn Scheduler) {
        self.logger.info("Starting day-ahead price sensor");
        self.run_fetch(scheduler).await;
        scheduler.every_hour(Job::HourlyTick);
    }

    pub async fn handle(&mut self, job: Job, scheduler: &mut dyn Scheduler) {
        match job {
            Job::Fetch => {
                if self.fetch_due() {
                    self.run_fetch(scheduler).await;
                } else {
                    self.logger.debug("Ignoring stale fetch trigger");
                }
            }
            Job::HourlyTick => self.hourly_tick(),
        }
    }

    pub async fn handle_command(&mut self, cmd: ServiceCommand, scheduler: &mut dyn Scheduler) {
        match cmd {
            ServiceCommand::Reload(config) => {
                if let Err(e) = self.reload(&config, scheduler).await {
                    self.logger.error(&format!("Reload rejected: {}", e));
                }
            }
        }
    }

    /// A fetch job only runs for the trigger armed last, and not before it is due
    fn fetch_due(&self) -> bool {
        self.pending_fetch
            .is_some_and(|at| self.clock.now_utc() >= at)
    }

    fn arm_fetch(&mut self, scheduler: &mut dyn Scheduler, at: DateTime<Utc>) {
        self.pending_fetch = Some(at);
        scheduler.at(at, Job::Fetch);
    }

    /// Fetch both series and arm the next fetch.
    ///
    /// Success arms the next daily fetch; any failure clears both series and
    /// arms a retry after the retry delay.
    pub async fn run_fetch(&mut self, scheduler: &mut dyn Scheduler) -> FetchState {
        self.fetch_state = FetchState::FetchPending;
        self.pending_fetch = None;
        let now = self.clock.regional_now();

        let result = match self.fetcher.fetch(now).await {
            Ok(prices) if prices.today.is_empty() => {
                Err(FetchError::no_data(feed_date_string(&now)))
            }
            other => other,
        };
        let now = self.clock.regional_now();

        match result {
            Ok(prices) => {
                self.sensor.replace_series(prices, &now);
                self.fetch_state = FetchState::FetchOk;
                let next = self.next_fetch_at(&now);
                self.logger
                    .info(&format!("Fetch succeeded; next fetch at {}", next));
                self.arm_fetch(scheduler, next);
            }
            Err(e) => {
                self.sensor.replace_series(DayAheadPrices::empty(), &now);
                self.fetch_state = FetchState::FetchFailed;
                let retry = now.with_timezone(&Utc) + self.schedule.retry_delay;
                self.logger.warn(&format!(
                    "Fetch failed ({}): {}; retrying at {}",
                    e.kind(),
                    e,
                    retry
                ));
                self.arm_fetch(scheduler, retry);
            }
        }

        self.publish();
        self.fetch_state
    }

    /// Roll over at the day boundary and recompute
    pub fn hourly_tick(&mut self) {
        let now = self.clock.regional_now();
        if self.sensor.rollover(&now) {
            self.logger.info("Rolled tomorrow's prices over to today");
        }
        self.logger.debug(&format!(
            "Hourly tick; current value {:?}",
            self.sensor.state().current_value
        ));
        self.publish();
    }

    /// Start over with `config`: new identity and price source, empty series,
    /// not available, and an immediate fetch.
    ///
    /// An invalid configuration leaves the running sensor untouched.
    pub async fn reload(
        &mut self,
        config: &Config,
        scheduler: &mut dyn Scheduler,
    ) -> Result<FetchState> {
        config.validate()?;
        let schedule = FetchSchedule::from_config(config)?;
        let fetcher = (self.fetcher_factory)(config)?;

        scheduler.cancel_pending();
        self.pending_fetch = None;
        self.identity = SensorIdentity::from_config(config);
        self.logger = service_logger(&self.identity);
        self.fetcher = fetcher;
        self.schedule = schedule;
        self.sensor = PriceSensor::new();
        self.fetch_state = FetchState::Uninitialized;
        self.logger.info(&format!(
            "Configuration reloaded; now {}",
            self.identity.unique_id()
        ));
        self.publish();

        Ok(self.run_fetch(scheduler).await)
    }

    /// Next daily fetch instant after `now`
    pub fn next_fetch_at<T: TimeZone>(&self, now: &DateTime<T>) -> DateTime<Utc> {
        next_daily_occurrence(now, self.schedule.fetch_time).with_timezone(&Utc)
    }

    fn publish(&self) {
        let snapshot = EntitySnapshot::build(&self.identity, &self.sensor);
        self.snapshot.send_replace(Arc::new(snapshot));
    }

    /// Run until the job channel closes
    pub async fn run<S: Scheduler>(mut self, mut scheduler: S, mut jobs: mpsc::UnboundedReceiver<Job>) {
        self.start(&mut scheduler).await;
        loop {
            tokio::select! {
                job = jobs.recv() => match job {
                    Some(job) => self.handle(job, &mut scheduler).await,
                    None => break,
                },
                Some(cmd) = self.commands_rx.recv() => {
                    self.handle_command(cmd, &mut scheduler).await;
                }
            }
        }
        self.logger.info("Job channel closed; sensor stopped");
    }
}
