//! Timed job delivery
//!
//! Timers never touch sensor state. They only post a [`Job`] to the event
//! loop, which handles jobs one at a time in arrival order.

use crate::time::{Clock, next_top_of_hour};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Longest single sleep; wall-clock targets are re-checked after each one
const MAX_SLEEP: Duration = Duration::from_secs(60);

/// Work item delivered to the event loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Job {
    /// Fetch both series from the feed
    Fetch,
    /// Hourly rollover and recompute
    HourlyTick,
}

/// Arms one-shot and hourly triggers that post jobs to the event loop
pub trait Scheduler: Send {
    /// Deliver `job` once, at or after `instant`
    fn at(&mut self, instant: DateTime<Utc>, job: Job);

    /// Deliver `job` at every top of the hour
    fn every_hour(&mut self, job: Job);

    /// Drop every one-shot trigger that has not fired yet; hourly triggers stay
    fn cancel_pending(&mut self);
}

/// Scheduler backed by tokio timer tasks
pub struct TokioScheduler {
    tx: mpsc::UnboundedSender<Job>,
    clock: Arc<dyn Clock>,
    one_shots: Vec<JoinHandle<()>>,
    hourly: Vec<JoinHandle<()>>,
}

impl TokioScheduler {
    /// Scheduler plus the receiving end the event loop drains
    pub fn new(clock: Arc<dyn Clock>) -> (Self, mpsc::UnboundedReceiver<Job>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                clock,
                one_shots: Vec::new(),
                hourly: Vec::new(),
            },
            rx,
        )
    }

    /// Number of timer tasks still pending
    pub fn pending(&self) -> usize {
        self.one_shots
            .iter()
            .chain(self.hourly.iter())
            .filter(|t| !t.is_finished())
            .count()
    }

    /// Abort every timer task
    pub fn shutdown(&mut self) {
        self.cancel_pending();
        for task in self.hourly.drain(..) {
            task.abort();
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Sleep until `clock` reads at least `instant`
async fn sleep_until(clock: &dyn Clock, instant: DateTime<Utc>) {
    loop {
        let remaining = match (instant - clock.now_utc()).to_std() {
            Ok(d) if !d.is_zero() => d,
            _ => return,
        };
        tokio::time::sleep(remaining.min(MAX_SLEEP)).await;
    }
}

impl Scheduler for TokioScheduler {
    fn at(&mut self, instant: DateTime<Utc>, job: Job) {
        let tx = self.tx.clone();
        let clock = Arc::clone(&self.clock);
        let task = tokio::spawn(async move {
            sleep_until(clock.as_ref(), instant).await;
            let _ = tx.send(job);
        });
        self.one_shots.retain(|t| !t.is_finished());
        self.one_shots.push(task);
    }

    fn every_hour(&mut self, job: Job) {
        let tx = self.tx.clone();
        let clock = Arc::clone(&self.clock);
        let task = tokio::spawn(async move {
            loop {
                let next = next_top_of_hour(&clock.now_utc());
                sleep_until(clock.as_ref(), next).await;
                if tx.send(job).is_err() {
                    break;
                }
            }
        });
        self.hourly.push(task);
    }

    fn cancel_pending(&mut self) {
        for task in self.one_shots.drain(..) {
            task.abort();
        }
    }
}

/// Scheduler that only records what was armed, for driving the loop by hand
#[derive(Debug, Default)]
pub struct ManualScheduler {
    pub armed: Vec<(DateTime<Utc>, Job)>,
    pub hourly: Vec<Job>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Earliest armed one-shot trigger
    pub fn next_armed(&self) -> Option<(DateTime<Utc>, Job)> {
        self.armed.iter().min_by_key(|(at, _)| *at).copied()
    }

    /// Remove and return every one-shot job due at `now`, earliest first
    pub fn take_due(&mut self, now: DateTime<Utc>) -> Vec<Job> {
        let mut due: Vec<(DateTime<Utc>, Job)> = Vec::new();
        self.armed.retain(|entry| {
            if entry.0 <= now {
                due.push(*entry);
                false
            } else {
                true
            }
        });
        due.sort_by_key(|(at, _)| *at);
        due.into_iter().map(|(_, job)| job).collect()
    }
}

impl Scheduler for ManualScheduler {
    fn at(&mut self, instant: DateTime<Utc>, job: Job) {
        self.armed.push((instant, job));
    }

    fn every_hour(&mut self, job: Job) {
        self.hourly.push(job);
    }

    fn cancel_pending(&mut self) {
        self.armed.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::FixedClock;
    use chrono::TimeZone;

    #[test]
    fn manual_scheduler_releases_due_jobs_in_order() {
        let t0 = Utc.with_ymd_and_hms(2025, 6, 10, 10, 0, 0).unwrap();
        let mut sched = ManualScheduler::new();
        sched.at(t0 + chrono::Duration::hours(2), Job::Fetch);
        sched.at(t0 + chrono::Duration::hours(1), Job::HourlyTick);
        sched.every_hour(Job::HourlyTick);

        assert_eq!(
            sched.next_armed(),
            Some((t0 + chrono::Duration::hours(1), Job::HourlyTick))
        );
        assert!(sched.take_due(t0).is_empty());
        assert_eq!(
            sched.take_due(t0 + chrono::Duration::hours(3)),
            vec![Job::HourlyTick, Job::Fetch]
        );
        assert!(sched.armed.is_empty());
        assert_eq!(sched.hourly, vec![Job::HourlyTick]);

        sched.at(t0 + chrono::Duration::hours(4), Job::Fetch);
        sched.cancel_pending();
        assert!(sched.next_armed().is_none());
        assert_eq!(sched.hourly, vec![Job::HourlyTick]);
    }

    #[tokio::test]
    async fn past_instant_fires_immediately() {
        let now = Utc.with_ymd_and_hms(2025, 6, 10, 10, 0, 0).unwrap();
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(now));
        let (mut sched, mut rx) = TokioScheduler::new(clock);
        sched.at(now - chrono::Duration::seconds(1), Job::Fetch);
        assert_eq!(rx.recv().await, Some(Job::Fetch));
    }

    #[tokio::test]
    async fn shutdown_aborts_pending_timers() {
        let now = Utc.with_ymd_and_hms(2025, 6, 10, 10, 0, 0).unwrap();
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(now));
        let (mut sched, mut rx) = TokioScheduler::new(clock);
        sched.at(now + chrono::Duration::hours(1), Job::Fetch);
        sched.every_hour(Job::HourlyTick);
        assert_eq!(sched.pending(), 2);

        sched.cancel_pending();
        assert_eq!(sched.pending(), 1);

        sched.shutdown();
        assert_eq!(sched.pending(), 0);
        drop(sched);
        assert_eq!(rx.recv().await, None);
    }
}
