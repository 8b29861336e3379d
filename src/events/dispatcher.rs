//! The polling loop that turns due events into state changes.
//!
//! Each poll claims every due event in one transaction, then runs each
//! handler in its own transaction that re-checks the claim and marks the
//! event processed. A failing handler rolls back, its claim is released,
//! and the rest of the batch carries on.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use serde::Serialize;

use super::handlers::{self, HandlerContext};
use super::queue::Event;
use crate::clock::Clock;
use crate::error::{GameError, GameResult};
use crate::model::Timestamp;
use crate::notify::{Notifier, Outbox};
use crate::store::Store;

/// What a single poll did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PollReport {
    pub claimed: usize,
    pub processed: usize,
    /// Duplicates and stale events, marked processed without effect.
    pub skipped: usize,
    pub failed: usize,
}

/// How a single event ended.
enum Outcome {
    Processed,
    Skipped,
    /// Another worker took over the claim.
    Lost,
}

pub struct Dispatcher<S: Store> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
    worker: u64,
    lease: Duration,
    speed: f64,
    interval: StdDuration,
}

impl<S: Store> Dispatcher<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, notifier: Arc<dyn Notifier>, worker: u64) -> Self {
        Dispatcher {
            store,
            clock,
            notifier,
            worker,
            lease: Duration::minutes(5),
            speed: 1.0,
            interval: StdDuration::from_secs(1),
        }
    }

    pub fn with_lease(mut self, lease: Duration) -> Self {
        self.lease = lease;
        self
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_interval(mut self, interval: StdDuration) -> Self {
        self.interval = interval;
        self
    }

    pub fn worker(&self) -> u64 {
        self.worker
    }

    /// Claims and dispatches every event due now.
    ///
    /// Fails only if the claim itself cannot be stored.
    pub fn poll_once(&self) -> GameResult<PollReport> {
        let now = self.clock.now();
        let batch = self
            .store
            .transaction(|world| Ok(world.events.claim_due(now, self.worker, self.lease)))?;
        let mut report = PollReport {
            claimed: batch.len(),
            ..PollReport::default()
        };
        if batch.is_empty() {
            return Ok(report);
        }
        tracing::debug!(worker = self.worker, claimed = batch.len(), %now, "poll");

        for event in &batch {
            match self.dispatch(event, now) {
                Ok(Outcome::Processed) => report.processed += 1,
                Ok(Outcome::Skipped) => report.skipped += 1,
                Ok(Outcome::Lost) => {
                    tracing::warn!(event = event.id, worker = self.worker, "claim lost before dispatch");
                }
                Err(err) => {
                    report.failed += 1;
                    tracing::error!(
                        event = event.id,
                        kind = event.kind(),
                        village = event.village,
                        retryable = err.is_retryable(),
                        %err,
                        "event handler failed"
                    );
                    self.release(event);
                }
            }
        }
        Ok(report)
    }

    fn dispatch(&self, event: &Event, now: Timestamp) -> GameResult<Outcome> {
        let mut outbox = Outbox::new();
        let outcome = self.store.transaction(|world| {
            if !world.events.is_claimed_by(event.id, self.worker) {
                return Ok(Outcome::Lost);
            }
            let mut ctx = HandlerContext {
                now,
                speed: self.speed,
                outbox: &mut outbox,
            };
            let outcome = match handlers::handle(world, event, &mut ctx) {
                Ok(()) => Outcome::Processed,
                Err(GameError::InvariantViolation(reason)) => {
                    tracing::warn!(event = event.id, kind = event.kind(), %reason, "event skipped");
                    Outcome::Skipped
                }
                Err(err) => return Err(err),
            };
            world.events.mark_processed(event.id);
            Ok(outcome)
        })?;
        if matches!(outcome, Outcome::Processed) {
            tracing::debug!(event = event.id, kind = event.kind(), notifications = outbox.len(), "event processed");
            outbox.flush(self.notifier.as_ref());
        }
        Ok(outcome)
    }

    fn release(&self, event: &Event) {
        let released = self
            .store
            .transaction(|world| Ok(world.events.release(event.id, self.worker)));
        if let Err(err) = released {
            // The lease expires on its own.
            tracing::warn!(event = event.id, %err, "could not release claim");
        }
    }

    /// Polls once immediately, then every interval until `shutdown` is set.
    pub fn run(&self, shutdown: &AtomicBool) {
        tracing::info!(worker = self.worker, interval_ms = self.interval.as_millis() as u64, "dispatcher started");
        while !shutdown.load(Ordering::Relaxed) {
            match self.poll_once() {
                Ok(report) if report.claimed > 0 => {
                    tracing::info!(
                        processed = report.processed,
                        skipped = report.skipped,
                        failed = report.failed,
                        "poll complete"
                    );
                }
                Ok(_) => {}
                Err(err) => tracing::error!(%err, "poll failed"),
            }
            std::thread::sleep(self.interval);
        }
        tracing::info!(worker = self.worker, "dispatcher stopped");
    }
}
