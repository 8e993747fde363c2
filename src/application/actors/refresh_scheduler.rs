//! Refresh scheduler
//!
//! Owns the two periodic refresh loops as tokio tasks that do nothing but
//! send tick messages to the engine actor: the fast loop refreshes open
//! positions, account info, and robot performance; the slow loop refreshes
//! the signal ledger. The loops never touch shared state themselves, so a
//! hung broker call stalls one actor iteration and nothing else.
//!
//! `start` and `stop` are idempotent. `stop` aborts both tasks; it runs on
//! session teardown and on drop, so no timer survives logout.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::engine_actor::EngineMessage;

pub struct RefreshScheduler {
    engine: mpsc::Sender<EngineMessage>,
    fast_interval: Duration,
    slow_interval: Duration,
    tasks: Vec<JoinHandle<()>>,
}

impl RefreshScheduler {
    pub fn new(
        engine: mpsc::Sender<EngineMessage>,
        fast_interval: Duration,
        slow_interval: Duration,
    ) -> Self {
        Self {
            engine,
            fast_interval,
            slow_interval,
            tasks: Vec::new(),
        }
    }

    pub fn is_running(&self) -> bool {
        !self.tasks.is_empty()
    }

    /// Start both loops. No-op when already running.
    pub fn start(&mut self) {
        if self.is_running() {
            debug!("auto refresh already running");
            return;
        }
        self.tasks.push(Self::spawn_tick(
            self.engine.clone(),
            self.fast_interval,
            || EngineMessage::RefreshPositions,
        ));
        self.tasks.push(Self::spawn_tick(
            self.engine.clone(),
            self.slow_interval,
            || EngineMessage::RefreshSignals,
        ));
        info!(
            fast_ms = self.fast_interval.as_millis() as u64,
            slow_ms = self.slow_interval.as_millis() as u64,
            "auto refresh started"
        );
    }

    /// Stop both loops. No-op when already stopped; safe to call repeatedly.
    pub fn stop(&mut self) {
        if self.tasks.is_empty() {
            return;
        }
        for task in self.tasks.drain(..) {
            task.abort();
        }
        info!("auto refresh stopped");
    }

    fn spawn_tick(
        engine: mpsc::Sender<EngineMessage>,
        period: Duration,
        make: impl Fn() -> EngineMessage + Send + 'static,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                // Drop the tick when the mailbox is full; ticks coalesce and
                // a fresh one follows next period.
                match engine.try_send(make()) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {}
                    Err(mpsc::error::TrySendError::Closed(_)) => break,
                }
            }
        })
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
