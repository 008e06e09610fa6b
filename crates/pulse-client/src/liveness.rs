//! Liveness monitor: keep-alive ticker and idle watchdog.
//!
//! Both timers exist only while a connection is open. The monitor does not
//! act on its own; the connection task awaits [`LivenessMonitor::tick`] and
//! decides what a tick means (send `ping`, close when idle).

use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};

use crate::config::LivenessConfig;

/// A liveness timer fired.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LivenessTick {
    /// Time to send a keep-alive.
    KeepAlive,
    /// Time to check for inactivity.
    IdleCheck,
}

struct Timers {
    keepalive: Interval,
    idle_check: Interval,
}

/// Keep-alive and idle state for the current connection.
pub struct LivenessMonitor {
    config: LivenessConfig,
    timers: Option<Timers>,
    last_activity: Instant,
}

impl LivenessMonitor {
    /// Stopped monitor.
    pub fn new(config: LivenessConfig) -> Self {
        Self {
            config,
            timers: None,
            last_activity: Instant::now(),
        }
    }

    /// Start both timers and count "now" as activity. Restarts if running.
    pub fn start(&mut self) {
        let now = Instant::now();
        self.last_activity = now;
        self.timers = Some(Timers {
            keepalive: ticker(now, self.config.keepalive_interval),
            idle_check: ticker(now, self.config.idle_check_interval),
        });
    }

    /// Drop both timers.
    pub fn stop(&mut self) {
        self.timers = None;
    }

    /// Whether timers are armed.
    pub fn is_running(&self) -> bool {
        self.timers.is_some()
    }

    /// Record inbound or outbound activity.
    pub fn record_activity(&mut self) {
        self.last_activity = Instant::now();
    }

    /// Time since the last recorded activity.
    pub fn idle_for(&self) -> Duration {
        self.last_activity.elapsed()
    }

    /// Whether inactivity has reached the threshold.
    pub fn is_idle(&self) -> bool {
        self.idle_for() >= self.config.idle_timeout
    }

    /// Wait for the next timer. Never resolves while stopped.
    ///
    /// Cancel-safe: dropping the future loses no ticks.
    pub async fn tick(&mut self) -> LivenessTick {
        match self.timers.as_mut() {
            Some(timers) => {
                tokio::select! {
                    biased;
                    _ = timers.keepalive.tick() => LivenessTick::KeepAlive,
                    _ = timers.idle_check.tick() => LivenessTick::IdleCheck,
                }
            }
            None => std::future::pending().await,
        }
    }
}

fn ticker(now: Instant, period: Duration) -> Interval {
    let mut interval = interval_at(now + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}
