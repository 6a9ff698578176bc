//! Runtime liveness polling.

use crate::commands;
use dockman_core::CommandRunner;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Fixed period between liveness probes.
pub const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Default)]
struct HealthInner {
    running: AtomicBool,
    probes: AtomicU64,
}

/// Process-wide daemon health flag. Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct HealthState {
    inner: Arc<HealthInner>,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Result of the most recent probe; false before the first one.
    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::Acquire)
    }

    /// Number of probes completed so far.
    pub fn probes(&self) -> u64 {
        self.inner.probes.load(Ordering::Acquire)
    }

    fn record(&self, running: bool) {
        let previous = self.inner.running.swap(running, Ordering::AcqRel);
        self.inner.probes.fetch_add(1, Ordering::AcqRel);
        if previous != running {
            info!(
                "Container runtime is {}",
                if running { "running" } else { "not running" }
            );
        }
    }
}

pub struct HealthPoller {
    runner: Arc<dyn CommandRunner>,
    state: HealthState,
}

impl HealthPoller {
    pub fn new(runner: Arc<dyn CommandRunner>, state: HealthState) -> Self {
        Self { runner, state }
    }

    pub fn state(&self) -> &HealthState {
        &self.state
    }

    /// Run one probe and record it. A failed probe simply reads as "not running".
    pub async fn tick(&self) -> bool {
        let runner = Arc::clone(&self.runner);
        let running = match tokio::task::spawn_blocking(move || {
            runner.run(&commands::daemon_info()).ok
        })
        .await
        {
            Ok(ok) => ok,
            Err(e) => {
                warn!("Liveness probe task failed: {}", e);
                false
            }
        };
        debug!("Liveness probe: {}", running);
        self.state.record(running);
        running
    }

    /// Start the poll loop. It runs for the life of the runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(HEALTH_POLL_INTERVAL);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(
                "Health poller running (checks every {} seconds)",
                HEALTH_POLL_INTERVAL.as_secs()
            );

            loop {
                ticker.tick().await;
                self.tick().await;
            }
        })
    }
}
