//! Periodic maintenance loop.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::companion::Companion;

/// Handle to a running maintenance loop.
pub struct MaintenanceHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<u64>,
}

impl MaintenanceHandle {
    /// Stop the loop and wait for it. Returns the number of ticks run.
    pub async fn stop(self) -> u64 {
        let _ = self.stop.send(true);
        self.task.await.unwrap_or(0)
    }
}

/// Tick `companion` every `orchestration.tick_interval_secs` until stopped.
/// The first tick runs one full interval after start.
///
/// Must be called from within a tokio runtime.
pub fn spawn(companion: Arc<Companion>) -> MaintenanceHandle {
    let period = Duration::from_secs(companion.engine().config().orchestration.tick_interval_secs.max(1));
    let (stop, mut stopped) = watch::channel(false);

    let task = tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ticks = 0u64;
        loop {
            tokio::select! {
                changed = stopped.changed() => {
                    if changed.is_err() || *stopped.borrow() {
                        break;
                    }
                }
                _ = interval.tick() => {
                    ticks += 1;
                    let report = companion.tick(Utc::now());
                    debug!(
                        tick = ticks,
                        emotion_changes = report.emotion_changes,
                        evicted = report.evicted,
                        prolonged = report.prolonged.len(),
                        "maintenance tick"
                    );
                }
            }
        }
        companion.shutdown();
        info!(ticks, "maintenance loop stopped");
        ticks
    });

    MaintenanceHandle { stop, task }
}
