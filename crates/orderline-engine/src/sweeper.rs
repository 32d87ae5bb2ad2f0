//! # Lock Sweeper
//!
//! Background task that periodically evicts expired locks.
//!
//! Correctness never depends on this task: `acquire` evicts stale locks on
//! its own. The sweep only keeps the table from accumulating entries for
//! entities nobody touches again.
//!
//! ```text
//! ┌──────────────┐  tick every sweep_interval   ┌──────────────────────┐
//! │ LockSweeper  │ ───────────────────────────► │ cleanup_expired_locks│
//! │   .run()     │                              └──────────────────────┘
//! │              │ ◄── LockSweeperHandle::shutdown()
//! └──────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::error::{EngineError, EngineResult};
use crate::lock::LockManager;

/// Periodic expired-lock sweep.
pub struct LockSweeper {
    locks: Arc<LockManager>,
    interval: Duration,
    shutdown_rx: mpsc::Receiver<()>,
}

/// Handle for stopping a running sweeper.
#[derive(Clone)]
pub struct LockSweeperHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl LockSweeperHandle {
    /// Triggers graceful shutdown.
    pub async fn shutdown(&self) -> EngineResult<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| EngineError::Processing("Sweeper already stopped".into()))
    }
}

impl LockSweeper {
    /// Creates a sweeper and its handle.
    pub fn new(locks: Arc<LockManager>, interval: Duration) -> (Self, LockSweeperHandle) {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let sweeper = LockSweeper {
            locks,
            interval,
            shutdown_rx,
        };
        (sweeper, LockSweeperHandle { shutdown_tx })
    }

    /// Runs the sweep loop.
    ///
    /// This should be spawned as a background task.
    pub async fn run(mut self) {
        info!(interval = ?self.interval, "Lock sweeper starting");

        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let evicted = self.locks.cleanup_expired_locks();
                    if evicted > 0 {
                        debug!(evicted, "Sweep evicted expired locks");
                    }
                }

                _ = self.shutdown_rx.recv() => {
                    info!("Lock sweeper shutting down");
                    break;
                }
            }
        }

        info!("Lock sweeper stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::Utc;

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_evicts_and_stops() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let locks = Arc::new(LockManager::with_clock(
            Duration::from_secs(30),
            clock.clone(),
        ));
        locks.acquire("order1", None).unwrap();
        locks.acquire("order2", None).unwrap();

        let (sweeper, handle) = LockSweeper::new(locks.clone(), Duration::from_secs(1));
        let task = tokio::spawn(sweeper.run());

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(locks.active_locks(), 2);

        clock.advance(chrono::Duration::seconds(31));
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(locks.cleanup_expired_locks(), 0, "sweeper already evicted");

        handle.shutdown().await.unwrap();
        task.await.unwrap();
    }
}
