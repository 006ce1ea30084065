//! Background Expiry Sweeper
//!
//! A single long-lived task that removes entries once their deadline passes.
//! It never scans the store: the expiration index keeps the soonest deadline
//! at its tail, so each round only looks at one record.
//!
//! ## Loop
//!
//! ```text
//!          ┌──────────────────────────────┐
//!          │ lock store, look at the tail │
//!          └──────────────┬───────────────┘
//!        ┌────────────────┼─────────────────┐
//!        ▼                ▼                 ▼
//!   index empty      tail in future      tail due
//!        │                │                 │
//!   sleep idle       sleep until its    evict it, log,
//!   interval         deadline           go again at once
//! ```
//!
//! The lock is released before sleeping. A Set that arms an earlier deadline
//! than the one being slept on wakes the sweeper through a `Notify`, and a
//! shutdown signal ends the loop.
//!
//! Eviction is lazy: nothing is removed before its deadline, and a read in the
//! window between the deadline and the sweep may still see the old value.

use super::{lock_store, SharedStore, SweepStep};
use crate::stats::EngineCounters;
use crate::ttl::{duration_until, unix_now};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tracing::{debug, info, trace};

/// Configuration for the expiry sweeper.
#[derive(Debug, Clone)]
pub struct ExpiryConfig {
    /// How long to sleep when nothing is armed (default: 1s)
    pub idle_interval: Duration,
}

impl Default for ExpiryConfig {
    fn default() -> Self {
        Self {
            idle_interval: Duration::from_secs(1),
        }
    }
}

/// The sweeper task state.
#[derive(Debug)]
pub struct ExpirySweeper {
    store: SharedStore,
    config: ExpiryConfig,
    wake: Arc<Notify>,
    counters: Arc<EngineCounters>,
}

impl ExpirySweeper {
    pub fn new(
        store: SharedStore,
        config: ExpiryConfig,
        wake: Arc<Notify>,
        counters: Arc<EngineCounters>,
    ) -> Self {
        Self {
            store,
            config,
            wake,
            counters,
        }
    }

    /// Runs until `shutdown` turns `true` or its sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        debug!(
            idle_interval_ms = self.config.idle_interval.as_millis(),
            "Expiry sweeper running"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let step = lock_store(&self.store).sweep_step(unix_now());

            let pause = match step {
                SweepStep::Evicted(record) => {
                    self.counters.record_eviction();
                    info!(
                        key = %record.key,
                        expires_at = record.expires_at,
                        time = unix_now(),
                        "expired"
                    );
                    // Drain any further due records without sleeping
                    tokio::task::yield_now().await;
                    continue;
                }
                SweepStep::Idle => self.config.idle_interval,
                SweepStep::WaitUntil(at) => duration_until(at),
            };

            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                _ = self.wake.notified() => {
                    trace!("Expiry sweeper woken by an earlier deadline");
                }
                result = shutdown.changed() => {
                    if result.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        debug!("Expiry sweeper received shutdown signal");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Store;
    use bytes::Bytes;
    use std::sync::Mutex;

    fn start(
        store: &SharedStore,
        idle_interval: Duration,
    ) -> (
        Arc<Notify>,
        Arc<EngineCounters>,
        watch::Sender<bool>,
        tokio::task::JoinHandle<()>,
    ) {
        let wake = Arc::new(Notify::new());
        let counters = Arc::new(EngineCounters::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let sweeper = ExpirySweeper::new(
            Arc::clone(store),
            ExpiryConfig { idle_interval },
            Arc::clone(&wake),
            Arc::clone(&counters),
        );
        let handle = tokio::spawn(sweeper.run(shutdown_rx));
        (wake, counters, shutdown_tx, handle)
    }

    #[tokio::test]
    async fn test_sweeper_evicts_due_keys_only() {
        let store: SharedStore = Arc::new(Mutex::new(Store::new()));
        {
            let mut guard = lock_store(&store);
            for i in 0..10 {
                guard.set(format!("key{}", i), Bytes::from("value"), unix_now() - 1);
            }
            guard.set("persistent".into(), Bytes::from("value"), unix_now() + 3600);
        }

        let (_wake, counters, _shutdown, _handle) = start(&store, Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(200)).await;

        let guard = lock_store(&store);
        assert_eq!(guard.len(), 1);
        assert_eq!(guard.pending_expirations(), 1);
        assert!(guard.get("persistent").is_some());
        assert_eq!(counters.snapshot(guard.len()).evictions, 10);
    }

    #[tokio::test]
    async fn test_sweeper_picks_up_keys_armed_while_idle() {
        let store: SharedStore = Arc::new(Mutex::new(Store::new()));
        let (wake, _counters, _shutdown, _handle) = start(&store, Duration::from_secs(30));

        tokio::time::sleep(Duration::from_millis(50)).await;
        lock_store(&store).set("late".into(), Bytes::from("v"), unix_now() - 1);
        wake.notify_one();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(lock_store(&store).is_empty());
    }

    #[tokio::test]
    async fn test_sweeper_stops_on_shutdown() {
        let store: SharedStore = Arc::new(Mutex::new(Store::new()));
        let (_wake, _counters, shutdown, handle) = start(&store, Duration::from_secs(30));

        shutdown.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweeper did not stop")
            .unwrap();

        // Nothing sweeps once stopped
        lock_store(&store).set("key".into(), Bytes::from("v"), unix_now() - 1);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(lock_store(&store).len(), 1);
    }
}
