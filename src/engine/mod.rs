//! Cache Engine
//!
//! The [`Engine`] owns the store and every channel, and supervises the
//! background tasks that serve requests:
//!
//! ```text
//!  CacheService ──try_send──> set/get/delete inbound channels
//!                                         │
//!                                         ▼
//!                                    Dispatcher
//!                                         │
//!                                         ▼
//!                              bounded processing channel
//!                                         │
//!                       ┌─────────────────┼─────────────────┐
//!                       ▼                 ▼                 ▼
//!                   Worker 0          Worker 1   ...    Worker N-1
//!                       │                 │                 │
//!                       └────────> Mutex<Store> <───────────┘
//!                                         ▲
//!                                         │
//!                                   ExpirySweeper
//! ```
//!
//! Channels decide admission; the store lock decides correctness. Neither
//! replaces the other: many workers run requests in parallel, so the lock is
//! what serializes mutations of a single key.
//!
//! ## Example
//!
//! ```
//! use emberkv::{Context, Engine, EngineConfig};
//! use emberkv::ttl::expires_in;
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let engine = Engine::start(EngineConfig::default().with_worker_count(2)).unwrap();
//! let cache = engine.service();
//! let ctx = Context::background();
//!
//! cache.set(&ctx, "name", "Ariz", expires_in(Duration::from_secs(60))).await.unwrap();
//! assert_eq!(cache.get(&ctx, "name").await.unwrap(), "Ariz");
//!
//! engine.shutdown().await;
//! # });
//! ```

pub mod dispatcher;
pub mod request;
pub mod worker;

pub use request::{DeleteRequest, GetRequest, Request, SetRequest};

use crate::config::{ConfigError, EngineConfig};
use crate::service::CacheService;
use crate::stats::{EngineCounters, EngineStats};
use crate::storage::{lock_store, ExpiryConfig, ExpirySweeper, SharedStore, Store};
use dispatcher::{dispatch_loop, InboundReceivers};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, watch, Notify};
use tokio::task::JoinHandle;
use tracing::{info, info_span, warn, Instrument, Span};
use worker::Worker;

/// Sending ends of the inbound channels. Cloned into every [`CacheService`].
#[derive(Debug, Clone)]
pub struct InboundSenders {
    pub set: mpsc::Sender<SetRequest>,
    pub get: mpsc::Sender<GetRequest>,
    pub delete: mpsc::Sender<DeleteRequest>,
}

/// The running cache engine.
///
/// Created once with [`Engine::start`] and owned by whatever builds the
/// front end. Dropping it signals every background task to stop;
/// [`Engine::shutdown`] additionally waits for them.
pub struct Engine {
    store: SharedStore,
    counters: Arc<EngineCounters>,
    inbound: InboundSenders,
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
    span: Span,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("tasks", &self.tasks.len())
            .field("stats", &self.stats())
            .finish()
    }
}

impl Engine {
    /// Builds the engine and starts the dispatcher, the workers and the
    /// sweeper.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn start(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let span = info_span!("engine", service = %config.service_name);
        let store: SharedStore = Arc::new(Mutex::new(Store::new()));
        let counters = Arc::new(EngineCounters::new());
        let sweeper_wake = Arc::new(Notify::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let (set_tx, set_rx) = mpsc::channel(config.inbound_capacity);
        let (get_tx, get_rx) = mpsc::channel(config.inbound_capacity);
        let (delete_tx, delete_rx) = mpsc::channel(config.inbound_capacity);
        let (processing_tx, processing_rx) = mpsc::channel(config.processing_capacity);

        let mut tasks = Vec::with_capacity(config.worker_count + 2);

        let inbound = InboundReceivers {
            set: set_rx,
            get: get_rx,
            delete: delete_rx,
        };
        tasks.push(tokio::spawn(
            dispatch_loop(inbound, processing_tx, shutdown_rx.clone()).instrument(span.clone()),
        ));

        let queue = Arc::new(tokio::sync::Mutex::new(processing_rx));
        for id in 0..config.worker_count {
            let worker = Worker::new(
                id,
                Arc::clone(&store),
                Arc::clone(&queue),
                Arc::clone(&counters),
                Arc::clone(&sweeper_wake),
            );
            tasks.push(tokio::spawn(
                worker.run(shutdown_rx.clone()).instrument(span.clone()),
            ));
        }

        let sweeper = ExpirySweeper::new(
            Arc::clone(&store),
            ExpiryConfig {
                idle_interval: config.sweep_interval,
            },
            sweeper_wake,
            Arc::clone(&counters),
        );
        tasks.push(tokio::spawn(
            sweeper.run(shutdown_rx).instrument(span.clone()),
        ));

        span.in_scope(|| {
            info!(
                workers = config.worker_count,
                inbound_capacity = config.inbound_capacity,
                processing_capacity = config.processing_capacity,
                "Engine started"
            )
        });

        Ok(Self {
            store,
            counters,
            inbound: InboundSenders {
                set: set_tx,
                get: get_tx,
                delete: delete_tx,
            },
            shutdown_tx,
            tasks,
            span,
        })
    }

    /// A client handle for this engine.
    pub fn service(&self) -> CacheService {
        CacheService::new(self.inbound.clone(), Arc::clone(&self.counters))
    }

    /// Current statistics.
    pub fn stats(&self) -> EngineStats {
        let keys = lock_store(&self.store).len();
        self.counters.snapshot(keys)
    }

    /// Signals every background task to stop and waits for them.
    ///
    /// Requests still queued are dropped; their callers see
    /// [`CacheError::Overloaded`](crate::CacheError::Overloaded) and later
    /// calls are refused the same way.
    pub async fn shutdown(mut self) {
        self.shutdown_tx.send_replace(true);

        for task in std::mem::take(&mut self.tasks) {
            if let Err(e) = task.await {
                self.span
                    .in_scope(|| warn!(error = %e, "Engine task ended abnormally"));
            }
        }

        self.span.in_scope(|| info!("Engine stopped"));
    }

    #[cfg(test)]
    pub(crate) fn store(&self) -> &SharedStore {
        &self.store
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown_tx.send_replace(true);
    }
}
