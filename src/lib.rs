//! # EmberKV - An In-Process TTL Key-Value Cache
//!
//! EmberKV is a concurrency-safe key/value cache where every entry carries an
//! absolute expiration time. Callers talk to it through a bounded
//! request/response channel protocol that sheds load instead of queueing
//! without limit.
//!
//! ## Features
//!
//! - **Admission Control**: Full queues reject immediately with
//!   [`CacheError::Overloaded`]
//! - **Worker Pool**: N workers execute requests in parallel under one store lock
//! - **Ordered Expiry**: The soonest deadline is always at hand, no scans
//! - **Cancellation**: Every call carries a [`Context`]; cancelled work is skipped
//! - **Graceful Shutdown**: Every background loop observes a shutdown signal
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                               EmberKV                                   │
//! │                                                                         │
//! │  ┌──────────────┐   set/get/delete   ┌────────────┐   processing        │
//! │  │ CacheService │──────channels─────>│ Dispatcher │──────channel──┐     │
//! │  └──────────────┘                    └────────────┘               │     │
//! │         ▲                                                         ▼     │
//! │         │ one-shot replies                           ┌──────────────┐   │
//! │         └────────────────────────────────────────────│ Worker pool  │   │
//! │                                                      └──────┬───────┘   │
//! │                                                             ▼           │
//! │                     ┌───────────────────────────────────────────────┐   │
//! │                     │ Mutex<Store>: HashMap + ExpirationIndex        │   │
//! │                     └───────────────────────────────────────────────┘   │
//! │                                                             ▲           │
//! │                                                    ┌────────┴───────┐   │
//! │                                                    │ ExpirySweeper  │   │
//! │                                                    └────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use emberkv::{CacheError, Context, Engine, EngineConfig};
//! use emberkv::ttl::expires_in;
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let engine = Engine::start(EngineConfig::default()).unwrap();
//! let cache = engine.service();
//! let ctx = Context::with_timeout(Duration::from_secs(10));
//!
//! cache.set(&ctx, "session", "token123", expires_in(Duration::from_secs(3600))).await.unwrap();
//! assert_eq!(cache.get(&ctx, "session").await.unwrap(), "token123");
//!
//! cache.delete(&ctx, "session").await.unwrap();
//! assert_eq!(cache.get(&ctx, "session").await, Err(CacheError::NotFound));
//!
//! engine.shutdown().await;
//! # });
//! ```
//!
//! ## Module Overview
//!
//! - [`storage`]: The store, its expiration index and the expiry sweeper
//! - [`engine`]: Engine lifecycle, request types, dispatcher and workers
//! - [`service`]: The client-facing façade
//! - [`context`]: Cancellation and deadlines
//! - [`commands`] / [`connection`]: The text protocol served by the binary
//!
//! ## Design Highlights
//!
//! ### Channels for Admission, a Lock for Correctness
//!
//! Requests reach the store through bounded channels, which decide whether
//! work is accepted. Several workers then run concurrently, so the store is
//! still guarded by a single exclusive lock covering both the map and the
//! expiration index.
//!
//! ### Lazy Expiry
//!
//! Keys are never removed before their deadline. Between the deadline and the
//! sweep a read may still return the old value.

pub mod commands;
pub mod config;
pub mod connection;
pub mod context;
pub mod engine;
pub mod error;
pub mod service;
pub mod stats;
pub mod storage;
pub mod ttl;

// Re-export commonly used types for convenience
pub use commands::CommandHandler;
pub use config::{ConfigError, EngineConfig};
pub use connection::{handle_connection, ConnectionStats};
pub use context::{CancelHandle, Context};
pub use engine::Engine;
pub use error::{CacheError, CacheResult};
pub use service::CacheService;
pub use stats::EngineStats;

/// The default port the bundled server listens on
pub const DEFAULT_PORT: u16 = 7878;

/// The default host the bundled server binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Version of EmberKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
