//! Storage Module
//!
//! The data half of the cache: the key/value [`Store`], its ordered
//! [`ExpirationIndex`], and the [`ExpirySweeper`] that evicts entries once
//! their deadline passes.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                Mutex<Store>  (one exclusive lock)           │
//! │  ┌──────────────────────────┐  ┌─────────────────────────┐  │
//! │  │ HashMap<String, Entry>   │  │ ExpirationIndex         │  │
//! │  │                          │  │ (soonest at the tail)   │  │
//! │  └──────────────────────────┘  └─────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//!          ▲                                  ▲
//!          │                                  │
//!   ┌──────┴───────┐                 ┌────────┴────────┐
//!   │ Worker pool  │                 │  ExpirySweeper  │
//!   └──────────────┘                 └─────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use emberkv::storage::{SweepStep, Store};
//! use bytes::Bytes;
//!
//! let mut store = Store::new();
//! store.set("session".to_string(), Bytes::from("token123"), 1_000);
//! assert_eq!(store.get("session"), Some(Bytes::from("token123")));
//!
//! // Not yet due at t=999, evicted at t=1000
//! assert_eq!(store.sweep_step(999), SweepStep::WaitUntil(1_000));
//! assert!(matches!(store.sweep_step(1_000), SweepStep::Evicted(_)));
//! assert!(store.is_empty());
//! ```

pub mod expiry;
pub mod index;
pub mod store;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

// Re-export commonly used types
pub use expiry::{ExpiryConfig, ExpirySweeper};
pub use index::{ExpirationIndex, ExpirationRecord};
pub use store::{Entry, Store, SweepStep};

/// The store behind the engine's single exclusive lock.
pub type SharedStore = Arc<Mutex<Store>>;

/// Acquires the store lock.
///
/// Every store operation completes its map and index updates before
/// returning, so a panic elsewhere cannot leave them half-applied and a
/// poisoned lock is safe to reuse.
pub fn lock_store(store: &Mutex<Store>) -> MutexGuard<'_, Store> {
    store.lock().unwrap_or_else(PoisonError::into_inner)
}
