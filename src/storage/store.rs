//! Key-Value Store with Expiration Index
//!
//! The raw data behind the engine: a `HashMap` from key to value plus the
//! [`ExpirationIndex`] that orders every live key by its deadline.
//!
//! ## Locking
//!
//! `Store` performs no synchronization of its own. The engine wraps it in a
//! single `Mutex` and every method here must be called while holding that
//! lock, so the map and the index are always updated together.
//!
//! ## Consistency
//!
//! Every key in the map has exactly one record in the index. Overwriting a key
//! removes its previous record before arming the new one, and deleting or
//! evicting a key removes both halves in the same call.

use super::index::{ExpirationIndex, ExpirationRecord};
use bytes::Bytes;
use std::collections::HashMap;

/// A stored value together with the deadline it was armed with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// The opaque payload
    pub value: Bytes,
    /// Absolute expiration time in Unix epoch seconds
    pub expires_at: i64,
}

/// What the sweeper should do next, as decided by [`Store::sweep_step`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SweepStep {
    /// Nothing is armed
    Idle,
    /// The soonest record is due at this epoch second
    WaitUntil(i64),
    /// This record was due and has been removed
    Evicted(ExpirationRecord),
}

/// Mapping plus expiration index. Not thread-safe on its own.
#[derive(Debug, Default)]
pub struct Store {
    data: HashMap<String, Entry>,
    index: ExpirationIndex,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites `key`.
    ///
    /// Returns `true` if the key was new, `false` if an existing entry was
    /// replaced. Either way the key ends up with exactly one index record.
    pub fn set(&mut self, key: String, value: Bytes, expires_at: i64) -> bool {
        let previous = self
            .data
            .insert(key.clone(), Entry { value, expires_at });

        if let Some(prev) = &previous {
            self.index.remove(&key, prev.expires_at);
        }
        self.index.insert(ExpirationRecord::new(key, expires_at));

        previous.is_none()
    }

    /// Looks up `key` without side effects.
    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.data.get(key).map(|entry| entry.value.clone())
    }

    /// Returns the full entry for `key`, including its deadline.
    pub fn get_entry(&self, key: &str) -> Option<&Entry> {
        self.data.get(key)
    }

    /// Removes `key` and its index record.
    ///
    /// Returns `false` if the key was not present.
    pub fn delete(&mut self, key: &str) -> bool {
        match self.data.remove(key) {
            Some(entry) => {
                self.index.remove(key, entry.expires_at);
                true
            }
            None => false,
        }
    }

    /// The record that expires soonest, if any.
    pub fn next_expiration(&self) -> Option<&ExpirationRecord> {
        self.index.peek()
    }

    /// Inspects the soonest record and evicts it if it is due at `now`.
    ///
    /// A record is due once `now >= expires_at`.
    pub fn sweep_step(&mut self, now: i64) -> SweepStep {
        match self.index.peek() {
            None => SweepStep::Idle,
            Some(record) if record.expires_at > now => SweepStep::WaitUntil(record.expires_at),
            Some(_) => match self.index.pop() {
                Some(record) => {
                    self.data.remove(&record.key);
                    SweepStep::Evicted(record)
                }
                None => SweepStep::Idle,
            },
        }
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of armed expiration records. Always equal to [`Store::len`].
    pub fn pending_expirations(&self) -> usize {
        self.index.len()
    }

    /// Iterates over live entries in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Entry)> {
        self.data.iter()
    }
}
