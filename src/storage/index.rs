//! Expiration Index
//!
//! An ordered list of `(key, expires_at)` records kept sorted by descending
//! expiration time, so the record that expires soonest is always the last one.
//!
//! ```text
//!   index 0                                   tail
//!   ┌──────────┬──────────┬──────────┬──────────┐
//!   │ t = 900  │ t = 500  │ t = 500  │ t = 120  │  <- next to expire
//!   └──────────┴──────────┴──────────┴──────────┘
//! ```
//!
//! Peeking and popping the tail are O(1). Insertion finds its slot with a
//! binary search (O(log n) comparisons) and shifts the records after it.
//! Removing a specific key narrows the search to the run of records sharing
//! that key's expiration time, so it never scans the whole index.

/// A single pending expiration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpirationRecord {
    /// The key that expires
    pub key: String,
    /// Absolute expiration time in Unix epoch seconds
    pub expires_at: i64,
}

impl ExpirationRecord {
    pub fn new(key: impl Into<String>, expires_at: i64) -> Self {
        Self {
            key: key.into(),
            expires_at,
        }
    }
}

/// Records ordered by descending `expires_at`; the minimum lives at the tail.
#[derive(Debug, Default)]
pub struct ExpirationIndex {
    records: Vec<ExpirationRecord>,
}

impl ExpirationIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record at its sorted position.
    ///
    /// The search keeps moving right while the probed record does not expire
    /// before the new one, so a record tied with existing ones lands closest
    /// to the tail.
    pub fn insert(&mut self, record: ExpirationRecord) {
        let pos = self
            .records
            .partition_point(|r| r.expires_at >= record.expires_at);
        self.records.insert(pos, record);
    }

    /// Returns the record that expires soonest.
    #[inline]
    pub fn peek(&self) -> Option<&ExpirationRecord> {
        self.records.last()
    }

    /// Removes and returns the record that expires soonest.
    #[inline]
    pub fn pop(&mut self) -> Option<ExpirationRecord> {
        self.records.pop()
    }

    /// Removes the record for `key` that was armed for `expires_at`.
    ///
    /// Returns `false` if no such record exists.
    pub fn remove(&mut self, key: &str, expires_at: i64) -> bool {
        let start = self.records.partition_point(|r| r.expires_at > expires_at);
        let end = self.records.partition_point(|r| r.expires_at >= expires_at);

        match self.records[start..end].iter().position(|r| r.key == key) {
            Some(offset) => {
                self.records.remove(start + offset);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterates from the latest expiration to the soonest.
    pub fn iter(&self) -> impl Iterator<Item = &ExpirationRecord> {
        self.records.iter()
    }
}
