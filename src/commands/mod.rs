//! Command Handler Module
//!
//! The text protocol spoken by the bundled server. It stands in for the
//! front end that normally sits in front of the cache: it validates input
//! (non-empty keys, well-formed TTLs) before anything reaches the engine and
//! turns relative TTLs into absolute deadlines.
//!
//! ## Architecture
//!
//! ```text
//! Client line
//!       │
//!       ▼
//! ┌─────────────────┐
//! │ Command::parse  │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ CommandHandler  │  (per-request timeout context)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │  CacheService   │
//! └─────────────────┘
//! ```

pub mod handler;

// Re-export the main command types
pub use handler::{Command, CommandError, CommandHandler, Reply, DEFAULT_REQUEST_TIMEOUT};
