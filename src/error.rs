//! Errors surfaced by the cache façade.

use thiserror::Error;

/// Outcome of a failed [`CacheService`](crate::CacheService) call.
///
/// The three variants call for different handling: retry later, give up, or
/// treat the key as absent.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CacheError {
    /// The request was not admitted because the engine's queues are full or
    /// the engine has stopped
    #[error("server overloaded, please try again in a few seconds")]
    Overloaded,

    /// The caller's context was cancelled before the request completed
    #[error("request cancelled")]
    Cancelled,

    /// The key is absent or has been evicted
    #[error("key not found")]
    NotFound,
}

impl CacheError {
    /// Whether retrying the same call later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CacheError::Overloaded)
    }
}

/// Result type returned by the cache façade.
pub type CacheResult<T> = Result<T, CacheError>;
