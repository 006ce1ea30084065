//! Cache Service Façade
//!
//! The client-facing entry point. Each call:
//!
//! 1. refuses immediately if the caller's context is already cancelled,
//! 2. tries to enqueue without waiting, failing with
//!    [`CacheError::Overloaded`] if the inbound channel is full,
//! 3. waits for the worker's reply or for cancellation, whichever comes
//!    first.
//!
//! A caller that gives up leaves its request in flight. The worker may still
//! run it; the reply lands in a one-shot channel that nobody reads.

use crate::context::Context;
use crate::engine::{DeleteRequest, GetRequest, InboundSenders, SetRequest};
use crate::error::{CacheError, CacheResult};
use crate::stats::EngineCounters;
use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::warn;

/// Cloneable client handle, obtained from [`Engine::service`](crate::Engine::service).
#[derive(Debug, Clone)]
pub struct CacheService {
    inbound: InboundSenders,
    counters: Arc<EngineCounters>,
}

impl CacheService {
    pub(crate) fn new(inbound: InboundSenders, counters: Arc<EngineCounters>) -> Self {
        Self { inbound, counters }
    }

    /// Stores `value` under `key` until `expires_at` (Unix epoch seconds).
    ///
    /// A deadline in the past is accepted; the sweeper evicts the key on its
    /// next round.
    pub async fn set(
        &self,
        ctx: &Context,
        key: impl Into<String>,
        value: impl Into<Bytes>,
        expires_at: i64,
    ) -> CacheResult<()> {
        self.check_cancelled(ctx)?;
        let (request, done) = SetRequest::new(ctx.clone(), key, value, expires_at);
        self.admit(&self.inbound.set, request)?;
        self.wait(ctx, done).await
    }

    /// Returns the value stored under `key`.
    ///
    /// A key whose deadline passed but has not been swept yet is still
    /// returned.
    pub async fn get(&self, ctx: &Context, key: impl Into<String>) -> CacheResult<Bytes> {
        self.check_cancelled(ctx)?;
        let (request, reply) = GetRequest::new(ctx.clone(), key);
        self.admit(&self.inbound.get, request)?;
        self.wait(ctx, reply).await?.ok_or(CacheError::NotFound)
    }

    /// Removes `key`. Removing an absent key succeeds.
    pub async fn delete(&self, ctx: &Context, key: impl Into<String>) -> CacheResult<()> {
        self.check_cancelled(ctx)?;
        let (request, done) = DeleteRequest::new(ctx.clone(), key);
        self.admit(&self.inbound.delete, request)?;
        self.wait(ctx, done).await
    }

    fn check_cancelled(&self, ctx: &Context) -> CacheResult<()> {
        if ctx.is_cancelled() {
            self.counters.record_cancelled();
            return Err(CacheError::Cancelled);
        }
        Ok(())
    }

    /// Non-blocking enqueue.
    fn admit<T>(&self, channel: &mpsc::Sender<T>, request: T) -> CacheResult<()> {
        match channel.try_send(request) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.counters.record_rejected();
                warn!("Request rejected, inbound channel full");
                Err(CacheError::Overloaded)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.counters.record_rejected();
                warn!("Request rejected, engine stopped");
                Err(CacheError::Overloaded)
            }
        }
    }

    async fn wait<T>(&self, ctx: &Context, reply: oneshot::Receiver<T>) -> CacheResult<T> {
        tokio::select! {
            biased;
            result = reply => match result {
                Ok(value) => Ok(value),
                // A worker only drops a request unanswered if it was cancelled
                Err(_) if ctx.is_cancelled() => {
                    self.counters.record_cancelled();
                    Err(CacheError::Cancelled)
                }
                // Otherwise the engine shut down with it still queued
                Err(_) => Err(CacheError::Overloaded),
            },
            _ = ctx.cancelled() => {
                self.counters.record_cancelled();
                Err(CacheError::Cancelled)
            }
        }
    }
}
