//! Worker Pool
//!
//! `N` workers share the receiving end of the processing channel. Each one
//! pulls a request, drops it if its context is already cancelled, and
//! otherwise runs it against the store under the exclusive lock before
//! replying on the request's one-shot channel.
//!
//! The lock is held only for the store call itself, never across a channel
//! operation, so workers contend on it briefly and in parallel with the
//! sweeper.

use super::request::{DeleteRequest, GetRequest, Request, SetRequest};
use crate::stats::EngineCounters;
use crate::storage::{lock_store, SharedStore};
use crate::ttl::unix_now;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex, Notify};
use tracing::{debug, info, trace};

/// The processing channel's receiver, shared by every worker.
pub type SharedQueue = Arc<Mutex<mpsc::Receiver<Request>>>;

/// One member of the pool.
#[derive(Debug)]
pub struct Worker {
    id: usize,
    store: SharedStore,
    queue: SharedQueue,
    counters: Arc<EngineCounters>,
    sweeper_wake: Arc<Notify>,
}

impl Worker {
    pub fn new(
        id: usize,
        store: SharedStore,
        queue: SharedQueue,
        counters: Arc<EngineCounters>,
        sweeper_wake: Arc<Notify>,
    ) -> Self {
        Self {
            id,
            store,
            queue,
            counters,
            sweeper_wake,
        }
    }

    /// Drains the processing channel until shutdown or until it closes.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        trace!(worker = self.id, "Worker started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            let next = tokio::select! {
                next = async { self.queue.lock().await.recv().await } => next,
                _ = shutdown.changed() => break,
            };

            match next {
                Some(request) => self.process(request),
                None => break,
            }
        }

        debug!(worker = self.id, "Worker stopped");
    }

    /// Executes one request.
    pub fn process(&self, request: Request) {
        if request.ctx().is_cancelled() {
            self.counters.record_dropped();
            debug!(
                worker = self.id,
                kind = request.kind(),
                key = %request.key(),
                "Dropping cancelled request"
            );
            return;
        }

        match request {
            Request::Set(req) => self.set(req),
            Request::Get(req) => self.get(req),
            Request::Delete(req) => self.delete(req),
        }
    }

    fn set(&self, req: SetRequest) {
        let SetRequest {
            key,
            value,
            expires_at,
            done,
            ..
        } = req;

        info!(key = %key, value = ?value, expires_at, time = unix_now(), "set");

        let armed_next = {
            let mut store = lock_store(&self.store);
            store.set(key.clone(), value, expires_at);
            store
                .next_expiration()
                .is_some_and(|record| record.key == key)
        };

        // The sweeper may be sleeping towards a later deadline
        if armed_next {
            self.sweeper_wake.notify_one();
        }

        self.counters.record_set();
        let _ = done.send(());
    }

    fn get(&self, req: GetRequest) {
        let value = lock_store(&self.store).get(&req.key);
        self.counters.record_get();
        let _ = req.reply.send(value);
    }

    fn delete(&self, req: DeleteRequest) {
        let removed = lock_store(&self.store).delete(&req.key);
        info!(key = %req.key, removed, time = unix_now(), "delete");
        self.counters.record_delete();
        let _ = req.done.send(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::storage::Store;
    use bytes::Bytes;
    use std::time::Duration;

    fn worker() -> (Worker, SharedStore, Arc<EngineCounters>, Arc<Notify>) {
        let store: SharedStore = Arc::new(std::sync::Mutex::new(Store::new()));
        let (_tx, rx) = mpsc::channel(1);
        let counters = Arc::new(EngineCounters::new());
        let wake = Arc::new(Notify::new());
        let worker = Worker::new(
            0,
            Arc::clone(&store),
            Arc::new(Mutex::new(rx)),
            Arc::clone(&counters),
            Arc::clone(&wake),
        );
        (worker, store, counters, wake)
    }

    #[test]
    fn test_set_get_delete() {
        let (worker, store, counters, _wake) = worker();
        let ctx = Context::background();

        let (req, mut done) = SetRequest::new(ctx.clone(), "key", "value", unix_now() + 60);
        worker.process(req.into());
        assert!(done.try_recv().is_ok());

        let (req, mut reply) = GetRequest::new(ctx.clone(), "key");
        worker.process(req.into());
        assert_eq!(reply.try_recv().unwrap(), Some(Bytes::from("value")));

        let (req, mut done) = DeleteRequest::new(ctx.clone(), "key");
        worker.process(req.into());
        assert!(done.try_recv().is_ok());
        assert!(lock_store(&store).is_empty());

        let stats = counters.snapshot(0);
        assert_eq!((stats.sets, stats.gets, stats.deletes), (1, 1, 1));
    }

    #[test]
    fn test_cancelled_request_is_dropped_without_reply() {
        let (worker, store, counters, _wake) = worker();
        let (ctx, handle) = Context::with_cancel();
        handle.cancel();

        let (req, mut done) = SetRequest::new(ctx, "key", "value", unix_now() + 60);
        worker.process(req.into());

        // The sender was dropped without a reply and the store is untouched
        assert!(matches!(
            done.try_recv(),
            Err(tokio::sync::oneshot::error::TryRecvError::Closed)
        ));
        assert!(lock_store(&store).is_empty());
        assert_eq!(counters.snapshot(0).dropped, 1);
    }

    #[test]
    fn test_reply_to_departed_caller_does_not_block() {
        let (worker, store, _counters, _wake) = worker();

        let (req, done) = SetRequest::new(Context::background(), "key", "v", unix_now() + 60);
        drop(done);
        worker.process(req.into());

        assert_eq!(lock_store(&store).len(), 1);
    }

    #[tokio::test]
    async fn test_earliest_deadline_wakes_sweeper() {
        let (worker, _store, _counters, wake) = worker();
        let ctx = Context::background();

        worker.process(SetRequest::new(ctx.clone(), "soon", "v", unix_now() + 5).0.into());

        // A permit was stored for the sweeper
        tokio::time::timeout(Duration::from_millis(100), wake.notified())
            .await
            .expect("sweeper was not notified");

        // A later deadline does not change the tail, so no new permit
        worker.process(SetRequest::new(ctx, "later", "v", unix_now() + 500).0.into());
        assert!(
            tokio::time::timeout(Duration::from_millis(50), wake.notified())
                .await
                .is_err()
        );
    }
}
