//! Request Dispatcher
//!
//! Fans the three typed inbound channels into the single processing channel.
//!
//! ```text
//!   set    ──┐
//!   get    ──┼──> dispatcher ──> processing channel ──> workers
//!   delete ──┘
//! ```
//!
//! Whichever inbound channel is ready gets picked; there is no fairness or
//! ordering across them. Because every request funnels through one bounded
//! channel, that channel's capacity limits admission for all operation kinds
//! together. When it is full the dispatcher stops pulling from the inbound
//! channels, they fill up in turn, and the façade starts rejecting.

use super::request::{DeleteRequest, GetRequest, Request, SetRequest};
use tokio::sync::{mpsc, watch};
use tracing::{debug, trace};

/// Receiving ends of the inbound channels.
#[derive(Debug)]
pub struct InboundReceivers {
    pub set: mpsc::Receiver<SetRequest>,
    pub get: mpsc::Receiver<GetRequest>,
    pub delete: mpsc::Receiver<DeleteRequest>,
}

/// Runs until shutdown, until every inbound channel is closed, or until the
/// workers are gone.
pub async fn dispatch_loop(
    mut inbound: InboundReceivers,
    processing: mpsc::Sender<Request>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        if *shutdown.borrow() {
            break;
        }

        let request = tokio::select! {
            Some(req) = inbound.set.recv() => Request::Set(req),
            Some(req) = inbound.get.recv() => Request::Get(req),
            Some(req) = inbound.delete.recv() => Request::Delete(req),
            _ = shutdown.changed() => break,
            else => break,
        };

        trace!(kind = request.kind(), key = %request.key(), "Routing request");

        // Waiting here is what pushes backpressure onto the inbound channels
        tokio::select! {
            result = processing.send(request) => {
                if result.is_err() {
                    break;
                }
            }
            _ = shutdown.changed() => break,
        }
    }

    debug!("Dispatcher stopped");
}
