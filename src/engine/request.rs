//! Typed requests carried through the engine's channels.
//!
//! Each request owns its parameters, the caller's [`Context`], and a one-shot
//! reply channel. A one-shot sender never blocks, so a worker can always
//! complete a request even if the caller has stopped listening.

use crate::context::Context;
use bytes::Bytes;
use tokio::sync::oneshot;

/// Insert or overwrite `key` with a deadline.
#[derive(Debug)]
pub struct SetRequest {
    pub ctx: Context,
    pub key: String,
    pub value: Bytes,
    /// Absolute expiration time in Unix epoch seconds
    pub expires_at: i64,
    pub(crate) done: oneshot::Sender<()>,
}

/// Look up `key`.
#[derive(Debug)]
pub struct GetRequest {
    pub ctx: Context,
    pub key: String,
    pub(crate) reply: oneshot::Sender<Option<Bytes>>,
}

/// Remove `key`.
#[derive(Debug)]
pub struct DeleteRequest {
    pub ctx: Context,
    pub key: String,
    pub(crate) done: oneshot::Sender<()>,
}

impl SetRequest {
    /// Builds a request and the receiver its completion arrives on.
    pub fn new(
        ctx: Context,
        key: impl Into<String>,
        value: impl Into<Bytes>,
        expires_at: i64,
    ) -> (Self, oneshot::Receiver<()>) {
        let (done, rx) = oneshot::channel();
        let request = Self {
            ctx,
            key: key.into(),
            value: value.into(),
            expires_at,
            done,
        };
        (request, rx)
    }
}

impl GetRequest {
    /// Builds a request and the receiver its value arrives on.
    pub fn new(ctx: Context, key: impl Into<String>) -> (Self, oneshot::Receiver<Option<Bytes>>) {
        let (reply, rx) = oneshot::channel();
        (
            Self {
                ctx,
                key: key.into(),
                reply,
            },
            rx,
        )
    }
}

impl DeleteRequest {
    /// Builds a request and the receiver its completion arrives on.
    pub fn new(ctx: Context, key: impl Into<String>) -> (Self, oneshot::Receiver<()>) {
        let (done, rx) = oneshot::channel();
        (
            Self {
                ctx,
                key: key.into(),
                done,
            },
            rx,
        )
    }
}

/// Any request, as it travels on the shared processing channel.
#[derive(Debug)]
pub enum Request {
    Set(SetRequest),
    Get(GetRequest),
    Delete(DeleteRequest),
}

impl Request {
    pub fn ctx(&self) -> &Context {
        match self {
            Request::Set(req) => &req.ctx,
            Request::Get(req) => &req.ctx,
            Request::Delete(req) => &req.ctx,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Request::Set(req) => &req.key,
            Request::Get(req) => &req.key,
            Request::Delete(req) => &req.key,
        }
    }

    /// Operation name, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Request::Set(_) => "set",
            Request::Get(_) => "get",
            Request::Delete(_) => "delete",
        }
    }
}

impl From<SetRequest> for Request {
    fn from(req: SetRequest) -> Self {
        Request::Set(req)
    }
}

impl From<GetRequest> for Request {
    fn from(req: GetRequest) -> Self {
        Request::Get(req)
    }
}

impl From<DeleteRequest> for Request {
    fn from(req: DeleteRequest) -> Self {
        Request::Delete(req)
    }
}
