//! Command Handler
//!
//! Parses one line of the text protocol, runs it through the
//! [`CacheService`], and renders the reply.
//!
//! ## Commands
//!
//! - `SET key ttl-seconds value...` - Store a value; the rest of the line is the value
//! - `GET key` - Fetch a value
//! - `DEL key` - Remove a key (succeeds if absent)
//! - `PING` - Liveness check
//!
//! ## Replies
//!
//! ```text
//! OK
//! PONG
//! VALUE <value>
//! ERR <message>
//! ```
//!
//! Every request runs under a [`Context`] that expires after the configured
//! request timeout, so a stalled engine answers `ERR timeout` instead of
//! hanging the connection.

use crate::context::Context;
use crate::error::CacheError;
use crate::service::CacheService;
use crate::ttl::expires_in;
use bytes::{BufMut, Bytes, BytesMut};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Default per-request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// A parsed protocol command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Set {
        key: String,
        ttl: Duration,
        value: Bytes,
    },
    Get {
        key: String,
    },
    Del {
        key: String,
    },
    Ping,
}

/// Reasons a line is not a valid command.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,

    #[error("unknown command '{0}'")]
    Unknown(String),

    #[error("wrong number of arguments for '{0}'")]
    WrongArity(&'static str),

    #[error("invalid ttl '{0}'")]
    InvalidTtl(String),
}

impl Command {
    /// Parses a single line, without its trailing newline.
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let line = line.trim_start();
        let (name, rest) = split_word(line);
        if name.is_empty() {
            return Err(CommandError::Empty);
        }

        match name.to_ascii_uppercase().as_str() {
            "SET" => {
                let (key, rest) = split_word(rest);
                let (ttl, value) = split_word(rest);
                if key.is_empty() || ttl.is_empty() || value.is_empty() {
                    return Err(CommandError::WrongArity("SET"));
                }
                let secs: u64 = ttl
                    .parse()
                    .map_err(|_| CommandError::InvalidTtl(ttl.to_string()))?;
                Ok(Command::Set {
                    key: key.to_string(),
                    ttl: Duration::from_secs(secs),
                    value: Bytes::copy_from_slice(value.as_bytes()),
                })
            }
            "GET" => Ok(Command::Get {
                key: single_key(rest, "GET")?,
            }),
            "DEL" => Ok(Command::Del {
                key: single_key(rest, "DEL")?,
            }),
            "PING" => Ok(Command::Ping),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

/// Splits off the first space-separated word; the remainder keeps inner spaces.
fn split_word(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(char::is_whitespace) {
        Some(pos) => (&s[..pos], s[pos..].trim_start()),
        None => (s, ""),
    }
}

fn single_key(rest: &str, name: &'static str) -> Result<String, CommandError> {
    let (key, extra) = split_word(rest);
    if key.is_empty() || !extra.is_empty() {
        return Err(CommandError::WrongArity(name));
    }
    Ok(key.to_string())
}

/// A reply line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Ok,
    Pong,
    Value(Bytes),
    Error(String),
}

impl Reply {
    pub fn error(msg: impl Into<String>) -> Self {
        Reply::Error(msg.into())
    }

    /// Encodes the reply as a newline-terminated line.
    pub fn serialize(&self) -> Bytes {
        let mut buf = BytesMut::new();
        match self {
            Reply::Ok => buf.put_slice(b"OK"),
            Reply::Pong => buf.put_slice(b"PONG"),
            Reply::Value(value) => {
                buf.put_slice(b"VALUE ");
                buf.put_slice(value);
            }
            Reply::Error(msg) => {
                buf.put_slice(b"ERR ");
                buf.put_slice(msg.as_bytes());
            }
        }
        buf.put_u8(b'\n');
        buf.freeze()
    }
}

impl From<CacheError> for Reply {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::Overloaded => Reply::error("overloaded"),
            CacheError::Cancelled => Reply::error("timeout"),
            CacheError::NotFound => Reply::error("not found"),
        }
    }
}

/// Executes protocol commands against the cache.
#[derive(Debug, Clone)]
pub struct CommandHandler {
    cache: CacheService,
    request_timeout: Duration,
}

impl CommandHandler {
    pub fn new(cache: CacheService) -> Self {
        Self::with_timeout(cache, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(cache: CacheService, request_timeout: Duration) -> Self {
        Self {
            cache,
            request_timeout,
        }
    }

    /// Parses and runs one line.
    pub async fn execute(&self, line: &str) -> Reply {
        match Command::parse(line) {
            Ok(command) => self.dispatch(command).await,
            Err(e) => {
                debug!(error = %e, "Rejected command");
                Reply::error(e.to_string())
            }
        }
    }

    /// Runs an already parsed command.
    pub async fn dispatch(&self, command: Command) -> Reply {
        let ctx = Context::with_timeout(self.request_timeout);

        let result = match command {
            Command::Set { key, ttl, value } => self
                .cache
                .set(&ctx, key, value, expires_in(ttl))
                .await
                .map(|()| Reply::Ok),
            Command::Get { key } => self.cache.get(&ctx, key).await.map(Reply::Value),
            Command::Del { key } => self.cache.delete(&ctx, key).await.map(|()| Reply::Ok),
            Command::Ping => Ok(Reply::Pong),
        };

        result.unwrap_or_else(Reply::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::engine::Engine;

    #[test]
    fn test_parse_set_keeps_spaces_in_value() {
        assert_eq!(
            Command::parse("SET greeting 60 hello  world"),
            Ok(Command::Set {
                key: "greeting".into(),
                ttl: Duration::from_secs(60),
                value: Bytes::from("hello  world"),
            })
        );
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(Command::parse("ping"), Ok(Command::Ping));
        assert_eq!(
            Command::parse("  get name"),
            Ok(Command::Get { key: "name".into() })
        );
        assert_eq!(
            Command::parse("Del name"),
            Ok(Command::Del { key: "name".into() })
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(Command::parse(""), Err(CommandError::Empty));
        assert_eq!(Command::parse("   "), Err(CommandError::Empty));
        assert_eq!(
            Command::parse("FLY away"),
            Err(CommandError::Unknown("FLY".into()))
        );
        assert_eq!(Command::parse("GET"), Err(CommandError::WrongArity("GET")));
        assert_eq!(
            Command::parse("GET a b"),
            Err(CommandError::WrongArity("GET"))
        );
        assert_eq!(
            Command::parse("SET key 10"),
            Err(CommandError::WrongArity("SET"))
        );
        assert_eq!(
            Command::parse("SET key soon value"),
            Err(CommandError::InvalidTtl("soon".into()))
        );
        assert_eq!(
            Command::parse("SET key -5 value"),
            Err(CommandError::InvalidTtl("-5".into()))
        );
    }

    #[test]
    fn test_reply_serialize() {
        assert_eq!(Reply::Ok.serialize(), Bytes::from("OK\n"));
        assert_eq!(Reply::Pong.serialize(), Bytes::from("PONG\n"));
        assert_eq!(
            Reply::Value(Bytes::from("Ariz")).serialize(),
            Bytes::from("VALUE Ariz\n")
        );
        assert_eq!(
            Reply::from(CacheError::NotFound).serialize(),
            Bytes::from("ERR not found\n")
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_execute_round_trip() {
        let engine = Engine::start(EngineConfig::default().with_worker_count(2)).unwrap();
        let handler = CommandHandler::new(engine.service());

        assert_eq!(handler.execute("PING").await, Reply::Pong);
        assert_eq!(handler.execute("SET name 60 Ariz").await, Reply::Ok);
        assert_eq!(
            handler.execute("GET name").await,
            Reply::Value(Bytes::from("Ariz"))
        );
        assert_eq!(handler.execute("DEL name").await, Reply::Ok);
        assert_eq!(handler.execute("DEL name").await, Reply::Ok);
        assert_eq!(
            handler.execute("GET name").await,
            Reply::error("not found")
        );
        assert_eq!(
            handler.execute("NOPE").await,
            Reply::error("unknown command 'NOPE'")
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_huge_ttl_is_kept_not_evicted() {
        let engine = Engine::start(
            EngineConfig::default()
                .with_worker_count(2)
                .with_sweep_interval(Duration::from_millis(50)),
        )
        .unwrap();
        let handler = CommandHandler::new(engine.service());

        assert_eq!(
            handler.execute("SET k 18446744073709551615 forever").await,
            Reply::Ok
        );
        tokio::time::sleep(Duration::from_millis(300)).await;

        assert_eq!(
            handler.execute("GET k").await,
            Reply::Value(Bytes::from("forever"))
        );
        assert_eq!(engine.stats().evictions, 0);
    }
}
