//! Connection Handler Module
//!
//! This module handles individual client connections to the text front end.
//! Each client gets its own task that reads newline-terminated commands and
//! writes one reply line per command.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! 1. Client connects
//!        │
//!        ▼
//! 2. ┌──────────────────────────────┐
//!    │  Split complete lines out of │
//!    │  the read buffer             │
//!    │          │                   │
//!    │          ▼                   │
//!    │  Execute through the cache   │
//!    │          │                   │
//!    │          ▼                   │
//!    │  Write the reply line        │
//!    │          │                   │
//!    │     [Loop back]              │
//!    └──────────────────────────────┘
//!        │
//!        ▼
//! 3. Client disconnects / error
//! ```
//!
//! ## Buffer Management
//!
//! TCP is a stream: a read may hold half a line or several lines. Bytes
//! accumulate in a `BytesMut` until a newline arrives. A line longer than
//! [`MAX_LINE_LENGTH`] closes the connection.

use crate::commands::CommandHandler;
use bytes::{Buf, BytesMut};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tracing::{debug, info, trace, warn};

/// Maximum length of one command line (64 KB)
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

/// Initial buffer capacity
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Statistics for connection handling
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Total commands processed
    pub commands_processed: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn command_processed(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }
}

/// Errors that can occur while handling a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// I/O error (network issue)
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Client disconnected normally
    #[error("Client disconnected")]
    ClientDisconnected,

    /// Stream ended in the middle of a line
    #[error("Unexpected end of stream")]
    UnexpectedEof,

    /// A line exceeded the length limit
    #[error("Line length limit exceeded")]
    LineTooLong,
}

/// Serves one client.
pub struct ConnectionHandler {
    stream: BufWriter<TcpStream>,
    addr: SocketAddr,
    buffer: BytesMut,
    command_handler: CommandHandler,
    stats: Arc<ConnectionStats>,
}

impl ConnectionHandler {
    pub fn new(
        stream: TcpStream,
        addr: SocketAddr,
        command_handler: CommandHandler,
        stats: Arc<ConnectionStats>,
    ) -> Self {
        stats.connection_opened();

        Self {
            stream: BufWriter::new(stream),
            addr,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            command_handler,
            stats,
        }
    }

    /// Runs the read-execute-respond loop until the client goes away.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(client = %self.addr, "Client connected");

        let result = self.main_loop().await;

        match &result {
            Ok(()) | Err(ConnectionError::ClientDisconnected) => {
                debug!(client = %self.addr, "Client disconnected")
            }
            Err(ConnectionError::IoError(io_err))
                if io_err.kind() == std::io::ErrorKind::ConnectionReset =>
            {
                debug!(client = %self.addr, "Connection reset by client")
            }
            Err(e) => warn!(client = %self.addr, error = %e, "Connection error"),
        }

        self.stats.connection_closed();
        result
    }

    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            while let Some(line) = self.next_line()? {
                let reply = self.command_handler.execute(&line).await;
                self.stats.command_processed();

                let bytes = reply.serialize();
                self.stream.write_all(&bytes).await?;
                self.stream.flush().await?;
                trace!(client = %self.addr, bytes = bytes.len(), "Sent reply");
            }

            self.read_more_data().await?;
        }
    }

    /// Takes the next complete line out of the buffer, if there is one.
    fn next_line(&mut self) -> Result<Option<String>, ConnectionError> {
        let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') else {
            if self.buffer.len() > MAX_LINE_LENGTH {
                return Err(ConnectionError::LineTooLong);
            }
            return Ok(None);
        };

        if pos > MAX_LINE_LENGTH {
            return Err(ConnectionError::LineTooLong);
        }

        let raw = self.buffer.split_to(pos);
        self.buffer.advance(1);

        let raw = raw.strip_suffix(b"\r").unwrap_or(&raw[..]);
        Ok(Some(String::from_utf8_lossy(raw).into_owned()))
    }

    async fn read_more_data(&mut self) -> Result<(), ConnectionError> {
        if self.buffer.capacity() - self.buffer.len() < 1024 {
            self.buffer.reserve(INITIAL_BUFFER_SIZE);
        }

        let n = self.stream.get_mut().read_buf(&mut self.buffer).await?;

        if n == 0 {
            if self.buffer.is_empty() {
                return Err(ConnectionError::ClientDisconnected);
            }
            return Err(ConnectionError::UnexpectedEof);
        }

        trace!(client = %self.addr, bytes = n, "Read data");
        Ok(())
    }
}

/// Creates a [`ConnectionHandler`] and runs it to completion.
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    command_handler: CommandHandler,
    stats: Arc<ConnectionStats>,
) {
    let handler = ConnectionHandler::new(stream, addr, command_handler, stats);
    if let Err(e) = handler.run().await {
        match e {
            ConnectionError::ClientDisconnected => {}
            ConnectionError::IoError(ref io_err)
                if io_err.kind() == std::io::ErrorKind::ConnectionReset => {}
            _ => {
                debug!(client = %addr, error = %e, "Connection ended with error");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::engine::Engine;
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::net::TcpListener;

    async fn create_test_server() -> (SocketAddr, Engine, Arc<ConnectionStats>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let engine = Engine::start(EngineConfig::default().with_worker_count(2)).unwrap();
        let stats = Arc::new(ConnectionStats::new());

        let handler = CommandHandler::new(engine.service());
        let stats_clone = Arc::clone(&stats);

        tokio::spawn(async move {
            while let Ok((stream, client_addr)) = listener.accept().await {
                let stats = Arc::clone(&stats_clone);
                tokio::spawn(handle_connection(stream, client_addr, handler.clone(), stats));
            }
        });

        (addr, engine, stats)
    }

    async fn request(
        reader: &mut BufReader<tokio::net::tcp::OwnedReadHalf>,
        writer: &mut tokio::net::tcp::OwnedWriteHalf,
        line: &str,
    ) -> String {
        writer.write_all(line.as_bytes()).await.unwrap();
        let mut reply = String::new();
        reader.read_line(&mut reply).await.unwrap();
        reply
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_ping_pong() {
        let (addr, _engine, _) = create_test_server().await;
        let (read, mut write) = TcpStream::connect(addr).await.unwrap().into_split();
        let mut read = BufReader::new(read);

        assert_eq!(request(&mut read, &mut write, "PING\r\n").await, "PONG\n");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_set_get_del() {
        let (addr, _engine, _) = create_test_server().await;
        let (read, mut write) = TcpStream::connect(addr).await.unwrap().into_split();
        let mut read = BufReader::new(read);

        assert_eq!(
            request(&mut read, &mut write, "SET name 60 Ariz\n").await,
            "OK\n"
        );
        assert_eq!(
            request(&mut read, &mut write, "GET name\n").await,
            "VALUE Ariz\n"
        );
        assert_eq!(request(&mut read, &mut write, "DEL name\n").await, "OK\n");
        assert_eq!(
            request(&mut read, &mut write, "GET name\n").await,
            "ERR not found\n"
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_pipelined_commands() {
        let (addr, _engine, _) = create_test_server().await;
        let (read, mut write) = TcpStream::connect(addr).await.unwrap().into_split();
        let mut read = BufReader::new(read);

        write
            .write_all(b"SET k1 60 v1\nSET k2 60 v2\nGET k1\nGET k2\n")
            .await
            .unwrap();

        let mut lines = Vec::new();
        for _ in 0..4 {
            let mut line = String::new();
            read.read_line(&mut line).await.unwrap();
            lines.push(line);
        }

        assert_eq!(lines, vec!["OK\n", "OK\n", "VALUE v1\n", "VALUE v2\n"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_complete_line_over_limit_is_rejected() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _client = TcpStream::connect(addr).await.unwrap();
        let (stream, client_addr) = listener.accept().await.unwrap();

        let engine = Engine::start(EngineConfig::default().with_worker_count(1)).unwrap();
        let mut handler = ConnectionHandler::new(
            stream,
            client_addr,
            CommandHandler::new(engine.service()),
            Arc::new(ConnectionStats::new()),
        );

        // Whole line, newline included, already buffered
        let mut line = format!("SET k 60 {}", "x".repeat(MAX_LINE_LENGTH));
        line.push('\n');
        handler.buffer.extend_from_slice(line.as_bytes());
        assert!(matches!(
            handler.next_line(),
            Err(ConnectionError::LineTooLong)
        ));

        // A line right at the limit still goes through
        handler.buffer.clear();
        let mut line = "x".repeat(MAX_LINE_LENGTH);
        line.push('\n');
        handler.buffer.extend_from_slice(line.as_bytes());
        assert_eq!(
            handler.next_line().unwrap().map(|l| l.len()),
            Some(MAX_LINE_LENGTH)
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_connection_stats() {
        let (addr, _engine, stats) = create_test_server().await;

        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 0);

        let (read, mut write) = TcpStream::connect(addr).await.unwrap().into_split();
        let mut read = BufReader::new(read);
        request(&mut read, &mut write, "PING\n").await;

        assert_eq!(stats.connections_accepted.load(Ordering::Relaxed), 1);
        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 1);
        assert!(stats.commands_processed.load(Ordering::Relaxed) >= 1);

        drop(write);
        drop(read);
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 0);
    }
}
