//! Connection Handler Module
//!
//! Each client connection to the bundled server is served by its own async
//! task, so a slow client never holds up the others.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     TCP Listener                            │
//! │                    (main.rs)                                │
//! └──────────────────────┬──────────────────────────────────────┘
//!                        │ accept() + spawn
//!                        ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 ConnectionHandler                           │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐      │
//! │  │ Read bytes  │───>│ Split lines │───>│ Execute cmd │      │
//! │  └─────────────┘    └─────────────┘    └──────┬──────┘      │
//! │                                               ▼             │
//! │                                      ┌─────────────┐        │
//! │                                      │ Write reply │        │
//! │                                      └─────────────┘        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use emberkv::connection::{handle_connection, ConnectionStats};
//! use emberkv::commands::CommandHandler;
//! use emberkv::{Engine, EngineConfig};
//! use std::sync::Arc;
//!
//! let engine = Engine::start(EngineConfig::default())?;
//! let stats = Arc::new(ConnectionStats::new());
//! let handler = CommandHandler::new(engine.service());
//!
//! // For each accepted connection...
//! let (stream, addr) = listener.accept().await?;
//! tokio::spawn(handle_connection(stream, addr, handler.clone(), stats));
//! ```

pub mod handler;

// Re-export commonly used types
pub use handler::{
    handle_connection, ConnectionError, ConnectionHandler, ConnectionStats, MAX_LINE_LENGTH,
};
