//! EmberKV - An In-Process TTL Key-Value Cache
//!
//! Entry point for the bundled server. It builds the cache engine, exposes it
//! over a small line-based TCP protocol, and shuts everything down on Ctrl+C.

use anyhow::{bail, Context as _};
use emberkv::commands::CommandHandler;
use emberkv::connection::{handle_connection, ConnectionStats};
use emberkv::{Engine, EngineConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Server configuration
struct ServerConfig {
    /// Host to bind to
    host: String,
    /// Port to listen on
    port: u16,
    /// Number of engine workers
    workers: usize,
    /// Per-request timeout
    request_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: emberkv::DEFAULT_HOST.to_string(),
            port: emberkv::DEFAULT_PORT,
            workers: emberkv::config::DEFAULT_WORKER_COUNT,
            request_timeout: emberkv::commands::DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl ServerConfig {
    /// Parse configuration from command-line arguments
    fn from_args() -> anyhow::Result<Self> {
        let mut config = ServerConfig::default();
        let mut args = std::env::args().skip(1);

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--host" | "-h" => {
                    config.host = args.next().context("--host requires a value")?;
                }
                "--port" | "-p" => {
                    let value = args.next().context("--port requires a value")?;
                    config.port = value
                        .parse()
                        .with_context(|| format!("invalid port number '{}'", value))?;
                }
                "--workers" | "-w" => {
                    let value = args.next().context("--workers requires a value")?;
                    config.workers = value
                        .parse()
                        .with_context(|| format!("invalid worker count '{}'", value))?;
                }
                "--timeout" | "-t" => {
                    let value = args.next().context("--timeout requires a value")?;
                    config.request_timeout = parse_timeout(&value)?;
                }
                "--help" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("EmberKV version {}", emberkv::VERSION);
                    std::process::exit(0);
                }
                other => bail!("unknown argument: {} (see --help)", other),
            }
        }

        Ok(config)
    }

    /// Returns the bind address as a string
    fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Parses a request timeout in whole seconds. Zero is rejected since every
/// request would be cancelled before it starts.
fn parse_timeout(value: &str) -> anyhow::Result<Duration> {
    let secs: u64 = value
        .parse()
        .with_context(|| format!("invalid timeout '{}'", value))?;
    if secs == 0 {
        bail!("--timeout must be at least 1 second");
    }
    Ok(Duration::from_secs(secs))
}

fn print_help() {
    println!(
        r#"
EmberKV - An In-Process TTL Key-Value Cache

USAGE:
    emberkv [OPTIONS]

OPTIONS:
    -h, --host <HOST>        Host to bind to (default: 127.0.0.1)
    -p, --port <PORT>        Port to listen on (default: 7878)
    -w, --workers <N>        Number of cache workers (default: 10)
    -t, --timeout <SECS>     Per-request timeout in seconds (default: 10)
    -v, --version            Print version information
        --help               Print this help message

ENVIRONMENT:
    RUST_LOG                 Log filter (default: info)

PROTOCOL (one command per line):
    SET <key> <ttl-seconds> <value>   -> OK
    GET <key>                         -> VALUE <value> | ERR not found
    DEL <key>                         -> OK
    PING                              -> PONG
"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_args()?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!(version = emberkv::VERSION, "Starting service");

    let engine = Engine::start(
        EngineConfig::default()
            .with_service_name("emberkv")
            .with_worker_count(config.workers),
    )?;
    let handler = CommandHandler::with_timeout(engine.service(), config.request_timeout);
    let stats = Arc::new(ConnectionStats::new());

    let listener = TcpListener::bind(config.bind_address())
        .await
        .with_context(|| format!("failed to bind {}", config.bind_address()))?;
    info!(host = %config.bind_address(), "Listening");

    let shutdown = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            return;
        }
        info!("Shutdown signal received, stopping server...");
    };

    tokio::select! {
        _ = accept_loop(listener, handler, stats) => {}
        _ = shutdown => {}
    }

    engine.shutdown().await;
    info!("Shutdown complete");
    Ok(())
}

/// Main loop that accepts incoming connections
async fn accept_loop(listener: TcpListener, handler: CommandHandler, stats: Arc<ConnectionStats>) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let handler = handler.clone();
                let stats = Arc::clone(&stats);
                tokio::spawn(handle_connection(stream, addr, handler, stats));
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}
