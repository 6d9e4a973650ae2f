//! Phased server (sample host process)
//!
//! Boots an Axum-backed server through the full lifecycle and keeps it
//! listening until Ctrl+C.
//!
//! ```text
//!   load config ──▶ logging/metrics ──▶ ServerBuilder
//!                                           │
//!        ┌──────────────────────────────────┘
//!        ▼
//!   config():  beforeConfig ─▶ mount default middleware, /status, /
//!   listen():  beforeInit ─▶ [port probe] ─▶ bind ─▶ afterListen
//!   Ctrl+C:    close()
//! ```
//!
//! The config file path is read from `PHASED_SERVER_CONFIG`; defaults apply
//! when it is unset.

use std::net::SocketAddr;
use std::path::PathBuf;

use axum::{routing::get, Router};
use serde_json::json;
use tokio::net::TcpListener;

use phased_server::config::{load_config, AppConfig};
use phased_server::host::{default_middleware, status_routes, AxumHost, Handler};
use phased_server::lifecycle::{Hook, ServerBuilder, ServerContext, TestCase};
use phased_server::observability::{logging, metrics};

const CONFIG_ENV: &str = "PHASED_SERVER_CONFIG";
const DEFAULT_PORT: u16 = 8080;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match std::env::var_os(CONFIG_ENV) {
        Some(path) => load_config(&PathBuf::from(path))?,
        None => AppConfig::default(),
    };

    logging::init(&config.observability.log_level);
    tracing::info!("phased-server v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let port = config.server.port.unwrap_or(DEFAULT_PORT);
    let bind_host = config.server.bind_host.clone();
    let probe_addr = format!("{bind_host}:{port}");

    let builder = ServerBuilder::from_config(&config);
    let broadcaster = builder.broadcaster();
    let hello = Router::new().route("/", get(|| async { "hello" }));

    let mut server = builder
        .middleware(default_middleware(&config.http, &config.server.name))
        .middleware(status_routes(broadcaster))
        .middleware(Handler::routes("hello", hello))
        .before_init(Hook::from_fn(|| async { Ok(json!({ "warmed_up": true })) }))
        .after_listen(Hook::new(|ctx: ServerContext| async move {
            tracing::info!(server = %ctx.name(), address = ?ctx.local_addr(), "Accepting traffic");
            Ok(json!(null))
        }))
        .tests(TestCase::new(
            format!("Port {port} is unavailable"),
            format!("Port {port} is available"),
            move || {
                let addr = probe_addr.clone();
                async move { TcpListener::bind(addr).await.map(drop) }
            },
        ))
        .build(AxumHost::new(bind_host));

    server.subscribe(|status| tracing::debug!(?status, "Lifecycle status"));

    let outcome = server.listen(Some(port)).await?;
    tracing::info!(
        address = ?outcome.local_addr,
        init_results = ?outcome.init_results,
        "Startup complete"
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    let message = server.close().await?;
    tracing::info!("{}", message);
    Ok(())
}
