//! Service bootstrap (v1)
//!
//! Runs an HTTP service exposing `/health` under the lifecycle coordinator.
//!
//! # Architecture Overview
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────┐
//!   │                         REGISTRY                              │
//!   │  ServiceConfig   Shutdown   AbortNotifier   Endpoints group   │
//!   │        │             │            │               │           │
//!   │        └─────────────┴─────┬──────┴───────────────┘           │
//!   │                            ▼                                  │
//!   │                      HttpServer (Lifecycles group)            │
//!   └────────────────────────────┬─────────────────────────────────┘
//!                                ▼
//!   SIGINT/SIGTERM ──▶ SignalBridge ──▶ Shutdown ─┐
//!   component fatal error ──▶ AbortNotifier ──────┼──▶ Coordinator
//!                                                 │    start all → wait → stop all
//! ```

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use service_bootstrap::config::{load_config, ServiceConfig};
use service_bootstrap::fatal;
use service_bootstrap::http::{Endpoints, HttpServer, Middlewares};
use service_bootstrap::lifecycle::{startup, AbortNotifier, Coordinator};
use service_bootstrap::observability::logging::{self, Level};
use service_bootstrap::observability::metrics;
use service_bootstrap::registry::{Group, Registry, WiringError};

#[derive(Debug, Parser)]
#[command(name = "service-bootstrap", version, about)]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured log level.
    #[arg(long, value_enum)]
    log_level: Option<Level>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match load_config(path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("failed to load configuration from {}: {err}", path.display());
                return ExitCode::FAILURE;
            }
        },
        None => ServiceConfig::default(),
    };
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }

    if let Err(err) = logging::init(&config.logging) {
        eprintln!("{err}");
        return ExitCode::FAILURE;
    }

    tracing::info!(
        http_address = %config.server.http_address,
        request_timeout_secs = config.server.request_timeout_secs,
        "service-bootstrap v0.1.0 starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => {
                if let Err(err) = metrics::init_metrics(addr) {
                    fatal!(error = %err, "failed to install metrics exporter");
                }
            }
            Err(err) => fatal!(error = %err, "invalid metrics address"),
        }
    }

    let registry = Arc::new(Registry::new());
    let coordinator = Coordinator::new(registry.clone());

    if let Err(err) = wire(&registry, config) {
        return startup::abort_wiring(&coordinator, err).await;
    }

    startup::run(&coordinator).await
}

fn wire(registry: &Registry, config: ServiceConfig) -> Result<(), WiringError> {
    registry.provide_instance(config)?;
    registry.provide_monitoring_endpoints()?;
    registry.provide_component(
        |(config, Group(endpoints), Group(middlewares), abort): (
            Arc<ServiceConfig>,
            Group<Endpoints>,
            Group<Middlewares>,
            Arc<AbortNotifier>,
        )| {
            HttpServer::new(config.server.clone(), endpoints, middlewares).with_abort((*abort).clone())
        },
    )?;
    registry.validate()
}
