//! component-http demo host.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────▶ net::reactor ──▶ runtime::pool ──▶ http::task ──▶ routing
//!                 (one thread)     (workers)         (decode)       (path → unit)
//!                      │                                               │
//!                      │               ┌───────────────────────────────┘
//!                      ▼               ▼
//!     ◀────────── http::response ◀── component value / POST payload
//!     Client Response      │
//!                          └──▶ forward targets (POST)
//! ```
//!
//! Hosts two demo units: `sensorUnit` (GET `/sensor`) and
//! `controllerUnit` (GET and POST `/setpoint`). POSTed setpoints are
//! forwarded to the controller.

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use clap::Parser;
use serde::{Deserialize, Serialize};

use component_http::codec::{CodecCatalog, JsonCodec};
use component_http::config::{load_config, ListenerConfig, ServerConfig, UnitBinding};
use component_http::http::{HttpServer, Method};
use component_http::observability::{logging, metrics};
use component_http::routing::UriRegistry;
use component_http::runtime::{Message, MessageType, SystemContext, Target, WorkerPool};

#[derive(Parser)]
#[command(name = "component-http")]
#[command(about = "HTTP front end for a component runtime", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener port.
    #[arg(short, long)]
    port: Option<u16>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Reading {
    celsius: f64,
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1} C", self.celsius)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Setpoint {
    celsius: f64,
}

impl fmt::Display for Setpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "setpoint {:.1} C", self.celsius)
    }
}

struct Sensor {
    id: String,
    samples: AtomicU64,
}

impl Target for Sensor {
    fn id(&self) -> &str {
        &self.id
    }

    fn message_type(&self) -> MessageType {
        MessageType::of::<Reading>()
    }

    fn deliver(&self, message: Message) {
        tracing::debug!(unit = %self.id, message = %message, "Sensor ignores deliveries");
    }

    fn value(&self) -> Option<Message> {
        let sample = self.samples.fetch_add(1, Ordering::Relaxed);
        Some(Message::new(Reading {
            celsius: 20.0 + (sample % 10) as f64 * 0.1,
        }))
    }
}

struct Controller {
    id: String,
    setpoint: Mutex<Option<Setpoint>>,
}

impl Target for Controller {
    fn id(&self) -> &str {
        &self.id
    }

    fn message_type(&self) -> MessageType {
        MessageType::of::<Setpoint>()
    }

    fn deliver(&self, message: Message) {
        let Some(setpoint) = message.downcast_ref::<Setpoint>() else {
            return;
        };
        tracing::info!(unit = %self.id, celsius = setpoint.celsius, "Setpoint updated");
        if let Ok(mut current) = self.setpoint.lock() {
            *current = Some(setpoint.clone());
        }
    }

    fn value(&self) -> Option<Message> {
        let current = self.setpoint.lock().ok()?.clone()?;
        Some(Message::new(current))
    }
}

/// Bindings used when the config file names no target units.
fn demo_bindings(listener: &mut ListenerConfig) {
    listener.target_units.insert(
        "sensor".to_string(),
        UnitBinding::Detailed {
            unit: "sensorUnit".to_string(),
            methods: vec![Method::Get],
        },
    );
    listener.target_units.insert(
        "setpoint".to_string(),
        UnitBinding::Detailed {
            unit: "controllerUnit".to_string(),
            methods: vec![Method::Get, Method::Post],
        },
    );
    if listener.packages.is_empty() {
        listener.packages.push("demo".to_string());
    }
    if listener.targets.is_empty() {
        listener.targets.push("controllerUnit".to_string());
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(port) = cli.port {
        config.listener.port = port;
    }

    logging::init_logging(&config.observability);
    tracing::info!("component-http v{} starting", env!("CARGO_PKG_VERSION"));

    let pool = WorkerPool::new(config.runtime.worker_threads)?;

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                let _runtime = pool.handle().enter();
                metrics::init_metrics(addr);
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let context = Arc::new(SystemContext::new(pool.clone()));
    context.register(Arc::new(Sensor {
        id: "sensorUnit".to_string(),
        samples: AtomicU64::new(0),
    }));
    context.register(Arc::new(Controller {
        id: "controllerUnit".to_string(),
        setpoint: Mutex::new(None),
    }));

    if config.listener.target_units.is_empty() {
        demo_bindings(&mut config.listener);
    }

    let catalog = CodecCatalog::new()
        .with_codec("demo.sensor", Arc::new(JsonCodec::<Reading>::new()))
        .with_codec("demo.control", Arc::new(JsonCodec::<Setpoint>::new()));

    let mut server = HttpServer::new(config.id.clone(), context, UriRegistry::shared(), catalog);
    server.initialize(config.listener)?;
    let addr = server.start()?;

    tracing::info!(address = %addr, "Listening for connections");

    pool.block_on(tokio::signal::ctrl_c())?;
    tracing::info!("Shutdown signal received");

    server.stop();
    server.shutdown();

    tracing::info!("Shutdown complete");
    Ok(())
}
