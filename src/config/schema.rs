//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::http::request::Method;

/// Default listening port.
pub const DEFAULT_PORT: u16 = 8042;

/// Default read buffer capacity in bytes.
pub const DEFAULT_BUFFER_CAPACITY: usize = 700_000;

/// Root configuration for the demo binary.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Identity of the server unit, sent in the `Server` header.
    pub id: String,

    /// Listener and request handling.
    pub listener: ListenerConfig,

    /// Worker pool sizing.
    pub runtime: RuntimeConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            id: "http".to_string(),
            listener: ListenerConfig::default(),
            runtime: RuntimeConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Listener configuration. Immutable once validated.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// TCP port, 0 picks an ephemeral port.
    pub port: u16,

    /// Capacity of the read buffer; longer requests are truncated.
    pub buffer_capacity: usize,

    /// Fixed read length. When set, a read stops after this many bytes.
    pub stopper: Option<usize>,

    /// Forward target component ids for POST payloads.
    pub targets: Vec<String>,

    /// Codec namespaces to load.
    pub packages: Vec<String>,

    /// Path → component bindings used to pre-populate the URI registry.
    pub target_units: BTreeMap<String, UnitBinding>,

    /// How the reactor waits for worker results.
    pub dispatch: DispatchMode,

    /// When the reactor processes ready keys.
    pub ready_policy: ReadyPolicy,

    /// Emit `Content-Length` on every response.
    pub content_length: bool,

    /// Render GET values through the codec registered for their type
    /// instead of their text form.
    pub codec_bodies: bool,

    /// Close connections idle for longer than this. `None` never does.
    pub idle_timeout_ms: Option<u64>,
}

impl ListenerConfig {
    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            stopper: None,
            targets: Vec::new(),
            packages: Vec::new(),
            target_units: BTreeMap::new(),
            dispatch: DispatchMode::default(),
            ready_policy: ReadyPolicy::default(),
            content_length: true,
            codec_bodies: false,
            idle_timeout_ms: None,
        }
    }
}

/// Binding of a path to a component, optionally with its allowed methods.
///
/// Accepts `"sensor": "sensorUnit"` or
/// `"sensor": {"unit": "sensorUnit", "methods": ["GET"]}`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum UnitBinding {
    Unit(String),
    Detailed {
        unit: String,
        #[serde(default)]
        methods: Vec<Method>,
    },
}

impl UnitBinding {
    pub fn unit(&self) -> &str {
        match self {
            UnitBinding::Unit(unit) | UnitBinding::Detailed { unit, .. } => unit,
        }
    }

    pub fn methods(&self) -> &[Method] {
        match self {
            UnitBinding::Unit(_) => &[],
            UnitBinding::Detailed { methods, .. } => methods,
        }
    }
}

/// How the reactor obtains a worker task's result.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DispatchMode {
    /// Wait for the task on the reactor thread before re-registering for
    /// WRITE. Simple; a slow component stalls every connection.
    #[default]
    Blocking,
    /// Return to polling; the task's completion wakes the reactor, which
    /// then re-registers the connection for WRITE.
    Deferred,
}

/// When ready keys are processed.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ReadyPolicy {
    /// Process every key as soon as a wakeup reports it.
    #[default]
    NonEmpty,
    /// Legacy behaviour: collect keys and only process the collected set
    /// on a wakeup that reports no new keys.
    ZeroReady,
}

/// Worker pool configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Worker threads (also the bound on concurrent tasks).
    pub worker_threads: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self { worker_threads: 4 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
