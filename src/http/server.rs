//! HTTP server unit: lifecycle hooks around the reactor.
//!
//! # Responsibilities
//! - Validate and store listener configuration
//! - Populate the codec registry and the URI registry
//! - Bind the listener and launch the reactor on its own thread
//! - Stop, restart, and shut down on request from the host
//!
//! # Design Decisions
//! - Binding happens inside `start()`; a taken port is returned to the caller
//! - State lives in a shared atomic cell the reactor checks every wakeup

use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::JoinHandle;

use arc_swap::ArcSwap;
use thiserror::Error;

use crate::codec::{CodecCatalog, CodecRegistry};
use crate::config::{validate_listener, ConfigError, ListenerConfig, Properties};
use crate::http::response::ResponseEncoder;
use crate::http::task::TaskFactory;
use crate::lifecycle::{ServerState, StateCell};
use crate::net::connection::ConnectionServices;
use crate::net::listener::ListenerError;
use crate::net::reactor::{Reactor, ReactorHandle};
use crate::routing::UriRegistry;
use crate::runtime::context::Context;
use crate::runtime::target::TargetRef;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("server is not initialized")]
    NotInitialized,
    #[error("server is already running")]
    AlreadyRunning,
    #[error("server has been shut down")]
    ShutDown,
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("listener failed: {0}")]
    Listener(#[from] ListenerError),
    #[error("failed to spawn reactor thread: {0}")]
    Spawn(std::io::Error),
}

struct Running {
    handle: ReactorHandle,
    thread: JoinHandle<()>,
    local_addr: SocketAddr,
}

/// A server unit hosted by a component runtime.
pub struct HttpServer {
    id: String,
    context: Arc<dyn Context>,
    state: Arc<StateCell>,
    config: Option<ListenerConfig>,
    catalog: CodecCatalog,
    codecs: Arc<ArcSwap<CodecRegistry>>,
    uris: Arc<UriRegistry>,
    running: Option<Running>,
}

impl HttpServer {
    /// Create an uninitialized server. `uris` may be shared with the host,
    /// which can add paths of its own.
    pub fn new(
        id: impl Into<String>,
        context: Arc<dyn Context>,
        uris: Arc<UriRegistry>,
        catalog: CodecCatalog,
    ) -> Self {
        Self {
            id: id.into(),
            context,
            state: Arc::new(StateCell::default()),
            config: None,
            catalog,
            codecs: Arc::new(ArcSwap::from_pointee(CodecRegistry::new())),
            uris,
            running: None,
        }
    }

    /// Initialize from the host's string properties.
    pub fn on_initialization(&mut self, properties: &Properties) -> Result<(), ServerError> {
        let config = ListenerConfig::from_properties(properties)?;
        self.initialize(config)
    }

    /// Validate and store `config`, then populate both registries.
    pub fn initialize(&mut self, config: ListenerConfig) -> Result<(), ServerError> {
        if self.running.is_some() {
            return Err(ServerError::AlreadyRunning);
        }
        if self.is_shut_down() {
            return Err(ServerError::ShutDown);
        }

        self.config = None;
        self.state.set(ServerState::Uninitialized);
        validate_listener(&config).map_err(ConfigError::Validation)?;

        let registry = CodecRegistry::scan(&self.catalog, &config.packages);
        let codec_count = registry.len();
        self.codecs.store(Arc::new(registry));

        if config.target_units.is_empty() {
            tracing::warn!(server_id = %self.id, "No target units configured, every path answers 404");
        }
        for (path, binding) in &config.target_units {
            if binding.methods().is_empty() {
                tracing::warn!(
                    server_id = %self.id,
                    path = %path,
                    unit = binding.unit(),
                    "Binding lists no methods, every request to it answers 405 until the host adds some"
                );
            }
            self.uris.add_unit_path_node(path, binding.unit());
            for method in binding.methods() {
                self.uris.add_node(path, *method);
            }
        }

        tracing::info!(
            server_id = %self.id,
            port = config.port,
            codecs = codec_count,
            paths = self.uris.len(),
            dispatch = ?config.dispatch,
            "Server initialized"
        );

        self.config = Some(config);
        self.state.set(ServerState::Initialized);
        Ok(())
    }

    /// Bind the listener and launch the reactor. Returns the bound address.
    pub fn start(&mut self) -> Result<SocketAddr, ServerError> {
        if let Some(running) = &self.running {
            if !running.thread.is_finished() {
                tracing::error!(server_id = %self.id, "Start requested while already running");
                return Err(ServerError::AlreadyRunning);
            }
            // The reactor ended on its own; reap it before starting again.
            self.stop();
        }
        if self.is_shut_down() {
            return Err(ServerError::ShutDown);
        }
        let config = self.config.clone().ok_or(ServerError::NotInitialized)?;

        self.state.set(ServerState::Starting);

        let services = ConnectionServices {
            pool: self.context.scheduler().clone(),
            tasks: TaskFactory::new(Arc::clone(&self.codecs), Arc::clone(&self.uris), Arc::clone(&self.context)),
            encoder: ResponseEncoder::new(self.id.clone(), config.content_length).with_codec_bodies(config.codec_bodies),
            codecs: Arc::clone(&self.codecs),
            targets: self.resolve_targets(&config),
        };

        let (reactor, handle) = match Reactor::bind(&config, services, Arc::clone(&self.state)) {
            Ok(bound) => bound,
            Err(e) => {
                tracing::error!(server_id = %self.id, port = config.port, error = %e, "Failed to open listener");
                self.state.set(ServerState::Stopped);
                return Err(e.into());
            }
        };
        let local_addr = reactor.local_addr();

        let thread = std::thread::Builder::new()
            .name(format!("{}-reactor", self.id))
            .spawn(move || reactor.run());
        let thread = match thread {
            Ok(thread) => thread,
            Err(e) => {
                tracing::error!(server_id = %self.id, error = %e, "Failed to spawn reactor thread");
                self.state.set(ServerState::Stopped);
                return Err(ServerError::Spawn(e));
            }
        };

        self.running = Some(Running {
            handle,
            thread,
            local_addr,
        });
        // The reactor may already have failed and set STOPPED.
        self.state.transition(ServerState::Starting, ServerState::Started);

        tracing::info!(server_id = %self.id, address = %local_addr, "Server started");
        Ok(local_addr)
    }

    fn resolve_targets(&self, config: &ListenerConfig) -> Vec<TargetRef> {
        config
            .targets
            .iter()
            .filter_map(|id| {
                let target = self.context.reference(id);
                if target.is_none() {
                    tracing::warn!(server_id = %self.id, target = %id, "Forward target not found");
                }
                target
            })
            .collect()
    }

    /// Stop the reactor and wait for it to close every socket.
    pub fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            tracing::debug!(server_id = %self.id, state = %self.state(), "Stop requested while not running");
            return;
        };

        self.state.set(ServerState::Stopping);
        running.handle.wake();
        if running.thread.join().is_err() {
            tracing::error!(server_id = %self.id, "Reactor thread panicked");
        }
        self.state.set(ServerState::Stopped);

        tracing::info!(server_id = %self.id, address = %running.local_addr, "Server stopped");
    }

    /// Stop if running and release configuration and codecs. Final.
    pub fn shutdown(&mut self) {
        if self.is_shut_down() {
            return;
        }
        self.stop();
        self.state.set(ServerState::ShuttingDown);
        self.config = None;
        self.codecs.store(Arc::new(CodecRegistry::new()));
        self.state.set(ServerState::Shutdown);
        tracing::info!(server_id = %self.id, "Server shut down");
    }

    fn is_shut_down(&self) -> bool {
        matches!(self.state(), ServerState::ShuttingDown | ServerState::Shutdown)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> ServerState {
        self.state.get()
    }

    /// Bound address while running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|r| r.local_addr)
    }

    pub fn config(&self) -> Option<&ListenerConfig> {
        self.config.as_ref()
    }

    pub fn uris(&self) -> &Arc<UriRegistry> {
        &self.uris
    }

    /// Snapshot of the current codec registry.
    pub fn codecs(&self) -> Arc<CodecRegistry> {
        self.codecs.load_full()
    }
}

impl Drop for HttpServer {
    fn drop(&mut self) {
        self.stop();
    }
}
