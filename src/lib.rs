//! Embeddable HTTP/1.0 server unit for component runtimes.
//!
//! Maps URL paths to components hosted by a runtime: GET reads a
//! component's current value, POST decodes the body into the component's
//! message type, answers 202, and forwards the payload to configured
//! targets.

// Core subsystems
pub mod codec;
pub mod config;
pub mod http;
pub mod net;
pub mod routing;
pub mod runtime;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::{ListenerConfig, ServerConfig};
pub use http::{HttpServer, ServerError};
pub use lifecycle::ServerState;
