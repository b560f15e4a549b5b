//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! host properties (flat string map)          config file (TOML)
//!     → properties.rs (parse keys)               → loader.rs (deserialize)
//!     → ListenerConfig                           → ServerConfig
//!                  ↘                           ↙
//!                    validation.rs (semantic checks)
//!                    → validated, immutable config
//!                    → HttpServer::initialize
//! ```
//!
//! # Design Decisions
//! - Config is immutable once accepted; changes require re-initialisation
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod properties;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use properties::Properties;
pub use schema::{
    DispatchMode, ListenerConfig, ObservabilityConfig, ReadyPolicy, RuntimeConfig, ServerConfig, UnitBinding,
};
pub use validation::{validate_config, validate_listener, ValidationError};
