//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (buffer sizes, stopper, timeouts)
//! - Reject codec namespaces containing whitespace
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ListenerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;

use crate::config::schema::{ListenerConfig, ServerConfig};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    ZeroBufferCapacity,
    InvalidStopper { stopper: usize, capacity: usize },
    EmptyTargetName,
    InvalidPackage(String),
    EmptyUnitId { path: String },
    ZeroIdleTimeout,
    ZeroWorkers,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::ZeroBufferCapacity => write!(f, "buffer capacity must be positive"),
            ValidationError::InvalidStopper { stopper, capacity } => {
                write!(f, "stopper {} must be between 1 and the buffer capacity {}", stopper, capacity)
            }
            ValidationError::EmptyTargetName => write!(f, "target names must not be empty"),
            ValidationError::InvalidPackage(package) => {
                write!(f, "package {:?} must be non-empty and contain no whitespace", package)
            }
            ValidationError::EmptyUnitId { path } => write!(f, "target unit for path {:?} has no id", path),
            ValidationError::ZeroIdleTimeout => write!(f, "idle timeout must be positive"),
            ValidationError::ZeroWorkers => write!(f, "worker thread count must be positive"),
        }
    }
}

/// Validate a listener configuration.
pub fn validate_listener(config: &ListenerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.buffer_capacity == 0 {
        errors.push(ValidationError::ZeroBufferCapacity);
    }
    if let Some(stopper) = config.stopper {
        if stopper == 0 || stopper > config.buffer_capacity {
            errors.push(ValidationError::InvalidStopper {
                stopper,
                capacity: config.buffer_capacity,
            });
        }
    }
    if config.targets.iter().any(|t| t.trim().is_empty()) {
        errors.push(ValidationError::EmptyTargetName);
    }
    for package in &config.packages {
        if package.is_empty() || package.chars().any(char::is_whitespace) {
            errors.push(ValidationError::InvalidPackage(package.clone()));
        }
    }
    for (path, binding) in &config.target_units {
        if binding.unit().trim().is_empty() {
            errors.push(ValidationError::EmptyUnitId { path: path.clone() });
        }
    }
    if config.idle_timeout_ms == Some(0) {
        errors.push(ValidationError::ZeroIdleTimeout);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate the whole demo configuration.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = match validate_listener(&config.listener) {
        Ok(()) => Vec::new(),
        Err(errors) => errors,
    };
    if config.runtime.worker_threads == 0 {
        errors.push(ValidationError::ZeroWorkers);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
