//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Initialisation:
//!     targetUnits config → add_unit_path_node / add_node
//!
//! Every request (worker thread):
//!     update_units(context)        reconcile id bindings
//!     → get_methods_by_path(path)  allowed methods + bound component
//!     → NotFound / MethodNotAllowed / dispatch to component
//! ```
//!
//! # Design Decisions
//! - Paths are single normalised keys, not patterns
//! - Lookups never block writers for long (sharded map)

pub mod registry;

pub use registry::{RouteEntry, UriRegistry};

/// Normalise a request target or registered path into a registry key.
///
/// Drops the query string, fragment and surrounding slashes:
/// `/sensor/?x=1` → `sensor`.
pub fn normalize_path(target: &str) -> String {
    let path = target.split(['?', '#']).next().unwrap_or_default();
    path.trim_matches('/').to_string()
}
