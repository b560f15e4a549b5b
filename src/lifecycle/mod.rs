//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! on_initialization: UNINITIALIZED → INITIALIZED
//! start:             STARTING → STARTED      (reactor thread running)
//! stop:              STOPPING → STOPPED      (reactor joined, port released)
//! shutdown:          SHUTTING_DOWN → SHUTDOWN
//! ```
//!
//! # Design Decisions
//! - A fresh `start` may follow `stop`; nothing may follow `shutdown`
//! - The reactor itself sets STOPPED when its listener fails

pub mod state;

pub use state::{ServerState, StateCell};
