//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (non-blocking accept)
//!     → reactor.rs (readiness loop on a dedicated thread)
//!     → connection.rs (read → worker → write → forward → close)
//!
//! Connection States:
//!     Reading → Processing → Writing → Closed
//! ```
//!
//! # Design Decisions
//! - One request per connection; the server always closes after writing
//! - Worker tasks run on the pool; the reactor only moves bytes

pub mod connection;
pub mod listener;
pub mod reactor;

pub use connection::{ConnectionManager, ConnectionServices, ConnectionState, ReadOutcome, WriteOutcome};
pub use listener::{Listener, ListenerError};
pub use reactor::{Reactor, ReactorHandle};
