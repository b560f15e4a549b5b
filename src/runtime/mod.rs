//! Host runtime collaborators.
//!
//! # Data Flow
//! ```text
//! HttpServer::start
//!     → context.rs (resolve forward targets by id)
//!     → pool.rs (worker tasks submitted by the reactor)
//!
//! Worker task
//!     → target.rs (GET: read accessor on the bound component)
//!     → message.rs (typed values decoded from POST bodies)
//!
//! Response written
//!     → target.rs (deliver POST payload to matching forward targets)
//! ```
//!
//! # Design Decisions
//! - Components are trait objects; the server never knows their types
//! - Messages carry their runtime type so forwarding matches exactly

pub mod context;
pub mod message;
pub mod pool;
pub mod target;

pub use context::{Context, SystemContext};
pub use message::{Message, MessageType, Payload};
pub use pool::{PoolError, WorkerPool};
pub use target::{deliver_to_matching, Target, TargetRef};
