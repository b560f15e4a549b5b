//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! request bytes (from the reactor)
//!     → task.rs (on a worker: refresh units, decode, route)
//!         → request.rs (request line, headers, body)
//!         → routing::UriRegistry (path → methods, component)
//!     → process.rs (method + outcome)
//!     → response.rs (status line, headers, body; payload to forward)
//!     → back to the reactor for writing
//! ```
//!
//! # Design Decisions
//! - HTTP/1.0 only, one request per connection
//! - Only GET and POST are understood; anything else answers 400
//! - server.rs owns lifecycle; nothing here touches sockets directly

pub mod process;
pub mod request;
pub mod response;
pub mod server;
pub mod task;

pub use process::{Outcome, ResponseProcess};
pub use request::{HttpRequest, Method, ProtocolError};
pub use response::{EncodedResponse, ResponseEncoder};
pub use server::{HttpServer, ServerError};
pub use task::{RequestTask, TaskFactory};
