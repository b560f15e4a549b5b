//! Message codec subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     CodecCatalog (namespace → codecs, declared in code)
//!     → registry.rs scan(configured namespaces)
//!     → CodecRegistry (type → codec, immutable)
//!
//! POST request (worker thread):
//!     target.message_type() → registry lookup → codec.decode(body) → Message
//!
//! GET response (reactor thread):
//!     value.message_type() → registry lookup → codec.encode(value) → body
//! ```
//!
//! # Design Decisions
//! - Explicit registration replaces classpath-style scanning
//! - The registry is never mutated after it is built; re-initialisation
//!   swaps in a whole new registry

pub mod json;
pub mod registry;
pub mod text;

use thiserror::Error;

use crate::runtime::message::{Message, MessageType};

pub use json::JsonCodec;
pub use registry::{CodecCatalog, CodecRegistry};
pub use text::TextCodec;

/// Failure to move between wire bytes and a typed value.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid JSON body: {0}")]
    Json(#[from] serde_json::Error),
    #[error("body is not valid UTF-8")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("cannot parse {type_name} from body: {reason}")]
    Parse { type_name: &'static str, reason: String },
    #[error("codec for {expected} cannot encode a {found}")]
    TypeMismatch {
        expected: MessageType,
        found: MessageType,
    },
}

/// Encoder/decoder pair for one declared message type.
pub trait HttpCodec: Send + Sync {
    fn message_type(&self) -> MessageType;

    fn decode(&self, body: &[u8]) -> Result<Message, CodecError>;

    fn encode(&self, message: &Message) -> Result<Vec<u8>, CodecError>;

    /// MIME type of encoded bodies.
    fn content_type(&self) -> &'static str;
}
