//! Target component references.
//!
//! # Responsibilities
//! - Describe what the server needs from a downstream component
//! - Fan a decoded POST payload out to forward targets of the same type
//!
//! # Design Decisions
//! - Delivery is fire-and-forget; a component handles its own failures
//! - Matching is by exact runtime type, never by conversion

use std::fmt;
use std::sync::Arc;

use crate::runtime::message::{Message, MessageType};

/// A downstream component that can be queried or sent messages.
pub trait Target: Send + Sync {
    /// Component id inside the host runtime.
    fn id(&self) -> &str;

    /// Type of message the component declares it accepts.
    fn message_type(&self) -> MessageType;

    /// Deliver a message. Must not block the caller on processing.
    fn deliver(&self, message: Message);

    /// Read-style accessor used for GET requests. `None` means the
    /// component has nothing to report.
    fn value(&self) -> Option<Message> {
        None
    }
}

/// Shared handle to a target component.
pub type TargetRef = Arc<dyn Target>;

impl fmt::Debug for dyn Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Target")
            .field("id", &self.id())
            .field("message_type", &self.message_type())
            .finish()
    }
}

/// Deliver `message` to every target whose declared type matches the
/// message's runtime type. Returns the number of deliveries.
pub fn deliver_to_matching(targets: &[TargetRef], message: &Message) -> usize {
    let mut delivered = 0;
    for target in targets {
        if target.message_type() == message.message_type() {
            tracing::trace!(target_id = target.id(), message_type = %message.message_type(), "Forwarding message");
            target.deliver(message.clone());
            delivered += 1;
        }
    }
    delivered
}
