//! Type-erased messages exchanged with runtime components.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Identity of a declared message type.
///
/// Equality and hashing use only the [`TypeId`]; the name is kept for logs.
#[derive(Clone, Copy)]
pub struct MessageType {
    id: TypeId,
    name: &'static str,
}

impl MessageType {
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for MessageType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for MessageType {}

impl Hash for MessageType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Anything that can travel as a [`Message`]: shareable and printable.
pub trait Payload: Any + Send + Sync + fmt::Debug + fmt::Display {
    fn as_any(&self) -> &dyn Any;
}

impl<T> Payload for T
where
    T: Any + Send + Sync + fmt::Debug + fmt::Display,
{
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A typed value whose concrete type is known only at runtime.
///
/// Cloning is cheap; the payload is shared.
#[derive(Clone)]
pub struct Message {
    ty: MessageType,
    payload: Arc<dyn Payload>,
}

impl Message {
    pub fn new<T: Payload>(value: T) -> Self {
        Self {
            ty: MessageType::of::<T>(),
            payload: Arc::new(value),
        }
    }

    /// Runtime type of the carried value.
    pub fn message_type(&self) -> MessageType {
        self.ty
    }

    pub fn is<T: 'static>(&self) -> bool {
        self.ty == MessageType::of::<T>()
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        Payload::as_any(self.payload.as_ref()).downcast_ref::<T>()
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("type", &self.ty)
            .field("payload", &self.payload)
            .finish()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.payload.as_ref(), f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Reading(u32);

    impl fmt::Display for Reading {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "reading={}", self.0)
        }
    }

    #[test]
    fn downcast_recovers_concrete_value() {
        let message = Message::new(Reading(7));
        assert!(message.is::<Reading>());
        assert_eq!(message.downcast_ref::<Reading>(), Some(&Reading(7)));
        assert!(message.downcast_ref::<String>().is_none());
        assert_eq!(message.to_string(), "reading=7");
    }

    #[test]
    fn message_type_compares_by_type_only() {
        assert_eq!(MessageType::of::<Reading>(), Message::new(Reading(1)).message_type());
        assert_ne!(MessageType::of::<Reading>(), MessageType::of::<String>());
    }
}
