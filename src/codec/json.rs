//! JSON codec built on serde.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec::{CodecError, HttpCodec};
use crate::runtime::message::{Message, MessageType, Payload};

/// Codec for any serde type that can travel as a [`Message`].
pub struct JsonCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonCodec<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> HttpCodec for JsonCodec<T>
where
    T: Payload + Serialize + DeserializeOwned,
{
    fn message_type(&self) -> MessageType {
        MessageType::of::<T>()
    }

    fn decode(&self, body: &[u8]) -> Result<Message, CodecError> {
        let value: T = serde_json::from_slice(body)?;
        Ok(Message::new(value))
    }

    fn encode(&self, message: &Message) -> Result<Vec<u8>, CodecError> {
        let value = message
            .downcast_ref::<T>()
            .ok_or_else(|| CodecError::TypeMismatch {
                expected: self.message_type(),
                found: message.message_type(),
            })?;
        Ok(serde_json::to_vec(value)?)
    }

    fn content_type(&self) -> &'static str {
        "application/json"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::fmt;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Command {
        action: String,
        speed: u8,
    }

    impl fmt::Display for Command {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}@{}", self.action, self.speed)
        }
    }

    #[test]
    fn decodes_body_into_declared_type() {
        let codec = JsonCodec::<Command>::new();
        let message = codec.decode(br#"{"action":"move","speed":3}"#).unwrap();
        assert_eq!(
            message.downcast_ref::<Command>(),
            Some(&Command { action: "move".into(), speed: 3 })
        );
    }

    #[test]
    fn malformed_body_is_a_json_error() {
        let codec = JsonCodec::<Command>::new();
        assert!(matches!(codec.decode(b"{\"action\":"), Err(CodecError::Json(_))));
        assert!(matches!(codec.decode(b""), Err(CodecError::Json(_))));
    }

    #[test]
    fn encode_rejects_foreign_type() {
        let codec = JsonCodec::<Command>::new();
        let err = codec.encode(&Message::new(String::from("x"))).unwrap_err();
        assert!(matches!(err, CodecError::TypeMismatch { .. }));

        let bytes = codec
            .encode(&Message::new(Command { action: "stop".into(), speed: 0 }))
            .unwrap();
        assert_eq!(bytes, br#"{"action":"stop","speed":0}"#);
    }
}
