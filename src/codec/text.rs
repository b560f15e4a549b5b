//! Plain-text codec for types with `FromStr` and `Display`.

use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

use crate::codec::{CodecError, HttpCodec};
use crate::runtime::message::{Message, MessageType, Payload};

/// Decodes a trimmed UTF-8 body with `FromStr`, encodes with `Display`.
pub struct TextCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> TextCodec<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for TextCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> HttpCodec for TextCodec<T>
where
    T: Payload + FromStr,
    T::Err: fmt::Display,
{
    fn message_type(&self) -> MessageType {
        MessageType::of::<T>()
    }

    fn decode(&self, body: &[u8]) -> Result<Message, CodecError> {
        let text = std::str::from_utf8(body)?.trim();
        let value = text.parse::<T>().map_err(|e| CodecError::Parse {
            type_name: std::any::type_name::<T>(),
            reason: e.to_string(),
        })?;
        Ok(Message::new(value))
    }

    fn encode(&self, message: &Message) -> Result<Vec<u8>, CodecError> {
        let value = message
            .downcast_ref::<T>()
            .ok_or_else(|| CodecError::TypeMismatch {
                expected: self.message_type(),
                found: message.message_type(),
            })?;
        Ok(value.to_string().into_bytes())
    }

    fn content_type(&self) -> &'static str {
        "text/plain; charset=utf-8"
    }
}
