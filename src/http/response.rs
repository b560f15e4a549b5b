//! Response encoding.
//!
//! # Responsibilities
//! - Turn a `ResponseProcess` into HTTP/1.0 response bytes
//! - Hand a POST payload back to the caller for forwarding
//!
//! # Rendering Rules
//! ```text
//! method   outcome        response
//! GET      Status(c)      c, empty body
//! GET      Value(v)       200, Server header, body = text of v
//! GET      Absent         501
//! POST     Status(c)      c, empty body
//! POST     Value(v)       202, empty body, v forwarded afterwards
//! POST     Absent         501
//! unknown  any            400
//! ```
//!
//! # Design Decisions
//! - Every response carries `Connection: close`; there is no keep-alive
//! - `Content-Length` is emitted unless disabled for byte compatibility
//!   with clients that expect the bare legacy form
//! - A GET body is the value's text form; codec rendering is opt-in

use http::StatusCode;

use crate::codec::CodecRegistry;
use crate::http::process::{Outcome, ResponseProcess};
use crate::http::request::Method;
use crate::runtime::message::Message;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Rendered response plus the payload to forward once it is written.
#[derive(Debug)]
pub struct EncodedResponse {
    pub status: StatusCode,
    pub bytes: Vec<u8>,
    pub forward: Option<Message>,
}

/// Renders responses for one server unit.
#[derive(Debug, Clone)]
pub struct ResponseEncoder {
    server_id: String,
    content_length: bool,
    codec_bodies: bool,
}

impl ResponseEncoder {
    pub fn new(server_id: impl Into<String>, content_length: bool) -> Self {
        Self {
            server_id: server_id.into(),
            content_length,
            codec_bodies: false,
        }
    }

    /// Render GET values with the codec registered for their type.
    pub fn with_codec_bodies(mut self, enabled: bool) -> Self {
        self.codec_bodies = enabled;
        self
    }

    pub fn server_id(&self) -> &str {
        &self.server_id
    }

    /// Encode `process`, consuming it. `codecs` is consulted only when codec
    /// bodies are enabled.
    pub fn encode(&self, process: ResponseProcess, codecs: &CodecRegistry) -> EncodedResponse {
        let (method, outcome) = process.into_parts();
        match (method, outcome) {
            (None, _) => self.status_only(StatusCode::BAD_REQUEST),
            (Some(Method::Get), Outcome::Status(status)) => self.status_only(status),
            (Some(Method::Get), Outcome::Value(message)) => self.ok(&message, codecs),
            (Some(Method::Post), Outcome::Status(status)) => self.status_only(status),
            (Some(Method::Post), Outcome::Value(message)) => {
                let mut response = self.status_only(StatusCode::ACCEPTED);
                response.forward = Some(message);
                response
            }
            (Some(_), Outcome::Absent) => self.status_only(StatusCode::NOT_IMPLEMENTED),
        }
    }

    fn status_only(&self, status: StatusCode) -> EncodedResponse {
        EncodedResponse {
            status,
            bytes: self.render(status, &[], &[]),
            forward: None,
        }
    }

    fn ok(&self, message: &Message, codecs: &CodecRegistry) -> EncodedResponse {
        let rendered = if self.codec_bodies {
            codecs.get(&message.message_type()).and_then(|codec| match codec.encode(message) {
                Ok(bytes) => Some((bytes, codec.content_type())),
                Err(e) => {
                    tracing::warn!(error = %e, message_type = %message.message_type(), "Codec failed to encode value, using text form");
                    None
                }
            })
        } else {
            None
        };
        let (body, content_type) = rendered.unwrap_or_else(|| (message.to_string().into_bytes(), TEXT_PLAIN));

        let headers = [("Server", self.server_id.as_str()), ("Content-Type", content_type)];
        EncodedResponse {
            status: StatusCode::OK,
            bytes: self.render(StatusCode::OK, &headers, &body),
            forward: None,
        }
    }

    fn render(&self, status: StatusCode, headers: &[(&str, &str)], body: &[u8]) -> Vec<u8> {
        let mut head = format!(
            "HTTP/1.0 {} {}\r\n",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown")
        );
        for (name, value) in headers {
            head.push_str(name);
            head.push_str(": ");
            head.push_str(value);
            head.push_str("\r\n");
        }
        if self.content_length {
            head.push_str(&format!("Content-Length: {}\r\n", body.len()));
        }
        head.push_str("Connection: close\r\n\r\n");

        let mut bytes = head.into_bytes();
        bytes.extend_from_slice(body);
        bytes
    }
}
