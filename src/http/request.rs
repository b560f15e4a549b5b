//! Request decoding.
//!
//! # Responsibilities
//! - Parse the request line into method, path and version
//! - Collect headers and the body that followed them
//! - Normalise the request target into a registry path
//!
//! # Design Decisions
//! - Only GET and POST are understood; anything else decodes with no
//!   method so the response layer can answer 400
//! - The body is whatever arrived after the header block, cut to
//!   `Content-Length` when the header is present and smaller

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::routing::normalize_path;

/// Request methods this server routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            other => Err(ProtocolError::UnsupportedMethod(other.to_string())),
        }
    }
}

/// Reasons a request cannot be decoded.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("request is empty")]
    Empty,
    #[error("request head is not valid UTF-8")]
    InvalidEncoding,
    #[error("malformed request line: {0:?}")]
    MalformedRequestLine(String),
    #[error("unsupported method: {0}")]
    UnsupportedMethod(String),
}

/// A decoded request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// `None` when the method is not GET or POST.
    pub method: Option<Method>,
    /// Method token exactly as received.
    pub raw_method: String,
    /// Normalised path, e.g. `sensor` for `/sensor?x=1`.
    pub path: String,
    pub version: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    /// Decode a complete request buffer.
    pub fn decode(buffer: &[u8]) -> Result<Self, ProtocolError> {
        if buffer.iter().all(|b| b.is_ascii_whitespace() || *b == 0) {
            return Err(ProtocolError::Empty);
        }

        let (head, body) = split_head(buffer);
        let head = std::str::from_utf8(head).map_err(|_| ProtocolError::InvalidEncoding)?;
        let mut lines = head.lines().skip_while(|line| line.trim().is_empty());

        let request_line = lines.next().ok_or(ProtocolError::Empty)?;
        let mut parts = request_line.split_whitespace();
        let (raw_method, target, version) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(m), Some(t), Some(v), None) if v.starts_with("HTTP/") => (m, t, v),
            _ => return Err(ProtocolError::MalformedRequestLine(request_line.to_string())),
        };

        let headers: Vec<(String, String)> = lines
            .filter_map(|line| {
                let (name, value) = line.split_once(':')?;
                Some((name.trim().to_string(), value.trim().to_string()))
            })
            .collect();

        let mut body = body.to_vec();
        let declared = headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.parse::<usize>().ok());
        if let Some(len) = declared {
            body.truncate(len);
        }

        Ok(Self {
            method: raw_method.parse().ok(),
            raw_method: raw_method.to_string(),
            path: normalize_path(target),
            version: version.to_string(),
            headers,
            body,
        })
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Split at the first blank line; accepts CRLF and bare LF framing.
fn split_head(buffer: &[u8]) -> (&[u8], &[u8]) {
    if let Some(pos) = find(buffer, b"\r\n\r\n") {
        return (&buffer[..pos], &buffer[pos + 4..]);
    }
    if let Some(pos) = find(buffer, b"\n\n") {
        return (&buffer[..pos], &buffer[pos + 2..]);
    }
    (buffer, &[])
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_get_request() {
        let request = HttpRequest::decode(b"GET /sensor?unit=c HTTP/1.1\r\nHost: robot\r\n\r\n").unwrap();
        assert_eq!(request.method, Some(Method::Get));
        assert_eq!(request.path, "sensor");
        assert_eq!(request.version, "HTTP/1.1");
        assert_eq!(request.header("host"), Some("robot"));
        assert!(request.body.is_empty());
    }

    #[test]
    fn decodes_post_body_cut_to_content_length() {
        let raw = b"POST /actuate HTTP/1.0\r\nContent-Length: 4\r\n\r\nmovejunk";
        let request = HttpRequest::decode(raw).unwrap();
        assert_eq!(request.method, Some(Method::Post));
        assert_eq!(request.path, "actuate");
        assert_eq!(request.body, b"move");
    }

    #[test]
    fn bare_lf_framing_is_accepted() {
        let request = HttpRequest::decode(b"POST /a HTTP/1.0\nX: y\n\n{}").unwrap();
        assert_eq!(request.body, b"{}");
        assert_eq!(request.header("x"), Some("y"));
    }

    #[test]
    fn other_methods_decode_without_method() {
        let request = HttpRequest::decode(b"DELETE /sensor HTTP/1.1\r\n\r\n").unwrap();
        assert_eq!(request.method, None);
        assert_eq!(request.raw_method, "DELETE");
    }

    #[test]
    fn garbage_is_rejected() {
        assert_eq!(HttpRequest::decode(b"\r\n\0\0"), Err(ProtocolError::Empty));
        assert!(matches!(
            HttpRequest::decode(b"hello world\r\n\r\n"),
            Err(ProtocolError::MalformedRequestLine(_))
        ));
        assert_eq!(
            HttpRequest::decode(&[0xc3, 0x28, b' ', b'/', b'\r', b'\n']),
            Err(ProtocolError::InvalidEncoding)
        );
    }

    #[test]
    fn method_parsing_is_case_sensitive() {
        assert_eq!("GET".parse::<Method>(), Ok(Method::Get));
        assert!("get".parse::<Method>().is_err());
    }
}
