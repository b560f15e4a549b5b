//! Outcome of one request, handed from a worker task to the response encoder.

use http::StatusCode;

use crate::http::request::Method;
use crate::runtime::message::Message;

/// What the routing step produced.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Answer with this status and no body.
    Status(StatusCode),
    /// A typed result: the GET value or the decoded POST payload.
    Value(Message),
    /// Nothing was produced.
    Absent,
}

/// Method plus outcome of a processed request.
///
/// Produced once per request and consumed once when the response is written.
#[derive(Debug, Clone)]
pub struct ResponseProcess {
    method: Option<Method>,
    outcome: Outcome,
}

impl ResponseProcess {
    pub fn new(method: Option<Method>, outcome: Outcome) -> Self {
        Self { method, outcome }
    }

    pub fn status(method: Method, status: StatusCode) -> Self {
        Self::new(Some(method), Outcome::Status(status))
    }

    pub fn value(method: Method, message: Message) -> Self {
        Self::new(Some(method), Outcome::Value(message))
    }

    pub fn absent(method: Method) -> Self {
        Self::new(Some(method), Outcome::Absent)
    }

    /// A request whose method could not be determined.
    pub fn unknown() -> Self {
        Self::new(None, Outcome::Absent)
    }

    pub fn method(&self) -> Option<Method> {
        self.method
    }

    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    pub fn into_parts(self) -> (Option<Method>, Outcome) {
        (self.method, self.outcome)
    }
}
