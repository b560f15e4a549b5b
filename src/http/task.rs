//! Worker task: decode a request buffer and run the routing step.
//!
//! # Responsibilities
//! - Refresh the URI registry against the live components
//! - Decode the buffer and resolve the path
//! - Call the bound component (GET) or decode its payload (POST)
//!
//! # Design Decisions
//! - Runs on the worker pool, never on the reactor thread
//! - Never fails: every problem becomes a `ResponseProcess`

use std::sync::Arc;

use arc_swap::ArcSwap;
use http::StatusCode;
use uuid::Uuid;

use crate::codec::CodecRegistry;
use crate::http::process::ResponseProcess;
use crate::http::request::{HttpRequest, Method};
use crate::routing::UriRegistry;
use crate::runtime::context::Context;

/// Builds tasks that share the server's registries.
#[derive(Clone)]
pub struct TaskFactory {
    codecs: Arc<ArcSwap<CodecRegistry>>,
    uris: Arc<UriRegistry>,
    context: Arc<dyn Context>,
}

impl TaskFactory {
    pub fn new(codecs: Arc<ArcSwap<CodecRegistry>>, uris: Arc<UriRegistry>, context: Arc<dyn Context>) -> Self {
        Self { codecs, uris, context }
    }

    /// A task for one request buffer, bound to the current codec table.
    pub fn task(&self, buffer: Vec<u8>) -> RequestTask {
        RequestTask {
            request_id: Uuid::new_v4(),
            buffer,
            codecs: self.codecs.load_full(),
            uris: Arc::clone(&self.uris),
            context: Arc::clone(&self.context),
        }
    }
}

/// One unit of deferred request work.
pub struct RequestTask {
    request_id: Uuid,
    buffer: Vec<u8>,
    codecs: Arc<CodecRegistry>,
    uris: Arc<UriRegistry>,
    context: Arc<dyn Context>,
}

impl RequestTask {
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn run(self) -> ResponseProcess {
        self.uris.update_units(self.context.as_ref());

        let request = match HttpRequest::decode(&self.buffer) {
            Ok(request) => request,
            Err(e) => {
                tracing::debug!(request_id = %self.request_id, error = %e, "Undecodable request");
                return ResponseProcess::unknown();
            }
        };

        let Some(method) = request.method else {
            tracing::debug!(request_id = %self.request_id, method = %request.raw_method, "Unsupported method");
            return ResponseProcess::unknown();
        };

        tracing::debug!(request_id = %self.request_id, method = %method, path = %request.path, "Routing request");

        let Some(entry) = self.uris.get_methods_by_path(&request.path) else {
            tracing::debug!(request_id = %self.request_id, path = %request.path, "No route registered");
            return ResponseProcess::status(method, StatusCode::NOT_FOUND);
        };

        if !entry.allows(method) {
            tracing::debug!(
                request_id = %self.request_id,
                path = %request.path,
                method = %method,
                allowed = ?entry.methods(),
                "Method not allowed"
            );
            return ResponseProcess::status(method, StatusCode::METHOD_NOT_ALLOWED);
        }

        let Some(target) = entry.target() else {
            tracing::debug!(request_id = %self.request_id, path = %request.path, "No component bound to path");
            return ResponseProcess::absent(method);
        };

        match method {
            Method::Get => match target.value() {
                Some(value) => ResponseProcess::value(method, value),
                None => ResponseProcess::absent(method),
            },
            Method::Post => {
                let declared = target.message_type();
                let Some(codec) = self.codecs.get(&declared) else {
                    tracing::warn!(request_id = %self.request_id, message_type = %declared, "No codec for declared message type");
                    return ResponseProcess::absent(method);
                };
                match codec.decode(&request.body) {
                    Ok(message) => ResponseProcess::value(method, message),
                    Err(e) => {
                        tracing::debug!(request_id = %self.request_id, error = %e, message_type = %declared, "Body decode failed");
                        ResponseProcess::absent(method)
                    }
                }
            }
        }
    }
}
