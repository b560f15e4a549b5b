//! Per-connection state machine driven by the reactor.
//!
//! # Responsibilities
//! - Accept connections and register them for READ
//! - Read a request into the shared buffer and hand it to a worker
//! - With a fixed read length, accumulate input across readiness events
//!   until that many bytes have arrived
//! - Write the encoded response, then forward the POST payload
//! - Close connections on completion, error, or idle timeout
//!
//! # Design Decisions
//! - Each connection serves exactly one request (HTTP/1.0, `Connection: close`)
//! - A connection is registered for exactly one of READ or WRITE at a time
//! - Tokens come from a monotonic counter and are never reused; a late
//!   worker completion for a closed connection is dropped

use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use http::StatusCode;
use mio::net::TcpStream;
use mio::{Interest, Registry, Token, Waker};
use tokio::sync::mpsc::UnboundedSender;

use crate::codec::CodecRegistry;
use crate::config::{DispatchMode, ListenerConfig};
use crate::http::process::{Outcome, ResponseProcess};
use crate::http::request::Method;
use crate::http::response::ResponseEncoder;
use crate::http::task::TaskFactory;
use crate::net::listener::Listener;
use crate::observability::metrics;
use crate::runtime::message::Message;
use crate::runtime::pool::{PoolError, WorkerPool};
use crate::runtime::target::{deliver_to_matching, TargetRef};

/// First token handed to a connection. Lower tokens belong to the reactor.
pub const FIRST_CONNECTION: usize = 2;

/// Unique identifier for a connection, also its poll token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    pub fn token(&self) -> Token {
        Token(self.0 as usize)
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Where a connection is in its single request/response exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Registered for READ, waiting for request bytes.
    Reading,
    /// Request handed to a worker; no interest until it completes.
    Processing,
    /// Registered for WRITE, response pending or partially written.
    Writing,
}

/// Result of handling READ readiness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Nothing to read yet; the connection stays registered for READ.
    Empty,
    /// The peer closed without sending a request, or the connection is gone.
    Closed,
    /// The request was processed and the connection now waits for WRITE.
    Ready,
    /// The request was handed to a worker; the completion arrives later.
    Deferred,
    /// READ readiness arrived while the connection was not reading.
    Busy,
}

/// Result of handling WRITE readiness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Bytes remain; wait for the next WRITE readiness.
    Pending,
    /// Response fully written and the connection closed.
    Completed,
}

/// A worker's result for a deferred request.
#[derive(Debug)]
pub struct Completion {
    pub token: Token,
    pub result: Result<ResponseProcess, PoolError>,
}

/// Everything a connection needs beyond its socket.
pub struct ConnectionServices {
    pub pool: WorkerPool,
    pub tasks: TaskFactory,
    pub encoder: ResponseEncoder,
    pub codecs: Arc<ArcSwap<CodecRegistry>>,
    /// Components that receive forwarded POST payloads.
    pub targets: Vec<TargetRef>,
}

struct Outbound {
    bytes: Vec<u8>,
    written: usize,
    status: StatusCode,
    method: &'static str,
    forward: Option<Message>,
}

struct Connection {
    id: ConnectionId,
    stream: TcpStream,
    peer: SocketAddr,
    state: ConnectionState,
    interest: Interest,
    /// Request bytes read so far.
    received: Vec<u8>,
    pending: Option<ResponseProcess>,
    outbound: Option<Outbound>,
    started: Option<Instant>,
    last_activity: Instant,
}

impl Connection {
    /// Whether a POST payload is still waiting to be forwarded.
    fn holds_forward(&self) -> bool {
        let pending = self
            .pending
            .as_ref()
            .is_some_and(|p| p.method() == Some(Method::Post) && matches!(p.outcome(), Outcome::Value(_)));
        pending || self.outbound.as_ref().is_some_and(|o| o.forward.is_some())
    }
}

struct Filled {
    len: usize,
    eof: bool,
}

/// Read until the source would block, hits EOF, or `limit` bytes are in.
fn fill<R: Read>(source: &mut R, buffer: &mut [u8], stopper: Option<usize>) -> io::Result<Filled> {
    let limit = stopper.map_or(buffer.len(), |s| s.min(buffer.len()));
    let mut len = 0;

    while len < limit {
        match source.read(&mut buffer[len..limit]) {
            Ok(0) => return Ok(Filled { len, eof: true }),
            Ok(n) => len += n,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    Ok(Filled { len, eof: false })
}

/// Owns every open connection of one reactor.
pub struct ConnectionManager {
    connections: HashMap<Token, Connection>,
    next_id: u64,
    /// Request buffer reused across reads; its length is the configured capacity.
    scratch: Vec<u8>,
    stopper: Option<usize>,
    dispatch: DispatchMode,
    services: ConnectionServices,
    completions: UnboundedSender<Completion>,
    waker: Arc<Waker>,
}

impl ConnectionManager {
    pub fn new(
        config: &ListenerConfig,
        services: ConnectionServices,
        completions: UnboundedSender<Completion>,
        waker: Arc<Waker>,
    ) -> Self {
        Self {
            connections: HashMap::new(),
            next_id: FIRST_CONNECTION as u64,
            scratch: vec![0; config.buffer_capacity],
            stopper: config.stopper,
            dispatch: config.dispatch,
            services,
            completions,
            waker,
        }
    }

    /// Accept every pending connection. Returns how many were registered.
    pub fn accept(&mut self, listener: &Listener, registry: &Registry) -> usize {
        let mut accepted = 0;

        loop {
            let (mut stream, peer) = match listener.accept() {
                Ok(pair) => pair,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::warn!(error = %e, "Accept failed");
                    break;
                }
            };

            let id = ConnectionId(self.next_id);
            self.next_id += 1;
            let token = id.token();

            if let Err(e) = registry.register(&mut stream, token, Interest::READABLE) {
                tracing::warn!(connection_id = %id, peer = %peer, error = %e, "Connection registration failed");
                continue;
            }

            let now = Instant::now();
            self.connections.insert(
                token,
                Connection {
                    id,
                    stream,
                    peer,
                    state: ConnectionState::Reading,
                    interest: Interest::READABLE,
                    received: Vec::new(),
                    pending: None,
                    outbound: None,
                    started: None,
                    last_activity: now,
                },
            );
            metrics::record_connection_opened();
            tracing::trace!(connection_id = %id, peer = %peer, "Connection accepted");
            accepted += 1;
        }

        accepted
    }

    /// Handle READ readiness.
    pub fn read(&mut self, token: Token, registry: &Registry) -> io::Result<ReadOutcome> {
        let Some(conn) = self.connections.get_mut(&token) else {
            return Ok(ReadOutcome::Closed);
        };
        if conn.state != ConnectionState::Reading {
            tracing::trace!(connection_id = %conn.id, state = ?conn.state, "Read readiness ignored");
            return Ok(ReadOutcome::Busy);
        }

        let remaining = self.stopper.map(|length| length.saturating_sub(conn.received.len()));
        let filled = fill(&mut conn.stream, &mut self.scratch, remaining)?;
        conn.last_activity = Instant::now();
        conn.received.extend_from_slice(&self.scratch[..filled.len]);

        if conn.received.is_empty() {
            if filled.eof {
                tracing::trace!(connection_id = %conn.id, "Peer closed before sending a request");
                self.close(token, registry);
                return Ok(ReadOutcome::Closed);
            }
            metrics::record_empty_read();
            tracing::trace!(connection_id = %conn.id, "Empty read, still waiting");
            return Ok(ReadOutcome::Empty);
        }

        if let Some(length) = self.stopper {
            if conn.received.len() < length && !filled.eof {
                if filled.len == 0 {
                    metrics::record_empty_read();
                }
                tracing::trace!(
                    connection_id = %conn.id,
                    received = conn.received.len(),
                    expected = length,
                    "Fixed-length request incomplete"
                );
                return Ok(ReadOutcome::Empty);
            }
        }

        conn.state = ConnectionState::Processing;
        conn.started = Some(conn.last_activity);
        let id = conn.id;
        let request = std::mem::take(&mut conn.received);
        let bytes = request.len();

        let task = self.services.tasks.task(request);
        tracing::debug!(
            connection_id = %id,
            request_id = %task.request_id(),
            bytes,
            "Request read"
        );

        let submitted = self.services.pool.submit(move || task.run());

        match self.dispatch {
            DispatchMode::Blocking => {
                let process = self.services.pool.wait(submitted).unwrap_or_else(|e| {
                    tracing::error!(connection_id = %id, error = %e, "Worker task failed");
                    ResponseProcess::unknown()
                });
                self.respond(token, process, registry)?;
                Ok(ReadOutcome::Ready)
            }
            DispatchMode::Deferred => {
                let completions = self.completions.clone();
                let waker = Arc::clone(&self.waker);
                self.services.pool.spawn(async move {
                    let result = match submitted.await {
                        Ok(result) => result,
                        Err(e) => Err(PoolError::Failed(e)),
                    };
                    if completions.send(Completion { token, result }).is_ok() {
                        if let Err(e) = waker.wake() {
                            tracing::warn!(error = %e, "Failed to wake reactor");
                        }
                    }
                });
                Ok(ReadOutcome::Deferred)
            }
        }
    }

    /// Apply a deferred worker result. Returns false if the connection is gone.
    pub fn complete(&mut self, completion: Completion, registry: &Registry) -> io::Result<bool> {
        let token = completion.token;
        if !self.connections.contains_key(&token) {
            tracing::trace!(token = token.0, "Completion for a closed connection dropped");
            return Ok(false);
        }

        let process = completion.result.unwrap_or_else(|e| {
            tracing::error!(token = token.0, error = %e, "Worker task failed");
            ResponseProcess::unknown()
        });
        self.respond(token, process, registry)?;
        Ok(true)
    }

    fn respond(&mut self, token: Token, process: ResponseProcess, registry: &Registry) -> io::Result<()> {
        let Some(conn) = self.connections.get_mut(&token) else {
            return Ok(());
        };
        conn.pending = Some(process);
        conn.state = ConnectionState::Writing;
        registry.reregister(&mut conn.stream, token, Interest::WRITABLE)?;
        conn.interest = Interest::WRITABLE;
        Ok(())
    }

    /// Handle WRITE readiness.
    pub fn write(&mut self, token: Token, registry: &Registry) -> io::Result<WriteOutcome> {
        let Some(conn) = self.connections.get_mut(&token) else {
            return Ok(WriteOutcome::Completed);
        };
        if conn.state != ConnectionState::Writing {
            tracing::trace!(connection_id = %conn.id, state = ?conn.state, "Write readiness ignored");
            return Ok(WriteOutcome::Pending);
        }

        if conn.outbound.is_none() {
            let process = conn.pending.take().unwrap_or_else(ResponseProcess::unknown);
            let method = process.method().map_or("UNKNOWN", |m| m.as_str());
            let codecs = self.services.codecs.load();
            let encoded = self.services.encoder.encode(process, &codecs);
            conn.outbound = Some(Outbound {
                bytes: encoded.bytes,
                written: 0,
                status: encoded.status,
                method,
                forward: encoded.forward,
            });
        }

        let Connection {
            id,
            stream,
            outbound,
            started,
            last_activity,
            ..
        } = conn;
        let Some(out) = outbound.as_mut() else {
            return Ok(WriteOutcome::Completed);
        };

        while out.written < out.bytes.len() {
            match stream.write(&out.bytes[out.written..]) {
                Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
                Ok(n) => {
                    out.written += n;
                    *last_activity = Instant::now();
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    tracing::trace!(connection_id = %id, written = out.written, total = out.bytes.len(), "Partial write");
                    return Ok(WriteOutcome::Pending);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        let id = *id;
        let started = *started;
        let Some(finished) = outbound.take() else {
            return Ok(WriteOutcome::Completed);
        };

        metrics::record_request(finished.method, finished.status.as_u16(), started);
        tracing::debug!(
            connection_id = %id,
            method = finished.method,
            status = finished.status.as_u16(),
            bytes = finished.bytes.len(),
            "Response written"
        );

        self.close(token, registry);

        if let Some(message) = finished.forward {
            let delivered = deliver_to_matching(&self.services.targets, &message);
            metrics::record_forwarded(delivered);
            tracing::debug!(connection_id = %id, message_type = %message.message_type(), delivered, "Payload forwarded");
        }

        Ok(WriteOutcome::Completed)
    }

    /// Close a connection after an I/O error.
    pub fn abandon(&mut self, token: Token, registry: &Registry, error: &io::Error) {
        if let Some(conn) = self.connections.get(&token) {
            tracing::debug!(connection_id = %conn.id, peer = %conn.peer, error = %error, "Connection failed");
        }
        self.close(token, registry);
    }

    pub fn close(&mut self, token: Token, registry: &Registry) {
        if let Some(mut conn) = self.connections.remove(&token) {
            if let Err(e) = registry.deregister(&mut conn.stream) {
                tracing::trace!(connection_id = %conn.id, error = %e, "Deregistration failed");
            }
            metrics::record_connection_closed();
            tracing::trace!(connection_id = %conn.id, "Connection closed");
        }
    }

    /// Close connections idle for at least `timeout`. Connections waiting
    /// on a worker are never expired. A POST payload not yet forwarded is
    /// dropped with its connection.
    pub fn expire(&mut self, now: Instant, timeout: Duration, registry: &Registry) -> usize {
        let expired: Vec<Token> = self
            .connections
            .iter()
            .filter(|(_, c)| c.state != ConnectionState::Processing)
            .filter(|(_, c)| now.saturating_duration_since(c.last_activity) >= timeout)
            .map(|(token, _)| *token)
            .collect();

        for token in &expired {
            if let Some(conn) = self.connections.get(token) {
                if conn.holds_forward() {
                    metrics::record_forward_dropped();
                    tracing::debug!(connection_id = %conn.id, peer = %conn.peer, "Idle connection expired before its response was written, forward dropped");
                } else {
                    tracing::debug!(connection_id = %conn.id, peer = %conn.peer, "Idle connection expired");
                }
            }
            self.close(*token, registry);
        }
        expired.len()
    }

    /// Time until the next idle connection expires.
    pub fn next_expiry(&self, now: Instant, timeout: Duration) -> Option<Duration> {
        self.connections
            .values()
            .filter(|c| c.state != ConnectionState::Processing)
            .map(|c| (c.last_activity + timeout).saturating_duration_since(now))
            .min()
    }

    pub fn close_all(&mut self, registry: &Registry) {
        let tokens: Vec<Token> = self.connections.keys().copied().collect();
        let count = tokens.len();
        for token in tokens {
            self.close(token, registry);
        }
        if count > 0 {
            tracing::debug!(count, "Open connections closed");
        }
    }

    pub fn contains(&self, token: Token) -> bool {
        self.connections.contains_key(&token)
    }

    pub fn state(&self, token: Token) -> Option<ConnectionState> {
        self.connections.get(&token).map(|c| c.state)
    }

    /// Whether the connection still owes a forward of its POST payload.
    pub fn holds_forward(&self, token: Token) -> bool {
        self.connections.get(&token).is_some_and(Connection::holds_forward)
    }

    /// The readiness the connection is currently registered for.
    pub fn interest(&self, token: Token) -> Option<Interest> {
        self.connections.get(&token).map(|c| c.interest)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
