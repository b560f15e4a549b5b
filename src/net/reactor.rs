//! Single-threaded readiness loop.
//!
//! # Responsibilities
//! - Own the poll, the listener, and every connection
//! - Route readiness to accept, read, or write handling
//! - Apply deferred worker completions
//! - Expire idle connections
//! - Tear everything down once the server leaves an active state
//!
//! # Design Decisions
//! - The reactor thread never decodes or routes; that happens on workers
//! - Under the zero-ready policy, readiness is collected and only handled
//!   on a wakeup that reports nothing new
//! - A failed readiness wait ends the loop; the server is then STOPPED

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use mio::event::Event;
use mio::{Events, Poll, Token, Waker};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

use crate::config::{ListenerConfig, ReadyPolicy};
use crate::lifecycle::{ServerState, StateCell};
use crate::net::connection::{Completion, ConnectionManager, ConnectionServices};
use crate::net::listener::{Listener, ListenerError};

pub const LISTENER: Token = Token(0);
pub const WAKER: Token = Token(1);

const EVENTS_CAPACITY: usize = 1024;

/// Poll timeout while zero-ready keys are waiting to be handled.
const ZERO_READY_TICK: Duration = Duration::from_millis(10);

/// Cloneable handle for waking a running reactor.
#[derive(Clone)]
pub struct ReactorHandle {
    waker: Arc<Waker>,
}

impl ReactorHandle {
    /// Interrupt the readiness wait so the loop re-checks the server state.
    pub fn wake(&self) {
        if let Err(e) = self.waker.wake() {
            tracing::warn!(error = %e, "Failed to wake reactor");
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ReadyKey {
    token: Token,
    readable: bool,
    writable: bool,
}

impl From<&Event> for ReadyKey {
    fn from(event: &Event) -> Self {
        Self {
            token: event.token(),
            readable: event.is_readable() || event.is_read_closed() || event.is_error(),
            writable: event.is_writable() || event.is_write_closed(),
        }
    }
}

pub struct Reactor {
    poll: Poll,
    events: Events,
    listener: Listener,
    connections: ConnectionManager,
    completions: UnboundedReceiver<Completion>,
    state: Arc<StateCell>,
    ready_policy: ReadyPolicy,
    idle_timeout: Option<Duration>,
    /// Keys collected under the zero-ready policy.
    selected: Vec<ReadyKey>,
}

impl Reactor {
    /// Bind the listener and set up polling. Nothing runs until [`Reactor::run`].
    pub fn bind(
        config: &ListenerConfig,
        services: ConnectionServices,
        state: Arc<StateCell>,
    ) -> Result<(Self, ReactorHandle), ListenerError> {
        let poll = Poll::new().map_err(ListenerError::Poll)?;
        let mut listener = Listener::bind(config)?;
        listener.register(poll.registry(), LISTENER)?;
        let waker = Arc::new(Waker::new(poll.registry(), WAKER).map_err(ListenerError::Poll)?);

        let (completions_tx, completions) = unbounded_channel();
        let connections = ConnectionManager::new(config, services, completions_tx, Arc::clone(&waker));

        let reactor = Self {
            poll,
            events: Events::with_capacity(EVENTS_CAPACITY),
            listener,
            connections,
            completions,
            state,
            ready_policy: config.ready_policy,
            idle_timeout: config.idle_timeout(),
            selected: Vec::new(),
        };
        Ok((reactor, ReactorHandle { waker }))
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.listener.local_addr()
    }

    /// Run until the server state leaves STARTING/STARTED or polling fails.
    pub fn run(mut self) {
        tracing::info!(
            address = %self.listener.local_addr(),
            ready_policy = ?self.ready_policy,
            "Reactor running"
        );

        while self.state.is_active() {
            let timeout = self.poll_timeout();
            if let Err(e) = self.poll.poll(&mut self.events, timeout) {
                if e.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                tracing::error!(error = %e, "Readiness wait failed, reactor stopping");
                break;
            }

            let fresh: Vec<ReadyKey> = self.events.iter().map(ReadyKey::from).collect();
            match self.ready_policy {
                ReadyPolicy::NonEmpty => {
                    for key in fresh {
                        self.dispatch(key);
                    }
                }
                ReadyPolicy::ZeroReady => {
                    if fresh.is_empty() {
                        for key in std::mem::take(&mut self.selected) {
                            self.dispatch(key);
                        }
                    } else {
                        for key in fresh {
                            self.select(key);
                        }
                    }
                }
            }

            self.drain_completions();
            self.sweep_idle();
        }

        self.teardown();
    }

    fn poll_timeout(&self) -> Option<Duration> {
        let idle = self
            .idle_timeout
            .and_then(|timeout| self.connections.next_expiry(Instant::now(), timeout));
        let tick = (self.ready_policy == ReadyPolicy::ZeroReady && !self.selected.is_empty())
            .then_some(ZERO_READY_TICK);

        match (idle, tick) {
            (Some(idle), Some(tick)) => Some(idle.min(tick)),
            (idle, tick) => idle.or(tick),
        }
    }

    /// Remember a key, merging readiness for a token already selected.
    fn select(&mut self, key: ReadyKey) {
        match self.selected.iter_mut().find(|k| k.token == key.token) {
            Some(existing) => {
                existing.readable |= key.readable;
                existing.writable |= key.writable;
            }
            None => self.selected.push(key),
        }
    }

    fn dispatch(&mut self, key: ReadyKey) {
        match key.token {
            LISTENER => {
                let accepted = self.connections.accept(&self.listener, self.poll.registry());
                if accepted > 0 {
                    tracing::trace!(accepted, open = self.connections.len(), "Connections accepted");
                }
            }
            // Completions are drained after every wakeup.
            WAKER => {}
            token => {
                if !self.connections.contains(token) {
                    tracing::trace!(token = token.0, "Readiness for a closed connection skipped");
                    return;
                }
                let registry = self.poll.registry();

                if key.readable {
                    if let Err(e) = self.connections.read(token, registry) {
                        self.connections.abandon(token, registry, &e);
                        return;
                    }
                }
                if key.writable && self.connections.contains(token) {
                    if let Err(e) = self.connections.write(token, registry) {
                        self.connections.abandon(token, registry, &e);
                    }
                }
            }
        }
    }

    fn drain_completions(&mut self) {
        let registry = self.poll.registry();
        while let Ok(completion) = self.completions.try_recv() {
            let token = completion.token;
            if let Err(e) = self.connections.complete(completion, registry) {
                self.connections.abandon(token, registry, &e);
            }
        }
    }

    fn sweep_idle(&mut self) {
        if let Some(timeout) = self.idle_timeout {
            let expired = self.connections.expire(Instant::now(), timeout, self.poll.registry());
            if expired > 0 {
                tracing::debug!(expired, "Idle connections closed");
            }
        }
    }

    fn teardown(mut self) {
        let registry = self.poll.registry();
        self.connections.close_all(registry);
        self.listener.deregister(registry);

        let address = self.listener.local_addr();
        drop(self.listener);
        self.state.set(ServerState::Stopped);
        tracing::info!(address = %address, "Reactor stopped, listener closed");
    }
}
