//! Shared utilities for integration and load testing.

#![allow(dead_code)]

use std::fmt;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use component_http::codec::{CodecCatalog, JsonCodec, TextCodec};
use component_http::config::{ListenerConfig, UnitBinding};
use component_http::http::{HttpServer, Method};
use component_http::routing::UriRegistry;
use component_http::runtime::{Context, Message, MessageType, Payload, SystemContext, Target, WorkerPool};

/// Payload decoded from JSON POST bodies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub action: String,
    pub level: u32,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.action, self.level)
    }
}

/// Payload with no codec anywhere; rendered through Display.
#[derive(Debug, Clone, PartialEq)]
pub struct Literal(pub String);

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Test component: returns a configurable value and records deliveries.
pub struct Unit {
    id: String,
    ty: MessageType,
    value: Mutex<Option<Message>>,
    received: Mutex<Vec<Message>>,
    panics: bool,
}

impl Unit {
    pub fn new<T: Payload>(id: &str) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            ty: MessageType::of::<T>(),
            value: Mutex::new(None),
            received: Mutex::new(Vec::new()),
            panics: false,
        })
    }

    pub fn returning<T: Payload>(id: &str, value: T) -> Arc<Self> {
        let unit = Self::new::<T>(id);
        unit.set_value(Some(Message::new(value)));
        unit
    }

    /// A component whose accessor panics.
    pub fn panicking<T: Payload>(id: &str) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            ty: MessageType::of::<T>(),
            value: Mutex::new(None),
            received: Mutex::new(Vec::new()),
            panics: true,
        })
    }

    pub fn set_value(&self, value: Option<Message>) {
        *self.value.lock().unwrap() = value;
    }

    pub fn received(&self) -> Vec<Message> {
        self.received.lock().unwrap().clone()
    }
}

impl Target for Unit {
    fn id(&self) -> &str {
        &self.id
    }

    fn message_type(&self) -> MessageType {
        self.ty
    }

    fn deliver(&self, message: Message) {
        self.received.lock().unwrap().push(message);
    }

    fn value(&self) -> Option<Message> {
        if self.panics {
            panic!("component {} failed", self.id);
        }
        self.value.lock().unwrap().clone()
    }
}

/// Codecs for the test payloads, under the `app` namespace.
pub fn catalog() -> CodecCatalog {
    CodecCatalog::new()
        .with_codec("app.commands", Arc::new(JsonCodec::<Command>::new()))
        .with_codec("app.numbers", Arc::new(TextCodec::<u32>::new()))
        .with_codec("app.strings", Arc::new(JsonCodec::<String>::new()))
}

/// Listener on an ephemeral port with `bindings` of (path, unit, methods).
pub fn listener_config(bindings: &[(&str, &str, &[Method])]) -> ListenerConfig {
    let mut config = ListenerConfig {
        port: 0,
        buffer_capacity: 64 * 1024,
        packages: vec!["app".to_string()],
        ..ListenerConfig::default()
    };
    for (path, unit, methods) in bindings {
        config.target_units.insert(
            path.to_string(),
            UnitBinding::Detailed {
                unit: unit.to_string(),
                methods: methods.to_vec(),
            },
        );
    }
    config
}

/// A started server plus the runtime pieces it depends on.
pub struct Harness {
    // Declared first so the reactor stops before the pool is released.
    pub server: HttpServer,
    pub context: Arc<SystemContext>,
    pub pool: WorkerPool,
    pub addr: SocketAddr,
}

impl Harness {
    pub fn start(config: ListenerConfig, units: Vec<Arc<Unit>>) -> Self {
        let pool = WorkerPool::new(2).unwrap();
        Self::start_on(pool, config, units)
    }

    pub fn start_on(pool: WorkerPool, config: ListenerConfig, units: Vec<Arc<Unit>>) -> Self {
        let context = Arc::new(SystemContext::new(pool.clone()));
        for unit in units {
            context.register(unit);
        }

        let shared: Arc<dyn Context> = context.clone();
        let mut server = HttpServer::new("http", shared, UriRegistry::shared(), catalog());
        server.initialize(config).unwrap();
        let bound = server.start().unwrap();
        let addr = SocketAddr::from(([127, 0, 0, 1], bound.port()));

        Self {
            server,
            context,
            pool,
            addr,
        }
    }

    pub fn request(&self, raw: &str) -> String {
        request(self.addr, raw.as_bytes())
    }
}

/// Send `raw` on a fresh connection and read until the server closes it.
pub fn request(addr: SocketAddr, raw: &[u8]) -> String {
    let mut stream = TcpStream::connect(addr).unwrap();
    stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    stream.write_all(raw).unwrap();

    let mut response = Vec::new();
    stream.read_to_end(&mut response).unwrap();
    String::from_utf8(response).unwrap()
}

pub fn status_line(response: &str) -> &str {
    response.split("\r\n").next().unwrap_or("")
}

pub fn body(response: &str) -> &str {
    response.split_once("\r\n\r\n").map(|(_, body)| body).unwrap_or("")
}

/// Poll `condition` until it holds or `timeout` passes.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    condition()
}
