//! Server lifecycle against real sockets.

use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;

use component_http::codec::CodecCatalog;
use component_http::config::Properties;
use component_http::http::{HttpServer, Method, ServerError};
use component_http::lifecycle::ServerState;
use component_http::routing::UriRegistry;
use component_http::runtime::{Context, SystemContext, WorkerPool};

mod common;

use common::{body, request, status_line, Literal, Unit};

const GET: &[Method] = &[Method::Get];

fn context_with_sensor() -> Arc<SystemContext> {
    let context = Arc::new(SystemContext::new(WorkerPool::new(2).unwrap()));
    context.register(Unit::returning("sensorUnit", Literal("42".to_string())));
    context
}

fn server(context: &Arc<SystemContext>) -> HttpServer {
    let shared: Arc<dyn Context> = context.clone();
    HttpServer::new("http", shared, UriRegistry::shared(), common::catalog())
}

fn loopback(addr: SocketAddr) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], addr.port()))
}

#[test]
fn bind_conflict_reports_error_and_stops() {
    let occupied = TcpListener::bind("0.0.0.0:0").unwrap();
    let port = occupied.local_addr().unwrap().port();

    let context = context_with_sensor();
    let mut server = server(&context);
    let mut config = common::listener_config(&[("sensor", "sensorUnit", GET)]);
    config.port = port;
    server.initialize(config).unwrap();

    assert!(matches!(server.start(), Err(ServerError::Listener(_))));
    assert_eq!(server.state(), ServerState::Stopped);
    assert!(server.local_addr().is_none());
}

#[test]
fn stop_closes_listener_and_restart_reuses_port() {
    let context = context_with_sensor();
    let mut server = server(&context);
    server
        .initialize(common::listener_config(&[("sensor", "sensorUnit", GET)]))
        .unwrap();

    let addr = loopback(server.start().unwrap());
    assert_eq!(body(&request(addr, b"GET /sensor HTTP/1.0\r\n\r\n")), "42");

    server.stop();
    assert_eq!(server.state(), ServerState::Stopped);
    assert!(TcpStream::connect(addr).is_err());

    let mut config = common::listener_config(&[("sensor", "sensorUnit", GET)]);
    config.port = addr.port();
    server.initialize(config).unwrap();
    let restarted = loopback(server.start().unwrap());

    assert_eq!(restarted.port(), addr.port());
    assert_eq!(server.state(), ServerState::Started);
    assert_eq!(body(&request(restarted, b"GET /sensor HTTP/1.0\r\n\r\n")), "42");

    server.shutdown();
    assert_eq!(server.state(), ServerState::Shutdown);
    assert!(matches!(server.start(), Err(ServerError::ShutDown)));
}

#[test]
fn initialization_from_host_properties() {
    let context = context_with_sensor();
    let mut server = server(&context);

    let properties = Properties::new()
        .with("port", "0")
        .with("packages", "app")
        .with("targetUnits", r#"{"sensor": {"unit": "sensorUnit", "methods": ["GET"]}}"#);
    server.on_initialization(&properties).unwrap();
    assert_eq!(server.state(), ServerState::Initialized);

    let addr = loopback(server.start().unwrap());
    let response = request(addr, b"GET /sensor HTTP/1.0\r\n\r\n");
    assert_eq!(status_line(&response), "HTTP/1.0 200 OK");
}

#[test]
fn host_registered_paths_are_served() {
    let context = context_with_sensor();
    let uris = UriRegistry::shared();
    uris.add_node("probe", Method::Get);
    uris.add_unit_path_node("probe", "sensorUnit");

    let shared: Arc<dyn Context> = context.clone();
    let mut server = HttpServer::new("http", shared, Arc::clone(&uris), CodecCatalog::new());
    server.initialize(common::listener_config(&[])).unwrap();

    let addr = loopback(server.start().unwrap());
    let response = request(addr, b"GET /probe HTTP/1.0\r\n\r\n");
    assert_eq!(body(&response), "42");
}
