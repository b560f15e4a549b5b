//! End-to-end request/response tests against a running server.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use component_http::config::{DispatchMode, ReadyPolicy};
use component_http::http::Method;
use component_http::runtime::{Message, MessageType, Target};

mod common;

use common::{body, status_line, wait_until, Command, Harness, Literal, Unit};

const GET: &[Method] = &[Method::Get];
const POST: &[Method] = &[Method::Post];

#[test]
fn get_returns_component_value() {
    let sensor = Unit::returning("sensorUnit", Literal("42".to_string()));
    let harness = Harness::start(common::listener_config(&[("sensor", "sensorUnit", GET)]), vec![sensor]);

    let response = harness.request("GET /sensor HTTP/1.0\r\n\r\n");

    assert_eq!(status_line(&response), "HTTP/1.0 200 OK");
    assert!(response.contains("Server: http\r\n"));
    assert!(response.contains("Content-Type: text/plain; charset=utf-8\r\n"));
    assert!(response.contains("Content-Length: 2\r\n"));
    assert_eq!(body(&response), "42");
}

#[test]
fn get_string_value_is_sent_as_text_despite_codec() {
    let sensor = Unit::returning("sensorUnit", String::from("42"));
    let harness = Harness::start(common::listener_config(&[("sensor", "sensorUnit", GET)]), vec![sensor]);
    assert!(harness.server.codecs().get(&MessageType::of::<String>()).is_some());

    let response = harness.request("GET /sensor HTTP/1.0\r\n\r\n");

    assert_eq!(status_line(&response), "HTTP/1.0 200 OK");
    assert!(response.contains("Content-Type: text/plain; charset=utf-8\r\n"));
    assert_eq!(body(&response), "42");
}

#[test]
fn get_value_uses_registered_codec_when_enabled() {
    let unit = Unit::returning(
        "panel",
        Command {
            action: "open".to_string(),
            level: 3,
        },
    );
    let mut config = common::listener_config(&[("panel", "panel", GET)]);
    config.codec_bodies = true;
    let harness = Harness::start(config, vec![unit]);

    let response = harness.request("GET /panel HTTP/1.0\r\n\r\n");

    assert_eq!(status_line(&response), "HTTP/1.0 200 OK");
    assert!(response.contains("Content-Type: application/json\r\n"));
    assert_eq!(body(&response), r#"{"action":"open","level":3}"#);
}

#[test]
fn post_is_accepted_and_forwarded_once() {
    let actuator = Unit::new::<Command>("actuator");
    let ctrl = Unit::new::<Command>("ctrl");
    let other = Unit::new::<Literal>("logger");

    let mut config = common::listener_config(&[("actuate", "actuator", POST)]);
    config.targets = vec!["ctrl".to_string(), "logger".to_string()];
    let harness = Harness::start(config, vec![actuator.clone(), ctrl.clone(), other.clone()]);

    let payload = r#"{"action":"move","level":7}"#;
    let raw = format!(
        "POST /actuate HTTP/1.0\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
        payload.len(),
        payload
    );
    let response = harness.request(&raw);

    assert_eq!(response, "HTTP/1.0 202 Accepted\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
    assert!(wait_until(Duration::from_secs(2), || ctrl.received().len() == 1));

    let received = ctrl.received();
    assert_eq!(
        received[0].downcast_ref::<Command>(),
        Some(&Command {
            action: "move".to_string(),
            level: 7
        })
    );
    assert!(other.received().is_empty());
    assert!(actuator.received().is_empty());
}

#[test]
fn unregistered_path_is_not_found() {
    let harness = Harness::start(common::listener_config(&[]), Vec::new());

    let response = harness.request("GET /nowhere HTTP/1.0\r\n\r\n");

    assert_eq!(response, "HTTP/1.0 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
    assert_eq!(harness.pool.submitted(), 1);
}

#[test]
fn post_to_get_only_path_is_rejected_without_forwarding() {
    let sensor = Unit::returning("sensorUnit", Literal("42".to_string()));
    let ctrl = Unit::new::<Command>("ctrl");
    let mut config = common::listener_config(&[("sensor", "sensorUnit", GET)]);
    config.targets = vec!["ctrl".to_string()];
    let harness = Harness::start(config, vec![sensor, ctrl.clone()]);

    let response = harness.request("POST /sensor HTTP/1.0\r\nContent-Length: 2\r\n\r\n{}");

    assert_eq!(status_line(&response), "HTTP/1.0 405 Method Not Allowed");
    std::thread::sleep(Duration::from_millis(50));
    assert!(ctrl.received().is_empty());
}

#[test]
fn unsupported_method_is_bad_request() {
    let sensor = Unit::returning("sensorUnit", Literal("42".to_string()));
    let harness = Harness::start(common::listener_config(&[("sensor", "sensorUnit", GET)]), vec![sensor]);

    let response = harness.request("PUT /sensor HTTP/1.0\r\n\r\n");

    assert_eq!(status_line(&response), "HTTP/1.0 400 Bad Request");
}

#[test]
fn undecodable_post_body_is_not_implemented() {
    let actuator = Unit::new::<Command>("actuator");
    let ctrl = Unit::new::<Command>("ctrl");
    let mut config = common::listener_config(&[("actuate", "actuator", POST)]);
    config.targets = vec!["ctrl".to_string()];
    let harness = Harness::start(config, vec![actuator, ctrl.clone()]);

    let response = harness.request("POST /actuate HTTP/1.0\r\nContent-Length: 8\r\n\r\nnot json");

    assert_eq!(status_line(&response), "HTTP/1.0 501 Not Implemented");
    std::thread::sleep(Duration::from_millis(50));
    assert!(ctrl.received().is_empty());
}

#[test]
fn component_without_value_is_not_implemented() {
    let silent = Unit::new::<Literal>("silent");
    let harness = Harness::start(common::listener_config(&[("silent", "silent", GET)]), vec![silent]);

    let response = harness.request("GET /silent HTTP/1.0\r\n\r\n");

    assert_eq!(status_line(&response), "HTTP/1.0 501 Not Implemented");
}

#[test]
fn missing_component_is_not_implemented_until_it_appears() {
    let harness = Harness::start(common::listener_config(&[("late", "lateUnit", GET)]), Vec::new());

    let response = harness.request("GET /late HTTP/1.0\r\n\r\n");
    assert_eq!(status_line(&response), "HTTP/1.0 501 Not Implemented");

    harness
        .context
        .register(Unit::returning("lateUnit", Literal("here".to_string())));

    let response = harness.request("GET /late HTTP/1.0\r\n\r\n");
    assert_eq!(status_line(&response), "HTTP/1.0 200 OK");
    assert_eq!(body(&response), "here");
}

#[test]
fn path_is_normalized_before_lookup() {
    let sensor = Unit::returning("sensorUnit", Literal("42".to_string()));
    let harness = Harness::start(common::listener_config(&[("sensor", "sensorUnit", GET)]), vec![sensor]);

    let response = harness.request("GET /sensor/?unit=c HTTP/1.0\r\n\r\n");

    assert_eq!(status_line(&response), "HTTP/1.0 200 OK");
}

#[test]
fn content_length_header_can_be_disabled() {
    let sensor = Unit::returning("sensorUnit", Literal("42".to_string()));
    let mut config = common::listener_config(&[("sensor", "sensorUnit", GET)]);
    config.content_length = false;
    let harness = Harness::start(config, vec![sensor]);

    let response = harness.request("GET /sensor HTTP/1.0\r\n\r\n");

    assert!(!response.contains("Content-Length"));
    assert_eq!(body(&response), "42");
}

#[test]
fn deferred_dispatch_serves_get_and_post() {
    let sensor = Unit::returning("sensorUnit", Literal("42".to_string()));
    let actuator = Unit::new::<Command>("actuator");
    let ctrl = Unit::new::<Command>("ctrl");

    let mut config = common::listener_config(&[("sensor", "sensorUnit", GET), ("actuate", "actuator", POST)]);
    config.dispatch = DispatchMode::Deferred;
    config.targets = vec!["ctrl".to_string()];
    let harness = Harness::start(config, vec![sensor, actuator, ctrl.clone()]);

    let response = harness.request("GET /sensor HTTP/1.0\r\n\r\n");
    assert_eq!(body(&response), "42");

    let payload = r#"{"action":"stop","level":0}"#;
    let raw = format!("POST /actuate HTTP/1.0\r\nContent-Length: {}\r\n\r\n{}", payload.len(), payload);
    let response = harness.request(&raw);
    assert_eq!(status_line(&response), "HTTP/1.0 202 Accepted");
    assert!(wait_until(Duration::from_secs(2), || ctrl.received().len() == 1));
}

#[test]
fn zero_ready_policy_still_serves_requests() {
    let sensor = Unit::returning("sensorUnit", Literal("42".to_string()));
    let mut config = common::listener_config(&[("sensor", "sensorUnit", GET)]);
    config.ready_policy = ReadyPolicy::ZeroReady;
    let harness = Harness::start(config, vec![sensor]);

    for _ in 0..3 {
        let response = harness.request("GET /sensor HTTP/1.0\r\n\r\n");
        assert_eq!(body(&response), "42");
    }
}

#[test]
fn value_changes_are_visible_per_request() {
    let sensor = Unit::returning("sensorUnit", Literal("1".to_string()));
    let harness = Harness::start(
        common::listener_config(&[("sensor", "sensorUnit", GET)]),
        vec![sensor.clone()],
    );

    assert_eq!(body(&harness.request("GET /sensor HTTP/1.0\r\n\r\n")), "1");
    sensor.set_value(Some(Message::new(Literal("2".to_string()))));
    assert_eq!(body(&harness.request("GET /sensor HTTP/1.0\r\n\r\n")), "2");
    assert_eq!(sensor.id(), "sensorUnit");
}

#[test]
fn fixed_length_post_arriving_in_segments_is_forwarded() {
    let head = "POST /actuate HTTP/1.0\r\nContent-Length: 4\r\n\r\n";
    let actuator = Unit::new::<u32>("actuator");
    let ctrl = Unit::new::<u32>("ctrl");
    let mut config = common::listener_config(&[("actuate", "actuator", POST)]);
    config.stopper = Some(head.len() + 4);
    config.targets = vec!["ctrl".to_string()];
    let harness = Harness::start(config, vec![actuator, ctrl.clone()]);

    let mut stream = TcpStream::connect(harness.addr).unwrap();
    stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    stream.write_all(head.as_bytes()).unwrap();
    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(harness.pool.submitted(), 0);
    stream.write_all(b"1234").unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).unwrap();

    assert_eq!(status_line(&response), "HTTP/1.0 202 Accepted");
    assert!(wait_until(Duration::from_secs(2), || ctrl.received().len() == 1));
    assert_eq!(ctrl.received()[0].downcast_ref::<u32>(), Some(&1234));
}
