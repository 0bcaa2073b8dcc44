#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Tests for the request wire format
//!
//! Field names, defaults and failure classification must match what the
//! front-end web server modules send.

use gosp_runtime::{GospError, Inbound, Request};
use std::collections::HashMap;

fn full_request() -> Request {
    Request {
        scheme: "https".into(),
        local_hostname: "www.example.com".into(),
        port: 443,
        uri: "/shop/cart.gosp".into(),
        path_info: "/extra".into(),
        query_args: "item=42&qty=2".into(),
        url: "https://www.example.com/shop/cart.gosp/extra?item=42&qty=2".into(),
        method: "POST".into(),
        request_line: "POST /shop/cart.gosp/extra?item=42&qty=2 HTTP/1.1".into(),
        request_time: 1_700_000_000_123_456_789,
        remote_hostname: "client.example.net".into(),
        remote_ip: "203.0.113.9".into(),
        filename: "/srv/www/shop/cart.gosp".into(),
        post_data: HashMap::from([("coupon".into(), "SPRING".into())]),
        header_data: HashMap::from([
            ("Accept".into(), "text/html".into()),
            ("Cookie".into(), "id=7".into()),
        ]),
        admin_email: "webmaster@example.com".into(),
        environment: HashMap::from([("PATH".into(), "/usr/bin".into())]),
        exit_now: false,
    }
}

#[test]
fn test_round_trip_preserves_every_field() {
    let original = full_request();
    let mut wire = Vec::new();
    original.encode(&mut wire).unwrap();
    assert_eq!(wire.last(), Some(&b'\n'));
    assert_eq!(Request::decode(&wire[..]).unwrap(), original);
}

#[test]
fn test_round_trip_with_empty_values() {
    let original = Request::default();
    let decoded = Request::from_json(&original.to_json()).unwrap();
    assert_eq!(decoded, original);
    assert!(decoded.header_data.is_empty());
    assert!(decoded.uri.is_empty());
}

#[test]
fn test_wire_names_are_pascal_case() {
    let json = full_request().to_json();
    for key in [
        "\"Scheme\"",
        "\"LocalHostname\"",
        "\"PathInfo\"",
        "\"QueryArgs\"",
        "\"RequestLine\"",
        "\"RequestTime\"",
        "\"RemoteIp\"",
        "\"PostData\"",
        "\"HeaderData\"",
        "\"AdminEmail\"",
        "\"ExitNow\"",
    ] {
        assert!(json.contains(key), "missing {key} in {json}");
    }
}

#[test]
fn test_truncated_message_is_malformed() {
    let err = Request::decode(&br#"{"Uri": "/index.gosp", "Meth"#[..]).unwrap_err();
    assert!(matches!(err, GospError::MalformedRequest(_)), "{err:?}");
}

#[test]
fn test_empty_input_is_malformed() {
    let err = Request::decode(&b""[..]).unwrap_err();
    assert!(matches!(err, GospError::MalformedRequest(_)), "{err:?}");
}

#[test]
fn test_wrong_field_type_is_malformed() {
    let err = Request::from_json(r#"{"Port": "eighty"}"#).unwrap_err();
    assert!(matches!(err, GospError::MalformedRequest(_)));
}

#[test]
fn test_exit_now_must_be_a_boolean() {
    // Only a JSON boolean triggers shutdown; the string form is rejected.
    assert!(Request::from_json(r#"{"ExitNow": "true"}"#).is_err());
    let req = Request::from_json(r#"{"ExitNow": true}"#).unwrap();
    assert_eq!(Inbound::from(req), Inbound::Shutdown);
}

#[test]
fn test_shutdown_message_encoding() {
    let json = Request::shutdown().to_json();
    let back = Request::from_json(&json).unwrap();
    assert!(back.is_control());
}

#[test]
fn test_post_field_lookup() {
    let req = full_request();
    assert_eq!(req.post_field("coupon"), Some("SPRING"));
    assert_eq!(req.post_field("missing"), None);
    assert_eq!(req.header("COOKIE"), Some("id=7"));
}
