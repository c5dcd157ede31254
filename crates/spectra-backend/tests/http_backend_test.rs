// Integration tests for `HttpBackend` using wiremock.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use spectra_backend::{
    Backend, ColourCount, Error, Frame, HttpBackend, MatrixDimensions, ParameterValue, Rgb,
    StateChange, TransportConfig,
};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, HttpBackend) {
    let server = MockServer::start().await;
    let backend = HttpBackend::new(
        "bridge",
        &format!("{}/api/v1", server.uri()),
        &TransportConfig::default(),
    )
    .unwrap();
    (server, backend)
}

fn static_green() -> StateChange {
    StateChange {
        zone: "main".into(),
        effect: "static".into(),
        parameter: None,
        colours: vec![Rgb::new(0, 255, 0)],
    }
}

// ── Happy-path tests ────────────────────────────────────────────────

#[tokio::test]
async fn test_discover_devices() {
    let (server, backend) = setup().await;

    let body = json!([
        {
            "uid": "kb1",
            "name": "Bridge Keyboard",
            "formFactor": "keyboard",
            "zones": [{
                "id": "main",
                "effects": [
                    { "id": "static", "label": "Static", "colours": 1 },
                    { "id": "gradient", "label": "Gradient", "colours": "variable" }
                ],
                "state": { "effect": "static", "colours": ["#00ff00"], "brightness": 80 }
            }],
            "matrix": { "rows": 6, "cols": 22 }
        },
        { "uid": "m1", "name": "Bridge Mouse" }
    ]);

    Mock::given(method("GET"))
        .and(path("/api/v1/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let devices = backend.discover().await.unwrap();

    assert_eq!(devices.len(), 2);
    assert_eq!(devices[0].uid, "kb1");
    assert_eq!(devices[0].zones[0].effects[1].colours, ColourCount::Variable);
    assert_eq!(devices[0].zones[0].state.brightness, Some(80));
    assert_eq!(devices[0].matrix, Some(MatrixDimensions::new(6, 22)));
    assert_eq!(devices[1].form_factor, None);
}

#[tokio::test]
async fn test_set_state_posts_change() {
    let (server, backend) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/devices/kb1/state"))
        .and(body_json(json!({
            "zone": "main",
            "effect": "static",
            "colours": ["#00FF00"]
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    backend.set_state("kb1", &static_green()).await.unwrap();
}

#[tokio::test]
async fn test_set_state_sends_parameter() {
    let (server, backend) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/devices/kb1/state"))
        .and(body_json(json!({
            "zone": "main",
            "effect": "wave",
            "parameter": 1,
            "colours": []
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let change = StateChange {
        zone: "main".into(),
        effect: "wave".into(),
        parameter: Some(ParameterValue::Integer(1)),
        colours: Vec::new(),
    };
    backend.set_state("kb1", &change).await.unwrap();
}

#[tokio::test]
async fn test_draw_matrix_puts_whole_frame() {
    let (server, backend) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/api/v1/devices/kb1/matrix"))
        .and(body_json(json!({
            "rows": 1,
            "cols": 2,
            "pixels": ["#FFFFFF", "#000000"]
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut frame = Frame::new(MatrixDimensions::new(1, 2)).unwrap();
    frame.set(0, 0, Rgb::WHITE);
    backend.draw_matrix("kb1", &frame).await.unwrap();
}

#[tokio::test]
async fn test_bearer_token_is_sent() {
    let server = MockServer::start().await;
    let transport = TransportConfig::default().with_token(SecretString::from("s3cret"));
    let backend = HttpBackend::new("bridge", &server.uri(), &transport).unwrap();

    Mock::given(method("GET"))
        .and(path("/health"))
        .and(header("authorization", "Bearer s3cret"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    backend.probe().await.unwrap();
}

// ── Error mapping tests ─────────────────────────────────────────────

#[tokio::test]
async fn test_unknown_device_is_not_found() {
    let (server, backend) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/devices/ghost"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = backend.get_device("ghost").await.unwrap_err();
    assert!(matches!(err, Error::NotFound { ref uid, .. } if uid == "ghost"));
}

#[tokio::test]
async fn test_matrix_not_implemented_is_unsupported() {
    let (server, backend) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/devices/m1/matrix"))
        .respond_with(ResponseTemplate::new(501))
        .mount(&server)
        .await;

    let err = backend.get_matrix("m1").await.unwrap_err();
    assert!(err.is_unsupported());
}

#[tokio::test]
async fn test_write_failure_is_device_communication() {
    let (server, backend) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/devices/kb1/state"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({ "message": "USB write failed" })),
        )
        .mount(&server)
        .await;

    let err = backend.set_state("kb1", &static_green()).await.unwrap_err();
    match err {
        Error::DeviceCommunication { uid, message, .. } => {
            assert_eq!(uid, "kb1");
            assert_eq!(message, "USB write failed");
        }
        other => panic!("expected DeviceCommunication, got {other:?}"),
    }
}

#[tokio::test]
async fn test_bad_json_is_invalid_response() {
    let (server, backend) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = backend.discover().await.unwrap_err();
    assert!(matches!(err, Error::InvalidResponse { .. }));
}

#[tokio::test]
async fn test_service_unavailable_status() {
    let (server, backend) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/health"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = backend.probe().await.unwrap_err();
    assert!(err.is_unavailable());
}

#[tokio::test]
async fn test_connection_refused_is_unavailable() {
    let server = MockServer::start().await;
    let uri = server.uri();
    drop(server);

    let backend = HttpBackend::new("bridge", &uri, &TransportConfig::default()).unwrap();
    let err = backend.discover().await.unwrap_err();
    assert!(matches!(err, Error::Unavailable { .. }));
    assert_eq!(err.backend(), "bridge");
}

#[tokio::test]
async fn test_slow_response_is_timeout() {
    let server = MockServer::start().await;
    let transport = TransportConfig::default().with_timeout(Duration::from_millis(100));
    let backend = HttpBackend::new("bridge", &server.uri(), &transport).unwrap();

    Mock::given(method("GET"))
        .and(path("/devices"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let err = backend.discover().await.unwrap_err();
    assert!(matches!(err, Error::Timeout { timeout_ms: 100, .. }));
}
