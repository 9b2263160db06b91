//! End-to-end checks of the loopback API through the full router stack.

use std::sync::Arc;

use axum_test::TestServer;
use common::protocol::{
    DecryptResponse, EncryptResponse, ErrorResponse, HealthResponse, MacResponse, VerifyResponse,
};
use serde_json::json;
use vault::{
    codec::SecureCodec,
    keys::{KeyProvider, KeySettings, MachineId},
    server::{router, state::AppState},
};

fn server_for_device(id: &str) -> TestServer {
    let device = Arc::new(MachineId::new(Some(id.to_owned()), None));
    let provider = KeyProvider::initialize(None, device, &KeySettings::default());
    let state = AppState::new(Arc::new(SecureCodec::new(&provider)));
    TestServer::new(router::build(state)).unwrap()
}

#[tokio::test]
async fn round_trip_over_http() {
    let server = server_for_device("integration-device");

    let sealed: EncryptResponse = server
        .post("/encrypt")
        .json(&json!({"plaintext": "mortgage 1875.00"}))
        .await
        .json();
    assert!(!sealed.envelope.starts_with("UNENCRYPTED:"));

    let opened: DecryptResponse = server
        .post("/decrypt")
        .json(&json!({"envelope": sealed.envelope}))
        .await
        .json();
    assert_eq!(opened.plaintext, "mortgage 1875.00");
}

#[tokio::test]
async fn envelope_from_same_device_decrypts_after_restart() {
    let sealed: EncryptResponse = server_for_device("restart-device")
        .post("/encrypt")
        .json(&json!({"plaintext": "car fund"}))
        .await
        .json();

    let opened: DecryptResponse = server_for_device("restart-device")
        .post("/decrypt")
        .json(&json!({"envelope": sealed.envelope}))
        .await
        .json();
    assert_eq!(opened.plaintext, "car fund");
}

#[tokio::test]
async fn marked_value_passes_through() {
    let server = server_for_device("integration-device");
    let opened: DecryptResponse = server
        .post("/decrypt")
        .json(&json!({"envelope": "UNENCRYPTED:cash envelope"}))
        .await
        .json();
    assert_eq!(opened.plaintext, "cash envelope");
}

#[tokio::test]
async fn short_envelope_yields_empty_plaintext() {
    let server = server_for_device("integration-device");
    // base64 of 11 bytes: shorter than a nonce.
    let response = server
        .post("/decrypt")
        .json(&json!({"envelope": "AAECAwQFBgcICQo="}))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<DecryptResponse>().plaintext, "");
}

#[tokio::test]
async fn mac_round_trip_and_mismatch() {
    let server = server_for_device("integration-device");
    let tagged: MacResponse = server
        .post("/mac")
        .json(&json!({"data": "category:groceries"}))
        .await
        .json();

    let ok: VerifyResponse = server
        .post("/verify")
        .json(&json!({"data": "category:groceries", "tag": tagged.tag}))
        .await
        .json();
    assert!(ok.valid);

    let mismatch: VerifyResponse = server
        .post("/verify")
        .json(&json!({"data": "category:dining", "tag": tagged.tag}))
        .await
        .json();
    assert!(!mismatch.valid);
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let server = server_for_device("integration-device");
    let response = server.post("/encrypt").text("{not json").await;
    response.assert_status_bad_request();
    assert_eq!(response.json::<ErrorResponse>().code, "bad_request");
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let server = server_for_device("integration-device");
    let response = server.get("/v2/encrypt").await;
    response.assert_status_not_found();
    assert_eq!(response.json::<ErrorResponse>().code, "not_found");
}

#[tokio::test]
async fn health_reports_tier() {
    let server = server_for_device("integration-device");
    let health: HealthResponse = server.get("/health").await.json();
    assert_eq!(health.key_tier, "derived");
    assert_eq!(health.status, "ok");
}
