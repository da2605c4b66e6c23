//! Integration tests for signed GETs and the 401 retry

mod common;

use ::common::crypto::{base64_decode, request_proof};
use lm_client::auth::TOKEN_TTL_MS;
use lm_client::Error;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn header<'a>(request: &'a Request, name: &str) -> &'a str {
    request
        .headers
        .get(name)
        .unwrap_or_else(|| panic!("missing header {}", name))
        .to_str()
        .unwrap()
}

async fn get_requests(server: &MockServer) -> Vec<Request> {
    server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|request| request.method.as_str() == "GET")
        .collect()
}

#[tokio::test]
async fn test_signed_get_returns_json() {
    let server = MockServer::start().await;
    let store = common::registered_store().await;
    common::store_token(&store, "access-1", "refresh-1", TOKEN_TTL_MS).await;

    Mock::given(method("GET"))
        .and(path(common::api_path("/things")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "serialNumber": "GS1" }])))
        .expect(1)
        .mount(&server)
        .await;

    let client = common::client(&server, store);
    let things = client.signed_get("/things").await.unwrap();
    assert_eq!(things, json!([{ "serialNumber": "GS1" }]));
}

#[tokio::test]
async fn test_signed_get_headers_verify() {
    let server = MockServer::start().await;
    let store = common::registered_store().await;
    common::store_token(&store, "access-1", "refresh-1", TOKEN_TTL_MS).await;

    Mock::given(method("GET"))
        .and(path(common::api_path("/things")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let client = common::client(&server, store);
    let identity = client.identity().await.unwrap();
    client.signed_get("/things").await.unwrap();

    let requests = get_requests(&server).await;
    let request = &requests[0];
    assert_eq!(header(request, "authorization"), "Bearer access-1");
    assert_eq!(
        header(request, "x-app-installation-id"),
        identity.installation_id()
    );

    let nonce = header(request, "x-nonce");
    let timestamp = header(request, "x-timestamp");
    assert!(timestamp.parse::<i64>().is_ok());

    let proof_input = format!("{}.{}.{}", identity.installation_id(), nonce, timestamp);
    let proof = request_proof(&proof_input, identity.derived_secret()).unwrap();
    let signed = format!("{}.{}", proof_input, proof);
    let signature = base64_decode(header(request, "x-request-signature")).unwrap();

    assert!(identity
        .secret_key()
        .public()
        .verify_der(signed.as_bytes(), &signature)
        .is_ok());
}

#[tokio::test]
async fn test_retries_once_after_401() {
    let server = MockServer::start().await;
    let store = common::registered_store().await;
    common::store_token(&store, "stale-access", "stale-refresh", TOKEN_TTL_MS).await;

    Mock::given(method("GET"))
        .and(path(common::api_path("/things")))
        .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(common::api_path("/things")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(common::api_path("/auth/signin")))
        .respond_with(common::token_response("fresh-access", "fresh-refresh"))
        .expect(1)
        .mount(&server)
        .await;

    let client = common::client(&server, store.clone());
    let (warnings, _guard) = common::capture_warnings();
    let result = client.signed_get("/things").await.unwrap();

    assert_eq!(result, json!({ "ok": true }));
    assert_eq!(store.token_deletes(), 1);
    assert_eq!(warnings.count(), 1);

    let requests = get_requests(&server).await;
    assert_eq!(requests.len(), 2);
    assert_eq!(header(&requests[0], "authorization"), "Bearer stale-access");
    assert_eq!(header(&requests[1], "authorization"), "Bearer fresh-access");
    // the retry is signed from scratch
    assert_ne!(
        header(&requests[0], "x-nonce"),
        header(&requests[1], "x-nonce")
    );
    assert_ne!(
        header(&requests[0], "x-request-signature"),
        header(&requests[1], "x-request-signature")
    );

    let stored = common::stored_token(&store).await.unwrap();
    assert_eq!(stored.access_token, "fresh-access");
}

#[tokio::test]
async fn test_second_401_is_not_retried() {
    let server = MockServer::start().await;
    let store = common::registered_store().await;
    common::store_token(&store, "stale-access", "stale-refresh", TOKEN_TTL_MS).await;

    Mock::given(method("GET"))
        .and(path(common::api_path("/things")))
        .respond_with(ResponseTemplate::new(401).set_body_string("still unauthorized"))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(common::api_path("/auth/signin")))
        .respond_with(common::token_response("fresh-access", "fresh-refresh"))
        .mount(&server)
        .await;

    let client = common::client(&server, store.clone());
    let err = client.signed_get("/things").await.unwrap_err();

    match &err {
        Error::ApiRequest { status, body } => {
            assert_eq!(status.as_u16(), 401);
            assert_eq!(body, "still unauthorized");
        }
        other => panic!("expected api request error, got {:?}", other),
    }
    assert_eq!(store.token_deletes(), 1);
}

#[tokio::test]
async fn test_server_error_is_not_retried() {
    let server = MockServer::start().await;
    let store = common::registered_store().await;
    common::store_token(&store, "access-1", "refresh-1", TOKEN_TTL_MS).await;

    Mock::given(method("GET"))
        .and(path(common::api_path("/things")))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    let client = common::client(&server, store.clone());
    let err = client.signed_get("/things").await.unwrap_err();

    assert!(matches!(err, Error::ApiRequest { .. }));
    assert_eq!(err.to_string(), "API request failed (500): boom");
    assert_eq!(store.token_deletes(), 0);
    assert_eq!(common::request_paths(&server).await.len(), 1);
}

#[tokio::test]
async fn test_resolve_serial_number() {
    let server = MockServer::start().await;
    let store = common::registered_store().await;
    common::store_token(&store, "access-1", "refresh-1", TOKEN_TTL_MS).await;

    Mock::given(method("GET"))
        .and(path(common::api_path("/things")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "type": "CoffeeMachine", "serialNumber": "GS012345" },
            { "type": "Grinder", "serialNumber": "GR1" },
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let client = common::client(&server, store);
    assert_eq!(client.resolve_serial_number().await.unwrap(), "GS012345");
}

#[tokio::test]
async fn test_configured_machine_id_skips_discovery() {
    let server = MockServer::start().await;
    let config = common::test_config(&server).with_machine_id("GS999");
    let client = lm_client::LmClient::new(config, common::registered_store().await).unwrap();

    assert_eq!(client.resolve_serial_number().await.unwrap(), "GS999");
    assert!(common::request_paths(&server).await.is_empty());
}
