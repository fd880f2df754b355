use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use tip_ledger_api::config::LedgerConfig;
use tip_ledger_api::db::InMemoryTipDepositStore;
use tip_ledger_api::handlers::{self, ApiState};
use tip_ledger_api::services::TipLedger;

const SENDER: &str = "0x04a1b2c3d4e5f60718293a4b5c6d7e8f90a1b2c3d4e5f60718293a4b5c6d7e8f";
const RECIPIENT: &str = "0x3bf0c63fcb93463407af97a5e5ee64fa883d107ef9e558472c4eb9aaaefa459d";
const TOKEN: &str = "0x049d36570d4e46f48e99674bd3fcc84644ddd6b96f7c741b1562b82f9e004dc7";
const ADMIN_TOKEN: &str = "s3cret";

fn app_with_store() -> (Router, Arc<InMemoryTipDepositStore>) {
    let store = Arc::new(InMemoryTipDepositStore::new());
    let ledger = TipLedger::new(store.clone(), LedgerConfig::default());
    let state = Arc::new(ApiState {
        ledger,
        admin_token: Some(ADMIN_TOKEN.to_string()),
    });
    (handlers::router(state), store)
}

fn app() -> Router {
    app_with_store().0
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn create(app: &Router, amount: &str) -> String {
    let (status, body) = send(
        app,
        post(
            "/tips",
            json!({
                "sender": SENDER,
                "nostr_recipient": RECIPIENT,
                "token_address": TOKEN,
                "amount": amount,
                "gas_amount": "21000",
                "gas_token_address": TOKEN,
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["data"]["deposit_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_create_and_fetch_tip() {
    let app = app();
    let id = create(&app, "1000000000000000000000").await;

    let (status, body) = send(&app, get(&format!("/tips/{}", id))).await;
    assert_eq!(status, StatusCode::OK);

    let data = &body["data"];
    assert_eq!(data["deposit_id"], id.as_str());
    assert_eq!(data["sender"], SENDER);
    assert_eq!(data["nostr_recipient"], RECIPIENT);
    assert_eq!(data["amount"], "1000000000000000000000");
    assert_eq!(data["gas_amount"], "21000");
    assert_eq!(data["gas_token_address"], TOKEN);
    assert_eq!(data["starknet_recipient"], Value::Null);
    assert_eq!(data["is_claimed"], false);
    assert_eq!(data["is_cancelled"], false);
    assert!(data["created_at"].is_string());
    assert!(data["updated_at"].is_string());
}

#[tokio::test]
async fn test_create_accepts_numeric_amount() {
    let app = app();
    let (status, body) = send(
        &app,
        post(
            "/tips",
            json!({
                "sender": SENDER,
                "nostr_recipient": RECIPIENT,
                "token_address": TOKEN,
                "amount": 250,
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["amount"], "250");
    assert_eq!(body["data"]["gas_amount"], Value::Null);
}

#[tokio::test]
async fn test_create_validation_errors() {
    let app = app();

    let (status, body) = send(
        &app,
        post(
            "/tips",
            json!({
                "sender": "alice",
                "nostr_recipient": RECIPIENT,
                "token_address": TOKEN,
                "amount": "5",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);
    assert_eq!(body["message"], "Invalid sender address");

    let (status, body) = send(
        &app,
        post(
            "/tips",
            json!({
                "sender": SENDER,
                "nostr_recipient": RECIPIENT,
                "token_address": TOKEN,
                "amount": "0",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().starts_with("Invalid amount"));

    let (status, body) = send(&app, post("/tips", json!({ "sender": SENDER }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);
}

#[tokio::test]
async fn test_negative_and_fractional_amounts_are_invalid_amount() {
    let app = app();

    for amount in [json!("-5"), json!(-5), json!("1.5"), json!(2.5)] {
        let (status, body) = send(
            &app,
            post(
                "/tips",
                json!({
                    "sender": SENDER,
                    "nostr_recipient": RECIPIENT,
                    "token_address": TOKEN,
                    "amount": amount,
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "amount {}", amount);
        let message = body["message"].as_str().unwrap();
        assert!(message.starts_with("Invalid amount: amount"), "{}", message);
    }

    let (status, body) = send(
        &app,
        post(
            "/tips",
            json!({
                "sender": SENDER,
                "nostr_recipient": RECIPIENT,
                "token_address": TOKEN,
                "amount": "5",
                "gas_amount": "-1",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid amount: gas amount must not be negative");

    let (_, body) = send(&app, get("/tips")).await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_page_beyond_offset_range_is_client_error() {
    let app = app();
    create(&app, "1").await;

    let (status, body) = send(&app, get("/tips?page=18446744073709551615")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);

    let uri = format!("/tips/sender/{}?page=18446744073709551615&limit=100", SENDER);
    let (status, _) = send(&app, get(&uri)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, get("/tips?page=92233720368547758")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_unmatched_routes_use_error_envelope() {
    let app = app();

    let (status, body) = send(&app, get("/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 404);
    assert_eq!(body["message"], "No route for /nope");

    let (status, body) = send(&app, get("/tips/expire")).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["code"], 405);
    assert_eq!(body["message"], "Method GET not allowed on /tips/expire");
}

#[tokio::test]
async fn test_unknown_tip_is_not_found() {
    let app = app();
    let (status, body) = send(&app, get("/tips/does-not-exist")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 404);
    assert!(body["message"].as_str().unwrap().contains("does-not-exist"));
}

#[tokio::test]
async fn test_list_endpoints_wrap_data() {
    let app = app();
    create(&app, "1").await;
    create(&app, "2").await;

    let (status, body) = send(&app, get("/tips")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (_, body) = send(&app, get("/tips?page=1&limit=1")).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, body) = send(&app, get(&format!("/tips/sender/{}", SENDER))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (status, body) = send(&app, get(&format!("/tips/recipient/{}", RECIPIENT))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (status, body) = send(&app, get("/tips/sender/0x99")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_filters_are_client_errors() {
    let app = app();

    let (status, body) = send(&app, get("/tips/sender/not-an-address")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid sender address");

    let (status, body) = send(&app, get("/tips/recipient/garbage")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid recipient address");

    let (status, _) = send(&app, get("/tips?limit=lots")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_claim_and_cancel_flow() {
    let app = app();
    let id = create(&app, "1000").await;

    let (status, body) = send(
        &app,
        post(&format!("/tips/{}/claim", id), json!({ "claimant": "0x1" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], 403);

    let (status, body) = send(
        &app,
        post(&format!("/tips/{}/claim", id), json!({ "claimant": RECIPIENT })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_claimed"], true);

    let (status, body) = send(
        &app,
        post(&format!("/tips/{}/cancel", id), json!({ "requester": SENDER })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], 409);
    assert!(body["message"].as_str().unwrap().ends_with("is claimed"));

    let (_, body) = send(&app, get(&format!("/tips/{}", id))).await;
    assert_eq!(body["data"]["is_claimed"], true);
    assert_eq!(body["data"]["is_cancelled"], false);
}

#[tokio::test]
async fn test_resolve_recipient_endpoint() {
    let app = app();
    let id = create(&app, "10").await;

    let (status, body) = send(
        &app,
        post(
            &format!("/tips/{}/recipient", id),
            json!({ "starknet_recipient": "0x777" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"]["starknet_recipient"],
        format!("0x{:0>64}", "777")
    );

    let (status, _) = send(
        &app,
        post(
            &format!("/tips/{}/recipient", id),
            json!({ "starknet_recipient": "0x778" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_expire_requires_admin_token() {
    let app = app();

    let (status, body) = send(&app, post("/tips/expire", json!({}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], 403);

    let request = Request::builder()
        .method("POST")
        .uri("/tips/expire")
        .header(header::AUTHORIZATION, format!("Bearer {}", ADMIN_TOKEN))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["count"], 0);
}

#[tokio::test]
async fn test_storage_failure_is_generic_server_error() {
    let (app, store) = app_with_store();
    store.set_unavailable(true);

    let (status, body) = send(&app, get("/tips")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], 500);
    assert_eq!(body["message"], "Internal server error.");

    let (status, _) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_health_ok() {
    let app = app();
    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
