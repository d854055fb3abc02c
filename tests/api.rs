// tests/api.rs
// Rotas que não precisam do banco: permissões, autenticação e verificação do webhook.

mod common;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt;

use common::{app, expired_token, lazy_pool, signed_headers, FakeProvider};

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn router() -> axum::Router {
    app(lazy_pool(), Arc::new(FakeProvider::default())).0
}

fn webhook_request(body: &'static [u8], signed: bool) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/webhooks/identity-provider")
        .header(header::CONTENT_TYPE, "application/json");
    if signed {
        for (name, value) in signed_headers(body) {
            builder = builder.header(name, value);
        }
    }
    builder.body(Body::from(body)).unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let response = router()
        .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn permission_table_is_public_and_matches_roles() {
    let response = router()
        .oneshot(Request::builder().uri("/api/permissions").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let table = body_json(response).await;
    let entries = table.as_array().unwrap();
    assert_eq!(entries.len(), 3);

    let find = |role: &str| entries.iter().find(|e| e["role"] == role).unwrap()["permissions"].clone();

    let admin = find("ADMIN");
    assert_eq!(admin["canManageUsers"], true);
    assert_eq!(admin["canSubmitRequests"], false);

    let manager = find("MANAGER");
    assert_eq!(manager["canAssignServices"], true);
    assert_eq!(manager["canManageForms"], false);

    let client = find("CLIENT");
    assert_eq!(client["canSubmitRequests"], true);
    assert_eq!(client["canViewAllServices"], false);
    assert_eq!(client["canViewOwnData"], true);
}

#[tokio::test]
async fn protected_routes_require_a_session() {
    for uri in ["/api/users/me", "/api/services", "/api/dashboard", "/api/forms"] {
        let response = router()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
    }
}

#[tokio::test]
async fn garbage_and_expired_tokens_are_rejected() {
    for token in ["nao-e-um-jwt".to_string(), expired_token("user_1")] {
        let response = router()
            .oneshot(
                Request::builder()
                    .uri("/api/users/me")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn unsigned_webhook_is_rejected() {
    let response = router()
        .oneshot(webhook_request(br#"{"type":"user.created","data":{}}"#, false))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn signed_webhook_with_unknown_event_is_acknowledged() {
    let response = router()
        .oneshot(webhook_request(br#"{"type":"session.created","data":{"id":"sess_1"}}"#, true))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let ack = body_json(response).await;
    assert_eq!(ack, json!({ "received": true, "outcome": "ignored:session.created" }));
}

#[tokio::test]
async fn signed_upsert_without_email_is_a_validation_error() {
    let response = router()
        .oneshot(webhook_request(
            br#"{"type":"user.created","data":{"id":"user_sem_email","email_addresses":[]}}"#,
            true,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn openapi_document_is_served() {
    let response = router()
        .oneshot(Request::builder().uri("/api-docs/openapi.json").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let doc = body_json(response).await;
    assert!(doc["paths"]["/api/services/{id}/batch-update"]["post"].is_object());
}

#[tokio::test]
async fn signed_delete_without_id_is_rejected() {
    let response = router()
        .oneshot(webhook_request(br#"{"type":"user.deleted","data":{"deleted":true}}"#, true))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
