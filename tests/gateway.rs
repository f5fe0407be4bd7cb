mod common;

use axum::http::StatusCode;
use serde_json::{Value, json};
use shop_gateway::services::errors::GENERIC_MESSAGE;

use common::{ScriptedTransport, Step, app, bearer, get, send, with_body};

#[tokio::test]
async fn health_is_public() {
    let transport = ScriptedTransport::new([]);
    let (res, body) = send(app(&transport), get("/health", None)).await;

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
    assert!(res.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn missing_credential_is_401_without_backend_call() {
    let transport = ScriptedTransport::new([Step::Reply(json!([]))]);
    let (res, body) = send(app(&transport), get("/api/v1/orders", None)).await;

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body["statusCode"], 401);
    assert_eq!(body["message"], "Unauthorized");
    assert!(body["timestamp"].is_string());
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn invalid_token_is_401_even_without_role_requirement() {
    let transport = ScriptedTransport::new([Step::Reply(json!({}))]);
    let (res, _) = send(app(&transport), get("/api/v1/auth/me", Some("Bearer not.a.jwt"))).await;

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn rejection_kinds_are_indistinguishable_to_the_caller() {
    let transport = ScriptedTransport::new([]);
    let expired = bearer("CUSTOMER", -60);
    let garbage = "Bearer abc.def.ghi".to_string();
    let wrong_scheme = "Token abc".to_string();

    let mut messages = Vec::new();
    for auth in [expired, garbage, wrong_scheme] {
        let (res, body) = send(app(&transport), get("/api/v1/cart", Some(&auth))).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        messages.push(body["message"].clone());
    }
    assert!(messages.iter().all(|m| *m == json!("Unauthorized")));
}

#[tokio::test]
async fn wrong_role_is_403_naming_required_and_actual() {
    let transport = ScriptedTransport::new([Step::Reply(json!({}))]);
    let auth = bearer("CUSTOMER", 900);
    let req = with_body("POST", "/api/v1/products", Some(&auth), r#"{"name":"mug"}"#);

    let (res, body) = send(app(&transport), req).await;

    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let message = body["message"].as_str().unwrap();
    assert!(message.contains("ADMIN"));
    assert!(message.contains("CUSTOMER"));
    assert_eq!(body["details"]["actualRole"], "CUSTOMER");
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn authorized_call_is_forwarded_with_identity_and_credential() {
    let transport = ScriptedTransport::new([Step::Reply(json!({"items": []}))]);
    let auth = bearer("CUSTOMER", 900);

    let (res, body) = send(app(&transport), get("/api/v1/cart", Some(&auth))).await;

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body, json!({"items": []}));

    let calls = transport.calls();
    assert_eq!(calls.len(), 1);
    let (address, envelope) = &calls[0];
    assert_eq!(address, "cart.requests");
    assert_eq!(envelope.pattern, "cart.get");
    assert_eq!(envelope.data["user"]["id"], "u1");
    assert_eq!(envelope.data["user"]["role"], "CUSTOMER");
    assert_eq!(envelope.authorization(), Some(auth.as_str()));
}

#[tokio::test]
async fn public_operation_needs_no_credential() {
    let transport = ScriptedTransport::new([Step::Reply(json!({"id": "p1"}))]);

    let (res, body) = send(app(&transport), get("/api/v1/products/p1?expand=category", None)).await;

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body["id"], "p1");

    let (_, envelope) = &transport.calls()[0];
    assert_eq!(envelope.pattern, "products.findOne");
    assert_eq!(envelope.data["params"], json!({"id": "p1"}));
    assert_eq!(envelope.data["query"], json!({"expand": "category"}));
    assert_eq!(envelope.data["user"], Value::Null);
    assert_eq!(envelope.authorization(), None);
}

#[tokio::test]
async fn post_forwards_body_and_returns_created() {
    let transport = ScriptedTransport::new([Step::Reply(json!({"id": "o1"}))]);
    let auth = bearer("CUSTOMER", 900);
    let req = with_body("POST", "/api/v1/orders", Some(&auth), r#"{"addressId":"a1"}"#);

    let (res, body) = send(app(&transport), req).await;

    assert_eq!(res.status(), StatusCode::CREATED);
    assert_eq!(body["id"], "o1");
    assert_eq!(transport.calls()[0].1.data["body"], json!({"addressId": "a1"}));
}

#[tokio::test]
async fn invalid_json_body_is_400_without_backend_call() {
    let transport = ScriptedTransport::new([Step::Reply(json!({}))]);
    let auth = bearer("CUSTOMER", 900);
    let req = with_body("POST", "/api/v1/orders", Some(&auth), "{not json");

    let (res, body) = send(app(&transport), req).await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body["statusCode"], 400);
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn structured_backend_error_passes_through() {
    let transport = ScriptedTransport::new([Step::BackendError(
        json!({"statusCode": 404, "message": "Product not found"}),
    )]);

    let (res, body) = send(app(&transport), get("/api/v1/products/nope", None)).await;

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Product not found");
    assert_eq!(transport.calls().len(), 1);
}

#[tokio::test]
async fn unmapped_backend_error_is_generic_500() {
    let transport = ScriptedTransport::new([Step::BackendError(json!("boom: pool exhausted"))]);

    let (res, body) = send(app(&transport), get("/api/v1/categories", None)).await;

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], GENERIC_MESSAGE);
    assert!(!body.to_string().contains("pool exhausted"));
}

#[tokio::test(start_paused = true)]
async fn backend_timing_out_twice_is_408_after_two_attempts() {
    let transport = ScriptedTransport::new([Step::Hang, Step::Hang, Step::Reply(json!("late"))]);
    let auth = bearer("ADMIN", 900);

    let (res, body) = send(app(&transport), get("/api/v1/users", Some(&auth))).await;

    assert_eq!(res.status(), StatusCode::REQUEST_TIMEOUT);
    assert!(body["message"].as_str().unwrap().contains("timeout"));
    assert_eq!(transport.calls().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn unreachable_backend_is_503_after_two_attempts() {
    let transport = ScriptedTransport::new([Step::Fail, Step::Fail]);

    let (res, body) = send(app(&transport), get("/api/v1/products", None)).await;

    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["statusCode"], 503);
    assert_eq!(transport.calls().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn single_failure_is_invisible_to_the_caller() {
    let transport = ScriptedTransport::new([Step::Fail, Step::Reply(json!([{"id": "c1"}]))]);

    let (res, body) = send(app(&transport), get("/api/v1/categories", None)).await;

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body, json!([{"id": "c1"}]));
    assert_eq!(transport.calls().len(), 2);
}

#[tokio::test]
async fn unknown_path_is_404_envelope() {
    let transport = ScriptedTransport::new([]);
    let (res, body) = send(app(&transport), get("/api/v1/inventory", None)).await;

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(body["statusCode"], 404);
}

#[tokio::test]
async fn unsupported_method_is_405_envelope() {
    let transport = ScriptedTransport::new([]);
    let req = with_body("PUT", "/api/v1/products", None, "{}");

    let (res, body) = send(app(&transport), req).await;

    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["statusCode"], 405);
    assert!(body["timestamp"].is_string());
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn oversized_body_is_413_envelope_without_backend_call() {
    let transport = ScriptedTransport::new([Step::Reply(json!({}))]);
    let auth = bearer("CUSTOMER", 900);
    let huge = format!(r#"{{"note":"{}"}}"#, "x".repeat(2 * 1024 * 1024));
    let req = with_body("POST", "/api/v1/orders", Some(&auth), &huge);

    let (res, body) = send(app(&transport), req).await;

    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["statusCode"], 413);
    assert!(body["timestamp"].is_string());
    assert!(transport.calls().is_empty());
}

#[test]
fn startup_fails_on_unusable_public_key() {
    let config = shop_gateway::config::Config::from_lookup(|key| match key {
        "ACCESS_JWT_PUBLIC_KEY_PEM" => Some("not a pem".into()),
        _ => None,
    })
    .unwrap();
    let transport = ScriptedTransport::new([]);

    let result = shop_gateway::app::build_state(&config, std::sync::Arc::new(transport));
    assert!(result.is_err());
}
