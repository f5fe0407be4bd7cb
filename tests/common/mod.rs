#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response};
use serde_json::Value;
use shop_gateway::app::{build_router, build_state};
use shop_gateway::config::Config;
use shop_gateway::services::auth::{KeyAlgorithm, KeyMaterial, TokenService, TokenSubject};
use shop_gateway::services::dispatch::{MessageEnvelope, ReplyPacket};
use shop_gateway::services::transport::{Transport, TransportError};
use tower::ServiceExt;

pub const PRIVATE_KEY_PEM: &str = include_str!("../fixtures/ed25519_private.pem");
pub const PUBLIC_KEY_PEM: &str = include_str!("../fixtures/ed25519_public.pem");
pub const ROGUE_PRIVATE_KEY_PEM: &str = include_str!("../fixtures/rogue_ed25519_private.pem");
pub const ROGUE_PUBLIC_KEY_PEM: &str = include_str!("../fixtures/rogue_ed25519_public.pem");

pub const ISSUER: &str = "shop-platform-it";

pub fn tokens() -> TokenService {
    let keys = KeyMaterial::from_pem(KeyAlgorithm::EdDsa, PUBLIC_KEY_PEM, Some(PRIVATE_KEY_PEM))
        .expect("fixture keys");
    TokenService::new(keys, ISSUER, 0)
}

pub fn bearer(role: &str, ttl: i64) -> String {
    let subject = TokenSubject::new("u1", "a@b.com", role);
    format!("Bearer {}", tokens().sign(&subject, ttl).expect("sign"))
}

#[derive(Debug, Clone)]
pub enum Step {
    Reply(Value),
    BackendError(Value),
    Fail,
    Hang,
}

/// In-memory transport: replays `Step`s in order and records every call.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
    steps: Arc<Mutex<VecDeque<Step>>>,
    calls: Arc<Mutex<Vec<(String, MessageEnvelope)>>>,
}

impl ScriptedTransport {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            steps: Arc::new(Mutex::new(steps.into_iter().collect())),
            calls: Arc::default(),
        }
    }

    pub fn calls(&self) -> Vec<(String, MessageEnvelope)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    fn backend_name(&self) -> &'static str {
        "scripted"
    }

    async fn request(
        &self,
        address: &str,
        envelope: &MessageEnvelope,
    ) -> Result<ReplyPacket, TransportError> {
        self.calls
            .lock()
            .unwrap()
            .push((address.to_string(), envelope.clone()));

        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(Step::Reply(v)) => Ok(ReplyPacket::response(envelope.id, v)),
            Some(Step::BackendError(e)) => Ok(ReplyPacket::error(envelope.id, e)),
            Some(Step::Fail) => Err(TransportError::Connection("connection refused".into())),
            Some(Step::Hang) | None => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(TransportError::Connection("hang elapsed".into()))
            }
        }
    }
}

pub fn config() -> Config {
    Config::from_lookup(|key| match key {
        "ACCESS_JWT_PUBLIC_KEY_PEM" => Some(PUBLIC_KEY_PEM.to_string()),
        "AUTH_ISSUER" => Some(ISSUER.to_string()),
        _ => None,
    })
    .expect("test config")
}

pub fn app(transport: &ScriptedTransport) -> Router {
    let config = config();
    let state = build_state(&config, Arc::new(transport.clone())).expect("state");
    build_router(state, &config)
}

pub async fn send(app: Router, req: Request<Body>) -> (Response<Body>, Value) {
    let res = app.oneshot(req).await.expect("infallible");
    let (parts, body) = res.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX).await.expect("body");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (Response::from_parts(parts, Body::empty()), json)
}

pub fn get(uri: &str, authorization: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(a) = authorization {
        builder = builder.header("authorization", a);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn with_body(method: &str, uri: &str, authorization: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(a) = authorization {
        builder = builder.header("authorization", a);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}
