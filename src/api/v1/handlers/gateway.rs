/*
 * Responsibility
 * - The one handler behind every gateway operation
 * - Request -> payload {params, query, body, user} -> RequestDispatcher
 * - Dispatch failures go through the ErrorTranslator exactly once, here
 */
use std::collections::BTreeMap;

use axum::{
    Json,
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Query, RawPathParams, Request, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::api::v1::GatewayOperation;
use crate::api::v1::extractors::MaybeIdentity;
use crate::error::AppError;
use crate::middleware::http::REQUEST_ID_HEADER;
use crate::services::dispatch::DispatchFailure;
use crate::services::dispatch::envelope::AUTHORIZATION_FIELD;
use crate::state::AppState;

pub async fn forward(
    op: &'static GatewayOperation,
    State(state): State<AppState>,
    MaybeIdentity(identity): MaybeIdentity,
    req: Request,
) -> Result<Response, AppError> {
    let (mut parts, body) = req.into_parts();

    // Operations without path parameters have nothing to extract.
    let params: BTreeMap<String, String> = RawPathParams::from_request_parts(&mut parts, &state)
        .await
        .map(|raw| {
            raw.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        })
        .unwrap_or_default();

    let Query(query) = Query::<BTreeMap<String, String>>::try_from_uri(&parts.uri)
        .map_err(|e| AppError::BadRequest(e.body_text()))?;

    let mut headers = BTreeMap::new();
    for (name, field) in [
        (header::AUTHORIZATION.as_str(), AUTHORIZATION_FIELD),
        (REQUEST_ID_HEADER, REQUEST_ID_HEADER),
    ] {
        if let Some(value) = parts.headers.get(name).and_then(|v| v.to_str().ok()) {
            headers.insert(field.to_string(), value.to_string());
        }
    }

    let bytes = Bytes::from_request(Request::from_parts(parts, body), &state)
        .await
        .map_err(|rejection| match rejection.status() {
            StatusCode::PAYLOAD_TOO_LARGE => AppError::PayloadTooLarge,
            _ => AppError::BadRequest(rejection.body_text()),
        })?;
    let body = if bytes.iter().all(u8::is_ascii_whitespace) {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .map_err(|e| AppError::BadRequest(format!("Invalid JSON body: {e}")))?
    };

    let payload = json!({
        "params": params,
        "query": query,
        "body": body,
        "user": identity,
    });

    let started = Instant::now();
    match state
        .dispatcher
        .dispatch(op.service, op.id, payload, headers)
        .await
    {
        Ok(dispatched) => {
            info!(
                operation = op.id,
                service = op.service,
                attempts = dispatched.attempts,
                elapsed_ms = dispatched.elapsed.as_millis() as u64,
                "dispatched"
            );
            Ok((op.verb.success_status(), Json(dispatched.reply)).into_response())
        }
        Err(failure) => {
            let elapsed_ms = started.elapsed().as_millis() as u64;
            let detail = match &failure {
                DispatchFailure::Backend { error, .. } => error.to_string(),
                other => other.to_string(),
            };

            if matches!(failure, DispatchFailure::UnknownService(_)) {
                error!(
                    operation = op.id,
                    service = op.service,
                    "no route for service; check SERVICE_ROUTES"
                );
            } else {
                warn!(
                    operation = op.id,
                    service = op.service,
                    elapsed_ms,
                    attempts = failure.attempts(),
                    kind = failure.kind(),
                    detail = %detail,
                    "dispatch failed"
                );
            }

            let envelope = state.translator.translate(failure.into_raw());
            Err(AppError::Upstream(envelope))
        }
    }
}
