//! Route handlers.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};

use crate::http::error::ApiError;
use crate::http::request::{basic_credentials, bearer_token, callback_url, request_id, token_prefix};
use crate::http::server::AppState;
use crate::transactions::{CreateTransactionRequest, Resolution};

/// `POST /mvola/token`: exchange Basic credentials for a bearer token.
pub async fn request_token(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let request_id = request_id(&headers);
    let (key, secret) = basic_credentials(&headers).ok_or_else(|| {
        tracing::warn!(request_id = %request_id, "Token request without Basic credentials");
        ApiError::AuthRequired("Basic credentials required".to_string())
    })?;

    let token = state.gateway.request_token(&key, &secret).await?;
    tracing::info!(
        request_id = %request_id,
        token_prefix = %token_prefix(&token),
        "Access token obtained"
    );
    Ok(Json(json!({ "access_token": token })))
}

/// `POST /mvola/transaction`: submit and wait for a definitive status.
pub async fn create_transaction(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let request_id = request_id(&headers);
    let token = bearer_token(&headers)
        .ok_or_else(|| ApiError::AuthRequired("Bearer token required".to_string()))?;

    let body: Value =
        serde_json::from_slice(&body).map_err(|_| ApiError::validation("JSON body required"))?;
    let request = CreateTransactionRequest::from_json(&body).map_err(|e| {
        tracing::warn!(request_id = %request_id, error = %e, "Rejected transaction request");
        ApiError::from(e)
    })?;

    let callback_url = callback_url(
        request.callback_url.as_deref(),
        state.public_base_url.as_deref(),
        &headers,
    );
    let outcome = state.orchestrator.execute(token, &request, &callback_url).await?;

    let status = match outcome.resolution {
        Resolution::Resolved => StatusCode::OK,
        Resolution::Pending => StatusCode::ACCEPTED,
    };
    tracing::info!(
        request_id = %request_id,
        correlation_id = %outcome.x_correlation_id,
        status = %outcome.status,
        source = outcome.source.as_str(),
        "Transaction finished"
    );
    Ok((status, Json(outcome)).into_response())
}

/// `PUT|POST /mvola/callback`: always 200 so the gateway never retries.
pub async fn receive_callback(State(state): State<AppState>, body: Bytes) -> Json<Value> {
    let payload = match serde_json::from_slice::<Value>(&body) {
        Ok(payload) if payload.is_object() => payload,
        _ => {
            state.receiver.ignore(&body).await;
            return Json(json!({
                "status": "ignored",
                "message": "Callback body is not a JSON object",
            }));
        }
    };

    let receipt = state.receiver.receive(payload).await;
    Json(json!({
        "status": "received",
        "message": "Callback processed",
        "correlation_id": receipt.correlation_id.as_deref().unwrap_or("N/A"),
    }))
}

/// `GET /health`: liveness.
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
        "pending": state.orchestrator.registry().len(),
    }))
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound
}

pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}
