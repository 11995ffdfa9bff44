//! Boundary error type.
//!
//! Every failure leaves the service as `{"error": <kind>, "message": <text>}`,
//! except upstream rejections, which are passed through verbatim.

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::correlation::RegistryError;
use crate::gateway::GatewayError;
use crate::transactions::{RequestError, TransactionError};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    AuthRequired(String),

    #[error("{message}")]
    Validation {
        message: String,
        missing_fields: Vec<String>,
    },

    #[error("upstream answered with status {status}")]
    UpstreamRejected {
        status: u16,
        body: Vec<u8>,
        content_type: Option<String>,
    },

    #[error("upstream request timed out")]
    UpstreamTimeout,

    #[error("upstream request failed: {0}")]
    UpstreamUnreachable(String),

    #[error("invalid upstream response: {0}")]
    InvalidUpstreamResponse(String),

    #[error("correlation id '{0}' is already in flight")]
    DuplicateCorrelationId(String),

    #[error("route not found")]
    NotFound,

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("request did not complete within {0} seconds")]
    RequestTimeout(u64),

    #[error("internal server error")]
    Internal,
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            missing_fields: Vec::new(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::AuthRequired(_) => StatusCode::UNAUTHORIZED,
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::UpstreamRejected { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            Self::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
            Self::UpstreamUnreachable(_) | Self::InvalidUpstreamResponse(_) | Self::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::DuplicateCorrelationId(_) => StatusCode::CONFLICT,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::RequestTimeout(_) => StatusCode::REQUEST_TIMEOUT,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::AuthRequired(_) => "auth_required",
            Self::Validation { .. } => "validation_error",
            Self::UpstreamRejected { .. } => "upstream_rejected",
            Self::UpstreamTimeout => "upstream_timeout",
            Self::UpstreamUnreachable(_) => "upstream_unreachable",
            Self::InvalidUpstreamResponse(_) => "invalid_upstream_response",
            Self::DuplicateCorrelationId(_) => "duplicate_correlation_id",
            Self::NotFound => "not_found",
            Self::MethodNotAllowed => "method_not_allowed",
            Self::RequestTimeout(_) => "request_timeout",
            Self::Internal => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind();
        let message = self.to_string();
        match self {
            Self::UpstreamRejected {
                body, content_type, ..
            } => {
                let mut response = Response::new(Body::from(body));
                *response.status_mut() = status;
                if let Some(value) = content_type.and_then(|ct| HeaderValue::from_str(&ct).ok()) {
                    response.headers_mut().insert(header::CONTENT_TYPE, value);
                }
                response
            }
            Self::Validation { missing_fields, .. } if !missing_fields.is_empty() => (
                status,
                Json(json!({
                    "error": kind,
                    "message": message,
                    "missingFields": missing_fields,
                })),
            )
                .into_response(),
            _ => (status, Json(json!({ "error": kind, "message": message }))).into_response(),
        }
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Rejected {
                status,
                body,
                content_type,
            } => Self::UpstreamRejected {
                status,
                body,
                content_type,
            },
            GatewayError::Timeout => Self::UpstreamTimeout,
            GatewayError::Unreachable(e) => Self::UpstreamUnreachable(e),
            GatewayError::InvalidResponse(e) => Self::InvalidUpstreamResponse(e),
        }
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::DuplicateId(id) => Self::DuplicateCorrelationId(id),
        }
    }
}

impl From<TransactionError> for ApiError {
    fn from(err: TransactionError) -> Self {
        match err {
            TransactionError::Duplicate(e) => e.into(),
            TransactionError::Upstream(e) => e.into(),
        }
    }
}

impl From<RequestError> for ApiError {
    fn from(err: RequestError) -> Self {
        match err {
            RequestError::MissingFields(fields) => Self::Validation {
                message: format!("Missing required fields: {}", fields.join(", ")),
                missing_fields: fields,
            },
            other => Self::validation(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_missing_fields_body() {
        let err: ApiError = RequestError::MissingFields(vec!["amount".to_string()]).into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error"], "validation_error");
        assert_eq!(body["missingFields"], serde_json::json!(["amount"]));
    }

    #[tokio::test]
    async fn test_rejection_passthrough_is_verbatim() {
        let err: ApiError = GatewayError::Rejected {
            status: 400,
            body: br#"{"errorCode":"4001","errorDescription":"bad msisdn"}"#.to_vec(),
            content_type: Some("application/json".to_string()),
        }
        .into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], br#"{"errorCode":"4001","errorDescription":"bad msisdn"}"#);
    }

    #[tokio::test]
    async fn test_upstream_status_mapping() {
        assert_eq!(ApiError::from(GatewayError::Timeout).status(), StatusCode::GATEWAY_TIMEOUT);

        let err = GatewayError::Unreachable("connection refused".to_string());
        let response = ApiError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"], "upstream_unreachable");
        assert!(body["message"].as_str().unwrap().contains("connection refused"));
    }

    #[test]
    fn test_duplicate_is_conflict() {
        let err: ApiError =
            TransactionError::Duplicate(RegistryError::DuplicateId("c1".to_string())).into();
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_internal_hides_details() {
        let body = body_json(ApiError::Internal.into_response()).await;
        assert_eq!(body["message"], "internal server error");
    }
}
