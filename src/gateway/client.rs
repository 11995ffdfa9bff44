//! MVola HTTP client with per-call timeouts.
//!
//! # Responsibilities
//! - Exchange consumer credentials for a bearer token
//! - Submit merchant-pay transactions
//! - Query transaction status and detail records
//! - Map transport failures and timeouts to `GatewayError`

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde_json::Value;
use std::time::{Duration, Instant};

use crate::config::GatewayConfig;
use crate::gateway::types::{
    Accepted, GatewayError, GatewayResult, MerchantPayment, PartnerContext,
};
use crate::gateway::Gateway;
use crate::observability::metrics;

const MERCHANT_PAY_PATH: &str = "/mvola/mm/transactions/type/merchantpay/1.0.0";
const TOKEN_SCOPE: &str = "EXT_INT_MVOLA_SCOPE";

/// reqwest-backed gateway client.
#[derive(Clone)]
pub struct MvolaClient {
    http: reqwest::Client,
    base_url: String,
    config: GatewayConfig,
}

impl MvolaClient {
    /// Create a new client for the configured base URL.
    pub fn new(config: GatewayConfig) -> GatewayResult<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| GatewayError::Unreachable(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            config,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request with a deadline, recording outcome metrics.
    async fn send(
        &self,
        call: &'static str,
        request: RequestBuilder,
        timeout: Duration,
    ) -> GatewayResult<Response> {
        let started = Instant::now();
        match request.timeout(timeout).send().await {
            Ok(response) => {
                tracing::info!(
                    call,
                    status = %response.status(),
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Upstream response received"
                );
                let outcome = if response.status().is_success() { "success" } else { "rejected" };
                metrics::record_upstream(call, outcome);
                Ok(response)
            }
            Err(e) if e.is_timeout() => {
                tracing::error!(
                    call,
                    timeout_secs = timeout.as_secs(),
                    "Upstream request timed out"
                );
                metrics::record_upstream(call, "timeout");
                Err(GatewayError::Timeout)
            }
            Err(e) => {
                tracing::error!(call, error = %e, "Upstream request failed");
                metrics::record_upstream(call, "unreachable");
                Err(GatewayError::Unreachable(e.to_string()))
            }
        }
    }

    /// Read a response body as JSON.
    async fn json(response: Response) -> GatewayResult<Value> {
        let bytes = response.bytes().await.map_err(body_error)?;
        serde_json::from_slice(&bytes).map_err(|e| GatewayError::InvalidResponse(e.to_string()))
    }

    /// Capture a response verbatim for passthrough.
    async fn rejected(response: Response) -> GatewayError {
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        match response.bytes().await {
            Ok(body) => {
                tracing::debug!(
                    status,
                    body = %String::from_utf8_lossy(&body),
                    "Upstream rejection body"
                );
                GatewayError::Rejected {
                    status,
                    body: body.to_vec(),
                    content_type,
                }
            }
            Err(e) => body_error(e),
        }
    }

    fn partner_query(
        &self,
        request: RequestBuilder,
        token: &str,
        ctx: &PartnerContext,
    ) -> RequestBuilder {
        request
            .header("Version", "1.0")
            .header("X-CorrelationID", &ctx.correlation_id)
            .header("UserLanguage", "FR")
            .header("UserAccountIdentifier", ctx.account_identifier())
            .header("partnerName", ctx.partner_header())
            .bearer_auth(token)
    }

    /// GET a partner-scoped record, returning its JSON on 200.
    async fn get_record(
        &self,
        call: &'static str,
        url: String,
        token: &str,
        ctx: &PartnerContext,
        timeout: Duration,
    ) -> GatewayResult<Value> {
        tracing::info!(call, url = %url, correlation_id = %ctx.correlation_id, "Querying upstream");
        let request = self.partner_query(self.http.get(url), token, ctx);
        let response = self.send(call, request, timeout).await?;

        if response.status() != StatusCode::OK {
            return Err(Self::rejected(response).await);
        }
        Self::json(response).await
    }
}

fn body_error(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Timeout
    } else {
        GatewayError::Unreachable(e.to_string())
    }
}

#[async_trait]
impl Gateway for MvolaClient {
    async fn request_token(
        &self,
        consumer_key: &str,
        consumer_secret: &str,
    ) -> GatewayResult<String> {
        let request = self
            .http
            .post(self.url("/token"))
            .header("Cache-Control", "no-cache")
            .basic_auth(consumer_key, Some(consumer_secret))
            .form(&[("grant_type", "client_credentials"), ("scope", TOKEN_SCOPE)]);

        let response = self
            .send("token", request, Duration::from_secs(self.config.token_timeout_secs))
            .await?;
        if response.status() != StatusCode::OK {
            return Err(Self::rejected(response).await);
        }

        let body = Self::json(response).await?;
        body.get("access_token")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                GatewayError::InvalidResponse(
                    "access_token missing from token response".to_string(),
                )
            })
    }

    async fn create_transaction(
        &self,
        token: &str,
        payment: &MerchantPayment,
        correlation_id: &str,
        callback_url: &str,
    ) -> GatewayResult<Accepted> {
        let request = self
            .http
            .post(self.url(&format!("{}/", MERCHANT_PAY_PATH)))
            .header("version", "1.0")
            .header("UserLanguage", "MG")
            .header("X-CorrelationID", correlation_id)
            .header("X-Callback-URL", callback_url)
            .header("Accept-Charset", "utf-8")
            .bearer_auth(token)
            .json(payment);

        let response = self
            .send("create", request, Duration::from_secs(self.config.create_timeout_secs))
            .await?;
        let status = response.status();
        if !matches!(status.as_u16(), 200 | 201 | 202) {
            return Err(Self::rejected(response).await);
        }

        let body = Self::json(response).await?;
        match body.get("serverCorrelationId").and_then(|v| v.as_str()) {
            Some(handle) if !handle.is_empty() => Ok(Accepted {
                server_correlation_id: handle.to_string(),
                status: status.as_u16(),
                body: body.clone(),
            }),
            _ => {
                tracing::error!(
                    correlation_id,
                    "serverCorrelationId missing from accepted response"
                );
                Err(GatewayError::rejected_json(status.as_u16(), &body))
            }
        }
    }

    async fn transaction_status(
        &self,
        token: &str,
        server_correlation_id: &str,
        ctx: &PartnerContext,
    ) -> GatewayResult<Value> {
        let url = self.url(&format!("{}/status/{}", MERCHANT_PAY_PATH, server_correlation_id));
        let timeout = Duration::from_secs(self.config.status_timeout_secs);
        self.get_record("status", url, token, ctx, timeout).await
    }

    async fn transaction_details(
        &self,
        token: &str,
        object_reference: &str,
        ctx: &PartnerContext,
    ) -> GatewayResult<Value> {
        let url = self.url(&format!("{}/{}", MERCHANT_PAY_PATH, object_reference));
        let timeout = Duration::from_secs(self.config.details_timeout_secs);
        self.get_record("details", url, token, ctx, timeout).await
    }
}

impl std::fmt::Debug for MvolaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MvolaClient")
            .field("base_url", &self.base_url)
            .field("create_timeout_secs", &self.config.create_timeout_secs)
            .finish()
    }
}
