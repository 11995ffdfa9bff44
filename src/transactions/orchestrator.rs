//! Transaction orchestration.
//!
//! # States
//! ```text
//! Submitting → AwaitingCallback → Resolved ───────────→ Terminal
//!                    │
//!                    └─(deadline)→ PollingFallback ───→ Terminal
//! ```
//!
//! - Submitting: register the slot, then submit upstream. Anything but an
//!   accepted answer releases the slot and is returned verbatim.
//! - AwaitingCallback: wait on the slot with the configured deadline.
//! - PollingFallback: release the slot first, then one status check and
//!   one detail fetch. Any failure there resolves as `PENDING`.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::{FallbackStrategy, TransactionConfig};
use crate::correlation::{
    CorrelationIdGenerator, Delivery, PendingRegistry, RegistryError, WaitOutcome,
};
use crate::gateway::{Gateway, GatewayError, PartnerContext};
use crate::observability::metrics;
use crate::transactions::types::{
    default_request_date, CreateTransactionRequest, OutcomeSource, TransactionOutcome,
};
use crate::transactions::TransactionStatus;

const STATUS_UNAVAILABLE: &str =
    "Transaction is being processed. Status could not be checked, query again later.";
const REFERENCE_UNAVAILABLE: &str =
    "Transaction is being processed. objectReference not yet available, query again later.";
const DETAILS_UNAVAILABLE: &str =
    "Transaction is being processed. Details could not be retrieved, query again later.";
const NO_CALLBACK: &str =
    "Transaction is being processed. No callback received yet, query again later.";

/// Orchestrator tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// How long to wait for the callback.
    pub callback_wait: Duration,
    /// Behaviour once the wait elapses.
    pub fallback: FallbackStrategy,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self::from(&TransactionConfig::default())
    }
}

impl From<&TransactionConfig> for OrchestratorConfig {
    fn from(config: &TransactionConfig) -> Self {
        Self {
            callback_wait: Duration::from_secs(config.callback_wait_secs),
            fallback: config.fallback,
        }
    }
}

/// Terminal failures of an attempt.
#[derive(Debug, Error)]
pub enum TransactionError {
    /// The caller supplied an id that is already in flight.
    #[error(transparent)]
    Duplicate(#[from] RegistryError),

    /// Upstream did not accept the transaction.
    #[error(transparent)]
    Upstream(#[from] GatewayError),
}

/// Drives one transaction attempt from submission to a final document.
#[derive(Clone)]
pub struct TransactionOrchestrator {
    gateway: Arc<dyn Gateway>,
    registry: PendingRegistry,
    ids: Arc<dyn CorrelationIdGenerator>,
    config: OrchestratorConfig,
}

impl TransactionOrchestrator {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        registry: PendingRegistry,
        ids: Arc<dyn CorrelationIdGenerator>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            gateway,
            registry,
            ids,
            config,
        }
    }

    pub fn registry(&self) -> &PendingRegistry {
        &self.registry
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Run one attempt.
    ///
    /// The registry slot is released on every exit path, including when the
    /// returned future is dropped mid-wait.
    pub async fn execute(
        &self,
        token: &str,
        request: &CreateTransactionRequest,
        callback_url: &str,
    ) -> Result<TransactionOutcome, TransactionError> {
        // Submitting
        let correlation_id = match request.supplied_correlation_id() {
            Some(id) => id.to_string(),
            None => self.ids.generate(),
        };
        let mut slot = self.registry.register(&correlation_id).map_err(|e| {
            tracing::warn!(correlation_id = %correlation_id, "Correlation id already in flight");
            e
        })?;

        let request_date = request
            .request_date
            .clone()
            .unwrap_or_else(default_request_date);
        let payment = request.to_payment(&correlation_id, &request_date);

        tracing::info!(
            correlation_id = %correlation_id,
            amount = %payment.amount,
            client = %request.client_msisdn,
            partner = %request.partner_msisdn,
            callback_url = %callback_url,
            "Submitting transaction"
        );

        let accepted = match self
            .gateway
            .create_transaction(token, &payment, &correlation_id, callback_url)
            .await
        {
            Ok(accepted) => accepted,
            Err(e) => {
                tracing::warn!(
                    correlation_id = %correlation_id,
                    error = %e,
                    "Transaction not accepted"
                );
                slot.release();
                return Err(e.into());
            }
        };
        let server_correlation_id = accepted.server_correlation_id;

        // AwaitingCallback
        tracing::info!(
            correlation_id = %correlation_id,
            server_correlation_id = %server_correlation_id,
            wait_secs = self.config.callback_wait.as_secs(),
            "Transaction accepted, awaiting callback"
        );

        let waited = slot.wait(self.config.callback_wait).await;
        let delivered = match waited {
            WaitOutcome::Delivered(delivery) => {
                slot.release();
                Some(delivery)
            }
            // Release before anything else so a late callback cannot resurrect the slot.
            WaitOutcome::TimedOut => slot.release(),
        };

        let outcome = match delivered {
            Some(delivery) => {
                self.resolve_from_callback(&correlation_id, &server_correlation_id, delivery)
            }
            None => {
                tracing::info!(
                    correlation_id = %correlation_id,
                    fallback = ?self.config.fallback,
                    "No callback before deadline"
                );
                match self.config.fallback {
                    FallbackStrategy::Poll => {
                        let ctx = request.partner_context(&correlation_id);
                        self.poll(token, &server_correlation_id, &ctx).await
                    }
                    FallbackStrategy::GiveUp => {
                        TransactionOutcome::pending(
                            &correlation_id,
                            &server_correlation_id,
                            NO_CALLBACK,
                        )
                    }
                }
            }
        };

        tracing::info!(
            correlation_id = %correlation_id,
            status = %outcome.status,
            source = ?outcome.source,
            "Transaction attempt finished"
        );
        metrics::record_transaction(outcome.status.as_str(), outcome.source.as_str());
        Ok(outcome)
    }

    fn resolve_from_callback(
        &self,
        correlation_id: &str,
        server_correlation_id: &str,
        delivery: Delivery,
    ) -> TransactionOutcome {
        tracing::info!(correlation_id, status = %delivery.status, "Callback received");
        TransactionOutcome::resolved(
            delivery.status,
            OutcomeSource::Callback,
            correlation_id,
            server_correlation_id,
            &delivery.payload,
        )
    }

    /// PollingFallback: one status check, then one detail fetch.
    async fn poll(
        &self,
        token: &str,
        server_correlation_id: &str,
        ctx: &PartnerContext,
    ) -> TransactionOutcome {
        let correlation_id = ctx.correlation_id.as_str();
        let pending = |message: &str| {
            TransactionOutcome::pending(correlation_id, server_correlation_id, message)
        };

        let status = match self
            .gateway
            .transaction_status(token, server_correlation_id, ctx)
            .await
        {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(correlation_id, error = %e, "Status check failed");
                return pending(STATUS_UNAVAILABLE);
            }
        };

        let object_reference = status
            .get("objectReference")
            .and_then(|v| v.as_str())
            .filter(|r| !r.is_empty());
        let Some(object_reference) = object_reference else {
            tracing::warn!(correlation_id, "objectReference not yet available");
            return pending(REFERENCE_UNAVAILABLE);
        };

        let details = match self
            .gateway
            .transaction_details(token, object_reference, ctx)
            .await
        {
            Ok(details) => details,
            Err(e) => {
                tracing::warn!(correlation_id, object_reference, error = %e, "Detail fetch failed");
                return pending(DETAILS_UNAVAILABLE);
            }
        };

        let status = TransactionStatus::from_record(&details);
        tracing::info!(correlation_id, status = %status, "Status resolved by polling");
        TransactionOutcome::resolved(
            status,
            OutcomeSource::ApiPolling,
            correlation_id,
            server_correlation_id,
            &details,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{Accepted, GatewayResult, MerchantPayment};
    use crate::transactions::types::Resolution;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::Mutex;

    /// In-process gateway with scripted answers.
    struct FakeGateway {
        create: Mutex<Option<GatewayResult<Accepted>>>,
        status: Mutex<Option<GatewayResult<Value>>>,
        details: Mutex<Option<GatewayResult<Value>>>,
        calls: Mutex<Vec<&'static str>>,
    }

    impl FakeGateway {
        fn accepting(handle: &str) -> Self {
            Self {
                create: Mutex::new(Some(Ok(Accepted {
                    server_correlation_id: handle.to_string(),
                    status: 202,
                    body: json!({"serverCorrelationId": handle, "status": "pending"}),
                }))),
                status: Mutex::new(None),
                details: Mutex::new(None),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn with_status(self, status: GatewayResult<Value>) -> Self {
            *self.status.lock().unwrap() = Some(status);
            self
        }

        fn with_details(self, details: GatewayResult<Value>) -> Self {
            *self.details.lock().unwrap() = Some(details);
            self
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Gateway for FakeGateway {
        async fn request_token(&self, _key: &str, _secret: &str) -> GatewayResult<String> {
            Ok("token".to_string())
        }

        async fn create_transaction(
            &self,
            _token: &str,
            _payment: &MerchantPayment,
            _correlation_id: &str,
            _callback_url: &str,
        ) -> GatewayResult<Accepted> {
            self.calls.lock().unwrap().push("create");
            self.create.lock().unwrap().take().unwrap_or(Err(GatewayError::Timeout))
        }

        async fn transaction_status(
            &self,
            _token: &str,
            _server_correlation_id: &str,
            _ctx: &PartnerContext,
        ) -> GatewayResult<Value> {
            self.calls.lock().unwrap().push("status");
            self.status.lock().unwrap().take().unwrap_or(Err(GatewayError::Timeout))
        }

        async fn transaction_details(
            &self,
            _token: &str,
            _object_reference: &str,
            _ctx: &PartnerContext,
        ) -> GatewayResult<Value> {
            self.calls.lock().unwrap().push("details");
            self.details.lock().unwrap().take().unwrap_or(Err(GatewayError::Timeout))
        }
    }

    fn request(correlation_id: &str) -> CreateTransactionRequest {
        CreateTransactionRequest::from_json(&json!({
            "amount": 1000,
            "clientMsisdn": "0343500003",
            "partnerMsisdn": "0343500004",
            "descriptionTransaction": "Order 42",
            "referenceID": "REF42",
            "name": "Shop",
            "xCorrelationID": correlation_id
        }))
        .unwrap()
    }

    fn orchestrator(
        gateway: Arc<FakeGateway>,
        wait_ms: u64,
        fallback: FallbackStrategy,
    ) -> TransactionOrchestrator {
        TransactionOrchestrator::new(
            gateway,
            PendingRegistry::new(),
            Arc::new(|| "generated".to_string()),
            OrchestratorConfig {
                callback_wait: Duration::from_millis(wait_ms),
                fallback,
            },
        )
    }

    #[tokio::test]
    async fn test_callback_resolves_attempt() {
        let gateway = Arc::new(FakeGateway::accepting("SCID1"));
        let orchestrator = orchestrator(gateway.clone(), 2_000, FallbackStrategy::Poll);

        let registry = orchestrator.registry().clone();
        let notifier = tokio::spawn(async move {
            while !registry.contains("c1") {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
            registry.deliver(
                "c1",
                Delivery {
                    status: TransactionStatus::from_upstream("completed"),
                    payload: json!({"amount": "1000", "transactionStatus": "completed"}),
                },
            )
        });

        let outcome = orchestrator.execute("token", &request("c1"), "http://cb").await.unwrap();
        assert!(notifier.await.unwrap());

        assert_eq!(outcome.resolution, Resolution::Resolved);
        assert_eq!(outcome.status, TransactionStatus::Success);
        assert_eq!(outcome.source, OutcomeSource::Callback);
        assert_eq!(outcome.server_correlation_id, "SCID1");
        assert_eq!(outcome.amount, Some(json!("1000")));
        assert_eq!(gateway.calls(), vec!["create"]);
        assert!(orchestrator.registry().is_empty());
    }

    #[tokio::test]
    async fn test_polling_fallback_resolves() {
        let gateway = Arc::new(
            FakeGateway::accepting("SCID2")
                .with_status(Ok(json!({"status": "completed", "objectReference": "OBJ2"})))
                .with_details(Ok(json!({"transactionStatus": "failed", "amount": "1000"}))),
        );
        let orchestrator = orchestrator(gateway.clone(), 20, FallbackStrategy::Poll);

        let outcome = orchestrator.execute("token", &request("c2"), "http://cb").await.unwrap();
        assert_eq!(outcome.resolution, Resolution::Resolved);
        assert_eq!(outcome.status, TransactionStatus::Failed);
        assert_eq!(outcome.source, OutcomeSource::ApiPolling);
        assert_eq!(gateway.calls(), vec!["create", "status", "details"]);
        assert!(orchestrator.registry().is_empty());
    }

    #[tokio::test]
    async fn test_missing_reference_is_pending() {
        let gateway = Arc::new(
            FakeGateway::accepting("SCID3").with_status(Ok(json!({"status": "pending"}))),
        );
        let orchestrator = orchestrator(gateway.clone(), 20, FallbackStrategy::Poll);

        let outcome = orchestrator.execute("token", &request("c3"), "http://cb").await.unwrap();
        assert_eq!(outcome.resolution, Resolution::Pending);
        assert_eq!(outcome.status, TransactionStatus::Pending);
        assert_eq!(outcome.message.as_deref(), Some(REFERENCE_UNAVAILABLE));
        assert_eq!(gateway.calls(), vec!["create", "status"]);
    }

    #[tokio::test]
    async fn test_failed_status_check_is_pending() {
        let gateway = Arc::new(
            FakeGateway::accepting("SCID3")
                .with_status(Err(GatewayError::Unreachable("reset".to_string()))),
        );
        let orchestrator = orchestrator(gateway, 20, FallbackStrategy::Poll);

        let outcome = orchestrator.execute("token", &request("c3"), "http://cb").await.unwrap();
        assert_eq!(outcome.resolution, Resolution::Pending);
        assert_eq!(outcome.message.as_deref(), Some(STATUS_UNAVAILABLE));
    }

    #[tokio::test]
    async fn test_failed_detail_fetch_is_pending() {
        let gateway = Arc::new(
            FakeGateway::accepting("SCID3")
                .with_status(Ok(json!({"objectReference": "OBJ3"})))
                .with_details(Err(GatewayError::Timeout)),
        );
        let orchestrator = orchestrator(gateway, 20, FallbackStrategy::Poll);

        let outcome = orchestrator.execute("token", &request("c3"), "http://cb").await.unwrap();
        assert_eq!(outcome.resolution, Resolution::Pending);
        assert_eq!(outcome.message.as_deref(), Some(DETAILS_UNAVAILABLE));
    }

    #[tokio::test]
    async fn test_give_up_skips_polling() {
        let gateway = Arc::new(FakeGateway::accepting("SCID5"));
        let orchestrator = orchestrator(gateway.clone(), 20, FallbackStrategy::GiveUp);

        let outcome = orchestrator.execute("token", &request("c5"), "http://cb").await.unwrap();
        assert_eq!(outcome.resolution, Resolution::Pending);
        assert_eq!(gateway.calls(), vec!["create"]);
    }

    #[tokio::test]
    async fn test_rejection_releases_slot() {
        let gateway = Arc::new(FakeGateway::accepting("unused"));
        *gateway.create.lock().unwrap() =
            Some(Err(GatewayError::rejected_json(400, &json!({"errorCode": "4001"}))));
        let orchestrator = orchestrator(gateway, 2_000, FallbackStrategy::Poll);

        let err = orchestrator.execute("token", &request("c4"), "http://cb").await.unwrap_err();
        assert!(matches!(
            err,
            TransactionError::Upstream(GatewayError::Rejected { status: 400, .. })
        ));
        assert!(orchestrator.registry().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_correlation_id() {
        let gateway = Arc::new(FakeGateway::accepting("SCID6"));
        let orchestrator = orchestrator(gateway.clone(), 20, FallbackStrategy::GiveUp);
        let _held = orchestrator.registry().register("c6").unwrap();

        let err = orchestrator.execute("token", &request("c6"), "http://cb").await.unwrap_err();
        assert!(matches!(err, TransactionError::Duplicate(_)));
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_generated_id_when_not_supplied() {
        let gateway = Arc::new(FakeGateway::accepting("SCID7"));
        let orchestrator = orchestrator(gateway, 10, FallbackStrategy::GiveUp);
        let mut request = request("ignored");
        request.x_correlation_id = None;

        let outcome = orchestrator.execute("token", &request, "http://cb").await.unwrap();
        assert_eq!(outcome.x_correlation_id, "generated");
    }

    #[tokio::test]
    async fn test_cancelled_attempt_releases_slot() {
        let gateway = Arc::new(FakeGateway::accepting("SCID8"));
        let orchestrator = orchestrator(gateway, 30_000, FallbackStrategy::Poll);

        let runner = orchestrator.clone();
        let task =
            tokio::spawn(async move { runner.execute("token", &request("c8"), "http://cb").await });
        while !orchestrator.registry().contains("c8") {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        task.abort();
        let _ = task.await;

        assert!(orchestrator.registry().is_empty());
    }
}
