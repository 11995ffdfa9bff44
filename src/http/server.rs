//! HTTP server setup.
//!
//! # Responsibilities
//! - Build the shared state (gateway client, registry, orchestrator, receiver)
//! - Create the Axum router and wire up middleware (request id, tracing,
//!   panic recovery, timeout)
//! - Serve until the shutdown signal fires

use axum::{
    error_handling::HandleErrorLayer,
    response::{IntoResponse, Response},
    routing::{get, on, post, MethodFilter},
    Router,
};
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::{timeout::TimeoutLayer, BoxError, ServiceBuilder};
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::callback::{CallbackAudit, CallbackReceiver};
use crate::config::{BridgeConfig, CallbackMethod};
use crate::correlation::{PendingRegistry, TimestampIdGenerator};
use crate::gateway::{Gateway, GatewayResult, MvolaClient};
use crate::http::error::ApiError;
use crate::http::handlers;
use crate::http::request::CALLBACK_PATH;
use crate::observability::metrics;
use crate::transactions::{OrchestratorConfig, TransactionOrchestrator};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<dyn Gateway>,
    pub orchestrator: TransactionOrchestrator,
    pub receiver: CallbackReceiver,
    pub public_base_url: Option<String>,
}

impl AppState {
    /// Wire up the subsystems around a gateway implementation.
    pub fn new(config: &BridgeConfig, gateway: Arc<dyn Gateway>) -> Self {
        let registry = PendingRegistry::new();
        let orchestrator = TransactionOrchestrator::new(
            gateway.clone(),
            registry.clone(),
            Arc::new(TimestampIdGenerator::new()),
            OrchestratorConfig::from(&config.transactions),
        );
        let audit = config
            .audit
            .enabled
            .then(|| Arc::new(CallbackAudit::new(&config.audit.path)));
        let receiver = CallbackReceiver::new(registry, audit, config.callback.clone());

        Self {
            gateway,
            orchestrator,
            receiver,
            public_base_url: config.listener.public_base_url.clone(),
        }
    }
}

/// HTTP server for the bridge.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a server talking to the configured MVola gateway.
    pub fn new(config: BridgeConfig) -> GatewayResult<Self> {
        let client = MvolaClient::new(config.gateway.clone())?;
        Ok(Self::with_gateway(config, Arc::new(client)))
    }

    /// Create a server around an arbitrary gateway implementation.
    pub fn with_gateway(config: BridgeConfig, gateway: Arc<dyn Gateway>) -> Self {
        let state = AppState::new(&config, gateway);
        let router = Self::build_router(&config, state.clone());
        Self { router, state }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &BridgeConfig, state: AppState) -> Router {
        let callback_method = match config.callback.method {
            CallbackMethod::Put => MethodFilter::PUT,
            CallbackMethod::Post => MethodFilter::POST,
        };

        let router = Router::new()
            .route("/mvola/token", post(handlers::request_token))
            .route("/mvola/transaction", post(handlers::create_transaction))
            .route(CALLBACK_PATH, on(callback_method, handlers::receive_callback))
            .route("/health", get(handlers::health))
            .method_not_allowed_fallback(handlers::method_not_allowed)
            .fallback(handlers::not_found)
            .with_state(state);

        with_middleware(router, Duration::from_secs(config.timeouts.request_secs))
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Consume the server, returning the configured router.
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining requests");
            })
            .await?;

        tracing::info!(
            pending = self.state.orchestrator.registry().len(),
            "HTTP server stopped"
        );
        Ok(())
    }
}

/// Wrap `router` in the request-id, tracing, panic and timeout layers.
///
/// Layers run top to bottom on the way in, so the request id is set before
/// anything is logged and every failure below `CatchPanicLayer` still leaves
/// as a JSON `ApiError`.
fn with_middleware(router: Router, request_timeout: Duration) -> Router {
    let timeout_secs = request_timeout.as_secs();
    router.layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(CatchPanicLayer::custom(handle_panic))
            .layer(HandleErrorLayer::new(move |err: BoxError| async move {
                handle_middleware_error(err, timeout_secs)
            }))
            .layer(TimeoutLayer::new(request_timeout)),
    )
}

fn handle_middleware_error(err: BoxError, timeout_secs: u64) -> ApiError {
    if err.is::<tower::timeout::error::Elapsed>() {
        tracing::warn!(timeout_secs, "Request exceeded the overall timeout");
        metrics::record_request_timeout();
        ApiError::RequestTimeout(timeout_secs)
    } else {
        tracing::error!(error = %err, "Unhandled middleware error");
        ApiError::Internal
    }
}

fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("non-string panic payload");
    tracing::error!(panic = detail, "Handler panicked");
    ApiError::Internal.into_response()
}
