mod error;
mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use log::info;
use tower_http::trace::TraceLayer;

use crate::core::BenchError;
use crate::report::ReportRenderer;
use crate::service::BenchmarkService;

pub use error::{ApiError, ErrorResponse};

/// Shared state of the HTTP handlers.
pub struct ApiState {
    pub service: BenchmarkService,
    pub renderer: Arc<dyn ReportRenderer>,
}

pub struct BenchApi {
    state: Arc<ApiState>,
}

impl BenchApi {
    pub fn new(service: BenchmarkService, renderer: Arc<dyn ReportRenderer>) -> Self {
        Self {
            state: Arc::new(ApiState { service, renderer }),
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(handlers::health))
            .route("/api/options/{kind}", get(handlers::list_options))
            .route("/api/benchmark/unique", post(handlers::run_unique))
            .route("/api/benchmark/workload", post(handlers::run_workload))
            .route("/api/benchmark/unique-custom", post(handlers::run_custom))
            .route(
                "/api/benchmark/workload-custom",
                post(handlers::run_custom_workload),
            )
            .route("/api/report", post(handlers::report))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    pub async fn serve(self, addr: &str) -> Result<(), BenchError> {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| BenchError::IoError(format!("binding to {addr}: {e}")))?;
        info!("Listening on {addr}");
        axum::serve(listener, self.router())
            .await
            .map_err(|e| BenchError::IoError(format!("serving: {e}")))?;
        Ok(())
    }
}
