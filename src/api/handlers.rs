use std::collections::BTreeMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde_json::Value;

use crate::model::{Backend, SingleQueryResult, WorkloadResult};
use crate::service::{
    CustomRequest, CustomWorkloadRequest, OptionEntry, OptionKind, UniqueRequest,
    WorkloadRequest, options,
};

use super::ApiState;
use super::error::ApiError;

const REPORT_FILENAME: &str = "benchmark-report.html";

pub async fn health() -> &'static str {
    "OK"
}

pub async fn list_options(Path(kind): Path<String>) -> Result<Json<Vec<OptionEntry>>, ApiError> {
    let kind: OptionKind = kind
        .parse()
        .map_err(|_| ApiError::NotFound(format!("No option list named '{kind}'")))?;
    Ok(Json(options(kind)))
}

pub async fn run_unique(
    State(state): State<Arc<ApiState>>,
    Json(req): Json<UniqueRequest>,
) -> Result<Json<BTreeMap<Backend, SingleQueryResult>>, ApiError> {
    let results = state
        .service
        .run_single_query(req.selected_query, &req.settings)
        .await?;
    Ok(Json(results))
}

pub async fn run_custom(
    State(state): State<Arc<ApiState>>,
    Json(req): Json<CustomRequest>,
) -> Result<Json<BTreeMap<Backend, SingleQueryResult>>, ApiError> {
    let results = state
        .service
        .run_custom_query(&req.custom_queries, &req.settings)
        .await?;
    Ok(Json(results))
}

pub async fn run_workload(
    State(state): State<Arc<ApiState>>,
    Json(req): Json<WorkloadRequest>,
) -> Result<Json<BTreeMap<Backend, WorkloadResult>>, ApiError> {
    let results = state
        .service
        .run_workload(req.selected_workload, &req.settings)
        .await?;
    Ok(Json(results))
}

pub async fn run_custom_workload(
    State(state): State<Arc<ApiState>>,
    Json(req): Json<CustomWorkloadRequest>,
) -> Result<Json<BTreeMap<Backend, WorkloadResult>>, ApiError> {
    let results = state
        .service
        .run_custom_workload(req.custom_workload_queries, &req.settings)
        .await?;
    Ok(Json(results))
}

pub async fn report(
    State(state): State<Arc<ApiState>>,
    Json(document): Json<Value>,
) -> Result<Response, ApiError> {
    let html = state.renderer.render(&document.to_string()).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/html; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={REPORT_FILENAME}"),
            ),
        ],
        html,
    )
        .into_response())
}
