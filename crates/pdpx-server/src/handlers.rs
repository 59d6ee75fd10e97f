use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use pdpx_core::{
    DecisionRequest, DecisionResponse, PolicyDocument, PolicyIdentifier, StatisticsSnapshot,
};
use serde::Serialize;
use serde_json::json;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthCheckReport {
    pub name: &'static str,
    pub url: &'static str,
    pub healthy: bool,
    pub code: u16,
    pub message: &'static str,
}

pub async fn healthcheck() -> Json<HealthCheckReport> {
    Json(HealthCheckReport {
        name: "Policy Decision Point",
        url: "self",
        healthy: true,
        code: 200,
        message: "alive",
    })
}

pub async fn statistics(State(state): State<AppState>) -> Json<StatisticsSnapshot> {
    Json(state.service.statistics())
}

pub async fn decision(
    State(state): State<AppState>,
    body: Result<Json<DecisionRequest>, JsonRejection>,
) -> Result<Json<DecisionResponse>, ApiError> {
    let Json(mut request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    request
        .request_id
        .get_or_insert_with(|| uuid::Uuid::new_v4().to_string());

    let response = state.service.decide(request).await?;
    Ok(Json(response))
}

pub async fn deploy_policy(
    State(state): State<AppState>,
    body: Result<Json<PolicyDocument>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(document) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let translated = state.service.deploy(&document).await?;
    Ok((
        StatusCode::OK,
        Json(json!({
            "policy-id": document.name,
            "policy-version": document.version,
            "translated": translated,
        })),
    ))
}

pub async fn undeploy_policy(
    State(state): State<AppState>,
    Path((name, version)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    state
        .service
        .undeploy(&PolicyIdentifier::new(name, version))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
