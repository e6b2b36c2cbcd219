use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::layout::mount::{MeasurementMount, MeasurementStrategy, MetricsMount, ReportedMount};
use crate::layout::orchestrator::{paginate_once, PaginationInput, PaginationView};
use crate::preview::session::SessionInfo;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct OpenPreviewRequest {
    #[serde(default)]
    pub measurement: MeasurementStrategy,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub revision: u64,
}

#[derive(Debug, Serialize)]
pub struct FontReadyResponse {
    /// Revision of the follow-up pass, absent when nothing needed re-measuring.
    pub revision: Option<u64>,
}

/// POST /api/v1/paginate
pub async fn handle_paginate(
    Json(input): Json<PaginationInput>,
) -> Result<Json<PaginationView>, AppError> {
    input.validate()?;
    let mut mount: Box<dyn MeasurementMount> = if input.measurements.is_some() {
        Box::new(ReportedMount::default())
    } else {
        Box::new(MetricsMount::default())
    };
    let view = paginate_once(mount.as_mut(), &input).await?;
    Ok(Json(view))
}

/// POST /api/v1/previews
pub async fn handle_open_preview(
    State(state): State<AppState>,
    body: Option<Json<OpenPreviewRequest>>,
) -> Result<(StatusCode, Json<SessionInfo>), AppError> {
    let req = body.map(|Json(r)| r).unwrap_or_default();
    let info = state.previews.open(req.measurement).await?;
    Ok((StatusCode::CREATED, Json(info)))
}

/// PUT /api/v1/previews/:id/snapshot
pub async fn handle_submit_snapshot(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<PaginationInput>,
) -> Result<(StatusCode, Json<SubmitResponse>), AppError> {
    let revision = state.previews.submit(id, input).await?;
    Ok((StatusCode::ACCEPTED, Json(SubmitResponse { revision })))
}

/// POST /api/v1/previews/:id/font-ready
pub async fn handle_font_ready(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<FontReadyResponse>), AppError> {
    let revision = state.previews.font_ready(id).await?;
    Ok((StatusCode::ACCEPTED, Json(FontReadyResponse { revision })))
}

/// GET /api/v1/previews/:id/pages
pub async fn handle_get_pages(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PaginationView>, AppError> {
    Ok(Json(state.previews.view(id).await?))
}

/// DELETE /api/v1/previews/:id
pub async fn handle_close_preview(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.previews.close(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
