//! Call report handler.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::{CallReportResponse, ReferencesRequest};
use crate::app_state::AppState;
use crate::domain::Serial;
use crate::error::{DonutError, ErrorResponse};

/// `POST /events/{serial}/calls`: Report a completed call.
///
/// # Errors
///
/// Returns a 422 when the reported participants are not exactly one
/// assigned group, and a 409 conflict when the event is not running.
#[utoipa::path(
    post,
    path = "/api/v1/events/{serial}/calls",
    tag = "Calls",
    summary = "Report a call",
    description = "Reconciles the participants who joined a call against their assigned group. A full match marks the whole group `completed`.",
    params(
        ("serial" = String, Path, description = "Event serial (UUID)"),
    ),
    request_body = ReferencesRequest,
    responses(
        (status = 200, description = "Group completed", body = CallReportResponse),
        (status = 400, description = "Empty batch or unknown participant", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
        (status = 409, description = "Event not running or group halted", body = ErrorResponse),
        (status = 422, description = "Report does not match one complete group", body = ErrorResponse),
    )
)]
pub async fn report_call(
    State(state): State<AppState>,
    Path(serial): Path<Serial>,
    Json(req): Json<ReferencesRequest>,
) -> Result<impl IntoResponse, DonutError> {
    let completed = state
        .donut_service
        .report_call(serial, &req.references)
        .await?;
    Ok(Json(CallReportResponse::from(completed)))
}

/// Call routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/events/{serial}/calls", post(report_call))
}
