//! Participant handlers: register, unregister, list.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::{
    ParticipantDto, ParticipantListParams, ParticipantListResponse, ReferencesRequest,
    RegisterResponse, UnregisterResponse,
};
use crate::app_state::AppState;
use crate::domain::Serial;
use crate::error::{DonutError, ErrorResponse};

/// `POST /events/{serial}/participants`: Register participants.
///
/// # Errors
///
/// Returns [`DonutError::Validation`] on an empty batch and a 409 conflict
/// on a finished or halted event.
#[utoipa::path(
    post,
    path = "/api/v1/events/{serial}/participants",
    tag = "Participants",
    summary = "Register participants",
    description = "Registers references as pending participants. Already registered references are skipped.",
    params(
        ("serial" = String, Path, description = "Event serial (UUID)"),
    ),
    request_body = ReferencesRequest,
    responses(
        (status = 201, description = "Participants registered", body = RegisterResponse),
        (status = 400, description = "Empty or malformed batch", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
        (status = 409, description = "Event finished or halted", body = ErrorResponse),
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Path(serial): Path<Serial>,
    Json(req): Json<ReferencesRequest>,
) -> Result<impl IntoResponse, DonutError> {
    let registered = state
        .donut_service
        .register(serial, &req.references)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            event_serial: serial,
            registered,
        }),
    ))
}

/// `POST /events/{serial}/participants/remove`: Unregister participants.
///
/// # Errors
///
/// Returns [`DonutError::Validation`] on an empty batch and a 409
/// conflict if a reference is paired in an open group.
#[utoipa::path(
    post,
    path = "/api/v1/events/{serial}/participants/remove",
    tag = "Participants",
    summary = "Unregister participants",
    description = "Removes the given references from the event. Members of a group whose call is still open cannot be removed.",
    params(
        ("serial" = String, Path, description = "Event serial (UUID)"),
    ),
    request_body = ReferencesRequest,
    responses(
        (status = 200, description = "Participants removed", body = UnregisterResponse),
        (status = 400, description = "Empty or malformed batch", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
        (status = 409, description = "Participant paired in an open group", body = ErrorResponse),
    )
)]
pub async fn unregister(
    State(state): State<AppState>,
    Path(serial): Path<Serial>,
    Json(req): Json<ReferencesRequest>,
) -> Result<impl IntoResponse, DonutError> {
    let removed = state
        .donut_service
        .unregister(serial, &req.references)
        .await?;
    Ok(Json(UnregisterResponse {
        event_serial: serial,
        removed,
    }))
}

/// `GET /events/{serial}/participants`: Paginated participant list.
///
/// # Errors
///
/// Returns [`DonutError::EventNotFound`] if the event does not exist.
#[utoipa::path(
    get,
    path = "/api/v1/events/{serial}/participants",
    tag = "Participants",
    summary = "List participants",
    description = "Returns participants ordered by reference, optionally filtered by status.",
    params(
        ("serial" = String, Path, description = "Event serial (UUID)"),
        ParticipantListParams,
    ),
    responses(
        (status = 200, description = "Paginated participant list", body = ParticipantListResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn list_participants(
    State(state): State<AppState>,
    Path(serial): Path<Serial>,
    Query(params): Query<ParticipantListParams>,
) -> Result<impl IntoResponse, DonutError> {
    let participants = state
        .donut_service
        .list_participants(serial, params.status)
        .await?;
    let (page, pagination) = params.pagination().paginate(participants);

    Ok(Json(ParticipantListResponse {
        data: page.iter().map(ParticipantDto::from).collect(),
        pagination,
    }))
}

/// Participant routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/events/{serial}/participants",
            post(register).get(list_participants),
        )
        .route("/events/{serial}/participants/remove", post(unregister))
}
