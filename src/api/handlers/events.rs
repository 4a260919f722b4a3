//! Event handlers: create, inspect and drive the lifecycle.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{
    CreateEventRequest, EventDto, EventInformationResponse, GroupDto, GroupListResponse,
    RoundOutcomeResponse, SweepResponse,
};
use crate::app_state::AppState;
use crate::domain::{EventStatus, Serial};
use crate::error::{DonutError, ErrorResponse};

/// `POST /events`: Create a new event.
///
/// # Errors
///
/// Returns [`DonutError::Validation`] on invalid options.
#[utoipa::path(
    post,
    path = "/api/v1/events",
    tag = "Events",
    summary = "Create an event",
    description = "Creates a pending event. Absent fields get defaults: name `event-<serial>`, start now, 24 hour window.",
    request_body = CreateEventRequest,
    responses(
        (status = 201, description = "Event created", body = EventDto),
        (status = 400, description = "Invalid options", body = ErrorResponse),
    )
)]
pub async fn create_event(
    State(state): State<AppState>,
    Json(req): Json<CreateEventRequest>,
) -> Result<impl IntoResponse, DonutError> {
    let event = state
        .donut_service
        .create_event(req.into_options()?)
        .await?;
    Ok((StatusCode::CREATED, Json(EventDto::from(&event))))
}

/// `GET /events/{serial}`: Event metadata, participants and groups.
///
/// # Errors
///
/// Returns [`DonutError::EventNotFound`] if the event does not exist.
#[utoipa::path(
    get,
    path = "/api/v1/events/{serial}",
    tag = "Events",
    summary = "Get event information",
    description = "Returns the event, every participant and the groups formed so far.",
    params(
        ("serial" = String, Path, description = "Event serial (UUID)"),
    ),
    responses(
        (status = 200, description = "Event information", body = EventInformationResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn get_event(
    State(state): State<AppState>,
    Path(serial): Path<Serial>,
) -> Result<impl IntoResponse, DonutError> {
    let info = state.donut_service.get_information(serial).await?;
    Ok(Json(EventInformationResponse::from(info)))
}

/// `POST /events/{serial}/start`: Run the first round.
///
/// # Errors
///
/// Returns a 409 conflict unless the event is pending.
#[utoipa::path(
    post,
    path = "/api/v1/events/{serial}/start",
    tag = "Lifecycle",
    summary = "Start an event",
    description = "Pairs every pending participant and moves the event to `active`. Only legal on a pending event.",
    params(
        ("serial" = String, Path, description = "Event serial (UUID)"),
    ),
    responses(
        (status = 200, description = "Round outcome", body = RoundOutcomeResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
        (status = 409, description = "Event already running or finished", body = ErrorResponse),
    )
)]
pub async fn start_event(
    State(state): State<AppState>,
    Path(serial): Path<Serial>,
) -> Result<impl IntoResponse, DonutError> {
    let outcome = state.donut_service.start(serial).await?;
    Ok(Json(RoundOutcomeResponse::from(outcome)))
}

/// `POST /events/{serial}/pair`: Pair participants still pending.
///
/// # Errors
///
/// Returns a 409 conflict on a finished or halted event.
#[utoipa::path(
    post,
    path = "/api/v1/events/{serial}/pair",
    tag = "Lifecycle",
    summary = "Run a pairing round",
    description = "Pairs participants still pending, such as late registrations or a previous leftover.",
    params(
        ("serial" = String, Path, description = "Event serial (UUID)"),
    ),
    responses(
        (status = 200, description = "Round outcome", body = RoundOutcomeResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
        (status = 409, description = "Event finished or halted", body = ErrorResponse),
    )
)]
pub async fn pair_event(
    State(state): State<AppState>,
    Path(serial): Path<Serial>,
) -> Result<impl IntoResponse, DonutError> {
    let outcome = state.donut_service.pair(serial).await?;
    Ok(Json(RoundOutcomeResponse::from(outcome)))
}

/// `POST /events/{serial}/stop`: Finish an event.
///
/// # Errors
///
/// Returns a 409 conflict on a halted event.
#[utoipa::path(
    post,
    path = "/api/v1/events/{serial}/stop",
    tag = "Lifecycle",
    summary = "Stop an event",
    description = "Halts every open participant and marks the event `completed`. Stopping a completed event is a no-op.",
    params(
        ("serial" = String, Path, description = "Event serial (UUID)"),
    ),
    responses(
        (status = 200, description = "Event stopped", body = SweepResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
        (status = 409, description = "Event halted", body = ErrorResponse),
    )
)]
pub async fn stop_event(
    State(state): State<AppState>,
    Path(serial): Path<Serial>,
) -> Result<impl IntoResponse, DonutError> {
    let halted = state.donut_service.stop(serial).await?;
    Ok(Json(SweepResponse {
        event_serial: serial,
        status: EventStatus::Completed,
        halted,
    }))
}

/// `POST /events/{serial}/halt`: Abort an event.
///
/// # Errors
///
/// Returns a 409 conflict on a completed event.
#[utoipa::path(
    post,
    path = "/api/v1/events/{serial}/halt",
    tag = "Lifecycle",
    summary = "Halt an event",
    description = "Halts every open participant and marks the event `halted`. Halting a halted event is a no-op.",
    params(
        ("serial" = String, Path, description = "Event serial (UUID)"),
    ),
    responses(
        (status = 200, description = "Event halted", body = SweepResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
        (status = 409, description = "Event completed", body = ErrorResponse),
    )
)]
pub async fn halt_event(
    State(state): State<AppState>,
    Path(serial): Path<Serial>,
) -> Result<impl IntoResponse, DonutError> {
    let halted = state.donut_service.halt(serial).await?;
    Ok(Json(SweepResponse {
        event_serial: serial,
        status: EventStatus::Halted,
        halted,
    }))
}

/// `GET /events/{serial}/groups`: Groups formed so far.
///
/// # Errors
///
/// Returns [`DonutError::EventNotFound`] if the event does not exist.
#[utoipa::path(
    get,
    path = "/api/v1/events/{serial}/groups",
    tag = "Events",
    summary = "List groups",
    description = "Returns every group of the event with its member references.",
    params(
        ("serial" = String, Path, description = "Event serial (UUID)"),
    ),
    responses(
        (status = 200, description = "Group list", body = GroupListResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn list_groups(
    State(state): State<AppState>,
    Path(serial): Path<Serial>,
) -> Result<impl IntoResponse, DonutError> {
    let map = state.donut_service.group_map(serial).await?;
    Ok(Json(GroupListResponse {
        event_serial: serial,
        groups: GroupDto::from_map(&map),
    }))
}

/// Event routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/events", post(create_event))
        .route("/events/{serial}", get(get_event))
        .route("/events/{serial}/start", post(start_event))
        .route("/events/{serial}/pair", post(pair_event))
        .route("/events/{serial}/stop", post(stop_event))
        .route("/events/{serial}/halt", post(halt_event))
        .route("/events/{serial}/groups", get(list_groups))
}
