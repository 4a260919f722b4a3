//! REST API layer: route handlers, DTOs, and router composition.
//!
//! All resource endpoints are mounted under `/api/v1`; `/health`,
//! `/ready` and the `/ws` upgrade live at the root.

pub mod dto;
pub mod handlers;

use std::time::Duration;

use axum::Router;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::app_state::AppState;
use crate::ws::handler::ws_handler;

/// OpenAPI document for every REST endpoint.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "donut-gateway",
        description = "Random pairing of event participants into call groups."
    ),
    paths(
        handlers::events::create_event,
        handlers::events::get_event,
        handlers::events::start_event,
        handlers::events::pair_event,
        handlers::events::stop_event,
        handlers::events::halt_event,
        handlers::events::list_groups,
        handlers::participants::register,
        handlers::participants::unregister,
        handlers::participants::list_participants,
        handlers::calls::report_call,
        handlers::system::health_handler,
        handlers::system::ready_handler,
    ),
    components(schemas(crate::error::ErrorResponse, crate::error::ErrorBody)),
    tags(
        (name = "Events", description = "Event creation and inspection"),
        (name = "Lifecycle", description = "Start, pair, stop and halt"),
        (name = "Participants", description = "Registration"),
        (name = "Calls", description = "Call reconciliation"),
        (name = "System", description = "Health and readiness"),
    )
)]
pub struct ApiDoc;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes())
}

/// Builds the full application: REST, WebSocket, Swagger UI (with the
/// `swagger-ui` feature) and the tower middleware stack.
pub fn build_app(state: AppState, request_timeout: Duration) -> Router {
    let router = build_router().route("/ws", get(ws_handler));

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    );

    router
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
