//! Service error types with HTTP status code mapping.
//!
//! [`DonutError`] is the central error type. Each variant identifies which
//! precondition failed and maps to an HTTP status code and a structured
//! JSON error response, so the transport never inspects internals.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{EventStatus, Serial};
use crate::storage::StorageError;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 4003,
///     "message": "pair is lacking participants: reported 1 of 2",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Illegal lifecycle transitions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateConflict {
    /// `Start` on an event that is already running.
    #[error("match is already running")]
    AlreadyActive,

    /// Any mutation on an event that has finished or was halted.
    #[error("match is already {0}")]
    AlreadyTerminal(EventStatus),

    /// A call report on an event that is not running.
    #[error("match is not running (status: {0})")]
    NotRunning(EventStatus),

    /// A call report for a group that was swept by a halt.
    #[error("group {0} has been halted")]
    GroupHalted(Serial),

    /// Removing a participant that sits in an open group.
    #[error("participant {0} is paired in an open group")]
    ParticipantPaired(String),
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category         | HTTP Status                  |
/// |-----------|------------------|------------------------------|
/// | 1000–1999 | Validation       | 400 Bad Request              |
/// | 2000–2999 | Not Found/State  | 404 Not Found / 409 Conflict |
/// | 3000–3999 | Server           | 500 Internal Server Error    |
/// | 4000–4999 | Reconciliation   | 422 Unprocessable Entity     |
#[derive(Debug, thiserror::Error)]
pub enum DonutError {
    /// Malformed or empty input.
    #[error("invalid request: {0}")]
    Validation(String),

    /// No event with the given serial exists.
    #[error("event not found: {0}")]
    EventNotFound(Serial),

    /// Illegal lifecycle transition.
    #[error(transparent)]
    StateConflict(#[from] StateConflict),

    /// The reported participants span more than one assigned group.
    #[error("expected one group but found {groups}")]
    AmbiguousGroup {
        /// Number of distinct groups among the reported participants.
        groups: usize,
    },

    /// None of the reported participants has been assigned a group.
    #[error("reported participants have no group assignment")]
    NoAssignment,

    /// The reported participants are a strict subset of their group.
    #[error("pair is lacking participants: reported {reported} of {expected}")]
    IncompleteGroup {
        /// Participants resolved from the report.
        reported: usize,
        /// Members of the authoritative group.
        expected: usize,
    },

    /// Storage collaborator failure, including transaction rollback.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl DonutError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::Validation(_) => 1001,
            Self::EventNotFound(_) => 2001,
            Self::StateConflict(_) => 2002,
            Self::Internal(_) => 3000,
            Self::Storage(_) => 3001,
            Self::AmbiguousGroup { .. } => 4001,
            Self::NoAssignment => 4002,
            Self::IncompleteGroup { .. } => 4003,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::EventNotFound(_) => StatusCode::NOT_FOUND,
            Self::StateConflict(_) => StatusCode::CONFLICT,
            Self::AmbiguousGroup { .. } | Self::NoAssignment | Self::IncompleteGroup { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::Storage(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Builds the JSON body for this error.
    #[must_use]
    pub fn to_body(&self) -> ErrorResponse {
        ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        }
    }
}

impl IntoResponse for DonutError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let mut response = axum::Json(self.to_body()).into_response();
        *response.status_mut() = status;
        response
    }
}
