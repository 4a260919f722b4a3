//! Event DTOs: creation, details and lifecycle results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::participant_dto::{GroupDto, ParticipantDto};
use crate::domain::{Event, EventOptions, EventStatus, Serial};
use crate::error::DonutError;
use crate::service::{EventInformation, RoundOutcome};

/// Request body for `POST /events`.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CreateEventRequest {
    /// Display name (max 100 chars). Defaults to `event-<serial>`.
    #[serde(default)]
    pub name: Option<String>,
    /// Description (max 1000 chars).
    #[serde(default)]
    pub description: Option<String>,
    /// Start of the event window. Defaults to now.
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    /// Window length in seconds. Defaults to 24 hours.
    #[serde(default)]
    pub duration_secs: Option<i64>,
}

impl CreateEventRequest {
    /// Converts the request into construction options.
    ///
    /// # Errors
    ///
    /// Returns [`DonutError::Validation`] if `duration_secs` is out of
    /// range.
    pub fn into_options(self) -> Result<EventOptions, DonutError> {
        let duration = self
            .duration_secs
            .map(|secs| {
                chrono::Duration::try_seconds(secs).ok_or_else(|| {
                    DonutError::Validation(format!("duration_secs out of range: {secs}"))
                })
            })
            .transpose()?;
        Ok(EventOptions {
            name: self.name,
            description: self.description,
            start_time: self.start_time,
            duration,
        })
    }
}

/// Event metadata as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EventDto {
    /// Event serial.
    pub serial: Serial,
    /// Display name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Lifecycle status.
    pub status: EventStatus,
    /// Window start.
    pub start_time: DateTime<Utc>,
    /// Window end.
    pub end_time: DateTime<Utc>,
    /// Window length in seconds.
    pub duration_secs: i64,
}

impl From<&Event> for EventDto {
    fn from(event: &Event) -> Self {
        Self {
            serial: event.serial,
            name: event.name.clone(),
            description: event.description.clone(),
            status: event.status,
            start_time: event.start_time,
            end_time: event.end_time(),
            duration_secs: event.duration.num_seconds(),
        }
    }
}

/// Response body for `GET /events/{serial}`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EventInformationResponse {
    /// Event metadata.
    pub event: EventDto,
    /// Every participant, ordered by reference.
    pub participants: Vec<ParticipantDto>,
    /// Groups formed so far.
    pub groups: Vec<GroupDto>,
}

impl From<EventInformation> for EventInformationResponse {
    fn from(info: EventInformation) -> Self {
        Self {
            event: EventDto::from(&info.event),
            participants: info.participants.iter().map(ParticipantDto::from).collect(),
            groups: GroupDto::from_map(&info.groups),
        }
    }
}

/// Response body for `POST /events/{serial}/start` and `/pair`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RoundOutcomeResponse {
    /// Event serial.
    pub event_serial: Serial,
    /// Event status after the round.
    pub status: EventStatus,
    /// Groups formed by this round.
    pub groups: Vec<GroupDto>,
    /// Participant left for the next round.
    pub leftover: Option<String>,
}

impl From<RoundOutcome> for RoundOutcomeResponse {
    fn from(outcome: RoundOutcome) -> Self {
        Self {
            event_serial: outcome.event_serial,
            status: outcome.status,
            groups: outcome
                .groups
                .into_iter()
                .map(|g| GroupDto {
                    group_serial: g.group_serial,
                    references: g.references,
                })
                .collect(),
            leftover: outcome.leftover,
        }
    }
}

/// Response body for `POST /events/{serial}/stop` and `/halt`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SweepResponse {
    /// Event serial.
    pub event_serial: Serial,
    /// Event status after the operation.
    pub status: EventStatus,
    /// Participants moved to `halted`.
    pub halted: u64,
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn request_maps_duration() {
        let request = CreateEventRequest {
            name: Some("weekly".to_string()),
            duration_secs: Some(3600),
            ..CreateEventRequest::default()
        };
        let Ok(options) = request.into_options() else {
            panic!("valid request");
        };
        assert_eq!(options.duration, Some(chrono::Duration::hours(1)));
        assert_eq!(options.name.as_deref(), Some("weekly"));
    }

    #[test]
    fn event_dto_carries_end_time() {
        let Ok(event) = Event::build(EventOptions::default()) else {
            panic!("valid event");
        };
        let dto = EventDto::from(&event);
        assert_eq!(dto.duration_secs, 86_400);
        assert_eq!(dto.end_time, event.end_time());
        assert_eq!(dto.status, EventStatus::Pending);
    }
}
