//! Participant, group and call-report DTOs.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::common_dto::{PaginationMeta, PaginationParams};
use crate::domain::{GroupMap, Participant, ParticipantStatus, Serial};
use crate::service::CompletedGroup;

/// Request body carrying a batch of participant references.
///
/// Used by registration, unregistration and call reports.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReferencesRequest {
    /// Participant references.
    pub references: Vec<String>,
}

/// Response body for `POST /events/{serial}/participants`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterResponse {
    /// Event serial.
    pub event_serial: Serial,
    /// Newly inserted participants.
    pub registered: u64,
}

/// Response body for `POST /events/{serial}/participants/remove`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UnregisterResponse {
    /// Event serial.
    pub event_serial: Serial,
    /// Participants removed.
    pub removed: u64,
}

/// One participant row.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ParticipantDto {
    /// Participant reference.
    pub participant_ref: String,
    /// Group, once paired.
    pub group_serial: Option<Serial>,
    /// Membership status.
    pub status: ParticipantStatus,
}

impl From<&Participant> for ParticipantDto {
    fn from(participant: &Participant) -> Self {
        Self {
            participant_ref: participant.participant_ref.clone(),
            group_serial: participant.group_serial,
            status: participant.status,
        }
    }
}

/// Query parameters for `GET /events/{serial}/participants`.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ParticipantListParams {
    /// Only return participants with this status.
    #[serde(default)]
    pub status: Option<ParticipantStatus>,
    /// Page number (1-indexed). Defaults to 1.
    #[serde(default)]
    pub page: Option<u32>,
    /// Items per page (max 100). Defaults to 20.
    #[serde(default)]
    pub per_page: Option<u32>,
}

impl ParticipantListParams {
    /// Pagination part of the query, with defaults filled in.
    #[must_use]
    pub fn pagination(&self) -> PaginationParams {
        let defaults = PaginationParams::default();
        PaginationParams {
            page: self.page.unwrap_or(defaults.page),
            per_page: self.per_page.unwrap_or(defaults.per_page),
        }
    }
}

/// Paginated participant list.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ParticipantListResponse {
    /// Participants on this page.
    pub data: Vec<ParticipantDto>,
    /// Pagination metadata.
    pub pagination: PaginationMeta,
}

/// One group with its member references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct GroupDto {
    /// Group serial.
    pub group_serial: Serial,
    /// Member references.
    pub references: Vec<String>,
}

impl GroupDto {
    /// Flattens a [`GroupMap`] into a list ordered by group serial.
    #[must_use]
    pub fn from_map(map: &GroupMap) -> Vec<Self> {
        map.iter()
            .map(|(group_serial, members)| Self {
                group_serial: *group_serial,
                references: members.iter().map(|p| p.participant_ref.clone()).collect(),
            })
            .collect()
    }
}

/// Response body for `GET /events/{serial}/groups`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GroupListResponse {
    /// Event serial.
    pub event_serial: Serial,
    /// Groups formed so far.
    pub groups: Vec<GroupDto>,
}

/// Response body for `POST /events/{serial}/calls`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CallReportResponse {
    /// Event serial.
    pub event_serial: Serial,
    /// Completed group.
    pub group_serial: Serial,
    /// Every member of the group.
    pub references: Vec<String>,
    /// `true` if an earlier report had already completed the group.
    pub already_completed: bool,
}

impl From<CompletedGroup> for CallReportResponse {
    fn from(group: CompletedGroup) -> Self {
        Self {
            event_serial: group.event_serial,
            group_serial: group.group_serial,
            references: group.references,
            already_completed: group.already_completed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::group_map;

    #[test]
    fn group_list_follows_map_order() {
        let event = Serial::generate();
        let first = Serial::generate();
        let second = Serial::generate();
        let rows = [("b", second), ("a", first), ("c", second)]
            .into_iter()
            .map(|(r, g)| Participant {
                event_serial: event,
                participant_ref: r.to_string(),
                group_serial: Some(g),
                status: ParticipantStatus::Active,
            })
            .collect::<Vec<_>>();

        let groups = GroupDto::from_map(&group_map(&rows));
        assert_eq!(groups.len(), 2);
        assert_eq!(groups.first().map(|g| g.group_serial), Some(first));
        assert_eq!(
            groups.last().map(|g| g.references.clone()),
            Some(vec!["b".to_string(), "c".to_string()])
        );
    }

    #[test]
    fn list_params_default_pagination() {
        let params = ParticipantListParams {
            status: None,
            page: None,
            per_page: Some(5),
        };
        let pagination = params.pagination();
        assert_eq!(pagination.page, 1);
        assert_eq!(pagination.per_page, 5);
    }
}
