//! Database rows for the `events` and `participants` tables.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::StorageError;
use crate::domain::{Event, Participant, Serial};

/// A row of the `events` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EventRow {
    /// Event serial.
    pub serial: Uuid,
    /// Display name.
    pub name: String,
    /// Display description.
    pub description: String,
    /// Status string (`pending`, `active`, `completed`, `halted`).
    pub status: String,
    /// Window start.
    pub start_time: DateTime<Utc>,
    /// Window end.
    pub end_time: DateTime<Utc>,
}

impl From<&Event> for EventRow {
    fn from(event: &Event) -> Self {
        Self {
            serial: *event.serial.as_uuid(),
            name: event.name.clone(),
            description: event.description.clone(),
            status: event.status.as_str().to_string(),
            start_time: event.start_time,
            end_time: event.end_time(),
        }
    }
}

impl TryFrom<EventRow> for Event {
    type Error = StorageError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse()
            .map_err(|e| StorageError::Corrupt(format!("event {}: {e}", row.serial)))?;
        Ok(Self {
            serial: Serial::from_uuid(row.serial),
            name: row.name,
            description: row.description,
            status,
            start_time: row.start_time,
            duration: row.end_time.signed_duration_since(row.start_time),
        })
    }
}

/// A row of the `participants` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ParticipantRow {
    /// Owning event serial.
    pub event_serial: Uuid,
    /// Participant reference.
    pub participant_ref: String,
    /// Round group serial, `NULL` while pending.
    pub group_serial: Option<Uuid>,
    /// Status string.
    pub status: String,
}

impl TryFrom<ParticipantRow> for Participant {
    type Error = StorageError;

    fn try_from(row: ParticipantRow) -> Result<Self, Self::Error> {
        let status = row.status.parse().map_err(|e| {
            StorageError::Corrupt(format!(
                "participant {} of event {}: {e}",
                row.participant_ref, row.event_serial
            ))
        })?;
        Ok(Self {
            event_serial: Serial::from_uuid(row.event_serial),
            participant_ref: row.participant_ref,
            group_serial: row.group_serial.map(Serial::from_uuid),
            status,
        })
    }
}
