//! Lifecycle notifications published after every committed mutation.
//!
//! Notifications are broadcast through the [`super::NotificationBus`] and
//! forwarded to WebSocket subscribers of the affected event.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::Serial;

/// One group formed by a pairing round, as carried in notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairedGroup {
    /// Group identifier.
    pub group_serial: Serial,
    /// Participant references placed in the group.
    pub references: Vec<String>,
}

/// Notification emitted after a state change has been committed.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "notification_type", rename_all = "snake_case")]
pub enum Notification {
    /// A new event was created.
    EventCreated {
        /// Event identifier.
        event_serial: Serial,
        /// Event display name.
        name: String,
        /// Creation timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Participants were registered on an event.
    ParticipantsRegistered {
        /// Event identifier.
        event_serial: Serial,
        /// References submitted for registration.
        references: Vec<String>,
        /// Rows actually inserted (duplicates are ignored).
        inserted: u64,
        /// Registration timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Participants were removed from an event.
    ParticipantsUnregistered {
        /// Event identifier.
        event_serial: Serial,
        /// References submitted for removal.
        references: Vec<String>,
        /// Rows actually removed.
        removed: u64,
        /// Removal timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A pairing round was committed.
    RoundPaired {
        /// Event identifier.
        event_serial: Serial,
        /// Groups formed by the round.
        groups: Vec<PairedGroup>,
        /// Participant left waiting for the next round, if any.
        leftover: Option<String>,
        /// Commit timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A reported call was reconciled and its group completed.
    GroupCompleted {
        /// Event identifier.
        event_serial: Serial,
        /// Completed group.
        group_serial: Serial,
        /// Every member of the group.
        references: Vec<String>,
        /// Completion timestamp.
        timestamp: DateTime<Utc>,
    },

    /// The event was stopped and marked completed.
    EventStopped {
        /// Event identifier.
        event_serial: Serial,
        /// Participants swept to halted.
        halted: u64,
        /// Stop timestamp.
        timestamp: DateTime<Utc>,
    },

    /// The event was aborted and marked halted.
    EventHalted {
        /// Event identifier.
        event_serial: Serial,
        /// Participants swept to halted.
        halted: u64,
        /// Halt timestamp.
        timestamp: DateTime<Utc>,
    },
}

impl Notification {
    /// Returns the event serial this notification concerns.
    #[must_use]
    pub fn event_serial(&self) -> Serial {
        match self {
            Self::EventCreated { event_serial, .. }
            | Self::ParticipantsRegistered { event_serial, .. }
            | Self::ParticipantsUnregistered { event_serial, .. }
            | Self::RoundPaired { event_serial, .. }
            | Self::GroupCompleted { event_serial, .. }
            | Self::EventStopped { event_serial, .. }
            | Self::EventHalted { event_serial, .. } => *event_serial,
        }
    }

    /// Returns the notification type as a static string slice.
    #[must_use]
    pub const fn notification_type_str(&self) -> &'static str {
        match self {
            Self::EventCreated { .. } => "event_created",
            Self::ParticipantsRegistered { .. } => "participants_registered",
            Self::ParticipantsUnregistered { .. } => "participants_unregistered",
            Self::RoundPaired { .. } => "round_paired",
            Self::GroupCompleted { .. } => "group_completed",
            Self::EventStopped { .. } => "event_stopped",
            Self::EventHalted { .. } => "event_halted",
        }
    }
}
