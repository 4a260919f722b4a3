//! Event and participant status enums.
//!
//! Both enums share the same four states and the same lowercase wire
//! representation, which is also how they are stored in PostgreSQL.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Error returned when a status string is not one of the known values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown status: {0}")]
pub struct UnknownStatus(pub String);

/// Lifecycle status of an event.
///
/// `Pending → Active → Completed`, with a side transition
/// `Pending | Active → Halted`. `Completed` and `Halted` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// Created, not yet paired.
    Pending,
    /// At least one round has been paired.
    Active,
    /// Stopped after running; terminal.
    Completed,
    /// Aborted; terminal.
    Halted,
}

impl EventStatus {
    /// Returns the wire/storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Halted => "halted",
        }
    }

    /// Returns `true` for `Completed` and `Halted`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Halted)
    }

    const fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Active => 1,
            Self::Completed | Self::Halted => 2,
        }
    }

    /// Returns `true` if moving from `self` to `next` never regresses the
    /// lifecycle. Staying in place is allowed; leaving a terminal state is
    /// not.
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        match (self, next) {
            (Self::Completed, Self::Completed) | (Self::Halted, Self::Halted) => true,
            (Self::Completed | Self::Halted, _) => false,
            _ => next.rank() >= self.rank(),
        }
    }
}

/// Status of a participant within one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantStatus {
    /// Registered, waiting for a round.
    Pending,
    /// Assigned to a group, call not yet reported.
    Active,
    /// Group call reported and reconciled.
    Completed,
    /// Swept by a stop or halt.
    Halted,
}

impl ParticipantStatus {
    /// Returns the wire/storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Halted => "halted",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ParticipantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "halted" => Ok(Self::Halted),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

impl FromStr for ParticipantStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "halted" => Ok(Self::Halted),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}
