//! Time-sortable identifiers for events and groups.
//!
//! [`Serial`] is a newtype wrapper around [`uuid::Uuid`] (v7). Version 7
//! UUIDs embed a millisecond timestamp in their leading bits, so serials
//! generated later sort after serials generated earlier.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Unique identifier for an event or a round group.
///
/// Generated once and immutable thereafter. Event serials key the
/// participant registry; group serials tie the members of one pair or
/// triad together.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
#[schema(value_type = String, format = Uuid)]
pub struct Serial(uuid::Uuid);

impl Serial {
    /// Generates a new time-sortable `Serial` (UUID v7).
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::now_v7())
    }

    /// Creates a `Serial` from an existing [`uuid::Uuid`].
    #[must_use]
    pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner [`uuid::Uuid`].
    #[must_use]
    pub const fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl fmt::Display for Serial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Serial {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<uuid::Uuid>().map(Self)
    }
}

impl From<uuid::Uuid> for Serial {
    fn from(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }
}

impl From<Serial> for uuid::Uuid {
    fn from(serial: Serial) -> Self {
        serial.0
    }
}
