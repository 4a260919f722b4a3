//! Domain layer: identifiers, records, statuses and notifications.
//!
//! This module contains the server-side data model: time-sortable serials,
//! events with their construction defaults, participant rows and the
//! derived group map, and the notification bus that broadcasts committed
//! state changes.

pub mod event;
pub mod notification;
pub mod notification_bus;
pub mod participant;
pub mod serial;
pub mod status;

pub use event::{Event, EventOptions};
pub use notification::{Notification, PairedGroup};
pub use notification_bus::NotificationBus;
pub use participant::{GroupMap, Participant, group_map, normalize_references};
pub use serial::Serial;
pub use status::{EventStatus, ParticipantStatus, UnknownStatus};
