//! Pairing events and their construction defaults.

use chrono::{DateTime, Duration, Utc};

use super::{EventStatus, Serial};
use crate::error::DonutError;

/// Maximum length of an event name, in characters.
pub const MAX_NAME_LEN: usize = 100;

/// Maximum length of an event description, in characters.
pub const MAX_DESCRIPTION_LEN: usize = 1000;

/// Default event duration when none is supplied.
#[must_use]
pub fn default_duration() -> Duration {
    Duration::hours(24)
}

/// Optional fields accepted when creating an [`Event`].
///
/// Anything left as `None` is filled in by [`Event::build`].
#[derive(Debug, Clone, Default)]
pub struct EventOptions {
    /// Display name. Defaults to `event-<serial>`.
    pub name: Option<String>,
    /// Free-form description. Defaults to empty.
    pub description: Option<String>,
    /// Start of the event window. Defaults to now.
    pub start_time: Option<DateTime<Utc>>,
    /// Length of the event window. Defaults to 24 hours.
    pub duration: Option<Duration>,
}

/// One pairing campaign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Immutable identifier.
    pub serial: Serial,
    /// Display name.
    pub name: String,
    /// Display description.
    pub description: String,
    /// Lifecycle status.
    pub status: EventStatus,
    /// Start of the event window.
    pub start_time: DateTime<Utc>,
    /// Length of the event window.
    pub duration: Duration,
}

impl Event {
    /// Builds a new `Pending` event from `options`, generating its serial
    /// and filling defaults for every absent field.
    ///
    /// # Errors
    ///
    /// Returns [`DonutError::Validation`] if the duration is not strictly
    /// positive or a text field exceeds its length limit.
    pub fn build(options: EventOptions) -> Result<Self, DonutError> {
        let serial = Serial::generate();

        let name = match options.name.map(|n| n.trim().to_string()) {
            Some(name) if !name.is_empty() => name,
            _ => format!("event-{serial}"),
        };
        if name.chars().count() > MAX_NAME_LEN {
            return Err(DonutError::Validation(format!(
                "event name exceeds {MAX_NAME_LEN} characters"
            )));
        }

        let description = options.description.unwrap_or_default();
        if description.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(DonutError::Validation(format!(
                "event description exceeds {MAX_DESCRIPTION_LEN} characters"
            )));
        }

        let duration = options.duration.unwrap_or_else(default_duration);
        if duration <= Duration::zero() {
            return Err(DonutError::Validation(
                "event duration must be positive".to_string(),
            ));
        }

        Ok(Self {
            serial,
            name,
            description,
            status: EventStatus::Pending,
            start_time: options.start_time.unwrap_or_else(Utc::now),
            duration,
        })
    }

    /// End of the event window (`start_time + duration`).
    #[must_use]
    pub fn end_time(&self) -> DateTime<Utc> {
        self.start_time
            .checked_add_signed(self.duration)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn build_fills_defaults() {
        let before = Utc::now();
        let Ok(event) = Event::build(EventOptions::default()) else {
            panic!("defaults should be valid");
        };
        assert_eq!(event.status, EventStatus::Pending);
        assert_eq!(event.duration, Duration::hours(24));
        assert!(event.start_time >= before);
        assert_eq!(event.name, format!("event-{}", event.serial));
        assert!(event.description.is_empty());
    }

    #[test]
    fn build_keeps_supplied_fields() {
        let start = Utc::now() - Duration::days(1);
        let Ok(event) = Event::build(EventOptions {
            name: Some("  weekly donut ".to_string()),
            description: Some("coffee chats".to_string()),
            start_time: Some(start),
            duration: Some(Duration::days(10)),
        }) else {
            panic!("options should be valid");
        };
        assert_eq!(event.name, "weekly donut");
        assert_eq!(event.description, "coffee chats");
        assert_eq!(event.start_time, start);
        assert_eq!(event.end_time(), start + Duration::days(10));
    }

    #[test]
    fn blank_name_falls_back_to_default() {
        let Ok(event) = Event::build(EventOptions {
            name: Some("   ".to_string()),
            ..EventOptions::default()
        }) else {
            panic!("blank name should fall back");
        };
        assert!(event.name.starts_with("event-"));
    }

    #[test]
    fn rejects_non_positive_duration() {
        let result = Event::build(EventOptions {
            duration: Some(Duration::zero()),
            ..EventOptions::default()
        });
        assert!(matches!(result, Err(DonutError::Validation(_))));
    }

    #[test]
    fn rejects_long_name() {
        let result = Event::build(EventOptions {
            name: Some("x".repeat(MAX_NAME_LEN + 1)),
            ..EventOptions::default()
        });
        assert!(matches!(result, Err(DonutError::Validation(_))));
    }

    #[test]
    fn each_build_gets_a_fresh_serial() {
        let a = Event::build(EventOptions::default()).map(|e| e.serial).ok();
        let b = Event::build(EventOptions::default()).map(|e| e.serial).ok();
        assert!(a.is_some());
        assert_ne!(a, b);
    }
}
