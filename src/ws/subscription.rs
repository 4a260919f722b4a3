//! Events followed by one WebSocket connection.

use std::collections::HashSet;

use crate::domain::{Notification, Serial};

/// Follow list of a connection.
///
/// Explicit serials survive while the `*` wildcard is on, so dropping the
/// wildcard falls back to them.
#[derive(Debug, Default)]
pub struct Subscriptions {
    followed: HashSet<Serial>,
    everything: bool,
}

impl Subscriptions {
    /// Creates an empty follow list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Follows `serials`, and every event when `wildcard` is set.
    pub fn follow(&mut self, serials: &[Serial], wildcard: bool) {
        self.everything |= wildcard;
        self.followed.extend(serials.iter().copied());
    }

    /// Stops following `serials`; `wildcard` turns the catch-all off.
    pub fn unfollow(&mut self, serials: &[Serial], wildcard: bool) {
        if wildcard {
            self.everything = false;
        }
        self.followed.retain(|s| !serials.contains(s));
    }

    /// Whether `notification` goes out on this connection.
    #[must_use]
    pub fn admits(&self, notification: &Notification) -> bool {
        self.everything || self.followed.contains(&notification.event_serial())
    }

    /// Number of explicitly followed events.
    #[must_use]
    pub fn followed(&self) -> usize {
        self.followed.len()
    }

    /// `true` while the wildcard is on.
    #[must_use]
    pub fn follows_everything(&self) -> bool {
        self.everything
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn created(event_serial: Serial) -> Notification {
        Notification::EventCreated {
            event_serial,
            name: "standup".to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn fresh_connection_hears_nothing() {
        assert!(!Subscriptions::new().admits(&created(Serial::generate())));
    }

    #[test]
    fn followed_event_is_admitted_alone() {
        let mut subs = Subscriptions::new();
        let standup = Serial::generate();
        subs.follow(&[standup, standup], false);

        assert!(subs.admits(&created(standup)));
        assert!(!subs.admits(&created(Serial::generate())));
        assert_eq!(subs.followed(), 1);
    }

    #[test]
    fn dropping_wildcard_keeps_explicit_follows() {
        let mut subs = Subscriptions::new();
        let standup = Serial::generate();
        subs.follow(&[standup], true);
        assert!(subs.admits(&created(Serial::generate())));

        subs.unfollow(&[], true);
        assert!(!subs.follows_everything());
        assert!(subs.admits(&created(standup)));
        assert!(!subs.admits(&created(Serial::generate())));
    }

    #[test]
    fn unfollow_silences_event() {
        let mut subs = Subscriptions::new();
        let standup = Serial::generate();
        subs.follow(&[standup], false);
        subs.unfollow(&[standup], false);
        assert!(!subs.admits(&created(standup)));
        assert_eq!(subs.followed(), 0);
    }
}
