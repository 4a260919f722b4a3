//! Broadcast channel for lifecycle notifications.
//!
//! [`NotificationBus`] wraps a [`tokio::sync::broadcast`] channel. The
//! service publishes a [`Notification`] after every committed mutation and
//! each WebSocket connection subscribes to receive filtered copies.

use tokio::sync::broadcast;

use super::Notification;

/// Broadcast bus for [`Notification`]s.
///
/// When the ring buffer is full, the oldest notifications are dropped for
/// lagging receivers.
#[derive(Debug, Clone)]
pub struct NotificationBus {
    sender: broadcast::Sender<Notification>,
}

impl NotificationBus {
    /// Creates a new bus with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes a notification to all subscribers.
    ///
    /// Returns the number of receivers that got it; with no receivers the
    /// notification is dropped.
    pub fn publish(&self, notification: Notification) -> usize {
        self.sender.send(notification).unwrap_or(0)
    }

    /// Creates a receiver for all future notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    /// Returns the current number of active receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::Serial;
    use chrono::Utc;

    fn created(event_serial: Serial) -> Notification {
        Notification::EventCreated {
            event_serial,
            name: "weekly".to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn publish_without_receivers_returns_zero() {
        let bus = NotificationBus::new(16);
        assert_eq!(bus.publish(created(Serial::generate())), 0);
    }

    #[tokio::test]
    async fn subscriber_receives_notification() {
        let bus = NotificationBus::new(16);
        let mut rx = bus.subscribe();

        let serial = Serial::generate();
        bus.publish(created(serial));

        let Ok(received) = rx.recv().await else {
            panic!("expected a notification");
        };
        assert_eq!(received.event_serial(), serial);
    }

    #[test]
    fn receiver_count_tracks_subscribers() {
        let bus = NotificationBus::new(16);
        let rx1 = bus.subscribe();
        let _rx2 = bus.subscribe();
        assert_eq!(bus.receiver_count(), 2);
        drop(rx1);
        assert_eq!(bus.receiver_count(), 1);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let bus = NotificationBus::new(0);
        let _rx = bus.subscribe();
        assert_eq!(bus.publish(created(Serial::generate())), 1);
    }

    #[test]
    fn pending_receiver_is_woken_by_publish() {
        let bus = NotificationBus::new(16);
        let mut rx = bus.subscribe();
        let mut recv = tokio_test::task::spawn(async move { rx.recv().await });
        tokio_test::assert_pending!(recv.poll());

        let serial = Serial::generate();
        bus.publish(created(serial));
        assert!(recv.is_woken());

        let std::task::Poll::Ready(Ok(received)) = recv.poll() else {
            panic!("expected a ready notification");
        };
        assert_eq!(received.event_serial(), serial);
    }
}
