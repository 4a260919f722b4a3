//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::domain::NotificationBus;
use crate::service::DonutService;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Event lifecycle service.
    pub donut_service: Arc<DonutService>,
    /// Notification bus for WebSocket subscriptions.
    pub notification_bus: NotificationBus,
}

impl AppState {
    /// Wraps a service, sharing its notification bus.
    #[must_use]
    pub fn new(donut_service: Arc<DonutService>) -> Self {
        let notification_bus = donut_service.notification_bus().clone();
        Self {
            donut_service,
            notification_bus,
        }
    }
}
