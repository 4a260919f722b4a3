//! Service layer: business logic orchestration.
//!
//! [`DonutService`] runs the event lifecycle against a
//! [`crate::storage::Storage`] backend, drives the pure logic in
//! [`crate::engine`], and publishes committed changes on the
//! [`crate::domain::NotificationBus`].

pub mod donut_service;

pub use donut_service::{
    CompletedGroup, DonutService, EventInformation, PairingRng, RoundOutcome,
};
