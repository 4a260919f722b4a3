//! WebSocket layer: connection handling, message routing, subscriptions.
//!
//! The WebSocket endpoint at `/ws` streams lifecycle notifications for
//! subscribed events and accepts registration commands.

pub mod connection;
pub mod handler;
pub mod messages;
pub mod subscription;
