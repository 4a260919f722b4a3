//! # donut-gateway
//!
//! REST API and WebSocket service for random pairing events.
//!
//! Participants register on an event, a pairing round splits the pending
//! ones into call groups (pairs, or a triad when three remain), and call
//! reports are reconciled against the assigned group. The pairing and
//! reconciliation logic lives in [`engine`] and never touches storage;
//! [`service`] runs it inside storage transactions.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── REST Handlers (api/)
//!     ├── WS Handler (ws/)
//!     │
//!     ├── DonutService (service/)
//!     ├── NotificationBus (domain/)
//!     │
//!     ├── Pairing / reconciliation / lifecycle guards (engine/)
//!     │
//!     └── Storage (storage/): PostgreSQL or in-memory
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod service;
pub mod storage;
pub mod ws;
