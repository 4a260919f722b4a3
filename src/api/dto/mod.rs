//! Data Transfer Objects for REST request/response serialization.
//!
//! Serials are serialized as UUID strings and statuses as lowercase
//! strings.

pub mod common_dto;
pub mod event_dto;
pub mod participant_dto;

pub use common_dto::*;
pub use event_dto::*;
pub use participant_dto::*;
