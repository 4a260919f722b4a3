//! Storage layer: the persistence contract and its backends.
//!
//! [`Storage`] is the only shared mutable resource of the service. Every
//! multi-row mutation goes through a [`StorageTx`] obtained from
//! [`Storage::begin`]: it commits on [`StorageTx::commit`] and rolls back
//! when dropped without committing, so callers observe either the full
//! post-state or the full pre-state.
//!
//! Two backends are provided: [`PostgresStorage`] over `sqlx::PgPool` and
//! [`MemoryStorage`] for tests and local runs.

pub mod memory;
pub mod models;
pub mod postgres;

pub use memory::MemoryStorage;
pub use postgres::PostgresStorage;

use std::fmt;

use async_trait::async_trait;

use crate::domain::{Event, EventStatus, Participant, ParticipantStatus, Serial};

/// Storage layer errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Database driver error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration failed.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored row could not be mapped back into the domain model.
    #[error("corrupt row: {0}")]
    Corrupt(String),

    /// The backend refused the operation.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Selection of participant rows, one variant per lookup the core needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParticipantQuery {
    /// Every participant of an event.
    Event(Serial),
    /// Participants of an event whose status is one of the given values.
    EventWithStatus(Serial, Vec<ParticipantStatus>),
    /// Participants of an event with one of the given references.
    EventWithReferences(Serial, Vec<String>),
    /// Every participant holding the given group serial.
    Group(Serial),
}

impl ParticipantQuery {
    /// Returns `true` if `participant` is selected by this query.
    #[must_use]
    pub fn matches(&self, participant: &Participant) -> bool {
        match self {
            Self::Event(event) => participant.event_serial == *event,
            Self::EventWithStatus(event, statuses) => {
                participant.event_serial == *event && statuses.contains(&participant.status)
            }
            Self::EventWithReferences(event, references) => {
                participant.event_serial == *event
                    && references.contains(&participant.participant_ref)
            }
            Self::Group(group) => participant.group_serial == Some(*group),
        }
    }
}

/// Key of one participant row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantKey {
    /// Owning event.
    pub event_serial: Serial,
    /// Participant reference within the event.
    pub participant_ref: String,
}

/// New group and status for one participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupAssignment {
    /// Row to update.
    pub key: ParticipantKey,
    /// Group the participant is placed in.
    pub group_serial: Serial,
    /// New status.
    pub status: ParticipantStatus,
}

/// New status for one participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    /// Row to update.
    pub key: ParticipantKey,
    /// New status.
    pub status: ParticipantStatus,
}

/// Persistence contract consumed by the service.
#[async_trait]
pub trait Storage: Send + Sync + fmt::Debug {
    /// Inserts a new event.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backend rejects the operation.
    async fn create_event(&self, event: &Event) -> Result<(), StorageError>;

    /// Fetches an event by serial.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backend rejects the operation.
    async fn get_event(&self, serial: Serial) -> Result<Option<Event>, StorageError>;

    /// Overwrites the status of an event.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backend rejects the operation.
    async fn update_event_status(
        &self,
        serial: Serial,
        status: EventStatus,
    ) -> Result<(), StorageError>;

    /// Inserts participants, silently skipping `(event, reference)` pairs
    /// that already exist. Returns the number of rows inserted.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backend rejects the operation.
    async fn create_participants(&self, batch: &[Participant]) -> Result<u64, StorageError>;

    /// Deletes participants by key. Returns the number of rows removed.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backend rejects the operation.
    async fn delete_participants(&self, batch: &[ParticipantKey]) -> Result<u64, StorageError>;

    /// Lists participants selected by `query`, ordered by reference.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backend rejects the operation.
    async fn list_participants(
        &self,
        query: &ParticipantQuery,
    ) -> Result<Vec<Participant>, StorageError>;

    /// Opens a transaction.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backend rejects the operation.
    async fn begin(&self) -> Result<Box<dyn StorageTx>, StorageError>;

    /// Checks that the backend is reachable.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backend cannot be reached.
    async fn ping(&self) -> Result<(), StorageError>;

    /// Applies group assignments in one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backend rejects the operation.
    async fn update_participants_group_and_status(
        &self,
        batch: &[GroupAssignment],
    ) -> Result<(), StorageError> {
        let mut tx = self.begin().await?;
        tx.update_participants_group_and_status(batch).await?;
        tx.commit().await
    }

    /// Applies status updates in one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backend rejects the operation.
    async fn update_participants_status(&self, batch: &[StatusUpdate]) -> Result<(), StorageError> {
        let mut tx = self.begin().await?;
        tx.update_participants_status(batch).await?;
        tx.commit().await
    }
}

/// An open storage transaction.
///
/// Dropping the transaction without calling [`StorageTx::commit`] rolls
/// back every write made through it.
#[async_trait]
pub trait StorageTx: Send {
    /// Fetches an event and locks it until the transaction ends.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backend rejects the operation.
    async fn lock_event(&mut self, serial: Serial) -> Result<Option<Event>, StorageError>;

    /// Lists participants selected by `query`, ordered by reference.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backend rejects the operation.
    async fn list_participants(
        &mut self,
        query: &ParticipantQuery,
    ) -> Result<Vec<Participant>, StorageError>;

    /// Inserts participants, skipping `(event, reference)` pairs that
    /// already exist. Returns the number of rows inserted.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backend rejects the insert.
    async fn create_participants(&mut self, batch: &[Participant]) -> Result<u64, StorageError>;

    /// Deletes participants by key. Returns the number of rows removed.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backend rejects the delete.
    async fn delete_participants(&mut self, batch: &[ParticipantKey])
    -> Result<u64, StorageError>;

    /// Sets group and status for each participant in `batch`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Unavailable`] if a row in `batch` is not
    /// registered.
    async fn update_participants_group_and_status(
        &mut self,
        batch: &[GroupAssignment],
    ) -> Result<(), StorageError>;

    /// Sets status for each participant in `batch`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Unavailable`] if a row in `batch` is not
    /// registered.
    async fn update_participants_status(
        &mut self,
        batch: &[StatusUpdate],
    ) -> Result<(), StorageError>;

    /// Overwrites the status of an event.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backend rejects the operation.
    async fn update_event_status(
        &mut self,
        serial: Serial,
        status: EventStatus,
    ) -> Result<(), StorageError>;

    /// Makes every write of this transaction durable.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the commit fails, in which case no
    /// write of this transaction is kept.
    async fn commit(self: Box<Self>) -> Result<(), StorageError>;
}
