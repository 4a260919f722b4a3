//! In-memory storage backend.
//!
//! All state lives in a single [`MemoryState`] behind a
//! [`tokio::sync::Mutex`]. A transaction holds the mutex for its whole
//! lifetime and works on a staged copy of the state; commit swaps the copy
//! in, drop discards it. Transactions are therefore fully serialized.

use std::collections::{BTreeMap, HashMap, btree_map};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{
    GroupAssignment, ParticipantKey, ParticipantQuery, StatusUpdate, Storage, StorageError,
    StorageTx,
};
use crate::domain::{Event, EventStatus, Participant, Serial};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    events: HashMap<Serial, Event>,
    participants: BTreeMap<(Serial, String), Participant>,
}

impl MemoryState {
    fn select(&self, query: &ParticipantQuery) -> Vec<Participant> {
        let mut rows: Vec<Participant> = self
            .participants
            .values()
            .filter(|p| query.matches(p))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.participant_ref.cmp(&b.participant_ref));
        rows
    }

    fn insert(&mut self, batch: &[Participant]) -> u64 {
        let mut inserted = 0u64;
        for participant in batch {
            let key = (participant.event_serial, participant.participant_ref.clone());
            if let btree_map::Entry::Vacant(slot) = self.participants.entry(key) {
                slot.insert(participant.clone());
                inserted = inserted.saturating_add(1);
            }
        }
        inserted
    }

    fn remove(&mut self, batch: &[ParticipantKey]) -> u64 {
        let mut removed = 0u64;
        for key in batch {
            if self
                .participants
                .remove(&(key.event_serial, key.participant_ref.clone()))
                .is_some()
            {
                removed = removed.saturating_add(1);
            }
        }
        removed
    }

    fn participant_mut(&mut self, key: &ParticipantKey) -> Result<&mut Participant, StorageError> {
        self.participants
            .get_mut(&(key.event_serial, key.participant_ref.clone()))
            .ok_or_else(|| {
                StorageError::Unavailable(format!(
                    "participant {} not registered on event {}",
                    key.participant_ref, key.event_serial
                ))
            })
    }

    fn set_event_status(&mut self, serial: Serial, status: EventStatus) -> Result<(), StorageError> {
        let event = self
            .events
            .get_mut(&serial)
            .ok_or_else(|| StorageError::Unavailable(format!("event {serial} does not exist")))?;
        event.status = status;
        Ok(())
    }
}

/// In-memory [`Storage`] implementation.
///
/// Cheap to clone; clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    state: Arc<Mutex<MemoryState>>,
    commits: Arc<AtomicU64>,
    fail_next_commit: Arc<AtomicBool>,
}

impl MemoryStorage {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of committed write units (transactions and single writes).
    #[must_use]
    pub fn commit_count(&self) -> u64 {
        self.commits.load(Ordering::SeqCst)
    }

    /// Arms a one-shot failure: the next transaction commit returns
    /// [`StorageError::Unavailable`] and its writes are discarded.
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    fn record_commit(&self) {
        self.commits.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn create_event(&self, event: &Event) -> Result<(), StorageError> {
        let mut state = self.state.lock().await;
        if state.events.contains_key(&event.serial) {
            return Err(StorageError::Unavailable(format!(
                "event {} already exists",
                event.serial
            )));
        }
        state.events.insert(event.serial, event.clone());
        self.record_commit();
        Ok(())
    }

    async fn get_event(&self, serial: Serial) -> Result<Option<Event>, StorageError> {
        Ok(self.state.lock().await.events.get(&serial).cloned())
    }

    async fn update_event_status(
        &self,
        serial: Serial,
        status: EventStatus,
    ) -> Result<(), StorageError> {
        self.state.lock().await.set_event_status(serial, status)?;
        self.record_commit();
        Ok(())
    }

    async fn create_participants(&self, batch: &[Participant]) -> Result<u64, StorageError> {
        let inserted = self.state.lock().await.insert(batch);
        self.record_commit();
        Ok(inserted)
    }

    async fn delete_participants(&self, batch: &[ParticipantKey]) -> Result<u64, StorageError> {
        let removed = self.state.lock().await.remove(batch);
        self.record_commit();
        Ok(removed)
    }

    async fn list_participants(
        &self,
        query: &ParticipantQuery,
    ) -> Result<Vec<Participant>, StorageError> {
        Ok(self.state.lock().await.select(query))
    }

    async fn begin(&self) -> Result<Box<dyn StorageTx>, StorageError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryTx {
            guard,
            staged,
            storage: self.clone(),
        }))
    }

    async fn ping(&self) -> Result<(), StorageError> {
        Ok(())
    }
}

struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
    storage: MemoryStorage,
}

#[async_trait]
impl StorageTx for MemoryTx {
    async fn lock_event(&mut self, serial: Serial) -> Result<Option<Event>, StorageError> {
        Ok(self.staged.events.get(&serial).cloned())
    }

    async fn list_participants(
        &mut self,
        query: &ParticipantQuery,
    ) -> Result<Vec<Participant>, StorageError> {
        Ok(self.staged.select(query))
    }

    async fn create_participants(&mut self, batch: &[Participant]) -> Result<u64, StorageError> {
        Ok(self.staged.insert(batch))
    }

    async fn delete_participants(
        &mut self,
        batch: &[ParticipantKey],
    ) -> Result<u64, StorageError> {
        Ok(self.staged.remove(batch))
    }

    async fn update_participants_group_and_status(
        &mut self,
        batch: &[GroupAssignment],
    ) -> Result<(), StorageError> {
        for assignment in batch {
            let row = self.staged.participant_mut(&assignment.key)?;
            row.group_serial = Some(assignment.group_serial);
            row.status = assignment.status;
        }
        Ok(())
    }

    async fn update_participants_status(
        &mut self,
        batch: &[StatusUpdate],
    ) -> Result<(), StorageError> {
        for update in batch {
            self.staged.participant_mut(&update.key)?.status = update.status;
        }
        Ok(())
    }

    async fn update_event_status(
        &mut self,
        serial: Serial,
        status: EventStatus,
    ) -> Result<(), StorageError> {
        self.staged.set_event_status(serial, status)
    }

    async fn commit(self: Box<Self>) -> Result<(), StorageError> {
        let Self {
            mut guard,
            staged,
            storage,
        } = *self;
        if storage.fail_next_commit.swap(false, Ordering::SeqCst) {
            return Err(StorageError::Unavailable(
                "injected commit failure".to_string(),
            ));
        }
        *guard = staged;
        storage.record_commit();
        Ok(())
    }
}
