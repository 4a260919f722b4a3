//! Donut service: runs the event lifecycle on top of [`Storage`].
//!
//! Every read-modify-write operation follows the same shape: open a
//! transaction, lock the event row, check the lifecycle guard, read what
//! the decision needs, write, commit, then publish a [`Notification`].
//! Returning early before `commit` drops the transaction and rolls it back.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tokio::sync::Mutex;

use crate::domain::{
    Event, EventOptions, EventStatus, GroupMap, Notification, NotificationBus, PairedGroup,
    Participant, ParticipantStatus, Serial, group_map, normalize_references,
};
use crate::engine::lifecycle::{self, Sweep};
use crate::engine::{Group, Verdict, judge_report, plan_round, resolve_group};
use crate::error::{DonutError, StateConflict};
use crate::storage::{
    GroupAssignment, ParticipantKey, ParticipantQuery, StatusUpdate, Storage, StorageTx,
};

/// Random source used for pairing draws.
pub type PairingRng = Box<dyn RngCore + Send>;

/// Result of a `Start` or `Pair` round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundOutcome {
    /// Event the round ran on.
    pub event_serial: Serial,
    /// Event status after the round.
    pub status: EventStatus,
    /// Groups formed, in draw order.
    pub groups: Vec<PairedGroup>,
    /// Participant left waiting for the next round.
    pub leftover: Option<String>,
}

/// Result of a reconciled call report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedGroup {
    /// Owning event.
    pub event_serial: Serial,
    /// Completed group.
    pub group_serial: Serial,
    /// Every member of the group, sorted.
    pub references: Vec<String>,
    /// `true` if the group had been completed by an earlier report.
    pub already_completed: bool,
}

/// Read-only projection of one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventInformation {
    /// Event metadata and status.
    pub event: Event,
    /// Every participant, ordered by reference.
    pub participants: Vec<Participant>,
    /// Participants keyed by group.
    pub groups: GroupMap,
}

/// Orchestration layer for every event operation.
pub struct DonutService {
    storage: Arc<dyn Storage>,
    notification_bus: NotificationBus,
    rng: Mutex<PairingRng>,
}

impl fmt::Debug for DonutService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DonutService")
            .field("storage", &self.storage)
            .field("notification_bus", &self.notification_bus)
            .finish_non_exhaustive()
    }
}

impl DonutService {
    /// Creates a service drawing from an entropy-seeded generator.
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>, notification_bus: NotificationBus) -> Self {
        Self::with_rng(
            storage,
            notification_bus,
            Box::new(StdRng::from_entropy()),
        )
    }

    /// Creates a service with an explicit random source.
    #[must_use]
    pub fn with_rng(
        storage: Arc<dyn Storage>,
        notification_bus: NotificationBus,
        rng: PairingRng,
    ) -> Self {
        Self {
            storage,
            notification_bus,
            rng: Mutex::new(rng),
        }
    }

    /// Returns the notification bus.
    #[must_use]
    pub fn notification_bus(&self) -> &NotificationBus {
        &self.notification_bus
    }

    /// Creates a `Pending` event.
    ///
    /// # Errors
    ///
    /// Returns [`DonutError::Validation`] for invalid options and
    /// [`DonutError::Storage`] if the insert fails.
    pub async fn create_event(&self, options: EventOptions) -> Result<Event, DonutError> {
        let event = Event::build(options)?;
        self.storage.create_event(&event).await?;

        tracing::info!(event_serial = %event.serial, name = %event.name, "event created");
        self.notification_bus.publish(Notification::EventCreated {
            event_serial: event.serial,
            name: event.name.clone(),
            timestamp: Utc::now(),
        });
        Ok(event)
    }

    /// Fetches an event.
    ///
    /// # Errors
    ///
    /// Returns [`DonutError::EventNotFound`] for an unknown serial.
    pub async fn get_event(&self, serial: Serial) -> Result<Event, DonutError> {
        self.storage
            .get_event(serial)
            .await?
            .ok_or(DonutError::EventNotFound(serial))
    }

    /// Registers participants as `Pending`. Already registered references
    /// are skipped. Returns the number of new rows.
    ///
    /// The insert runs under the event lock, so it cannot land after a
    /// concurrent `Stop` or `Halt` has swept the event.
    ///
    /// # Errors
    ///
    /// Returns [`DonutError::Validation`] for an empty or malformed batch,
    /// [`DonutError::EventNotFound`], or a state conflict on a terminal
    /// event.
    pub async fn register(&self, serial: Serial, references: &[String]) -> Result<u64, DonutError> {
        let references = normalize_references(references)?;

        let mut tx = self.storage.begin().await?;
        let event = lock(tx.as_mut(), serial).await?;
        lifecycle::check_open(event.status)?;

        let rows: Vec<Participant> = references
            .iter()
            .map(|r| Participant::pending(serial, r.clone()))
            .collect();
        let inserted = tx.create_participants(&rows).await?;
        tx.commit().await?;

        tracing::info!(event_serial = %serial, submitted = rows.len(), inserted, "participants registered");
        self.notification_bus
            .publish(Notification::ParticipantsRegistered {
                event_serial: serial,
                references,
                inserted,
                timestamp: Utc::now(),
            });
        Ok(inserted)
    }

    /// Removes participants. Returns the number of rows removed.
    ///
    /// Members of a group whose call is still open (`Active`) cannot be
    /// removed; the whole batch is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`DonutError::Validation`] for an empty or malformed batch,
    /// [`DonutError::EventNotFound`] for an unknown event, and a state
    /// conflict if a reference is paired in an open group.
    pub async fn unregister(
        &self,
        serial: Serial,
        references: &[String],
    ) -> Result<u64, DonutError> {
        let references = normalize_references(references)?;

        let mut tx = self.storage.begin().await?;
        lock(tx.as_mut(), serial).await?;
        let rows = tx
            .list_participants(&ParticipantQuery::EventWithReferences(
                serial,
                references.clone(),
            ))
            .await?;
        lifecycle::check_removable(&rows)?;

        let keys: Vec<ParticipantKey> = references
            .iter()
            .map(|r| ParticipantKey {
                event_serial: serial,
                participant_ref: r.clone(),
            })
            .collect();
        let removed = tx.delete_participants(&keys).await?;
        tx.commit().await?;

        tracing::info!(event_serial = %serial, removed, "participants unregistered");
        self.notification_bus
            .publish(Notification::ParticipantsUnregistered {
                event_serial: serial,
                references,
                removed,
                timestamp: Utc::now(),
            });
        Ok(removed)
    }

    /// Starts a `Pending` event by running its first round.
    ///
    /// # Errors
    ///
    /// Returns a state conflict unless the event is `Pending`, and
    /// [`DonutError::Storage`] if the round cannot be committed. Nothing is
    /// written on error.
    pub async fn start(&self, serial: Serial) -> Result<RoundOutcome, DonutError> {
        let mut tx = self.storage.begin().await?;
        let event = lock(tx.as_mut(), serial).await?;
        lifecycle::check_start(event.status)?;

        let outcome = self.run_round(tx, &event).await?;
        tracing::info!(
            event_serial = %serial,
            groups = outcome.groups.len(),
            status = %outcome.status,
            "event started"
        );
        Ok(outcome)
    }

    /// Pairs the participants still pending on a non-terminal event.
    ///
    /// # Errors
    ///
    /// Returns a state conflict on a terminal event and
    /// [`DonutError::Storage`] if the round cannot be committed.
    pub async fn pair(&self, serial: Serial) -> Result<RoundOutcome, DonutError> {
        let mut tx = self.storage.begin().await?;
        let event = lock(tx.as_mut(), serial).await?;
        lifecycle::check_open(event.status)?;

        self.run_round(tx, &event).await
    }

    async fn run_round(
        &self,
        mut tx: Box<dyn StorageTx>,
        event: &Event,
    ) -> Result<RoundOutcome, DonutError> {
        let pending: Vec<String> = tx
            .list_participants(&ParticipantQuery::EventWithStatus(
                event.serial,
                vec![ParticipantStatus::Pending],
            ))
            .await?
            .into_iter()
            .map(|p| p.participant_ref)
            .collect();

        if pending.is_empty() {
            tracing::debug!(event_serial = %event.serial, "no pending participants");
            return Ok(RoundOutcome {
                event_serial: event.serial,
                status: event.status,
                groups: Vec::new(),
                leftover: None,
            });
        }

        let plan = {
            let mut rng = self.rng.lock().await;
            plan_round(pending, &mut *rng)
        };

        let assignments: Vec<GroupAssignment> = plan
            .groups
            .iter()
            .flat_map(|group| {
                group.references.iter().map(|r| GroupAssignment {
                    key: ParticipantKey {
                        event_serial: event.serial,
                        participant_ref: r.clone(),
                    },
                    group_serial: group.group_serial,
                    status: ParticipantStatus::Active,
                })
            })
            .collect();
        if !assignments.is_empty() {
            tx.update_participants_group_and_status(&assignments)
                .await?;
        }

        let status = lifecycle::advance(event.status, EventStatus::Active)?;
        if status != event.status {
            tx.update_event_status(event.serial, status).await?;
        }
        tx.commit().await?;

        if let Some(leftover) = &plan.leftover {
            tracing::warn!(
                event_serial = %event.serial,
                participant_ref = %leftover,
                "odd participant left unpaired, carried to the next round"
            );
        }

        let groups: Vec<PairedGroup> = plan.groups.into_iter().map(paired_group).collect();
        self.notification_bus.publish(Notification::RoundPaired {
            event_serial: event.serial,
            groups: groups.clone(),
            leftover: plan.leftover.clone(),
            timestamp: Utc::now(),
        });

        Ok(RoundOutcome {
            event_serial: event.serial,
            status,
            groups,
            leftover: plan.leftover,
        })
    }

    /// Reconciles a reported call: the reported participants must be
    /// exactly the members of one assigned group, which is then completed.
    ///
    /// # Errors
    ///
    /// - [`DonutError::Validation`] for an empty batch or an unknown
    ///   participant.
    /// - A state conflict unless the event is `Active`, or if the group was
    ///   halted.
    /// - [`DonutError::AmbiguousGroup`], [`DonutError::NoAssignment`] or
    ///   [`DonutError::IncompleteGroup`] when the report does not match one
    ///   group.
    pub async fn report_call(
        &self,
        serial: Serial,
        references: &[String],
    ) -> Result<CompletedGroup, DonutError> {
        let references = normalize_references(references)?;

        let mut tx = self.storage.begin().await?;
        let event = lock(tx.as_mut(), serial).await?;
        lifecycle::check_report(event.status)?;

        let resolved = tx
            .list_participants(&ParticipantQuery::EventWithReferences(
                serial,
                references.clone(),
            ))
            .await?;
        let group_serial = resolve_group(&references, &resolved)?;
        let members = tx
            .list_participants(&ParticipantQuery::Group(group_serial))
            .await?;

        let mut member_refs: Vec<String> =
            members.iter().map(|p| p.participant_ref.clone()).collect();
        member_refs.sort();

        let members = match judge_report(group_serial, resolved.len(), members)? {
            Verdict::AlreadyCompleted => {
                tracing::debug!(event_serial = %serial, group_serial = %group_serial, "group already completed");
                return Ok(CompletedGroup {
                    event_serial: serial,
                    group_serial,
                    references: member_refs,
                    already_completed: true,
                });
            }
            Verdict::Complete(members) => members,
        };

        let updates: Vec<StatusUpdate> = members
            .into_iter()
            .map(|p| StatusUpdate {
                key: ParticipantKey {
                    event_serial: p.event_serial,
                    participant_ref: p.participant_ref,
                },
                status: ParticipantStatus::Completed,
            })
            .collect();
        tx.update_participants_status(&updates).await?;
        tx.commit().await?;

        tracing::info!(event_serial = %serial, group_serial = %group_serial, "group completed");
        self.notification_bus.publish(Notification::GroupCompleted {
            event_serial: serial,
            group_serial,
            references: member_refs.clone(),
            timestamp: Utc::now(),
        });

        Ok(CompletedGroup {
            event_serial: serial,
            group_serial,
            references: member_refs,
            already_completed: false,
        })
    }

    /// Stops an event: open participants are halted and the event becomes
    /// `Completed`. Stopping a completed event is a no-op. Returns the
    /// number of participants halted.
    ///
    /// # Errors
    ///
    /// Returns a state conflict on a halted event.
    pub async fn stop(&self, serial: Serial) -> Result<u64, DonutError> {
        let halted = self.sweep(serial, lifecycle::plan_stop).await?;
        if let Some(halted) = halted {
            tracing::info!(event_serial = %serial, halted, "event stopped");
            self.notification_bus.publish(Notification::EventStopped {
                event_serial: serial,
                halted,
                timestamp: Utc::now(),
            });
        }
        Ok(halted.unwrap_or(0))
    }

    /// Aborts an event: open participants are halted and the event becomes
    /// `Halted`. Halting a halted event is a no-op. Returns the number of
    /// participants halted.
    ///
    /// # Errors
    ///
    /// Returns a state conflict on a completed event.
    pub async fn halt(&self, serial: Serial) -> Result<u64, DonutError> {
        let halted = self.sweep(serial, lifecycle::plan_halt).await?;
        if let Some(halted) = halted {
            tracing::info!(event_serial = %serial, halted, "event halted");
            self.notification_bus.publish(Notification::EventHalted {
                event_serial: serial,
                halted,
                timestamp: Utc::now(),
            });
        }
        Ok(halted.unwrap_or(0))
    }

    /// Returns `None` when the guard reported a no-op.
    async fn sweep(
        &self,
        serial: Serial,
        guard: fn(EventStatus) -> Result<Sweep, StateConflict>,
    ) -> Result<Option<u64>, DonutError> {
        let mut tx = self.storage.begin().await?;
        let event = lock(tx.as_mut(), serial).await?;
        let target = match guard(event.status)? {
            Sweep::Noop => return Ok(None),
            Sweep::Apply(target) => target,
        };

        let open = tx
            .list_participants(&ParticipantQuery::EventWithStatus(
                serial,
                vec![ParticipantStatus::Pending, ParticipantStatus::Active],
            ))
            .await?;
        let updates: Vec<StatusUpdate> = open
            .into_iter()
            .map(|p| StatusUpdate {
                key: ParticipantKey {
                    event_serial: p.event_serial,
                    participant_ref: p.participant_ref,
                },
                status: ParticipantStatus::Halted,
            })
            .collect();
        if !updates.is_empty() {
            tx.update_participants_status(&updates).await?;
        }

        let status = lifecycle::advance(event.status, target)?;
        tx.update_event_status(serial, status).await?;
        tx.commit().await?;

        Ok(Some(updates.len() as u64))
    }

    /// Returns the event, every participant and the group map.
    ///
    /// # Errors
    ///
    /// Returns [`DonutError::EventNotFound`] for an unknown serial.
    pub async fn get_information(&self, serial: Serial) -> Result<EventInformation, DonutError> {
        let event = self.get_event(serial).await?;
        let participants = self
            .storage
            .list_participants(&ParticipantQuery::Event(serial))
            .await?;
        let groups = group_map(&participants);
        Ok(EventInformation {
            event,
            participants,
            groups,
        })
    }

    /// Lists participants, optionally restricted to one status.
    ///
    /// # Errors
    ///
    /// Returns [`DonutError::EventNotFound`] for an unknown serial.
    pub async fn list_participants(
        &self,
        serial: Serial,
        status: Option<ParticipantStatus>,
    ) -> Result<Vec<Participant>, DonutError> {
        self.get_event(serial).await?;
        let query = match status {
            Some(status) => ParticipantQuery::EventWithStatus(serial, vec![status]),
            None => ParticipantQuery::Event(serial),
        };
        Ok(self.storage.list_participants(&query).await?)
    }

    /// Returns the participants of an event keyed by group.
    ///
    /// # Errors
    ///
    /// Returns [`DonutError::EventNotFound`] for an unknown serial.
    pub async fn group_map(&self, serial: Serial) -> Result<GroupMap, DonutError> {
        let participants = self.list_participants(serial, None).await?;
        Ok(group_map(&participants))
    }

    /// Checks that storage is reachable.
    ///
    /// # Errors
    ///
    /// Returns [`DonutError::Storage`] if the backend does not answer.
    pub async fn ping(&self) -> Result<(), DonutError> {
        Ok(self.storage.ping().await?)
    }
}

async fn lock(tx: &mut dyn StorageTx, serial: Serial) -> Result<Event, DonutError> {
    tx.lock_event(serial)
        .await?
        .ok_or(DonutError::EventNotFound(serial))
}

fn paired_group(group: Group) -> PairedGroup {
    PairedGroup {
        group_serial: group.group_serial,
        references: group.references,
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::storage::MemoryStorage;

    fn service_with_seed(seed: u64) -> (Arc<DonutService>, MemoryStorage) {
        let storage = MemoryStorage::new();
        let service = DonutService::with_rng(
            Arc::new(storage.clone()),
            NotificationBus::new(64),
            Box::new(StdRng::seed_from_u64(seed)),
        );
        (Arc::new(service), storage)
    }

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("user-{i}")).collect()
    }

    async fn event_with(service: &DonutService, n: usize) -> Serial {
        let Ok(event) = service.create_event(EventOptions::default()).await else {
            panic!("create event failed");
        };
        if n > 0 {
            let Ok(_) = service.register(event.serial, &names(n)).await else {
                panic!("register failed");
            };
        }
        event.serial
    }

    async fn statuses(service: &DonutService, serial: Serial) -> Vec<ParticipantStatus> {
        let Ok(info) = service.get_information(serial).await else {
            panic!("information failed");
        };
        info.participants.into_iter().map(|p| p.status).collect()
    }

    #[tokio::test]
    async fn four_participants_form_two_pairs() {
        let (service, _) = service_with_seed(1);
        let serial = event_with(&service, 4).await;

        let Ok(outcome) = service.start(serial).await else {
            panic!("start failed");
        };
        assert_eq!(outcome.status, EventStatus::Active);
        assert_eq!(outcome.groups.len(), 2);
        assert!(outcome.groups.iter().all(|g| g.references.len() == 2));
        assert!(outcome.leftover.is_none());

        let Ok(info) = service.get_information(serial).await else {
            panic!("information failed");
        };
        assert_eq!(info.event.status, EventStatus::Active);
        assert_eq!(info.groups.len(), 2);
        assert!(
            info.participants
                .iter()
                .all(|p| p.status == ParticipantStatus::Active && p.group_serial.is_some())
        );
    }

    #[tokio::test]
    async fn five_participants_form_pair_and_triad() {
        let (service, _) = service_with_seed(2);
        let serial = event_with(&service, 5).await;

        let Ok(outcome) = service.start(serial).await else {
            panic!("start failed");
        };
        let mut sizes: Vec<usize> = outcome.groups.iter().map(|g| g.references.len()).collect();
        sizes.sort_unstable();
        assert_eq!(sizes, vec![2, 3]);
        assert!(
            statuses(&service, serial)
                .await
                .iter()
                .all(|s| *s == ParticipantStatus::Active)
        );
    }

    #[tokio::test]
    async fn single_participant_is_carried_forward() {
        let (service, _) = service_with_seed(3);
        let serial = event_with(&service, 1).await;

        let Ok(outcome) = service.start(serial).await else {
            panic!("start failed");
        };
        assert!(outcome.groups.is_empty());
        assert_eq!(outcome.leftover.as_deref(), Some("user-0"));
        assert_eq!(outcome.status, EventStatus::Active);
        assert_eq!(
            statuses(&service, serial).await,
            vec![ParticipantStatus::Pending]
        );

        let Ok(_) = service.register(serial, &["late".to_string()]).await else {
            panic!("late register failed");
        };
        let Ok(second) = service.pair(serial).await else {
            panic!("pair failed");
        };
        assert_eq!(second.groups.len(), 1);
        assert!(second.leftover.is_none());
    }

    #[tokio::test]
    async fn empty_event_start_has_no_effect() {
        let (service, storage) = service_with_seed(4);
        let serial = event_with(&service, 0).await;
        let before = storage.commit_count();

        let Ok(outcome) = service.start(serial).await else {
            panic!("start failed");
        };
        assert!(outcome.groups.is_empty());
        assert_eq!(outcome.status, EventStatus::Pending);
        assert_eq!(storage.commit_count(), before);
    }

    #[tokio::test]
    async fn start_twice_conflicts_without_writes() {
        let (service, storage) = service_with_seed(5);
        let serial = event_with(&service, 4).await;
        let Ok(_) = service.start(serial).await else {
            panic!("start failed");
        };
        let before = storage.commit_count();

        let result = service.start(serial).await;
        assert!(matches!(
            result,
            Err(DonutError::StateConflict(StateConflict::AlreadyActive))
        ));
        assert_eq!(storage.commit_count(), before);
    }

    #[tokio::test]
    async fn start_on_stopped_event_is_terminal_conflict() {
        let (service, _) = service_with_seed(6);
        let serial = event_with(&service, 2).await;
        let Ok(_) = service.stop(serial).await else {
            panic!("stop failed");
        };
        assert!(matches!(
            service.start(serial).await,
            Err(DonutError::StateConflict(StateConflict::AlreadyTerminal(
                EventStatus::Completed
            )))
        ));
        assert!(matches!(
            service.pair(serial).await,
            Err(DonutError::StateConflict(StateConflict::AlreadyTerminal(_)))
        ));
    }

    #[tokio::test]
    async fn unknown_event_is_not_found() {
        let (service, _) = service_with_seed(7);
        let missing = Serial::generate();
        assert!(matches!(
            service.start(missing).await,
            Err(DonutError::EventNotFound(_))
        ));
        assert!(matches!(
            service.get_information(missing).await,
            Err(DonutError::EventNotFound(_))
        ));
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let (service, storage) = service_with_seed(8);
        let serial = event_with(&service, 4).await;
        let Ok(_) = service.start(serial).await else {
            panic!("start failed");
        };

        let Ok(halted) = service.stop(serial).await else {
            panic!("stop failed");
        };
        assert_eq!(halted, 4);
        let after_first = storage.commit_count();

        let Ok(halted) = service.stop(serial).await else {
            panic!("second stop failed");
        };
        assert_eq!(halted, 0);
        assert_eq!(storage.commit_count(), after_first);

        let Ok(event) = service.get_event(serial).await else {
            panic!("event missing");
        };
        assert_eq!(event.status, EventStatus::Completed);
        assert!(
            statuses(&service, serial)
                .await
                .iter()
                .all(|s| *s == ParticipantStatus::Halted)
        );
    }

    #[tokio::test]
    async fn halt_sweeps_and_blocks_stop() {
        let (service, _) = service_with_seed(9);
        let serial = event_with(&service, 3).await;

        let Ok(halted) = service.halt(serial).await else {
            panic!("halt failed");
        };
        assert_eq!(halted, 3);
        let Ok(0) = service.halt(serial).await else {
            panic!("second halt should be a no-op");
        };
        assert!(matches!(
            service.stop(serial).await,
            Err(DonutError::StateConflict(StateConflict::AlreadyTerminal(
                EventStatus::Halted
            )))
        ));
    }

    #[tokio::test]
    async fn exact_report_completes_group() {
        let (service, _) = service_with_seed(10);
        let serial = event_with(&service, 4).await;
        let Ok(outcome) = service.start(serial).await else {
            panic!("start failed");
        };
        let Some(group) = outcome.groups.first() else {
            panic!("expected a group");
        };

        let Ok(completed) = service.report_call(serial, &group.references).await else {
            panic!("report failed");
        };
        assert_eq!(completed.group_serial, group.group_serial);
        assert!(!completed.already_completed);

        let Ok(done) = service
            .list_participants(serial, Some(ParticipantStatus::Completed))
            .await
        else {
            panic!("list failed");
        };
        assert_eq!(done.len(), 2);

        let Ok(again) = service.report_call(serial, &group.references).await else {
            panic!("repeat report failed");
        };
        assert!(again.already_completed);
    }

    #[tokio::test]
    async fn reporting_every_group_keeps_event_active_until_stop() {
        let (service, _) = service_with_seed(21);
        let serial = event_with(&service, 4).await;
        let Ok(outcome) = service.start(serial).await else {
            panic!("start failed");
        };
        assert_eq!(outcome.groups.len(), 2);

        for group in &outcome.groups {
            let Ok(completed) = service.report_call(serial, &group.references).await else {
                panic!("report failed");
            };
            assert!(!completed.already_completed);
        }

        assert_eq!(statuses(&service, serial).await, vec![ParticipantStatus::Completed; 4]);
        let Ok(event) = service.get_event(serial).await else {
            panic!("event missing");
        };
        assert_eq!(event.status, EventStatus::Active);

        let Ok(0) = service.stop(serial).await else {
            panic!("stop should halt nobody");
        };
        let Ok(event) = service.get_event(serial).await else {
            panic!("event missing");
        };
        assert_eq!(event.status, EventStatus::Completed);
        assert_eq!(statuses(&service, serial).await, vec![ParticipantStatus::Completed; 4]);
    }

    #[tokio::test]
    async fn partial_triad_report_is_incomplete() {
        let (service, _) = service_with_seed(11);
        let serial = event_with(&service, 3).await;
        let Ok(outcome) = service.start(serial).await else {
            panic!("start failed");
        };
        let Some(triad) = outcome.groups.first() else {
            panic!("expected a triad");
        };
        let subset: Vec<String> = triad.references.iter().take(2).cloned().collect();

        assert!(matches!(
            service.report_call(serial, &subset).await,
            Err(DonutError::IncompleteGroup {
                reported: 2,
                expected: 3
            })
        ));
        assert!(
            statuses(&service, serial)
                .await
                .iter()
                .all(|s| *s == ParticipantStatus::Active)
        );
    }

    #[tokio::test]
    async fn cross_group_report_is_ambiguous() {
        let (service, _) = service_with_seed(12);
        let serial = event_with(&service, 4).await;
        let Ok(outcome) = service.start(serial).await else {
            panic!("start failed");
        };
        let picks: Vec<String> = outcome
            .groups
            .iter()
            .filter_map(|g| g.references.first().cloned())
            .collect();

        assert!(matches!(
            service.report_call(serial, &picks).await,
            Err(DonutError::AmbiguousGroup { groups: 2 })
        ));
    }

    #[tokio::test]
    async fn report_rejects_unknown_and_pending_states() {
        let (service, _) = service_with_seed(13);
        let serial = event_with(&service, 1).await;

        assert!(matches!(
            service.report_call(serial, &names(1)).await,
            Err(DonutError::StateConflict(StateConflict::NotRunning(
                EventStatus::Pending
            )))
        ));

        let Ok(_) = service.start(serial).await else {
            panic!("start failed");
        };
        assert!(matches!(
            service.report_call(serial, &names(1)).await,
            Err(DonutError::NoAssignment)
        ));
        assert!(matches!(
            service.report_call(serial, &["ghost".to_string()]).await,
            Err(DonutError::Validation(_))
        ));
        assert!(matches!(
            service.report_call(serial, &[]).await,
            Err(DonutError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn same_seed_yields_same_round() {
        let mut rounds = Vec::new();
        for _ in 0..2 {
            let (service, _) = service_with_seed(77);
            let serial = event_with(&service, 9).await;
            let Ok(outcome) = service.start(serial).await else {
                panic!("start failed");
            };
            let members: Vec<Vec<String>> =
                outcome.groups.into_iter().map(|g| g.references).collect();
            rounds.push(members);
        }
        assert_eq!(rounds.first(), rounds.last());
    }

    #[tokio::test]
    async fn failed_commit_leaves_prestate() {
        let (service, storage) = service_with_seed(14);
        let serial = event_with(&service, 4).await;
        storage.fail_next_commit();

        assert!(matches!(
            service.start(serial).await,
            Err(DonutError::Storage(_))
        ));
        let Ok(event) = service.get_event(serial).await else {
            panic!("event missing");
        };
        assert_eq!(event.status, EventStatus::Pending);
        let Ok(info) = service.get_information(serial).await else {
            panic!("information failed");
        };
        assert!(info.groups.is_empty());
        assert!(
            info.participants
                .iter()
                .all(|p| p.status == ParticipantStatus::Pending)
        );
    }

    #[tokio::test]
    async fn concurrent_pairs_never_double_assign() {
        let (service, _) = service_with_seed(15);
        let serial = event_with(&service, 10).await;

        let a = tokio::spawn({
            let service = Arc::clone(&service);
            async move { service.pair(serial).await }
        });
        let b = tokio::spawn({
            let service = Arc::clone(&service);
            async move { service.pair(serial).await }
        });
        let (Ok(Ok(first)), Ok(Ok(second))) = (a.await, b.await) else {
            panic!("both rounds should succeed");
        };

        let placed: Vec<String> = first
            .groups
            .into_iter()
            .chain(second.groups)
            .flat_map(|g| g.references)
            .collect();
        let unique: BTreeSet<&String> = placed.iter().collect();
        assert_eq!(placed.len(), 10);
        assert_eq!(unique.len(), 10);
    }

    #[tokio::test]
    async fn register_counts_new_rows_and_rejects_terminal() {
        let (service, _) = service_with_seed(16);
        let serial = event_with(&service, 2).await;

        let refs = vec!["user-0".to_string(), "fresh".to_string(), " fresh ".to_string()];
        let Ok(inserted) = service.register(serial, &refs).await else {
            panic!("register failed");
        };
        assert_eq!(inserted, 1);

        let Ok(removed) = service.unregister(serial, &["fresh".to_string()]).await else {
            panic!("unregister failed");
        };
        assert_eq!(removed, 1);

        let Ok(_) = service.halt(serial).await else {
            panic!("halt failed");
        };
        assert!(matches!(
            service.register(serial, &["later".to_string()]).await,
            Err(DonutError::StateConflict(StateConflict::AlreadyTerminal(_)))
        ));
    }

    #[tokio::test]
    async fn register_waits_for_event_lock_and_sees_stop() {
        let (service, storage) = service_with_seed(22);
        let serial = event_with(&service, 2).await;
        let Ok(_) = service.start(serial).await else {
            panic!("start failed");
        };

        let Ok(mut tx) = storage.begin().await else {
            panic!("begin failed");
        };
        let Ok(Some(_)) = tx.lock_event(serial).await else {
            panic!("lock failed");
        };

        let late = Arc::clone(&service);
        let register =
            tokio::spawn(async move { late.register(serial, &["late".to_string()]).await });
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(!register.is_finished());

        let Ok(()) = tx
            .update_event_status(serial, EventStatus::Completed)
            .await
        else {
            panic!("status write failed");
        };
        let Ok(()) = tx.commit().await else {
            panic!("commit failed");
        };

        let Ok(result) = register.await else {
            panic!("register task panicked");
        };
        assert!(matches!(
            result,
            Err(DonutError::StateConflict(StateConflict::AlreadyTerminal(
                EventStatus::Completed
            )))
        ));
        assert_eq!(statuses(&service, serial).await.len(), 2);
    }

    #[tokio::test]
    async fn unregister_refuses_open_group_members() {
        let (service, storage) = service_with_seed(23);
        let serial = event_with(&service, 4).await;
        let Ok(outcome) = service.start(serial).await else {
            panic!("start failed");
        };
        let Some(member) = outcome.groups.first().and_then(|g| g.references.first()) else {
            panic!("expected a paired member");
        };
        let before = storage.commit_count();

        let result = service
            .unregister(serial, &[member.clone(), "nobody".to_string()])
            .await;
        let Err(DonutError::StateConflict(StateConflict::ParticipantPaired(named))) = result else {
            panic!("expected a paired-member conflict");
        };
        assert_eq!(&named, member);
        assert_eq!(storage.commit_count(), before);
        assert_eq!(statuses(&service, serial).await.len(), 4);

        let Ok(_) = service.stop(serial).await else {
            panic!("stop failed");
        };
        let Ok(1) = service.unregister(serial, std::slice::from_ref(member)).await else {
            panic!("halted member should be removable");
        };
    }

    #[tokio::test]
    async fn round_is_broadcast() {
        let (service, _) = service_with_seed(17);
        let serial = event_with(&service, 2).await;
        let mut rx = service.notification_bus().subscribe();

        let Ok(_) = service.start(serial).await else {
            panic!("start failed");
        };
        let Ok(Notification::RoundPaired { groups, leftover, .. }) = rx.recv().await else {
            panic!("expected round_paired");
        };
        assert_eq!(groups.len(), 1);
        assert!(leftover.is_none());
    }
}
