//! Event lifecycle guards.
//!
//! `Pending -> Active -> Completed`, with `Pending | Active -> Halted` as
//! the side transition. `Completed` and `Halted` are terminal. Each guard
//! takes the locked event status and either allows the operation or names
//! the conflict.

use crate::domain::{EventStatus, Participant, ParticipantStatus};
use crate::error::StateConflict;

/// Outcome of a sweep guard (`Stop` or `Halt`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sweep {
    /// Halt open participants and move the event to the given status.
    Apply(EventStatus),
    /// The event already has the target status.
    Noop,
}

/// `Start` is legal only from `Pending`.
///
/// # Errors
///
/// [`StateConflict::AlreadyActive`] or [`StateConflict::AlreadyTerminal`].
pub const fn check_start(status: EventStatus) -> Result<(), StateConflict> {
    match status {
        EventStatus::Pending => Ok(()),
        EventStatus::Active => Err(StateConflict::AlreadyActive),
        EventStatus::Completed | EventStatus::Halted => {
            Err(StateConflict::AlreadyTerminal(status))
        }
    }
}

/// Pairing and registration need a non-terminal event.
///
/// # Errors
///
/// [`StateConflict::AlreadyTerminal`] on a completed or halted event.
pub const fn check_open(status: EventStatus) -> Result<(), StateConflict> {
    if status.is_terminal() {
        Err(StateConflict::AlreadyTerminal(status))
    } else {
        Ok(())
    }
}

/// Call reports need a running event.
///
/// # Errors
///
/// [`StateConflict::NotRunning`] unless the event is `Active`.
pub const fn check_report(status: EventStatus) -> Result<(), StateConflict> {
    match status {
        EventStatus::Active => Ok(()),
        other => Err(StateConflict::NotRunning(other)),
    }
}

/// Unregistration may not break up a group whose call is still open.
///
/// # Errors
///
/// [`StateConflict::ParticipantPaired`] naming the first `Active` row.
pub fn check_removable(rows: &[Participant]) -> Result<(), StateConflict> {
    match rows.iter().find(|p| p.status == ParticipantStatus::Active) {
        Some(paired) => Err(StateConflict::ParticipantPaired(
            paired.participant_ref.clone(),
        )),
        None => Ok(()),
    }
}

/// Guard for `Stop`.
///
/// # Errors
///
/// [`StateConflict::AlreadyTerminal`] on a halted event.
pub const fn plan_stop(status: EventStatus) -> Result<Sweep, StateConflict> {
    match status {
        EventStatus::Completed => Ok(Sweep::Noop),
        EventStatus::Halted => Err(StateConflict::AlreadyTerminal(status)),
        EventStatus::Pending | EventStatus::Active => Ok(Sweep::Apply(EventStatus::Completed)),
    }
}

/// Guard for `Halt`.
///
/// # Errors
///
/// [`StateConflict::AlreadyTerminal`] on a completed event.
pub const fn plan_halt(status: EventStatus) -> Result<Sweep, StateConflict> {
    match status {
        EventStatus::Halted => Ok(Sweep::Noop),
        EventStatus::Completed => Err(StateConflict::AlreadyTerminal(status)),
        EventStatus::Pending | EventStatus::Active => Ok(Sweep::Apply(EventStatus::Halted)),
    }
}

/// Forward-only guard applied to every event status write.
///
/// # Errors
///
/// [`StateConflict::AlreadyTerminal`] if `next` would regress `current`.
pub const fn advance(current: EventStatus, next: EventStatus) -> Result<EventStatus, StateConflict> {
    if current.can_advance_to(next) {
        Ok(next)
    } else {
        Err(StateConflict::AlreadyTerminal(current))
    }
}
