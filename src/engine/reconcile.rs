//! Call reconciliation: checks a reported call against the group that was
//! actually assigned.

use std::collections::BTreeSet;

use crate::domain::{Participant, ParticipantStatus, Serial};
use crate::error::{DonutError, StateConflict};

/// What to do with a group after a valid report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Mark every listed member `Completed`.
    Complete(Vec<Participant>),
    /// Every member is `Completed` already; nothing to write.
    AlreadyCompleted,
}

/// Resolves the single group a set of reported participants belongs to.
///
/// `resolved` are the event's rows whose reference is in `reported`.
///
/// # Errors
///
/// - [`DonutError::Validation`] if a reported reference is not registered.
/// - [`DonutError::AmbiguousGroup`] if the rows span several groups, an
///   ungrouped row counting as its own bucket.
/// - [`DonutError::NoAssignment`] if no row has a group.
pub fn resolve_group(reported: &[String], resolved: &[Participant]) -> Result<Serial, DonutError> {
    let known: BTreeSet<&str> = resolved
        .iter()
        .map(|p| p.participant_ref.as_str())
        .collect();
    let unknown: Vec<&str> = reported
        .iter()
        .map(String::as_str)
        .filter(|r| !known.contains(r))
        .collect();
    if !unknown.is_empty() {
        return Err(DonutError::Validation(format!(
            "unknown participant(s): {}",
            unknown.join(", ")
        )));
    }

    let buckets: BTreeSet<Option<Serial>> = resolved.iter().map(|p| p.group_serial).collect();
    if buckets.len() > 1 {
        return Err(DonutError::AmbiguousGroup {
            groups: buckets.len(),
        });
    }
    buckets.into_iter().flatten().next().ok_or(DonutError::NoAssignment)
}

/// Compares the resolved report against the authoritative group members.
///
/// # Errors
///
/// - [`DonutError::IncompleteGroup`] if `reported` differs from the group
///   size.
/// - [`StateConflict::GroupHalted`] if any member was halted.
pub fn judge_report(
    group: Serial,
    reported: usize,
    members: Vec<Participant>,
) -> Result<Verdict, DonutError> {
    if reported != members.len() {
        return Err(DonutError::IncompleteGroup {
            reported,
            expected: members.len(),
        });
    }
    if members
        .iter()
        .any(|p| p.status == ParticipantStatus::Halted)
    {
        return Err(StateConflict::GroupHalted(group).into());
    }
    if members
        .iter()
        .all(|p| p.status == ParticipantStatus::Completed)
    {
        return Ok(Verdict::AlreadyCompleted);
    }
    Ok(Verdict::Complete(members))
}
