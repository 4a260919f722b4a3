//! Participant membership rows and the derived group map.

use std::collections::{BTreeMap, BTreeSet};

use super::{ParticipantStatus, Serial};
use crate::error::DonutError;

/// Maximum length of a participant reference, in characters.
pub const MAX_REFERENCE_LEN: usize = 255;

/// A participant's membership in one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    /// Owning event.
    pub event_serial: Serial,
    /// Opaque external identity, unique within the event.
    pub participant_ref: String,
    /// Round group, absent while waiting for initial pairing.
    pub group_serial: Option<Serial>,
    /// Membership status.
    pub status: ParticipantStatus,
}

impl Participant {
    /// Creates a freshly registered `Pending` participant without a group.
    #[must_use]
    pub fn pending(event_serial: Serial, participant_ref: String) -> Self {
        Self {
            event_serial,
            participant_ref,
            group_serial: None,
            status: ParticipantStatus::Pending,
        }
    }
}

/// Participants keyed by the group they were placed in.
///
/// Participants without a group are not part of the map.
pub type GroupMap = BTreeMap<Serial, Vec<Participant>>;

/// Derives the [`GroupMap`] of a participant list.
#[must_use]
pub fn group_map(participants: &[Participant]) -> GroupMap {
    let mut map = GroupMap::new();
    for participant in participants {
        if let Some(group) = participant.group_serial {
            map.entry(group).or_default().push(participant.clone());
        }
    }
    map
}

/// Trims, validates and de-duplicates a batch of participant references.
///
/// The returned references keep first-seen order.
///
/// # Errors
///
/// Returns [`DonutError::Validation`] if the batch is empty, or if any
/// reference is blank or longer than [`MAX_REFERENCE_LEN`].
pub fn normalize_references<I, S>(references: I) -> Result<Vec<String>, DonutError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = BTreeSet::new();
    let mut normalized = Vec::new();
    for reference in references {
        let trimmed = reference.as_ref().trim();
        if trimmed.is_empty() {
            return Err(DonutError::Validation(
                "participant reference must not be empty".to_string(),
            ));
        }
        if trimmed.chars().count() > MAX_REFERENCE_LEN {
            return Err(DonutError::Validation(format!(
                "participant reference exceeds {MAX_REFERENCE_LEN} characters"
            )));
        }
        if seen.insert(trimmed.to_string()) {
            normalized.push(trimmed.to_string());
        }
    }
    if normalized.is_empty() {
        return Err(DonutError::Validation(
            "at least one participant reference is required".to_string(),
        ));
    }
    Ok(normalized)
}
