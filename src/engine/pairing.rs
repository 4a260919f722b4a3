//! Round planning: splits the pending participants of an event into groups.
//!
//! The planner is pure. It takes the pending references and a random
//! generator and returns a [`RoundPlan`]; persisting the plan is the
//! service's job.
//!
//! Groups are pairs, except that when exactly three participants remain
//! they form one triad. A single remaining participant is not grouped and
//! is reported as the round's leftover.

use rand::Rng;

use crate::domain::Serial;

/// One group formed by a round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    /// Freshly generated group serial.
    pub group_serial: Serial,
    /// Member references, sorted.
    pub references: Vec<String>,
}

impl Group {
    fn new(mut references: Vec<String>) -> Self {
        references.sort();
        Self {
            group_serial: Serial::generate(),
            references,
        }
    }

    /// Number of members (2 or 3).
    #[must_use]
    pub fn len(&self) -> usize {
        self.references.len()
    }

    /// Always `false` for a planned group.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }
}

/// Result of planning one round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundPlan {
    /// Groups in draw order.
    pub groups: Vec<Group>,
    /// The participant left without a group, if the pending set had size 1.
    pub leftover: Option<String>,
}

impl RoundPlan {
    /// Returns `true` if the round places nobody in a group.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total number of participants placed in a group.
    #[must_use]
    pub fn assigned(&self) -> usize {
        self.groups.iter().map(Group::len).sum()
    }
}

/// Plans a round over `pending`.
///
/// References are sorted and de-duplicated first, so the same generator
/// state always yields the same plan whatever order storage returned.
pub fn plan_round<R: Rng>(mut pending: Vec<String>, rng: &mut R) -> RoundPlan {
    pending.sort();
    pending.dedup();

    let mut plan = RoundPlan::default();
    loop {
        match pending.len() {
            0 => break,
            1 => {
                plan.leftover = pending.pop();
                break;
            }
            3 => {
                plan.groups.push(Group::new(std::mem::take(&mut pending)));
                break;
            }
            len => {
                let (first, second) = draw_two(len, rng);
                let (high, low) = if first > second {
                    (first, second)
                } else {
                    (second, first)
                };
                // Remove the higher index first so the lower one stays valid.
                let a = pending.swap_remove(high);
                let b = pending.swap_remove(low);
                plan.groups.push(Group::new(vec![a, b]));
            }
        }
    }
    plan
}

/// Draws two distinct indices in `0..len` uniformly. `len` must be >= 2.
fn draw_two<R: Rng>(len: usize, rng: &mut R) -> (usize, usize) {
    let first = rng.gen_range(0..len);
    let mut second = rng.gen_range(0..len.saturating_sub(1));
    if second >= first {
        second = second.saturating_add(1);
    }
    (first, second)
}
