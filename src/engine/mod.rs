//! Pure core logic: round planning, call reconciliation and lifecycle
//! guards. Nothing in here touches storage or the clock.

pub mod lifecycle;
pub mod pairing;
pub mod reconcile;

pub use lifecycle::Sweep;
pub use pairing::{Group, RoundPlan, plan_round};
pub use reconcile::{Verdict, judge_report, resolve_group};
