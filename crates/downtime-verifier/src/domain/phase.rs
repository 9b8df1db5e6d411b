//! Orchestrator phases.

use super::checkpoint::Checkpoint;
use std::fmt;

/// Linear phases of a verification run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    WaitMinHeight,
    ResolveTarget,
    Estimate,
    LocateSpan,
    Submit,
    Reconcile,
    Checkpoint(Checkpoint),
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::WaitMinHeight => f.write_str("wait-min-height"),
            Phase::ResolveTarget => f.write_str("resolve-target"),
            Phase::Estimate => f.write_str("estimate"),
            Phase::LocateSpan => f.write_str("locate-span"),
            Phase::Submit => f.write_str("submit"),
            Phase::Reconcile => f.write_str("reconcile"),
            Phase::Checkpoint(checkpoint) => write!(f, "checkpoint/{}", checkpoint),
        }
    }
}
