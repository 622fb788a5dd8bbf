//! Submission phases with validated transitions.
//!
//! Idle -> Submitting -> Succeeded/Failed -> Idle
//! Idle -> Failed (nothing to query)
//! Submitting -> Submitting (superseded by a newer submission)

use std::fmt;

use serde::Serialize;

use crate::error::QueryError;

/// Where the orchestrator is in handling the latest submission.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Submitting,
    Succeeded,
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Submitting => "submitting",
            Phase::Succeeded => "succeeded",
            Phase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Validate that a phase transition is allowed.
///
/// Valid transitions:
/// - Idle -> Submitting
/// - Idle -> Failed
/// - Submitting -> Submitting
/// - Submitting -> Succeeded
/// - Submitting -> Failed
/// - Submitting -> Idle (abandoned before an answer arrived)
/// - Succeeded -> Idle
/// - Failed -> Idle
pub fn validate_transition(from: Phase, to: Phase) -> Result<(), QueryError> {
    let valid = matches!(
        (from, to),
        (Phase::Idle, Phase::Submitting)
            | (Phase::Idle, Phase::Failed)
            | (Phase::Submitting, Phase::Submitting)
            | (Phase::Submitting, Phase::Succeeded)
            | (Phase::Submitting, Phase::Failed)
            | (Phase::Submitting, Phase::Idle)
            | (Phase::Succeeded, Phase::Idle)
            | (Phase::Failed, Phase::Idle)
    );

    if valid {
        Ok(())
    } else {
        Err(QueryError::InvalidTransition(from, to))
    }
}
