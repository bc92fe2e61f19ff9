//! Worker lifecycle state machine.
//!
//! ```text
//! unregistered -> installing -> installed -> activating -> active
//!                      |             |             |          |
//!                      +-------------+------> redundant <-----+
//! ```
//!
//! A worker that fails to install, or is superseded by a newer version,
//! ends up `redundant` and never handles traffic again.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::Error;

/// Lifecycle state of a single worker version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Unregistered,
    Installing,
    Installed,
    Activating,
    Active,
    Redundant,
}

impl WorkerState {
    /// Whether `next` is a legal edge from this state.
    pub fn can_transition_to(self, next: WorkerState) -> bool {
        use WorkerState::*;
        matches!(
            (self, next),
            (Unregistered, Installing)
                | (Installing, Installed)
                | (Installing, Redundant)
                | (Installed, Activating)
                | (Installed, Redundant)
                | (Activating, Active)
                | (Activating, Redundant)
                | (Active, Redundant)
        )
    }

    /// Move to `next`, or fail with `Error::InvalidTransition`.
    pub fn transition(self, next: WorkerState) -> Result<WorkerState, Error> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(Error::InvalidTransition { from: self, to: next })
        }
    }

    /// Only an active worker intercepts requests.
    pub fn handles_fetch(self) -> bool {
        self == WorkerState::Active
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WorkerState::Unregistered => "unregistered",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Active => "active",
            WorkerState::Redundant => "redundant",
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let state = WorkerState::Unregistered
            .transition(WorkerState::Installing)
            .and_then(|s| s.transition(WorkerState::Installed))
            .and_then(|s| s.transition(WorkerState::Activating))
            .and_then(|s| s.transition(WorkerState::Active))
            .unwrap();
        assert_eq!(state, WorkerState::Active);
        assert!(state.handles_fetch());
    }

    #[test]
    fn test_install_failure_goes_redundant() {
        let state = WorkerState::Installing.transition(WorkerState::Redundant).unwrap();
        assert_eq!(state, WorkerState::Redundant);
        assert!(!state.handles_fetch());
    }

    #[test]
    fn test_cannot_skip_install() {
        let result = WorkerState::Unregistered.transition(WorkerState::Activating);
        assert!(matches!(
            result,
            Err(Error::InvalidTransition { from: WorkerState::Unregistered, to: WorkerState::Activating })
        ));
    }

    #[test]
    fn test_redundant_is_terminal() {
        for next in [
            WorkerState::Unregistered,
            WorkerState::Installing,
            WorkerState::Installed,
            WorkerState::Activating,
            WorkerState::Active,
        ] {
            assert!(!WorkerState::Redundant.can_transition_to(next));
        }
    }

    #[test]
    fn test_only_active_handles_fetch() {
        assert!(!WorkerState::Installed.handles_fetch());
        assert!(!WorkerState::Activating.handles_fetch());
    }

    #[test]
    fn test_serialize_lowercase() {
        let json = serde_json::to_string(&WorkerState::Activating).unwrap();
        assert_eq!(json, "\"activating\"");
    }
}
