//! The driver's state machine.

use serde::Serialize;
use std::fmt;

/// Where a run is. `Validated` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    /// The manifest has been read and planned against; nothing written.
    Ready,
    /// A verified copy of the original text exists on disk.
    BackedUp,
    /// The rewritten text exists in memory.
    Mutated,
    /// The rewritten text passed validation and was committed.
    Validated,
    /// The run stopped; the working file is unchanged.
    Failed,
}

impl Stage {
    /// Returns `true` if the run can move from `self` to `next`.
    pub fn can_advance_to(self, next: Stage) -> bool {
        matches!(
            (self, next),
            (Stage::Ready, Stage::BackedUp)
                | (Stage::Ready, Stage::Validated)
                | (Stage::BackedUp, Stage::Mutated)
                | (Stage::Mutated, Stage::Validated)
        ) || (next == Stage::Failed && !self.is_terminal())
    }

    /// Returns `true` for `Validated` and `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Validated | Stage::Failed)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Ready => "ready",
            Stage::BackedUp => "backed-up",
            Stage::Mutated => "mutated",
            Stage::Validated => "validated",
            Stage::Failed => "failed",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_path() {
        assert!(Stage::Ready.can_advance_to(Stage::BackedUp));
        assert!(Stage::BackedUp.can_advance_to(Stage::Mutated));
        assert!(Stage::Mutated.can_advance_to(Stage::Validated));
    }

    #[test]
    fn no_skipping_the_backup() {
        assert!(!Stage::Ready.can_advance_to(Stage::Mutated));
        assert!(!Stage::BackedUp.can_advance_to(Stage::Validated));
    }

    #[test]
    fn terminal_stages_are_final() {
        assert!(!Stage::Validated.can_advance_to(Stage::Failed));
        assert!(!Stage::Failed.can_advance_to(Stage::Ready));
        assert!(Stage::Mutated.can_advance_to(Stage::Failed));
    }

    #[test]
    fn display() {
        assert_eq!(Stage::BackedUp.to_string(), "backed-up");
    }
}
