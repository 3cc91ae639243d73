//! The canonical pipeline stage order and its progress checkpoints.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One step of the job pipeline, in canonical order. `stages_completed` on
/// a `Job` is always a prefix of [`Stage::ORDER`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Initializing,
    Planning,
    ScenarioCreation,
    CodeGeneration,
    Rendering,
    Combining,
    Storage,
    Completed,
}

impl Stage {
    /// Canonical pipeline order, index 0 first.
    pub const ORDER: [Stage; 8] = [
        Stage::Initializing,
        Stage::Planning,
        Stage::ScenarioCreation,
        Stage::CodeGeneration,
        Stage::Rendering,
        Stage::Combining,
        Stage::Storage,
        Stage::Completed,
    ];

    /// Lower-bound progress percentage at entry to this stage.
    pub fn entry_percentage(self) -> f64 {
        match self {
            Stage::Initializing => 5.0,
            Stage::Planning => 15.0,
            Stage::ScenarioCreation => 30.0,
            Stage::CodeGeneration => 50.0,
            Stage::Rendering => 80.0,
            Stage::Combining => 90.0,
            Stage::Storage => 95.0,
            Stage::Completed => 100.0,
        }
    }

    pub fn index(self) -> usize {
        Self::ORDER.iter().position(|s| *s == self).expect("stage in ORDER")
    }

    /// The stage that canonically follows this one, if any.
    pub fn next(self) -> Option<Stage> {
        Self::ORDER.get(self.index() + 1).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Initializing => "initializing",
            Stage::Planning => "planning",
            Stage::ScenarioCreation => "scenario_creation",
            Stage::CodeGeneration => "code_generation",
            Stage::Rendering => "rendering",
            Stage::Combining => "combining",
            Stage::Storage => "storage",
            Stage::Completed => "completed",
        }
    }

    /// Whether `prefix` is a valid prefix of the canonical order, per the
    /// `stages_completed` invariant on `Job`.
    pub fn is_valid_prefix(prefix: &[Stage]) -> bool {
        prefix.iter().zip(Self::ORDER.iter()).all(|(a, b)| a == b)
            && prefix.len() <= Self::ORDER.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_is_strictly_increasing_percentage() {
        let mut last = -1.0;
        for stage in Stage::ORDER {
            assert!(stage.entry_percentage() > last);
            last = stage.entry_percentage();
        }
    }

    #[test]
    fn valid_prefix_accepts_empty_and_full_and_rejects_reordered() {
        assert!(Stage::is_valid_prefix(&[]));
        assert!(Stage::is_valid_prefix(&[Stage::Initializing, Stage::Planning]));
        assert!(!Stage::is_valid_prefix(&[Stage::Planning, Stage::Initializing]));
    }

    #[test]
    fn next_terminates_at_completed() {
        assert_eq!(Stage::Completed.next(), None);
        assert_eq!(Stage::Initializing.next(), Some(Stage::Planning));
    }
}
