//! Shared primitive types used across the pipeline.

use serde::{Deserialize, Serialize};

/// A crop stage.
///
/// Simulation logs and exported policy tables number stages 0..7.
/// The trained model was fit on stages numbered 1..8.
/// Both numberings are derived from one stored index so that the
/// conversion lives here and nowhere else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Stage {
    index: i64, // zero-based
}

impl Stage {
    pub fn from_zero_based(value: i64) -> Self {
        Self { index: value }
    }

    pub fn from_one_based(value: i64) -> Self {
        Self { index: value - 1 }
    }

    /// The numbering used by the simulation and the policy table.
    pub fn zero_based(self) -> i64 { self.index }

    /// The numbering the model was trained on.
    pub fn one_based(self) -> i64 { self.index + 1 }
}

/// A set of stage numbers as authored in metadata.
///
/// Metadata does not record which numbering the set was written in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StageSet(Vec<i64>);

impl StageSet {
    pub fn new(stages: Vec<i64>) -> Self {
        Self(stages)
    }

    /// Membership of a raw stage value, no convention applied.
    pub fn contains_raw(&self, value: i64) -> bool {
        self.0.contains(&value)
    }

    /// True if the stage matches in either numbering.
    // NOTE: keeps compatibility with sets authored in either convention.
    // Whether a set ever legitimately mixes both is unresolved.
    pub fn contains_either(&self, stage: Stage) -> bool {
        self.contains_raw(stage.zero_based()) || self.contains_raw(stage.one_based())
    }

    pub fn as_slice(&self) -> &[i64] {
        &self.0
    }
}

/// Physical family of an action column, selected by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Irrigate,
    Drain,
}

impl ActionKind {
    /// Any name containing "irrigate" is an irrigation action; everything else drains.
    pub fn of(name: &str) -> Self {
        if name.contains("irrigate") {
            Self::Irrigate
        } else {
            Self::Drain
        }
    }
}

/// Boolean to the 1.0/0.0 encoding used for model features.
pub fn flag(value: bool) -> f64 {
    if value { 1.0 } else { 0.0 }
}
