// Copyright (c) 2024 Mike Tsao

use crate::{fx::FxParams, types::FxUid};
use serde::{Deserialize, Serialize};

/// The number of rows fx sections can stack in.
pub const FX_ROW_MAX: usize = 5;

/// An effect applied to a stretch of a curve. Sections on the same row never
/// overlap; sections on different rows run in row order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FxSection {
    /// Assigned when the section joins a curve. It is not saved.
    #[serde(skip)]
    pub uid: FxUid,
    /// Start time.
    pub time: f64,
    #[allow(missing_docs)]
    pub length: f64,
    /// Stacking row, `0..FX_ROW_MAX`.
    pub row: usize,
    /// The registered kind of effect.
    #[serde(rename = "def", alias = "kind")]
    pub kind: String,
    /// A bypassed section is kept but not applied.
    #[serde(default, skip_serializing_if = "core::ops::Not::not")]
    pub bypassed: bool,
    #[allow(missing_docs)]
    #[serde(default)]
    pub params: FxParams,
}
impl FxSection {
    /// The time the section stops affecting the curve.
    pub fn end(&self) -> f64 {
        self.time + self.length
    }

    /// Whether the half-open windows `[time, time + length)` of the section
    /// and the given range overlap.
    pub fn overlaps(&self, time: f64, length: f64) -> bool {
        has_overlap(self.time, self.length, time, length)
    }
}

/// Two half-open intervals overlap iff each starts before the other ends.
pub(crate) fn has_overlap(t1: f64, l1: f64, t2: f64, l2: f64) -> bool {
    t1 < t2 + l2 && t2 < t1 + l1
}
