// Copyright (c) 2024 Mike Tsao

//! Bezier curves with stackable effects.
//!
//! A [Curve] is an ordered chain of [BezierNode]s plus [FxSection]s placed in
//! up to [FX_ROW_MAX] rows. Whenever it changes it precalculates a table of
//! samples, which channel items then read from.

use serde::{Deserialize, Serialize};

/// The most commonly used imports.
pub mod prelude {
    pub use super::{
        BezierHandle, BezierNode, Curve, CurveEvent, CurveEventKind, Curves, FxSection,
        HandleDir, SerializedCurve, CURVE_DEFAULT_HANDLE_LENGTH, FX_ROW_MAX,
    };
}

pub use curve::{Curve, CurveEvent, CurveEventKind};
pub use curves::Curves;
pub use fx_section::{FxSection, FX_ROW_MAX};
pub use node::{BezierHandle, BezierNode, HandleDir, CURVE_DEFAULT_HANDLE_LENGTH};

mod bezier;
#[allow(clippy::module_inception)]
mod curve;
mod curves;
mod fx_section;
mod node;

/// The saved form of a [Curve].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SerializedCurve {
    /// Nodes, sorted by time. The last node's time is the curve's length.
    pub nodes: Vec<BezierNode>,
    /// Fx sections.
    #[serde(default)]
    pub fxs: Vec<FxSection>,
}
