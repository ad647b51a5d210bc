// Copyright (c) 2024 Mike Tsao

use crate::{channel::SerializedChannel, curve::SerializedCurve};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The saved form of an [Automaton](super::Automaton).
///
/// Data from older versions is expected to have been brought up to date
/// before it gets here.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SerializedAutomaton {
    /// The version of the crate that wrote the data.
    #[serde(default)]
    pub version: String,

    /// Timeline length.
    pub length: f64,

    /// Samples per unit of time.
    pub resolution: f64,

    /// Curves by slot. `None` marks a removed curve, so that items keep
    /// referring to the right slots.
    #[serde(default)]
    pub curves: Vec<Option<SerializedCurve>>,

    /// Channels by name.
    #[serde(default)]
    pub channels: BTreeMap<String, SerializedChannel>,

    /// Whatever an editor wants to keep alongside the data. The automaton
    /// never looks inside it.
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}
impl Default for SerializedAutomaton {
    fn default() -> Self {
        Self {
            version: crate::app_version().to_string(),
            length: 1.0,
            resolution: 100.0,
            curves: Default::default(),
            channels: Default::default(),
            metadata: Default::default(),
        }
    }
}
