// Copyright (c) 2024 Mike Tsao

use crate::types::NodeUid;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

/// How far, in time, a freshly created handle reaches from its node.
pub const CURVE_DEFAULT_HANDLE_LENGTH: f64 = 0.5;

/// A bezier control handle, relative to the node that owns it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BezierHandle {
    #[allow(missing_docs)]
    pub time: f64,
    #[allow(missing_docs)]
    pub value: f64,
}
impl BezierHandle {
    /// A flat handle of the default length on the given side.
    pub fn default_for(dir: HandleDir) -> Self {
        Self {
            time: match dir {
                HandleDir::In => -CURVE_DEFAULT_HANDLE_LENGTH,
                HandleDir::Out => CURVE_DEFAULT_HANDLE_LENGTH,
            },
            value: 0.0,
        }
    }

    /// A handle that is exactly zero has no effect on the curve.
    pub fn is_zero(&self) -> bool {
        self.time == 0.0 && self.value == 0.0
    }
}

/// Which of a node's two handles.
#[derive(Clone, Copy, Debug, Display, EnumIter, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum HandleDir {
    /// The handle that shapes the segment arriving at the node. Its time is
    /// never positive.
    In,
    /// The handle that shapes the segment leaving the node. Its time is never
    /// negative.
    Out,
}
impl HandleDir {
    /// Forces a handle time onto this side of the node.
    pub fn clamp_time(&self, time: f64) -> f64 {
        match self {
            HandleDir::In => time.min(0.0),
            HandleDir::Out => time.max(0.0),
        }
    }
}

/// One control point of a curve.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BezierNode {
    /// Assigned when the node joins a curve. It is not saved.
    #[serde(skip)]
    pub uid: NodeUid,
    #[allow(missing_docs)]
    pub time: f64,
    #[allow(missing_docs)]
    pub value: f64,
    /// The incoming handle. `None` behaves like a zero handle.
    #[serde(rename = "in", default, skip_serializing_if = "Option::is_none")]
    pub in_handle: Option<BezierHandle>,
    /// The outgoing handle. `None` behaves like a zero handle.
    #[serde(rename = "out", default, skip_serializing_if = "Option::is_none")]
    pub out_handle: Option<BezierHandle>,
}
impl BezierNode {
    /// A node with both default handles.
    pub fn new_with(uid: NodeUid, time: f64, value: f64) -> Self {
        Self {
            uid,
            time,
            value,
            in_handle: Some(BezierHandle::default_for(HandleDir::In)),
            out_handle: Some(BezierHandle::default_for(HandleDir::Out)),
        }
    }

    /// The handle on the given side.
    pub fn handle(&self, dir: HandleDir) -> Option<&BezierHandle> {
        match dir {
            HandleDir::In => self.in_handle.as_ref(),
            HandleDir::Out => self.out_handle.as_ref(),
        }
    }

    /// Mutable access to the handle slot on the given side.
    pub fn handle_mut(&mut self, dir: HandleDir) -> &mut Option<BezierHandle> {
        match dir {
            HandleDir::In => &mut self.in_handle,
            HandleDir::Out => &mut self.out_handle,
        }
    }

    /// The handle on the given side, treating a missing one as zero.
    pub(crate) fn handle_or_zero(&self, dir: HandleDir) -> BezierHandle {
        self.handle(dir).copied().unwrap_or_default()
    }
}
