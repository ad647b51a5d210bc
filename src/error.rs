// Copyright (c) 2024 Mike Tsao

//! The errors that curve, channel and automaton operations can report.
//!
//! Validation always happens before any state changes, so an `Err` means the
//! target was left exactly as it was.

use crate::types::{CurveUid, FxUid, ItemUid, NodeUid};
use thiserror::Error;

/// The most commonly used imports.
pub mod prelude {
    pub use super::{AutomatonError, Result};
}

/// Everything that can go wrong when editing or querying an automaton.
#[derive(Debug, Error)]
pub enum AutomatonError {
    /// The curve has no node with this uid.
    #[error("Searched for node {0} but not found")]
    NodeNotFound(NodeUid),

    /// The curve has no fx section with this uid.
    #[error("Searched for fx {0} but not found")]
    FxNotFound(FxUid),

    /// The channel has no item with this uid.
    #[error("Searched for item {0} but not found")]
    ItemNotFound(ItemUid),

    /// The automaton has no curve in this slot.
    #[error("Curve {0} not found")]
    CurveNotFound(CurveUid),

    /// The automaton has no channel with this name.
    #[error("Channel {0} not found")]
    ChannelNotFound(String),

    /// A channel with this name already exists.
    #[error("A channel named {0} already exists")]
    ChannelExists(String),

    /// The channel already has an item with this uid.
    #[error("Item {0} already exists in this channel")]
    DuplicateItem(ItemUid),

    /// An index-based lookup ran past the end of a collection.
    #[error("Given {what} index {index} is invalid (current count: {count})")]
    IndexOutOfRange {
        /// What kind of thing was being looked up.
        what: &'static str,
        /// The requested index.
        index: usize,
        /// The number of things there actually are.
        count: usize,
    },

    /// A timeline length was NaN, infinite or not positive.
    #[error("Length {0} is invalid")]
    InvalidLength(f64),

    /// A sample resolution was NaN, infinite or not positive.
    #[error("Resolution {0} is invalid")]
    InvalidResolution(f64),

    /// A number that has to be finite wasn't.
    #[error("{what} must be finite, got {value}")]
    NonFinite {
        /// What the number was for.
        what: &'static str,
        /// The offending number.
        value: f64,
    },

    /// No fx definition is registered under this kind.
    #[error("Fx definition called {0} is not defined")]
    UnknownFx(String),

    /// The fx definition has no parameter with this name.
    #[error("Fx definition {kind} has no param called {name}")]
    UnknownFxParam {
        /// The fx kind.
        kind: String,
        /// The requested parameter name.
        name: String,
    },

    /// A parameter value had the wrong type for its declaration.
    #[error("Param {name} of fx {kind} expects a {expected} value")]
    FxParamType {
        /// The fx kind.
        kind: String,
        /// The parameter name.
        name: String,
        /// The type the definition declares.
        expected: &'static str,
    },

    /// Serialized curve data can't describe a curve.
    #[error("Curve data is invalid: {0}")]
    InvalidCurve(&'static str),

    /// An fx row outside `0..FX_ROW_MAX` was requested.
    #[error("Row number {0} is invalid")]
    InvalidRow(usize),

    /// The operation only applies to the other kind of channel item.
    #[error("Item {uid} is not a {expected} item")]
    ItemKind {
        /// The item that was addressed.
        uid: ItemUid,
        /// The kind of item the operation needs.
        expected: &'static str,
    },

    /// The item has no finite end, so the operation can't anchor to it.
    #[error("Item {0} is unbounded")]
    UnboundedItem(ItemUid),

    /// Serialized data couldn't be read or written.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// The crate's result type.
pub type Result<T> = core::result::Result<T, AutomatonError>;

/// Returns `value` if it is finite, otherwise a [AutomatonError::NonFinite]
/// naming `what`.
pub(crate) fn ensure_finite(what: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(AutomatonError::NonFinite { what, value })
    }
}
