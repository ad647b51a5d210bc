// Copyright (c) 2024 Mike Tsao

//! Behaviors shared by curves and channels.

use crate::status::{Status, StatusList};

/// The most commonly used imports.
pub mod prelude {
    pub use super::{HasStatus, Serializable};
}

/// Something that can produce a plain-data snapshot of itself. The snapshot
/// carries no uids or caches; those are rebuilt when the snapshot is loaded.
pub trait Serializable {
    /// The plain-data form.
    type Serialized;

    /// Returns a snapshot of the current state.
    fn serialize(&self) -> Self::Serialized;
}

/// Something that keeps a [StatusList] of diagnostics.
pub trait HasStatus {
    /// The codes this thing can report.
    type Code: Copy + PartialEq;

    /// All active diagnostics.
    fn status_list(&self) -> &StatusList<Self::Code>;

    /// The most severe active diagnostic, if any.
    fn status(&self) -> Option<&Status<Self::Code>> {
        self.status_list().top()
    }

    /// Records that something reads this thing's output. Calling it again
    /// changes nothing.
    fn mark_as_used(&mut self);
}
