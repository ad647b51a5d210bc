// Copyright (c) 2024 Mike Tsao

//! Diagnostics attached to curves and channels.
//!
//! A component keeps a [StatusList] of everything currently wrong with it
//! (at most one entry per code), and reports the most severe entry as its
//! status. An empty list means all is well.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, IntoStaticStr};

/// The most commonly used imports.
pub mod prelude {
    pub use super::{ChannelStatusCode, CurveStatusCode, Status, StatusLevel, StatusList};
}

/// How bad a [Status] is. Ordered from least to most severe.
#[derive(
    Clone, Copy, Debug, Display, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum StatusLevel {
    #[allow(missing_docs)]
    Info,
    #[allow(missing_docs)]
    Warning,
    #[allow(missing_docs)]
    Error,
}

/// Status codes a [Curve](crate::curve::Curve) can report.
#[derive(Clone, Copy, Debug, Display, IntoStaticStr, PartialEq, Eq, Hash)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum CurveStatusCode {
    /// No channel item refers to the curve and nothing has marked it used.
    NotUsed,
    /// The last precalculation produced NaN or infinite samples.
    NanDetected,
}

/// Status codes a [Channel](crate::channel::Channel) can report.
#[derive(Clone, Copy, Debug, Display, IntoStaticStr, PartialEq, Eq, Hash)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ChannelStatusCode {
    /// Nothing has read the channel's value yet.
    NotUsed,
}

/// One diagnostic entry.
#[derive(Clone, Debug, PartialEq)]
pub struct Status<C> {
    /// What this status is about.
    pub code: C,
    /// How severe it is.
    pub level: StatusLevel,
    /// A message suitable for display.
    pub message: String,
}
impl<C> Status<C> {
    /// Creates a status.
    pub fn new_with(code: C, level: StatusLevel, message: &str) -> Self {
        Self {
            code,
            level,
            message: message.to_string(),
        }
    }
}

/// A prioritized set of [Status] entries, keyed by code.
#[derive(Clone, Debug)]
pub struct StatusList<C> {
    entries: Vec<Status<C>>,
}
impl<C> Default for StatusList<C> {
    fn default() -> Self {
        Self {
            entries: Default::default(),
        }
    }
}
impl<C: Copy + PartialEq> StatusList<C> {
    /// The most severe active status, if any.
    pub fn top(&self) -> Option<&Status<C>> {
        self.entries.first()
    }

    /// Activates a status, replacing any entry with the same code.
    pub fn set(&mut self, status: Status<C>) {
        self.entries.retain(|s| s.code != status.code);
        self.entries.push(status);
        // Stable, so equally severe entries keep their insertion order.
        self.entries.sort_by(|a, b| b.level.cmp(&a.level));
    }

    /// Deactivates a status. Deleting a code that isn't present does nothing.
    pub fn delete(&mut self, code: C) {
        self.entries.retain(|s| s.code != code);
    }

    /// Activates or deactivates a status.
    pub fn set_active(&mut self, active: bool, status: Status<C>) {
        if active {
            self.set(status);
        } else {
            self.delete(status.code);
        }
    }

    /// Whether a status with this code is active.
    pub fn contains(&self, code: C) -> bool {
        self.entries.iter().any(|s| s.code == code)
    }

    /// All active entries, most severe first.
    pub fn entries(&self) -> &[Status<C>] {
        &self.entries
    }

    /// Runs `procedure` against this list and returns true if the reported
    /// top status is different afterward. Components use this to decide
    /// whether to emit a status-change event.
    pub fn watch(&mut self, procedure: impl FnOnce(&mut Self)) -> bool {
        let before = self.top().map(|s| (s.code, s.level));
        procedure(self);
        let after = self.top().map(|s| (s.code, s.level));
        before != after
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nan() -> Status<CurveStatusCode> {
        Status::new_with(
            CurveStatusCode::NanDetected,
            StatusLevel::Error,
            "This curve has NaN value",
        )
    }

    fn not_used() -> Status<CurveStatusCode> {
        Status::new_with(
            CurveStatusCode::NotUsed,
            StatusLevel::Warning,
            "This curve has not been used yet",
        )
    }

    #[test]
    fn top_is_most_severe() {
        let mut list = StatusList::default();
        assert!(list.top().is_none());

        list.set(not_used());
        assert_eq!(list.top().unwrap().code, CurveStatusCode::NotUsed);

        list.set(nan());
        assert_eq!(list.top().unwrap().code, CurveStatusCode::NanDetected);
        assert_eq!(list.entries().len(), 2);

        list.delete(CurveStatusCode::NanDetected);
        assert_eq!(list.top().unwrap().code, CurveStatusCode::NotUsed);
    }

    #[test]
    fn one_entry_per_code() {
        let mut list = StatusList::default();
        list.set(nan());
        list.set(nan());
        assert_eq!(list.entries().len(), 1);
    }

    #[test]
    fn deleting_absent_code_is_noop() {
        let mut list = StatusList::default();
        list.set(not_used());
        assert!(!list.watch(|l| l.delete(CurveStatusCode::NanDetected)));
        assert!(list.contains(CurveStatusCode::NotUsed));
    }

    #[test]
    fn watch_reports_top_changes_only() {
        let mut list = StatusList::default();
        assert!(list.watch(|l| l.set(not_used())));
        assert!(!list.watch(|l| l.set(not_used())));
        assert!(list.watch(|l| l.set_active(true, nan())));
        assert!(
            !list.watch(|l| l.delete(CurveStatusCode::NotUsed)),
            "removing a lower-priority entry leaves the top alone"
        );
        assert!(list.watch(|l| l.set_active(false, nan())));
        assert!(list.top().is_none());
    }

    #[test]
    fn codes_have_wire_names() {
        assert_eq!(CurveStatusCode::NanDetected.to_string(), "NAN_DETECTED");
        let name: &'static str = ChannelStatusCode::NotUsed.into();
        assert_eq!(name, "NOT_USED");
    }
}
