// Copyright (c) 2024 Mike Tsao

//! Unique identifiers for the things that live on a timeline, and the factory
//! that helps ensure they are in fact unique.

use core::hash::Hash;
use core::sync::atomic::{AtomicUsize, Ordering};
use serde::{Deserialize, Serialize};
use synonym::Synonym;

/// Identifies a [BezierNode](crate::curve::BezierNode) within its curve.
#[derive(Synonym, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NodeUid(pub usize);
impl IsUid for NodeUid {
    fn as_usize(&self) -> usize {
        self.0
    }
}

/// Identifies an [FxSection](crate::curve::FxSection) within its curve.
#[derive(Synonym, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FxUid(pub usize);
impl IsUid for FxUid {
    fn as_usize(&self) -> usize {
        self.0
    }
}

/// Identifies a [ChannelItem](crate::channel::ChannelItem) within its
/// channel.
#[derive(Synonym, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ItemUid(pub usize);
impl IsUid for ItemUid {
    fn as_usize(&self) -> usize {
        self.0
    }
}

/// Identifies a [Curve](crate::curve::Curve) owned by an
/// [Automaton](crate::automaton::Automaton). It is the curve's slot in the
/// automaton's curve arena, and it stays valid when other curves are removed.
#[derive(Synonym, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurveUid(pub usize);
impl IsUid for CurveUid {
    fn as_usize(&self) -> usize {
        self.0
    }
}

/// An optional Uid trait.
pub trait IsUid: Eq + Hash + Clone + From<usize> {
    /// Returns the raw uid.
    fn as_usize(&self) -> usize;
}

/// Generates unique uids. One factory is shared by every curve and channel of
/// an automaton, so uids of different kinds never collide either.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UidFactory {
    pub(crate) next_uid_value: AtomicUsize,
}
impl Default for UidFactory {
    fn default() -> Self {
        Self::new(1)
    }
}
impl UidFactory {
    /// Creates a new [UidFactory] starting with the given value.
    pub fn new(first_uid: usize) -> Self {
        Self {
            next_uid_value: AtomicUsize::new(first_uid),
        }
    }

    /// Generates the next unique uid.
    pub fn mint_next<U: IsUid>(&self) -> U {
        let uid_value = self.next_uid_value.fetch_add(1, Ordering::Relaxed);
        U::from(uid_value)
    }

    /// Notifies the factory that a uid exists that might have been created
    /// elsewhere (for example, an item being restored by an undo operation).
    /// This gives the factory an opportunity to adjust `next_uid_value` to
    /// stay consistent with all known uids.
    pub fn notify_externally_minted_uid<U: IsUid>(&self, uid: &U) {
        self.next_uid_value
            .fetch_max(uid.as_usize() + 1, Ordering::Relaxed);
    }
}
impl PartialEq for UidFactory {
    fn eq(&self, other: &Self) -> bool {
        self.next_uid_value.load(Ordering::Relaxed) == other.next_uid_value.load(Ordering::Relaxed)
    }
}
