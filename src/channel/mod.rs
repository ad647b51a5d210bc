// Copyright (c) 2024 Mike Tsao

//! Timelines of constant and curve items.
//!
//! A [Channel] owns a sorted, non-overlapping list of [ChannelItem]s and
//! turns a point in time into a single value.

use serde::{Deserialize, Serialize};

/// The most commonly used imports.
pub mod prelude {
    pub use super::{
        Channel, ChannelEvent, ChannelEventKind, ChannelItem, ItemSource, SerializedChannel,
        SerializedChannelItem,
    };
}

pub use channel::{Channel, ChannelEvent, ChannelEventKind};
pub use item::{ChannelItem, ItemSource, SerializedChannelItem};

#[allow(clippy::module_inception)]
mod channel;
mod item;

/// The saved form of a [Channel].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SerializedChannel {
    /// Items, sorted by time.
    #[serde(default)]
    pub items: Vec<SerializedChannelItem>,
}
