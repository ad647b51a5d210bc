// Copyright (c) 2024 Mike Tsao

//! Common data types used throughout the system.

/// The most commonly used imports.
pub mod prelude {
    pub use super::{CurveUid, FxUid, IsUid, ItemUid, NodeUid, UidFactory};
}

pub use uid::{CurveUid, FxUid, IsUid, ItemUid, NodeUid, UidFactory};

mod uid;
