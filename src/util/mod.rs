// Copyright (c) 2024 Mike Tsao

//! System utilities.

/// Commonly used imports.
pub mod prelude {
    pub use super::{Emitter, Rng, SaveTracker, SubscriptionId};
}

pub use events::{Emitter, SubscriptionId};
pub use rng::Rng;
pub use save::SaveTracker;

mod events;
mod rng;
mod save;
