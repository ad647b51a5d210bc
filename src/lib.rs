// Copyright (c) 2024 Mike Tsao

#![deny(missing_docs, unused_imports, unused_variables)]
#![allow(rustdoc::private_intra_doc_links)]

//! Automaton evaluates animation channels over time.
//!
//! A [Channel] is a timeline of non-overlapping [ChannelItem]s. Each item
//! either holds a constant value or plays back a window of a [Curve] with its
//! own speed, offset and amplitude. A [Curve] is a chain of bezier nodes with
//! effect ("fx") sections stacked on top of it in rows, precalculated into a
//! lookup table whenever it changes.
//!
//! The [Automaton] owns every curve and channel, the fx registry and the
//! global timeline length and resolution. Drive it by calling
//! [Automaton::update()] with the current time, then read each channel's
//! [Channel::current_value()], or call [Automaton::auto()] with a channel name.
//!
//! Every component publishes change notifications through an observer
//! interface ([util::Emitter]), and curves and channels carry diagnostics
//! ([status::StatusList]) that report things like unused curves or NaN
//! samples.

/// A collection of imports that are useful to users of this crate. `use
/// automaton::prelude::*;` for easier onboarding.
pub mod prelude {
    pub use super::{
        automaton::prelude::*, channel::prelude::*, curve::prelude::*, error::prelude::*,
        fx::prelude::*, status::prelude::*, traits::prelude::*, types::prelude::*,
        util::prelude::*,
    };
}

// Fundamental structures that are important enough to re-export at top level.
pub use version::app_version;
pub use {
    automaton::Automaton,
    channel::{Channel, ChannelItem},
    curve::Curve,
    error::{AutomatonError, Result},
};

pub mod automaton;
pub mod channel;
pub mod curve;
pub mod error;
pub mod fx;
pub mod status;
pub mod traits;
pub mod types;
pub mod util;

mod version;
