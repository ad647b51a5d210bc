// Copyright (c) 2024 Mike Tsao

//! The root aggregate that owns every curve and channel.

/// The most commonly used imports.
pub mod prelude {
    pub use super::{
        Automaton, AutomatonContext, AutomatonEvent, AutomatonEventKind, AutomatonOptions,
        AutomatonOptionsBuilder, SerializedAutomaton,
    };
}

pub use automaton::{Automaton, AutomatonEvent, AutomatonEventKind};
pub use context::AutomatonContext;
pub use options::{AutomatonOptions, AutomatonOptionsBuilder, AutomatonOptionsBuilderError};
pub use serialized::SerializedAutomaton;

#[allow(clippy::module_inception)]
mod automaton;
mod context;
mod options;
mod serialized;
