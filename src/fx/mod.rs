// Copyright (c) 2024 Mike Tsao

//! Effects ("fx") transform a window of a curve's precalculated samples.
//!
//! An [FxDefinition] describes one kind of effect: a display name, a
//! parameter schema, and the [FxProcessor] that does the work. Definitions
//! live in an [FxRegistry] keyed by kind. A curve places effects on its
//! timeline as [FxSection](crate::curve::FxSection)s that refer to a kind and
//! carry their own [FxParams].

/// The most commonly used imports.
pub mod prelude {
    pub use super::{
        FxContext, FxDefinition, FxDefinitionBuilder, FxParam, FxParamBuilder, FxParamValue,
        FxParams, FxProcessor, FxRegistry,
    };
}

pub use definition::{
    FxContext, FxDefinition, FxDefinitionBuilder, FxDefinitionBuilderError, FxParam,
    FxParamBuilder, FxParamBuilderError, FxParamValue, FxParams, FxProcessor,
};
pub use registry::FxRegistry;

mod builtins;
mod definition;
mod registry;
