// Copyright (c) 2024 Mike Tsao

use crate::{fx::FxRegistry, types::UidFactory, util::SaveTracker};
use std::rc::Rc;

/// The services an [Automaton](super::Automaton) shares with every curve and
/// channel it owns. Cloning is cheap and every clone refers to the same
/// services.
#[derive(Clone, Debug)]
pub struct AutomatonContext {
    /// Mints uids for nodes, fx sections and items.
    pub uid_factory: Rc<UidFactory>,
    /// The shared "has unsaved changes" flag.
    pub save_tracker: SaveTracker,
    /// The effects curves can use.
    pub fx_registry: Rc<FxRegistry>,
}
impl Default for AutomatonContext {
    fn default() -> Self {
        Self::new_with(FxRegistry::with_builtins())
    }
}
impl AutomatonContext {
    /// A fresh context around the given registry.
    pub fn new_with(fx_registry: FxRegistry) -> Self {
        Self {
            uid_factory: Default::default(),
            save_tracker: Default::default(),
            fx_registry: Rc::new(fx_registry),
        }
    }
}
