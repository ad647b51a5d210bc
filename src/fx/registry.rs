// Copyright (c) 2024 Mike Tsao

use super::{FxDefinition, FxParam, FxParamValue, FxParams};
use crate::error::{AutomatonError, Result};
use std::collections::BTreeMap;

/// All the [FxDefinition]s an automaton knows about, keyed by kind.
///
/// The registry is configuration: it is assembled before the automaton is
/// created and is read-only afterward.
#[derive(Debug, Default)]
pub struct FxRegistry {
    definitions: BTreeMap<String, FxDefinition>,
}
impl FxRegistry {
    /// A registry holding the built-in effects.
    pub fn with_builtins() -> Self {
        let mut r = Self::default();
        super::builtins::register_builtins(&mut r);
        r
    }

    /// Adds a definition, replacing any previous definition of the same kind.
    pub fn register(&mut self, kind: &str, definition: FxDefinition) -> &mut Self {
        self.definitions.insert(kind.to_string(), definition);
        self
    }

    /// The definition of `kind`, if registered.
    pub fn get(&self, kind: &str) -> Option<&FxDefinition> {
        self.definitions.get(kind)
    }

    /// The definition of `kind`, or [AutomatonError::UnknownFx].
    pub fn definition(&self, kind: &str) -> Result<&FxDefinition> {
        self.get(kind)
            .ok_or_else(|| AutomatonError::UnknownFx(kind.to_string()))
    }

    /// Every registered kind, sorted.
    pub fn ids(&self) -> Vec<&str> {
        self.definitions.keys().map(String::as_str).collect()
    }

    /// The display name of `kind`, falling back to the kind itself.
    pub fn name<'a>(&'a self, kind: &'a str) -> Option<&'a str> {
        self.get(kind).map(|d| {
            if d.name.is_empty() {
                kind
            } else {
                d.name.as_str()
            }
        })
    }

    /// The description of `kind`.
    pub fn description(&self, kind: &str) -> Option<&str> {
        self.get(kind).map(|d| d.description.as_str())
    }

    /// The parameter schema of `kind`.
    pub fn params(&self, kind: &str) -> Option<&BTreeMap<String, FxParam>> {
        self.get(kind).map(|d| &d.params)
    }

    /// A parameter set holding every default of `kind`.
    pub fn generate_default_params(&self, kind: &str) -> Result<FxParams> {
        Ok(self.definition(kind)?.default_params())
    }

    /// Checks a parameter value against the schema of `kind` and returns it
    /// clamped to the declared bounds.
    pub fn validate_param(&self, kind: &str, name: &str, value: FxParamValue) -> Result<FxParamValue> {
        let param = self
            .definition(kind)?
            .params
            .get(name)
            .ok_or_else(|| AutomatonError::UnknownFxParam {
                kind: kind.to_string(),
                name: name.to_string(),
            })?;
        if !param.default_value.is_same_type(&value) {
            return Err(AutomatonError::FxParamType {
                kind: kind.to_string(),
                name: name.to_string(),
                expected: param.default_value.type_name(),
            });
        }
        Ok(param.clamp(value))
    }

    /// The number of registered kinds.
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
