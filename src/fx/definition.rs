// Copyright (c) 2024 Mike Tsao

use core::fmt::Debug;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, rc::Rc};

/// The value of one fx parameter.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FxParamValue {
    /// An on/off switch.
    Bool(bool),
    /// A number.
    Float(f64),
}
impl Default for FxParamValue {
    fn default() -> Self {
        Self::Float(0.0)
    }
}
impl From<f64> for FxParamValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}
impl From<bool> for FxParamValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}
impl FxParamValue {
    /// The number, if this is one.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Bool(_) => None,
        }
    }

    /// The switch state, if this is a switch.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            Self::Float(_) => None,
        }
    }

    pub(crate) fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "boolean",
            Self::Float(_) => "float",
        }
    }

    pub(crate) fn is_same_type(&self, other: &Self) -> bool {
        core::mem::discriminant(self) == core::mem::discriminant(other)
    }
}

/// The parameter values of one fx section, by parameter name.
pub type FxParams = BTreeMap<String, FxParamValue>;

/// Declares one parameter of an [FxDefinition]. The type of the parameter is
/// the type of its default.
#[derive(Clone, Debug, Builder, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[builder(build_fn(private, name = "build_from_builder"))]
pub struct FxParam {
    /// Display name.
    #[builder(default, setter(into, strip_option))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// What the parameter does.
    #[builder(default, setter(into, strip_option))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The value a new section starts with.
    #[builder(setter(into))]
    #[serde(rename = "default")]
    pub default_value: FxParamValue,
    /// Lower bound for numeric values.
    #[builder(default, setter(strip_option))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Upper bound for numeric values.
    #[builder(default, setter(strip_option))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}
impl FxParamBuilder {
    /// Builds the [FxParam], rejecting a numeric default outside its own
    /// bounds.
    pub fn build(&self) -> Result<FxParam, FxParamBuilderError> {
        let param = self.build_from_builder()?;
        if let Some(default) = param.default_value.as_float() {
            if param.min.is_some_and(|min| default < min)
                || param.max.is_some_and(|max| default > max)
            {
                return Err(FxParamBuilderError::ValidationError(format!(
                    "default {default} is outside min/max"
                )));
            }
        }
        Ok(param)
    }
}
impl FxParam {
    /// A numeric parameter without bounds.
    pub fn float(default: f64) -> Self {
        Self {
            name: None,
            description: None,
            default_value: FxParamValue::Float(default),
            min: None,
            max: None,
        }
    }

    /// A switch.
    pub fn boolean(default: bool) -> Self {
        Self {
            default_value: FxParamValue::Bool(default),
            ..Self::float(0.0)
        }
    }

    /// Clamps a numeric value into `min..=max`. Switches pass through.
    pub fn clamp(&self, value: FxParamValue) -> FxParamValue {
        match value {
            FxParamValue::Float(mut v) => {
                if let Some(min) = self.min {
                    v = v.max(min);
                }
                if let Some(max) = self.max {
                    v = v.min(max);
                }
                FxParamValue::Float(v)
            }
            FxParamValue::Bool(_) => value,
        }
    }
}

/// Everything an [FxProcessor] gets to know about the section it is
/// processing.
///
/// The window covers sample indices `i0..=i1` of the curve's table. `source`
/// is the whole table as it stood before this section ran, so an effect can
/// look at samples outside its own window.
#[derive(Debug)]
pub struct FxContext<'a> {
    /// First sample index of the window.
    pub i0: usize,
    /// Last sample index of the window (inclusive).
    pub i1: usize,
    /// Start time of the section.
    pub t0: f64,
    /// End time of the section. Can lie past the end of the curve.
    pub t1: f64,
    /// Length of the section.
    pub length: f64,
    /// Samples per unit of time.
    pub resolution: f64,
    /// Time between two samples.
    pub delta_time: f64,
    /// The section's parameter values.
    pub params: &'a FxParams,
    /// The curve's samples before this section was applied.
    pub source: &'a [f64],
}
impl<'a> FxContext<'a> {
    /// Time of the given window position.
    pub fn time_at(&self, window_index: usize) -> f64 {
        (self.i0 + window_index) as f64 / self.resolution
    }

    /// Time since the start of the section at the given window position.
    pub fn elapsed_at(&self, window_index: usize) -> f64 {
        self.time_at(window_index) - self.t0
    }

    /// `0.0..=1.0` progress through the section at the given window position.
    pub fn progress_at(&self, window_index: usize) -> f64 {
        if self.length > 0.0 {
            self.elapsed_at(window_index) / self.length
        } else {
            1.0
        }
    }

    /// A numeric parameter, or 0.0 if it's missing or not numeric.
    pub fn float(&self, name: &str) -> f64 {
        self.params
            .get(name)
            .and_then(FxParamValue::as_float)
            .unwrap_or_default()
    }

    /// A switch parameter, or false if it's missing or not a switch.
    pub fn boolean(&self, name: &str) -> bool {
        self.params
            .get(name)
            .and_then(FxParamValue::as_bool)
            .unwrap_or_default()
    }

    /// Reads the source table at an arbitrary time, interpolating linearly
    /// and clamping to the table's ends.
    pub fn source_at_time(&self, time: f64) -> f64 {
        let Some(last) = self.source.len().checked_sub(1) else {
            return 0.0;
        };
        let index = (time * self.resolution).clamp(0.0, last as f64);
        let i = index.floor() as usize;
        let frac = index - i as f64;
        let v0 = self.source[i];
        let v1 = self.source[(i + 1).min(last)];
        v0 + (v1 - v0) * frac
    }
}

/// The work half of an effect. Implementations must be deterministic: a
/// curve precalculates whenever it changes, and the same inputs have to give
/// the same table.
pub trait FxProcessor {
    /// Transforms `window` (a copy of `context.source[i0..=i1]`) in place.
    fn process(&self, context: &FxContext<'_>, window: &mut [f64]);
}
impl<F> FxProcessor for F
where
    F: Fn(&FxContext<'_>, &mut [f64]),
{
    fn process(&self, context: &FxContext<'_>, window: &mut [f64]) {
        self(context, window)
    }
}

/// Describes one kind of effect.
#[derive(Builder, Clone)]
#[builder(build_fn(private, name = "build_from_builder"))]
pub struct FxDefinition {
    /// Display name.
    #[builder(setter(into))]
    pub name: String,
    /// What the effect does.
    #[builder(default, setter(into))]
    pub description: String,
    /// Parameter schema, by parameter name.
    #[builder(default, setter(custom))]
    pub params: BTreeMap<String, FxParam>,
    #[builder(setter(custom))]
    processor: Rc<dyn FxProcessor>,
}
impl Debug for FxDefinition {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FxDefinition")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}
impl FxDefinitionBuilder {
    /// Adds a parameter.
    pub fn param(&mut self, name: &str, param: FxParam) -> &mut Self {
        self.params
            .get_or_insert_with(Default::default)
            .insert(name.to_string(), param);
        self
    }

    /// Sets the function that does the work.
    pub fn processor(&mut self, processor: impl FxProcessor + 'static) -> &mut Self {
        self.processor = Some(Rc::new(processor));
        self
    }

    /// Builds the [FxDefinition], rejecting parameters whose defaults fall
    /// outside their own bounds.
    pub fn build(&self) -> Result<FxDefinition, FxDefinitionBuilderError> {
        let definition = self.build_from_builder()?;
        for (name, param) in definition.params.iter() {
            if param.clamp(param.default_value) != param.default_value {
                return Err(FxDefinitionBuilderError::ValidationError(format!(
                    "default of param {name} is outside its min/max"
                )));
            }
        }
        Ok(definition)
    }
}
impl FxDefinition {
    /// Runs the effect.
    pub fn process(&self, context: &FxContext<'_>, window: &mut [f64]) {
        self.processor.process(context, window);
    }

    /// A fresh parameter set filled with every default.
    pub fn default_params(&self) -> FxParams {
        self.params
            .iter()
            .map(|(name, param)| (name.clone(), param.default_value))
            .collect()
    }
}
