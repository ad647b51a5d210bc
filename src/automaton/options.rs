// Copyright (c) 2024 Mike Tsao

use derivative::Derivative;
use derive_builder::Builder;

/// How an [Automaton](super::Automaton) starts out.
#[derive(Clone, Debug, Derivative, Builder, PartialEq)]
#[derivative(Default)]
#[builder(default, build_fn(private, name = "build_from_builder"))]
pub struct AutomatonOptions {
    /// Timeline length of a new automaton that isn't loaded from data.
    #[derivative(Default(value = "1.0"))]
    pub length: f64,

    /// Samples per unit of time of a new automaton that isn't loaded from
    /// data.
    #[derivative(Default(value = "100.0"))]
    pub resolution: f64,

    /// Whether the automaton starts out playing.
    pub is_playing: bool,

    /// Marks every channel as used as soon as it's created, so that no
    /// channel ever reports
    /// [ChannelStatusCode::NotUsed](crate::status::ChannelStatusCode::NotUsed).
    pub disable_channel_not_used_warning: bool,
}
impl AutomatonOptionsBuilder {
    /// Builds the options, rejecting a length or resolution that isn't a
    /// positive finite number.
    pub fn build(&self) -> Result<AutomatonOptions, AutomatonOptionsBuilderError> {
        let options = self.build_from_builder()?;
        for (what, value) in [
            ("length", options.length),
            ("resolution", options.resolution),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(AutomatonOptionsBuilderError::ValidationError(format!(
                    "{what} {value} must be positive and finite"
                )));
            }
        }
        Ok(options)
    }
}
