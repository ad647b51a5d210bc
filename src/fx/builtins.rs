// Copyright (c) 2024 Mike Tsao

//! The effects every automaton starts with.

use super::{
    FxContext, FxDefinition, FxDefinitionBuilder, FxDefinitionBuilderError, FxParam, FxRegistry,
};
use crate::util::Rng;
use core::f64::consts::TAU;

pub(super) fn register_builtins(registry: &mut FxRegistry) {
    type Make = fn() -> Result<FxDefinition, FxDefinitionBuilderError>;
    let builtins: [(&str, Make); 9] = [
        ("add", add),
        ("cds", cds),
        ("clamp", clamp),
        ("exp", exp),
        ("lofi", lofi),
        ("noise", noise),
        ("pow", pow),
        ("repeat", repeat),
        ("sine", sine),
    ];
    for (kind, make) in builtins {
        match make() {
            Ok(definition) => {
                registry.register(kind, definition);
            }
            Err(e) => log::error!("built-in fx {kind} is malformed: {e}"),
        }
    }
}

fn bounded(default: f64, min: Option<f64>, max: Option<f64>) -> FxParam {
    FxParam {
        min,
        max,
        ..FxParam::float(default)
    }
}

fn named(name: &str, param: FxParam) -> FxParam {
    FxParam {
        name: Some(name.to_string()),
        ..param
    }
}

fn add() -> Result<FxDefinition, FxDefinitionBuilderError> {
    FxDefinitionBuilder::default()
        .name("Add")
        .description("The simplest fx ever. Just add a constant value to the curve.")
        .param("value", named("Value", FxParam::float(0.0)))
        .processor(|c: &FxContext<'_>, w: &mut [f64]| {
            let value = c.float("value");
            w.iter_mut().for_each(|v| *v += value);
        })
        .build()
}

fn clamp() -> Result<FxDefinition, FxDefinitionBuilderError> {
    FxDefinitionBuilder::default()
        .name("Clamp")
        .description("Constrain the curve between two values.")
        .param("min", named("Min", FxParam::float(0.0)))
        .param("max", named("Max", FxParam::float(1.0)))
        .processor(|c: &FxContext<'_>, w: &mut [f64]| {
            let (min, max) = (c.float("min"), c.float("max"));
            // f64::clamp panics when min > max; the params are free.
            w.iter_mut().for_each(|v| *v = v.max(min).min(max));
        })
        .build()
}

fn sine() -> Result<FxDefinition, FxDefinitionBuilderError> {
    FxDefinitionBuilder::default()
        .name("Sinewave")
        .description("Overlay a sinewave to the curve.")
        .param("amp", named("Amp", FxParam::float(0.1)))
        .param("freq", named("Frequency", FxParam::float(5.0)))
        .param(
            "offset",
            named("Offset", bounded(0.0, Some(0.0), Some(1.0))),
        )
        .processor(|c: &FxContext<'_>, w: &mut [f64]| {
            let (amp, freq, offset) = (c.float("amp"), c.float("freq"), c.float("offset"));
            for (i, v) in w.iter_mut().enumerate() {
                *v += amp * (TAU * (freq * c.elapsed_at(i) + offset)).sin();
            }
        })
        .build()
}

fn pow() -> Result<FxDefinition, FxDefinitionBuilderError> {
    FxDefinitionBuilder::default()
        .name("Power")
        .description("You got boost power!")
        .param("pow", named("Power", FxParam::float(2.0)))
        .param("bias", named("Bias", FxParam::float(0.0)))
        .param("positive", named("Force Positive", FxParam::boolean(false)))
        .processor(|c: &FxContext<'_>, w: &mut [f64]| {
            let (power, bias) = (c.float("pow"), c.float("bias"));
            let positive = c.boolean("positive");
            for v in w.iter_mut() {
                let d = *v - bias;
                let p = d.abs().powf(power);
                *v = if positive || d >= 0.0 { p } else { -p } + bias;
            }
        })
        .build()
}

fn lofi() -> Result<FxDefinition, FxDefinitionBuilderError> {
    FxDefinitionBuilder::default()
        .name("Lo-Fi")
        .description("Make curve more crunchy.")
        .param(
            "freq",
            named("Frequency", bounded(10.0, Some(0.0), Some(1000.0))),
        )
        .param("relative", named("Relative", FxParam::boolean(false)))
        .processor(|c: &FxContext<'_>, w: &mut [f64]| {
            let freq = c.float("freq");
            if freq <= 0.0 {
                return;
            }
            let origin = if c.boolean("relative") { c.t0 } else { 0.0 };
            for (i, v) in w.iter_mut().enumerate() {
                let t = c.time_at(i) - origin;
                let held = (t * freq).floor() / freq + origin;
                *v = c.source_at_time(held.max(c.t0));
            }
        })
        .build()
}

fn exp() -> Result<FxDefinition, FxDefinitionBuilderError> {
    FxDefinitionBuilder::default()
        .name("Exponential Smoothing")
        .description("Smooth the curve. Simple but good.")
        .param(
            "factor",
            named("Factor", bounded(10.0, Some(0.0), None)),
        )
        .processor(|c: &FxContext<'_>, w: &mut [f64]| {
            let Some(&first) = w.first() else {
                return;
            };
            let k = 1.0 - (-c.float("factor") * c.delta_time).exp();
            let mut state = first;
            for v in w.iter_mut() {
                state += (*v - state) * k;
                *v = state;
            }
        })
        .build()
}

fn cds() -> Result<FxDefinition, FxDefinitionBuilderError> {
    FxDefinitionBuilder::default()
        .name("Critically Damped Spring")
        .description("Basically the best smoothing method. Shoutouts to Keijiro Takahashi")
        .param(
            "factor",
            named("Factor", bounded(100.0, Some(0.0), None)),
        )
        .param("ratio", named("Damp Ratio", FxParam::float(1.0)))
        .processor(|c: &FxContext<'_>, w: &mut [f64]| {
            let Some(&first) = w.first() else {
                return;
            };
            let (k, ratio) = (c.float("factor"), c.float("ratio"));
            // Explicit integration blows up once dt * sqrt(k) nears 1.
            let substeps = (c.delta_time * k.sqrt() / 0.1).ceil().clamp(1.0, 1000.0);
            let dt = c.delta_time / substeps;
            let mut position = first;
            let mut velocity = 0.0;
            for v in w.iter_mut() {
                for _ in 0..substeps as usize {
                    velocity +=
                        (-k * (position - *v) - 2.0 * velocity * k.sqrt() * ratio) * dt;
                    position += velocity * dt;
                }
                *v = position;
            }
        })
        .build()
}

fn repeat() -> Result<FxDefinition, FxDefinitionBuilderError> {
    FxDefinitionBuilder::default()
        .name("Repeat")
        .description("Repeat a section of the curve previous from the fx.")
        .param(
            "interval",
            named("Interval", bounded(1.0, Some(0.0), None)),
        )
        .processor(|c: &FxContext<'_>, w: &mut [f64]| {
            let interval = c.float("interval");
            if interval <= 0.0 {
                return;
            }
            for (i, v) in w.iter_mut().enumerate() {
                let elapsed = c.elapsed_at(i).max(0.0);
                *v = c.source_at_time(c.t0 - interval + elapsed % interval);
            }
        })
        .build()
}

fn noise() -> Result<FxDefinition, FxDefinitionBuilderError> {
    FxDefinitionBuilder::default()
        .name("Fractal Noise")
        .description("wiggle()")
        .param(
            "recursion",
            named("Recursion", bounded(4.0, Some(1.0), Some(99.0))),
        )
        .param("freq", named("Frequency", bounded(1.0, Some(0.0), None)))
        .param(
            "reso",
            named("Reso", bounded(8.0, Some(1.0), Some(99.0))),
        )
        .param("amp", named("Amp", FxParam::float(0.2)))
        .param("seed", named("Seed", FxParam::float(1.0)))
        .processor(|c: &FxContext<'_>, w: &mut [f64]| {
            let octaves = c.float("recursion").round() as u32;
            let reso = c.float("reso").round().max(1.0) as i64;
            let freq = c.float("freq");
            let amp = c.float("amp");
            let seed = c.float("seed").round() as i64;
            for (i, v) in w.iter_mut().enumerate() {
                *v += amp * fractal_noise(c.elapsed_at(i) * freq, octaves, reso, seed);
            }
        })
        .build()
}

/// Deterministic bipolar noise at one integer lattice point.
fn lattice(seed: i64, octave: u32, x: i64) -> f64 {
    let key = ((seed as u128) << 64) ^ ((octave as u128) << 48) ^ (x as u64 as u128);
    Rng::new_with_seed(key).rand_bipolar()
}

/// Sums `octaves` layers of smoothed value noise over a lattice that repeats
/// every `reso` points.
fn fractal_noise(x: f64, octaves: u32, reso: i64, seed: i64) -> f64 {
    let mut sum = 0.0;
    let mut amp = 0.5;
    let mut scale = 1.0;
    for octave in 0..octaves {
        let p = x * scale;
        let i = p.floor();
        let f = p - i;
        let period = reso * (1 << octave.min(16));
        let i0 = (i as i64).rem_euclid(period);
        let i1 = (i0 + 1) % period;
        let a = lattice(seed, octave, i0);
        let b = lattice(seed, octave, i1);
        let s = f * f * (3.0 - 2.0 * f);
        sum += amp * (a + (b - a) * s);
        amp *= 0.5;
        scale *= 2.0;
    }
    sum
}
