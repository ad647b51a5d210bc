// Copyright (c) 2024 Mike Tsao

//! The `render-channel` example samples one channel of a serialized
//! automaton and prints `time,value` lines. Without an input file it renders
//! a small built-in automaton instead.

use automaton::prelude::*;
use clap::Parser;

#[derive(Parser, Debug, Default)]
#[clap(author, about, long_about = None)]
struct Args {
    /// A JSON-format automaton.
    input: Option<String>,

    /// Name of the channel to render
    #[clap(short = 'c', long, default_value = "demo")]
    channel: String,

    /// Number of samples across the timeline
    #[clap(short = 's', long, default_value_t = 32)]
    steps: usize,

    /// Print version and exit
    #[clap(short = 'v', long, value_parser)]
    version: bool,
}

/// A channel that holds 0.25, then plays a wobbly ramp twice.
fn built_in() -> anyhow::Result<Automaton> {
    let options = AutomatonOptionsBuilder::default().length(4.0).build()?;
    let mut automaton = Automaton::new(options)?;

    let ramp = automaton.create_curve(None)?;
    {
        let curve = automaton.curve_mut(ramp)?;
        curve.change_length(1.0)?;
        let last = curve.node_by_index(1)?.uid;
        curve.move_node_value(last, 1.0)?;
        if let Some(fx) = curve.create_fx(0.0, 1.0, "sine")? {
            curve.change_fx_param(fx.uid, "amp", 0.05)?;
        }
    }

    automaton.create_channel("demo", None)?;
    let (channel, curves) = automaton.channel_with_curves_mut("demo")?;
    let hold = channel.create_item_constant(0.0, curves)?;
    channel.change_item_value(hold.uid, 0.25, curves)?;
    let item = channel.create_item_curve(ramp, 1.0, curves)?;
    channel.resize_item(item.uid, 2.0, false, curves)?;
    channel.change_item_reset(item.uid, true, curves)?;
    Ok(automaton)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();
    if args.version {
        println!("{}", automaton::app_version());
        return Ok(());
    }

    let mut automaton = match args.input {
        Some(filename) => {
            let json = std::fs::read_to_string(&filename)?;
            let automaton = Automaton::from_json(&json, AutomatonOptions::default())?;
            eprintln!(
                "Successfully read {} channels from {filename}",
                automaton.count_channels()
            );
            automaton
        }
        None => built_in()?,
    };

    automaton.channel(&args.channel)?;
    let steps = args.steps.max(1);
    for i in 0..=steps {
        let time = automaton.length() * i as f64 / steps as f64;
        automaton.update(time);
        println!("{time:.4},{:.6}", automaton.auto(&args.channel));
    }

    let channel = automaton.channel(&args.channel)?;
    if let Some(status) = channel.status() {
        eprintln!("{}: {}", status.code, status.message);
    }
    Ok(())
}
