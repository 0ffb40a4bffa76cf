//! CLI Module
//!
//! Command-line interface for running the engine against simulated devices
//! and inspecting the built-in presets.

pub mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::engine::RepeatMode;
use crate::fx::{ListeningMode, OutputType};

/// Mixdeck - media playback and mixing engine
#[derive(Parser, Debug)]
#[command(name = "mixdeck")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Play a scripted session on simulated output devices
    #[command(name = "simulate")]
    Simulate(SimulateArgs),

    /// List listening modes and their effect settings
    #[command(name = "modes")]
    Modes {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the built-in output profiles
    #[command(name = "profiles")]
    Profiles {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the listening mode suggested for a context
    #[command(name = "suggest")]
    Suggest {
        /// Active output
        #[arg(short, long, default_value = "speaker", value_parser = parse_output)]
        output: OutputType,

        /// Hour of day (0-23); defaults to the local time
        #[arg(long)]
        hour: Option<u32>,

        /// Listening in a car
        #[arg(long)]
        car: bool,
    },
}

#[derive(clap::Args, Debug)]
pub struct SimulateArgs {
    /// Locators to queue; a demo playlist is used when empty
    pub items: Vec<String>,

    /// Engine configuration file (JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Simulated seconds to run
    #[arg(short, long, default_value_t = 30)]
    pub seconds: u64,

    /// Length of every simulated item in seconds
    #[arg(long, default_value_t = 12)]
    pub item_seconds: u64,

    #[arg(short, long, value_enum, default_value_t = RepeatArg::Off)]
    pub repeat: RepeatArg,

    #[arg(long)]
    pub shuffle: bool,

    /// Listening mode to apply before playback
    #[arg(short, long, value_parser = parse_mode)]
    pub mode: Option<ListeningMode>,

    /// Switch to this output halfway through
    #[arg(long, value_parser = parse_output)]
    pub switch_output: Option<OutputType>,

    /// Loop region as START_MS:END_MS
    #[arg(long = "loop", value_parser = parse_region)]
    pub loop_region: Option<(u64, u64)>,

    /// Add a fade-in automation over the first N milliseconds
    #[arg(long)]
    pub fade_in_ms: Option<u64>,

    /// Background layers to mix in
    #[arg(long, default_value_t = 0)]
    pub layers: usize,

    /// Print the final state as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RepeatArg {
    Off,
    One,
    All,
}

impl From<RepeatArg> for RepeatMode {
    fn from(arg: RepeatArg) -> Self {
        match arg {
            RepeatArg::Off => RepeatMode::Off,
            RepeatArg::One => RepeatMode::One,
            RepeatArg::All => RepeatMode::All,
        }
    }
}

fn parse_mode(s: &str) -> Result<ListeningMode, String> {
    ListeningMode::ALL
        .into_iter()
        .find(|m| m.key().eq_ignore_ascii_case(s))
        .ok_or_else(|| format!("unknown listening mode '{}'", s))
}

fn parse_output(s: &str) -> Result<OutputType, String> {
    OutputType::ALL
        .into_iter()
        .find(|t| t.key().eq_ignore_ascii_case(s))
        .ok_or_else(|| format!("unknown output type '{}'", s))
}

fn parse_region(s: &str) -> Result<(u64, u64), String> {
    let (start, end) = s
        .split_once(':')
        .ok_or_else(|| "expected START_MS:END_MS".to_string())?;
    let start = start.trim().parse::<u64>().map_err(|e| e.to_string())?;
    let end = end.trim().parse::<u64>().map_err(|e| e.to_string())?;
    Ok((start, end))
}
