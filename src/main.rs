//! tempoline CLI: convert a MIDI file or DAWproject into a timed JSON
//! event list.
//!
//! Usage:
//!   tempoline song.mid
//!   tempoline project.dawproject --target-duration 93.5 -o out.json

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tl_engine::RescaleOutcome;
use tl_master::{Converter, DecodeConfig, TempoSource, TieBreak};

#[derive(Parser)]
#[command(name = "tempoline", about = "Tempo-aware MIDI / DAWproject timeline converter")]
struct Args {
    /// Input .mid/.midi, .dawproject or project.xml
    input: PathBuf,

    /// Output JSON path (defaults to the input path with a .json extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Rescale all times so the last Note Off lands at this many seconds
    #[arg(long)]
    target_duration: Option<f64>,

    /// Order of Note On / Note Off at the same position
    #[arg(long, value_enum)]
    tie_break: Option<TieBreakArg>,

    /// Which tracks contribute Set Tempo events
    #[arg(long, value_enum)]
    tempo_source: Option<TempoSourceArg>,

    /// BPM difference below which a tempo segment counts as constant
    #[arg(long)]
    epsilon: Option<f64>,
}

#[derive(Clone, Copy, ValueEnum)]
enum TieBreakArg {
    NoteOffFirst,
    NoteOnFirst,
    Preserve,
}

impl From<TieBreakArg> for TieBreak {
    fn from(arg: TieBreakArg) -> Self {
        match arg {
            TieBreakArg::NoteOffFirst => TieBreak::NoteOffFirst,
            TieBreakArg::NoteOnFirst => TieBreak::NoteOnFirst,
            TieBreakArg::Preserve => TieBreak::Preserve,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum TempoSourceArg {
    AllTracks,
    FirstTrack,
}

impl From<TempoSourceArg> for TempoSource {
    fn from(arg: TempoSourceArg) -> Self {
        match arg {
            TempoSourceArg::AllTracks => TempoSource::AllTracks,
            TempoSourceArg::FirstTrack => TempoSource::FirstTrack,
        }
    }
}

fn build_config(args: &Args) -> Result<DecodeConfig, tl_master::Error> {
    let mut config = match &args.config {
        Some(path) => DecodeConfig::load(path)?,
        None => DecodeConfig::default(),
    };
    if let Some(target) = args.target_duration {
        config.target_duration_seconds = Some(target);
    }
    if let Some(tie_break) = args.tie_break {
        config.tie_break = tie_break.into();
    }
    if let Some(source) = args.tempo_source {
        config.tempo_source = source.into();
    }
    if let Some(epsilon) = args.epsilon {
        config.epsilon_for_constant_tempo = epsilon;
    }
    config.validate()?;
    Ok(config)
}

fn run(args: &Args) -> Result<(), tl_master::Error> {
    let converter = Converter::new(build_config(args)?);
    let (conversion, out_path) = converter.convert_file(&args.input, args.output.as_deref())?;

    println!("Input:    {} ({:?})", args.input.display(), conversion.format);
    print!("{}", conversion.summary);
    match conversion.rescale {
        Some(RescaleOutcome::Applied { factor }) => println!(
            "Scaled:   x{:.6} to {:.3}s",
            factor,
            conversion.timeline.last_note_off_time()
        ),
        Some(RescaleOutcome::Skipped) => println!("Scaled:   skipped (last note off is 0)"),
        None => {}
    }
    println!("Saved to {}", out_path.display());
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Failed to convert {}: {}", args.input.display(), e);
            ExitCode::FAILURE
        }
    }
}
