use std::process::ExitCode;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;

use beater_core::audio::default_sink_factory;
use beater_core::metronome::SilentLibrary;
use beater_core::{init_logging, EngineConfig, MetronomeManager, SoundType, TimeSignature};

/// Run the metronome engine against the real audio device, for manual
/// verification of timing, accents and live reconfiguration.
#[derive(Parser, Debug)]
#[command(name = "beater_cli", about = "Metronome engine test driver")]
struct Cli {
    /// Tempo in BPM (clamped to 1-300)
    #[arg(long, default_value_t = 120)]
    tempo: u32,

    /// Time signature as "numerator/subdivisions", e.g. 4/1 or 7/2
    #[arg(long, default_value = "4/1")]
    signature: String,

    /// Enable subdivision clicks
    #[arg(long, default_value_t = false)]
    subdivisions: bool,

    /// Disable the measure-start accent
    #[arg(long, default_value_t = false)]
    no_accent: bool,

    /// Volume percentage (0-100)
    #[arg(long, default_value_t = 100)]
    volume: u32,

    /// How long to play, in seconds
    #[arg(long, default_value_t = 8)]
    duration_secs: u64,

    /// Optional JSON engine config file
    #[arg(long)]
    config: Option<String>,
}

fn parse_signature(raw: &str) -> Result<TimeSignature> {
    let (numerator, subdivisions) = raw
        .split_once('/')
        .with_context(|| format!("signature must look like 4/1, got {raw:?}"))?;
    let numerator: u8 = numerator.trim().parse().context("invalid numerator")?;
    let subdivisions: u8 = subdivisions.trim().parse().context("invalid subdivisions")?;
    TimeSignature::new(numerator, subdivisions).map_err(|err| anyhow::anyhow!("{err}"))
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    if cli.duration_secs == 0 {
        bail!("duration must be at least one second");
    }

    let config = match &cli.config {
        Some(path) => EngineConfig::load_from_file(path),
        None => EngineConfig::default(),
    };

    let max_lights = config.visual.wide_screen_lights;
    let manager = MetronomeManager::new(
        config,
        Arc::new(SilentLibrary),
        default_sink_factory(),
        max_lights,
    );

    // No sample assets ship with the CLI; the sine bank always makes sound
    manager.select_sound_type(SoundType::Sine);
    manager.set_tempo(cli.tempo);
    manager.set_time_signature(parse_signature(&cli.signature)?);
    manager.set_subdivisions_enabled(cli.subdivisions);
    manager.set_accent_enabled(!cli.no_accent);
    manager.set_volume(cli.volume);

    println!(
        "Playing {} at {} BPM for {} s (subdivisions: {}, accent: {})",
        manager.time_signature_label(),
        manager.current_tempo(),
        cli.duration_secs,
        cli.subdivisions,
        !cli.no_accent,
    );

    manager.start();
    for _ in 0..cli.duration_secs {
        thread::sleep(Duration::from_secs(1));
        println!("lights: {:?}", manager.lights());
        if !manager.is_running() {
            bail!("playback stopped unexpectedly (no output device?)");
        }
    }
    manager.stop();

    Ok(())
}
