//! OPL3 register-log inspection tool
//!
//! Decodes IMF/RAW/DRO/VGM files and reports on them. The synthesis chip is
//! external, so register state is inspected through a recording backend.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use opl3_replayer::formats::{decode_auto, FileFormat};
use opl3_replayer::{CommandStream, Player, PlayerConfig, RecordingDevice, SeekOutcome};

#[derive(Parser)]
#[command(name = "opl3-replayer", version, about = "Inspect OPL2/OPL3 register logs")]
struct Args {
    /// JSON player configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output sample rate in Hz
    #[arg(long, global = true)]
    sample_rate: Option<u32>,

    /// Command rate for IMF files in Hz
    #[arg(long, global = true)]
    imf_rate: Option<f64>,

    /// Extra passes over a VGM loop region
    #[arg(long, global = true)]
    loops: Option<u32>,

    /// Enable debug logging
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Print format, command count, rate and duration
    Info {
        /// Register log to inspect
        file: PathBuf,
    },
    /// Print decoded commands
    Dump {
        /// Register log to inspect
        file: PathBuf,
        /// Stop after this many commands
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Seek to a time and print every nonzero register
    State {
        /// Register log to inspect
        file: PathBuf,
        /// Target time in seconds
        #[arg(long, default_value_t = 0.0)]
        at: f64,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let config = build_config(&args)?;

    match &args.command {
        Cmd::Info { file } => {
            let (format, stream) = load(file, &config)?;
            println!("File:        {}", file.display());
            println!("Format:      {}", format);
            println!("Commands:    {}", stream.len());
            println!("Rate:        {:.2} Hz", stream.cmd_rate);
            println!("Dual chip:   {}", stream.dual_chip_mode);
            println!("Duration:    {}", format_time(stream.total_seconds()));
        }
        Cmd::Dump { file, limit } => {
            let (_, stream) = load(file, &config)?;
            let limit = limit.unwrap_or(usize::MAX);
            for command in stream.commands.iter().take(limit) {
                println!(
                    "{:>10}  {:>10.4}s  {:03X} = {:02X}",
                    command.time,
                    command.time as f64 / stream.cmd_rate,
                    command.register,
                    command.value
                );
            }
            if stream.len() > limit {
                println!("... {} more", stream.len() - limit);
            }
        }
        Cmd::State { file, at } => {
            let (_, stream) = load(file, &config)?;
            let mut player = Player::with_config(RecordingDevice::new(), &config)?;
            player.load_stream(stream);
            let outcome = player.seek(*at);
            match outcome {
                SeekOutcome::Positioned => {
                    println!("Position:    {}", format_time(player.playback_time()))
                }
                SeekOutcome::EndOfStream => println!("Position:    end of stream"),
                SeekOutcome::NoStream => anyhow::bail!("no stream loaded"),
            }
            println!("Cursor:      {}", player.cursor());
            for (register, value) in player.device().registers().nonzero() {
                println!("{:03X} = {:02X}", register, value);
            }
        }
    }

    Ok(())
}

/// Config file (if any) with command-line overrides applied
fn build_config(args: &Args) -> Result<PlayerConfig> {
    let mut config = match &args.config {
        Some(path) => PlayerConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => PlayerConfig::default(),
    };
    if let Some(rate) = args.sample_rate {
        config.sample_rate = rate;
    }
    if let Some(rate) = args.imf_rate {
        config.imf_rate = rate;
    }
    if let Some(loops) = args.loops {
        config.vgm_loop_repeat = Some(loops);
    }
    config.validate()?;
    Ok(config)
}

fn load(path: &Path, config: &PlayerConfig) -> Result<(FileFormat, CommandStream)> {
    let data =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let (format, decoded) = decode_auto(&data, &config.decode_options());
    let stream = decoded
        .into_result()
        .with_context(|| format!("failed to decode {}", path.display()))?;
    let format = format.context("unrecognised container")?;
    log::info!("{}: {} ({} commands)", path.display(), format, stream.len());
    Ok((format, stream))
}

fn format_time(seconds: f64) -> String {
    let total_ms = (seconds * 1000.0).round() as u64;
    format!(
        "{}:{:02}.{:03}",
        total_ms / 60_000,
        (total_ms / 1000) % 60,
        total_ms % 1000
    )
}
