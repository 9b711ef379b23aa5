//! devdash-decode - Offline decoder for Haltech CAN logs
//!
//! Reads candump logs and prints the ECU and PD16 channels they carry.

mod candump;
mod commands;
mod config;
mod output;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use devdash_protocol::{BusDecoder, DeviceId, HaltechProtocol};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{ArgOverrides, Config, MergedConfig};
use crate::output::{OutputContext, OutputFormat};

#[derive(Parser)]
#[command(name = "devdash-decode")]
#[command(author, version, about = "Decode Haltech ECU and PD16 CAN logs")]
#[command(propagate_version = true)]
struct Cli {
    /// Protocol definition document (JSON or YAML)
    #[arg(short, long, env = "DEVDASH_PROTOCOL")]
    protocol: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long, env = "DEVDASH_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum)]
    output: Option<OutputFormat>,

    /// Only decode frames covered by the protocol definition
    #[arg(long)]
    no_fallback: bool,

    /// PD16 devices on the bus (e.g. --pd16 A,B)
    #[arg(long, value_delimiter = ',', value_parser = parse_device)]
    pd16: Vec<DeviceId>,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Minimal output (for scripting)
    #[arg(short, long)]
    quiet: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a candump log (default)
    Decode(DecodeArgs),

    /// List frames in the protocol definition
    Frames {
        /// List every channel instead of one row per frame
        #[arg(long)]
        channels: bool,
    },
}

#[derive(Args, Default)]
struct DecodeArgs {
    /// Log file to read ("-" or omitted for stdin)
    input: Option<PathBuf>,

    /// Print only the most recent value of each channel
    #[arg(long)]
    latest: bool,
}

fn parse_device(s: &str) -> Result<DeviceId, String> {
    s.parse().map_err(|e: devdash_protocol::ProtocolError| e.to_string())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays machine-readable
    let default_filter = if cli.verbose {
        "warn,devdash=debug"
    } else {
        "warn,devdash=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    // Load config file
    let config = if let Some(config_path) = &cli.config {
        Config::load_from(config_path)?
    } else {
        Config::load().unwrap_or_default()
    };

    // Merge CLI args with config
    let merged = config.merge_with_args(&ArgOverrides {
        protocol: cli.protocol.clone(),
        no_fallback: cli.no_fallback,
        output: cli.output,
        no_color: cli.no_color,
        pd16: cli.pd16.clone(),
    })?;

    let ctx = OutputContext::new(merged.output, merged.no_color, cli.quiet);

    let bus = match build_bus(&merged) {
        Ok(bus) => bus,
        Err(e) => {
            ctx.error(&format!("{:#}", e));
            return Err(e);
        }
    };

    match cli.command.unwrap_or(Commands::Decode(DecodeArgs::default())) {
        Commands::Decode(args) => {
            commands::decode(&bus, args.input.as_deref(), args.latest, &ctx)?;
        }
        Commands::Frames { channels } => {
            commands::frames(bus.ecu(), channels, &ctx)?;
        }
    }

    Ok(())
}

/// Build the frame router from resolved configuration
fn build_bus(config: &MergedConfig) -> Result<BusDecoder> {
    let mut protocol = HaltechProtocol::new();
    if let Some(path) = &config.protocol {
        let count = protocol
            .try_load_definition(path)
            .with_context(|| format!("Failed to load protocol definition: {}", path.display()))?;
        info!(path = %path.display(), frames = count, "Loaded protocol definition");
    }
    if !config.fallback {
        protocol = protocol.without_fallback();
    }

    let mut bus = BusDecoder::new(protocol);
    for device in &config.pd16 {
        bus.add_pd16(*device)?;
    }
    Ok(bus)
}
