mod capture;

use anyhow::{Context, Result};
use capture::{CaptureTransport, decode_hex};
use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use ecoflow_lib::constants::COMMAND_CHAR_HANDLE;
use ecoflow_lib::{DecodedState, Delta2, OutputCircuit, StateConsumer, StateParser, encode};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Encode commands for and decode telemetry from an EcoFlow Delta 2.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    verbose: Verbosity<WarnLevel>,
    /// Also write logs to this file.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
    /// Print decoded states as JSON, one object per line.
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the packet that switches an output circuit on or off.
    Encode {
        /// Output circuit: ac, dc or usb.
        #[arg(short, long)]
        circuit: OutputCircuit,
        #[arg(short, long, value_enum)]
        state: Switch,
    },
    /// Decode state notification payloads given as hex.
    Decode {
        #[arg(required = true)]
        payloads: Vec<String>,
    },
    /// Replay a capture file with one hex notification payload per line.
    Replay { file: PathBuf },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Switch {
    On,
    Off,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = init_tracing(&cli.verbose, cli.log_file.as_deref())?;

    match cli.command {
        Command::Encode { circuit, state } => {
            let packet = encode(circuit, state == Switch::On);
            println!("handle {COMMAND_CHAR_HANDLE:#06x}: {}", hex::encode(&packet));
        }
        Command::Decode { payloads } => {
            for payload in &payloads {
                let data = decode_hex(payload)?;
                print_state(&StateParser::parse(&data), cli.json)?;
            }
        }
        Command::Replay { file } => replay(&file, cli.json).await?,
    }
    Ok(())
}

fn init_tracing(verbose: &Verbosity<WarnLevel>, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::builder()
        .with_default_directive(verbose.tracing_level_filter().into())
        .from_env_lossy();

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            let name = path.file_name().context("Log file path has no file name")?;
            let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(file_layer)
        .init();
    Ok(guard)
}

fn print_state(state: &DecodedState, json: bool) -> Result<()> {
    if json {
        println!("{}", state.to_json()?);
    } else {
        println!("{state}");
    }
    Ok(())
}

async fn replay(path: &Path, json: bool) -> Result<()> {
    let transport = CaptureTransport::load(path).await?;
    info!(notifications = transport.len(), "Replaying capture");

    let (tx, rx) = mpsc::channel();
    let consumer = StateConsumer::blocking(move |state| {
        if tx.send(state).is_err() {
            error!("Replay receiver dropped");
        }
    });

    let mut device = Delta2::open(transport).await?;
    device.start_state_stream(consumer).await?;
    let delivered = device.transport_mut().play();
    device.stop_state_stream().await?;
    device.close().await?;

    let mut total = DecodedState::new();
    for state in rx.try_iter() {
        print_state(&state, json)?;
        total.merge(state);
    }
    info!(delivered, fields = total.len(), "Replay finished");

    if !json {
        println!("---");
    }
    print_state(&total, json)
}
