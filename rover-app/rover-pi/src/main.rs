//! Obstacle-avoiding rover: cruise forward, scan when something is close,
//! turn toward the open side.
//!
//! SIGINT and SIGTERM only flip a stop token; the loop notices it within one tick and
//! runs its own shutdown (motors stopped, sensor ranging released).

mod config;
mod error;
mod hardware;
mod mock;

use crate::config::{AppConfig, Board, HardwareProfile};
use crate::error::Result;
use crate::hardware::StdClock;
use clap::Parser;
use linux_embedded_hal::Delay;
use rover_core::utils::{AvoidanceLoop, StopToken};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(version = "1.0")]
struct Opts
{
    /// TOML configuration file
    #[clap(long, short)]
    config: Option<PathBuf>,
    /// motor controller serial device, skips board detection
    #[clap(long)]
    port: Option<String>,
    /// I2C bus number of the ToF sensor
    #[clap(long)]
    i2c_bus: Option<u8>,
    /// drive a simulated rover instead of hardware
    #[clap(long)]
    mock: bool,
    /// log filter used when RUST_LOG is unset
    #[clap(long, default_value = "info")]
    log: String,
}

fn run(opts: Opts) -> Result<()> {
    let mut config = match &opts.config {
        Some(path) => {
            info!("Using config: {}", path.display());
            AppConfig::from_file(path)?
        }
        None => AppConfig::default(),
    };
    if let Some(port) = opts.port {
        config.hardware.serial_port = Some(port);
    }
    if let Some(bus) = opts.i2c_bus {
        config.hardware.i2c_bus = bus;
    }

    let stop = Arc::new(StopToken::new());
    let handler_stop = Arc::clone(&stop);
    ctrlc::set_handler(move || handler_stop.request_stop())?;

    if opts.mock {
        info!("Driving simulated rover");
        let (drive, tof) = mock::rover();
        let mut avoid = AvoidanceLoop::new(drive, tof, Delay, StdClock::new(), config.avoidance);
        avoid.run(&stop)?;
        return Ok(());
    }

    let board = Board::detect();
    let profile = HardwareProfile::resolve(&config.hardware, board);
    info!(?profile, "Hardware profile");

    let drive = hardware::open_drive(&profile)?;
    let tof = hardware::open_tof(&profile)?;

    let mut avoid = AvoidanceLoop::new(drive, tof, Delay, StdClock::new(), config.avoidance);
    avoid.run(&stop)?;
    info!("Stopped");
    Ok(())
}

fn main() -> ExitCode {
    let opts: Opts = Opts::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&opts.log)),
        )
        .init();

    match run(opts) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
