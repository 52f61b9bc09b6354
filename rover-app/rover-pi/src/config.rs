//! Configuration for the rover host application
//!
//! Loads an optional TOML file and resolves which serial device and I2C bus
//! to open. Board detection runs once at startup; nothing in the control loop
//! depends on it.

use crate::error::Result;
use rover_core::utils::behavior::AvoidanceConfig;
use rover_core::utils::controllers::DistanceMode;
use rover_core::utils::controllers::tof::DEFAULT_ADDRESS;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Where the board model string lives.
pub const CPUINFO_PATH: &str = "/proc/cpuinfo";

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub hardware: HardwareConfig,
    pub avoidance: AvoidanceConfig,
}

/// Hardware overrides. Anything left unset comes from board detection.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HardwareConfig {
    /// Motor controller UART; detected from the board model when absent
    pub serial_port: Option<String>,
    pub baud_rate: u32,
    /// Linux I2C bus number (`/dev/i2c-<n>`) the ToF sensor sits on
    pub i2c_bus: u8,
    pub tof_address: u8,
    pub distance_mode: DistanceMode,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        HardwareConfig {
            serial_port: None,
            baud_rate: 115_200,
            i2c_bus: 3,
            tof_address: DEFAULT_ADDRESS,
            distance_mode: DistanceMode::Long,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }
}

/// Board family, as far as UART naming is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Board {
    RaspberryPi5,
    Other,
}

impl Board {
    /// Inspect the first `Model` line of a cpuinfo dump.
    pub fn from_cpuinfo(cpuinfo: &str) -> Board {
        match cpuinfo.lines().find(|line| line.contains("Model")) {
            Some(line) if line.contains("Raspberry Pi 5") => Board::RaspberryPi5,
            _ => Board::Other,
        }
    }

    pub fn detect() -> Board {
        match fs::read_to_string(CPUINFO_PATH) {
            Ok(cpuinfo) => Board::from_cpuinfo(&cpuinfo),
            Err(e) => {
                tracing::warn!("Could not read {}: {}", CPUINFO_PATH, e);
                Board::Other
            }
        }
    }

    /// GPIO header UART for this board.
    pub fn serial_port(self) -> &'static str {
        match self {
            Board::RaspberryPi5 => "/dev/ttyAMA0",
            Board::Other => "/dev/serial0",
        }
    }
}

/// Fully resolved device selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HardwareProfile {
    pub board: Board,
    pub serial_port: String,
    pub baud_rate: u32,
    pub i2c_device: String,
    pub tof_address: u8,
    pub distance_mode: DistanceMode,
}

impl HardwareProfile {
    pub fn resolve(
        config: &HardwareConfig,
        board: Board,
    ) -> Self {
        HardwareProfile {
            board,
            serial_port: config
                .serial_port
                .clone()
                .unwrap_or_else(|| board.serial_port().to_string()),
            baud_rate: config.baud_rate,
            i2c_device: format!("/dev/i2c-{}", config.i2c_bus),
            tof_address: config.tof_address,
            distance_mode: config.distance_mode,
        }
    }
}
