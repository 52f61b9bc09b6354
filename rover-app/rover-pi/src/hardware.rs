//! Device bring-up for the real rover: UART motor link, ToF sensor on Linux
//! I2C, and a monotonic clock.

use crate::config::HardwareProfile;
use crate::error::{Error, Result};
use embedded_io_adapters::std::FromStd;
use linux_embedded_hal::{Delay, I2cdev};
use rover_core::utils::Clock;
use rover_core::utils::controllers::{JsonDrive, Vl53l1x};
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::time::{Duration, Instant};

pub type SerialDrive = JsonDrive<FromStd<Box<dyn SerialPort>>>;
pub type Tof = Vl53l1x<I2cdev, Delay>;

/// Milliseconds since the process started.
pub struct StdClock {
    origin: Instant,
}

impl StdClock {
    pub fn new() -> Self {
        StdClock {
            origin: Instant::now(),
        }
    }
}

impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for StdClock {
    fn now_ms(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Open the motor controller UART (8N1, no flow control).
pub fn open_drive(profile: &HardwareProfile) -> Result<SerialDrive> {
    let port = serialport::new(&profile.serial_port, profile.baud_rate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .timeout(Duration::from_millis(100))
        .open()?;

    tracing::info!(
        "Opened serial port: {} at {} baud",
        profile.serial_port,
        profile.baud_rate
    );
    Ok(JsonDrive::new(FromStd::new(port)))
}

/// Open the I2C bus, initialize the sensor and start continuous ranging.
pub fn open_tof(profile: &HardwareProfile) -> Result<Tof> {
    let i2c = I2cdev::new(&profile.i2c_device)
        .map_err(|e| Error::I2c(format!("{}: {}", profile.i2c_device, e)))?;

    let mut tof = Vl53l1x::new(i2c, Delay, profile.tof_address);
    tof.init()?;
    tof.set_distance_mode(profile.distance_mode)?;
    tof.start_ranging()?;

    tracing::info!(
        "ToF ranging on {} at 0x{:02X} ({:?} mode)",
        profile.i2c_device,
        profile.tof_address,
        profile.distance_mode
    );
    Ok(tof)
}
