//! VL53L1X time-of-flight sensor driver.
//!
//! Register-level driver over an `embedded-hal` I2C bus. Register indices are
//! 16-bit big-endian and the device auto-increments the index on multi-byte
//! writes, so the default configuration block goes out as one transaction.

use embedded_hal::{delay::DelayNs, i2c::I2c};
use serde::{Deserialize, Serialize};

use super::DistanceSensor;

/// Factory I2C address.
pub const DEFAULT_ADDRESS: u8 = 0x29;
/// Expected content of `IDENTIFICATION__MODEL_ID`.
pub const MODEL_ID: u16 = 0xEACC;

pub const VHV_CONFIG_TIMEOUT_MACROP_LOOP_BOUND: u16 = 0x0008;
pub const VHV_CONFIG_INIT: u16 = 0x000B;
pub const DEFAULT_CONFIG_START: u16 = 0x002D;
pub const GPIO_HV_MUX_CTRL: u16 = 0x0030;
pub const GPIO_TIO_HV_STATUS: u16 = 0x0031;
pub const PHASECAL_CONFIG_TIMEOUT_MACROP: u16 = 0x004B;
pub const RANGE_CONFIG_VCSEL_PERIOD_A: u16 = 0x0060;
pub const RANGE_CONFIG_VCSEL_PERIOD_B: u16 = 0x0063;
pub const RANGE_CONFIG_VALID_PHASE_HIGH: u16 = 0x0069;
pub const SD_CONFIG_WOI_SD0: u16 = 0x0078;
pub const SD_CONFIG_INITIAL_PHASE_SD0: u16 = 0x007A;
pub const SYSTEM_INTERRUPT_CLEAR: u16 = 0x0086;
pub const SYSTEM_MODE_START: u16 = 0x0087;
pub const RESULT_FINAL_RANGE_MM_SD0: u16 = 0x0096;
pub const FIRMWARE_SYSTEM_STATUS: u16 = 0x00E5;
pub const IDENTIFICATION_MODEL_ID: u16 = 0x010F;

const MODE_START_CONTINUOUS: u8 = 0x40;
const MODE_STOP: u8 = 0x00;

/// Register block written to `0x2D..=0x87` on init (long distance mode,
/// 100 ms timing budget).
pub const DEFAULT_CONFIGURATION: [u8; 91] = [
    0x00, 0x00, 0x00, 0x01, 0x02, 0x00, 0x02, 0x08, // 0x2D
    0x00, 0x08, 0x10, 0x01, 0x01, 0x00, 0x00, 0x00, // 0x35
    0x00, 0xFF, 0x00, 0x0F, 0x00, 0x00, 0x00, 0x00, // 0x3D
    0x00, 0x20, 0x0B, 0x00, 0x00, 0x02, 0x0A, 0x21, // 0x45
    0x00, 0x00, 0x05, 0x00, 0x00, 0x00, 0x00, 0xC8, // 0x4D
    0x00, 0x00, 0x38, 0xFF, 0x01, 0x00, 0x08, 0x00, // 0x55
    0x00, 0x01, 0xCC, 0x0F, 0x01, 0xF1, 0x0D, 0x01, // 0x5D
    0x68, 0x00, 0x80, 0x08, 0xB8, 0x00, 0x00, 0x00, // 0x65
    0x00, 0x0F, 0x89, 0x00, 0x00, 0x00, 0x00, 0x00, // 0x6D
    0x00, 0x00, 0x01, 0x0F, 0x0D, 0x0E, 0x0E, 0x00, // 0x75
    0x00, 0x02, 0xC7, 0xFF, 0x9B, 0x00, 0x00, 0x00, // 0x7D
    0x01, 0x00, 0x00, // 0x85
];

/// Errors that can occur when talking to the sensor.
#[derive(Debug)]
pub enum TofError<E: core::fmt::Debug> {
    I2c(E),
    WrongModel(u16),
    NotRanging,
}

/// Ranging distance mode.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMode {
    /// Up to ~1.3 m, better ambient-light immunity.
    Short,
    /// Up to ~4 m.
    #[default]
    Long,
}

impl DistanceMode {
    /// `(phasecal timeout, vcsel period a, vcsel period b, valid phase high, woi sd0, initial phase sd0)`
    fn timing(self) -> (u8, u8, u8, u8, u16, u16) {
        match self {
            DistanceMode::Short => (0x14, 0x07, 0x05, 0x38, 0x0705, 0x0606),
            DistanceMode::Long => (0x0A, 0x0F, 0x0D, 0xB8, 0x0F0D, 0x0E0E),
        }
    }
}

/// VL53L1X driver holding the bus, a delay source and ranging state.
pub struct Vl53l1x<I2C, D> {
    i2c: I2C,
    delay: D,
    address: u8,
    /// Value of GPIO status bit 0 that means "data ready".
    ready_level: u8,
    ranging: bool,
}

impl<I2C, D, E> Vl53l1x<I2C, D>
where
    I2C: I2c<Error = E>,
    D: DelayNs,
    E: core::fmt::Debug,
{
    pub fn new(
        i2c: I2C,
        delay: D,
        address: u8,
    ) -> Self {
        Vl53l1x {
            i2c,
            delay,
            address,
            ready_level: 1,
            ranging: false,
        }
    }

    /// Bring the sensor up: wait for boot, check identity, load the default
    /// configuration and run the VHV calibration cycle.
    ///
    /// Leaves the sensor idle; call [`Self::start_ranging`] afterwards.
    pub fn init(&mut self) -> Result<(), TofError<E>> {
        while self.read_u8(FIRMWARE_SYSTEM_STATUS)? & 0x01 == 0 {
            self.delay.delay_ms(2);
        }

        let model = self.read_u16(IDENTIFICATION_MODEL_ID)?;
        if model != MODEL_ID {
            return Err(TofError::WrongModel(model));
        }

        let mut block = [0u8; 2 + DEFAULT_CONFIGURATION.len()];
        block[..2].copy_from_slice(&DEFAULT_CONFIG_START.to_be_bytes());
        block[2..].copy_from_slice(&DEFAULT_CONFIGURATION);
        self.i2c
            .write(self.address, &block)
            .map_err(TofError::I2c)?;

        let mux = self.read_u8(GPIO_HV_MUX_CTRL)?;
        self.ready_level = if mux & 0x10 == 0 { 1 } else { 0 };

        // One throwaway measurement performs VHV calibration.
        self.start_ranging()?;
        while !self.is_data_ready()? {
            self.delay.delay_ms(1);
        }
        self.clear_interrupt()?;
        self.stop_ranging()?;

        self.write_u8(VHV_CONFIG_TIMEOUT_MACROP_LOOP_BOUND, 0x09)?;
        self.write_u8(VHV_CONFIG_INIT, 0x00)?;

        tracing::info!(address = self.address, "VL53L1X initialized");
        Ok(())
    }

    /// Switch between short and long distance timing.
    pub fn set_distance_mode(
        &mut self,
        mode: DistanceMode,
    ) -> Result<(), TofError<E>> {
        let (phasecal, period_a, period_b, phase_high, woi, initial_phase) = mode.timing();
        self.write_u8(PHASECAL_CONFIG_TIMEOUT_MACROP, phasecal)?;
        self.write_u8(RANGE_CONFIG_VCSEL_PERIOD_A, period_a)?;
        self.write_u8(RANGE_CONFIG_VCSEL_PERIOD_B, period_b)?;
        self.write_u8(RANGE_CONFIG_VALID_PHASE_HIGH, phase_high)?;
        self.write_u16(SD_CONFIG_WOI_SD0, woi)?;
        self.write_u16(SD_CONFIG_INITIAL_PHASE_SD0, initial_phase)?;
        tracing::info!(?mode, "distance mode set");
        Ok(())
    }

    /// Start continuous ranging.
    pub fn start_ranging(&mut self) -> Result<(), TofError<E>> {
        self.write_u8(SYSTEM_MODE_START, MODE_START_CONTINUOUS)?;
        self.ranging = true;
        Ok(())
    }

    /// Stop ranging. Safe to call when already stopped.
    pub fn stop_ranging(&mut self) -> Result<(), TofError<E>> {
        self.write_u8(SYSTEM_MODE_START, MODE_STOP)?;
        self.ranging = false;
        Ok(())
    }

    pub fn is_ranging(&self) -> bool {
        self.ranging
    }

    pub fn is_data_ready(&mut self) -> Result<bool, TofError<E>> {
        Ok(self.read_u8(GPIO_TIO_HV_STATUS)? & 0x01 == self.ready_level)
    }

    pub fn clear_interrupt(&mut self) -> Result<(), TofError<E>> {
        self.write_u8(SYSTEM_INTERRUPT_CLEAR, 0x01)
    }

    /// Wait for the next measurement and return it in millimetres.
    pub fn read_distance(&mut self) -> Result<u16, TofError<E>> {
        if !self.ranging {
            return Err(TofError::NotRanging);
        }
        while !self.is_data_ready()? {
            self.delay.delay_ms(1);
        }
        let mm = self.read_u16(RESULT_FINAL_RANGE_MM_SD0)?;
        self.clear_interrupt()?;
        Ok(mm)
    }

    /// Release the bus and delay.
    pub fn release(self) -> (I2C, D) {
        (self.i2c, self.delay)
    }

    fn read_u8(
        &mut self,
        reg: u16,
    ) -> Result<u8, TofError<E>> {
        let mut buf = [0u8; 1];
        self.i2c
            .write_read(self.address, &reg.to_be_bytes(), &mut buf)
            .map_err(TofError::I2c)?;
        Ok(buf[0])
    }

    fn read_u16(
        &mut self,
        reg: u16,
    ) -> Result<u16, TofError<E>> {
        let mut buf = [0u8; 2];
        self.i2c
            .write_read(self.address, &reg.to_be_bytes(), &mut buf)
            .map_err(TofError::I2c)?;
        Ok(u16::from_be_bytes(buf))
    }

    fn write_u8(
        &mut self,
        reg: u16,
        value: u8,
    ) -> Result<(), TofError<E>> {
        let [hi, lo] = reg.to_be_bytes();
        self.i2c
            .write(self.address, &[hi, lo, value])
            .map_err(TofError::I2c)
    }

    fn write_u16(
        &mut self,
        reg: u16,
        value: u16,
    ) -> Result<(), TofError<E>> {
        let [hi, lo] = reg.to_be_bytes();
        let [vh, vl] = value.to_be_bytes();
        self.i2c
            .write(self.address, &[hi, lo, vh, vl])
            .map_err(TofError::I2c)
    }
}

impl<I2C, D, E> DistanceSensor for Vl53l1x<I2C, D>
where
    I2C: I2c<Error = E>,
    D: DelayNs,
    E: core::fmt::Debug,
{
    type Error = TofError<E>;

    fn read_distance(&mut self) -> Result<u16, Self::Error> {
        Vl53l1x::read_distance(self)
    }

    fn stop_ranging(&mut self) -> Result<(), Self::Error> {
        Vl53l1x::stop_ranging(self)
    }
}
