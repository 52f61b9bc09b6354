//! Module Exports
//!
//! This file exports the hardware seams used by the avoidance behavior.
//!
//! - `drive`: wheel-speed commands and the JSON serial drive link.
//! - `tof`: VL53L1X time-of-flight distance sensor over I2C.

/// Module for the differential-drive motor link.
pub mod drive;
pub mod tof;

pub use drive::{DriveError, JsonDrive, MotionCommand};
pub use tof::{DistanceMode, TofError, Vl53l1x};

/// Anything that can put a pair of wheel speeds on the motors.
///
/// Sends are best-effort: callers report a failure but do not retry.
pub trait Drive {
    type Error: core::fmt::Debug;

    fn send_motion(
        &mut self,
        cmd: MotionCommand,
    ) -> Result<(), Self::Error>;
}

/// Blocking range sensor returning millimetres to the nearest target.
pub trait DistanceSensor {
    type Error: core::fmt::Debug;

    /// Block until a fresh sample is available and return it.
    ///
    /// No timeout is applied; a stalled sensor stalls the caller.
    fn read_distance(&mut self) -> Result<u16, Self::Error>;

    /// Release active ranging.
    fn stop_ranging(&mut self) -> Result<(), Self::Error>;
}

impl<T: Drive + ?Sized> Drive for &mut T {
    type Error = T::Error;

    fn send_motion(
        &mut self,
        cmd: MotionCommand,
    ) -> Result<(), Self::Error> {
        T::send_motion(self, cmd)
    }
}

impl<T: DistanceSensor + ?Sized> DistanceSensor for &mut T {
    type Error = T::Error;

    fn read_distance(&mut self) -> Result<u16, Self::Error> {
        T::read_distance(self)
    }

    fn stop_ranging(&mut self) -> Result<(), Self::Error> {
        T::stop_ranging(self)
    }
}
