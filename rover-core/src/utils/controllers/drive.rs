//! Differential-drive motor link.
//!
//! The motor controller accepts newline-delimited JSON frames. Speed control
//! is command type `T = 1` with independent left/right wheel speeds:
//!
//! ```text
//! {"T":1,"L":0.3,"R":0.3}
//! ```

use alloc::vec::Vec;

use embedded_io::Write;
use serde::Serialize;

use super::Drive;
use crate::utils::behavior::Direction;

/// Command type for per-wheel speed control.
pub const SPEED_CTRL: u8 = 1;

/// Errors that can occur while sending a drive frame.
#[derive(Debug)]
pub enum DriveError<E: core::fmt::Debug> {
    Io(E),
    Encode(serde_json::Error),
}

/// Left/right wheel speeds, nominally in `-1.0..=1.0`.
///
/// Values are passed to the controller as-is; nothing clamps them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionCommand {
    pub left: f32,
    pub right: f32,
}

impl MotionCommand {
    pub const STOP: Self = Self {
        left: 0.0,
        right: 0.0,
    };

    pub const fn new(
        left: f32,
        right: f32,
    ) -> Self {
        Self { left, right }
    }

    /// Both wheels at `speed`.
    pub const fn forward(speed: f32) -> Self {
        Self::new(speed, speed)
    }

    pub const fn stop() -> Self {
        Self::STOP
    }

    /// Spin in place. Left is `(-k, +k)`, right is `(+k, -k)`.
    pub const fn rotate(
        direction: Direction,
        speed: f32,
    ) -> Self {
        match direction {
            Direction::Left => Self::new(-speed, speed),
            Direction::Right => Self::new(speed, -speed),
        }
    }

    pub fn is_stop(&self) -> bool {
        self.left == 0.0 && self.right == 0.0
    }
}

/// Wire representation of a speed command.
#[derive(Debug, Serialize, Clone, Copy, PartialEq)]
pub struct DriveFrame {
    #[serde(rename = "T")]
    pub t: u8,
    #[serde(rename = "L")]
    pub l: f32,
    #[serde(rename = "R")]
    pub r: f32,
}

impl From<MotionCommand> for DriveFrame {
    fn from(cmd: MotionCommand) -> Self {
        DriveFrame {
            t: SPEED_CTRL,
            l: cmd.left,
            r: cmd.right,
        }
    }
}

/// Drive link writing JSON frames to a byte sink, usually a UART.
pub struct JsonDrive<W> {
    port: W,
}

impl<W, E> JsonDrive<W>
where
    W: Write<Error = E>,
    E: core::fmt::Debug,
{
    pub fn new(port: W) -> Self {
        JsonDrive { port }
    }

    /// Encode a command into a single newline-terminated frame.
    pub fn encode(cmd: MotionCommand) -> Result<Vec<u8>, DriveError<E>> {
        let mut buf = serde_json::to_vec(&DriveFrame::from(cmd)).map_err(DriveError::Encode)?;
        buf.push(b'\n');
        Ok(buf)
    }

    pub fn into_inner(self) -> W {
        self.port
    }
}

impl<W, E> Drive for JsonDrive<W>
where
    W: Write<Error = E>,
    E: core::fmt::Debug,
{
    type Error = DriveError<E>;

    fn send_motion(
        &mut self,
        cmd: MotionCommand,
    ) -> Result<(), Self::Error> {
        let frame = Self::encode(cmd)?;
        self.port.write_all(&frame).map_err(DriveError::Io)?;
        self.port.flush().map_err(DriveError::Io)?;
        tracing::trace!(left = %cmd.left, right = %cmd.right, "drive frame sent");
        Ok(())
    }
}
