//! Simulated rover for bench runs without hardware.
//!
//! The drive and sensor share a tiny room model: the robot creeps toward a
//! wall while cruising, each rotate command swings the sensor one pose left or
//! right, and driving off after a turn opens a fresh stretch of floor.

use rover_core::utils::controllers::{DistanceSensor, Drive, MotionCommand};
use std::cell::RefCell;
use std::convert::Infallible;
use std::rc::Rc;

/// Distance closed per reading while driving forward.
const STEP_MM: u16 = 80;

struct Room {
    moving: bool,
    /// Rotation poses away from the original heading, negative is left.
    pose: i32,
    ahead_mm: u16,
    left_mm: u16,
    right_mm: u16,
}

impl Room {
    fn new() -> Self {
        Room {
            moving: false,
            pose: 0,
            ahead_mm: 1_600,
            left_mm: 1_200,
            right_mm: 700,
        }
    }

    fn apply(
        &mut self,
        cmd: MotionCommand,
    ) {
        if cmd.is_stop() {
            self.moving = false;
        } else if cmd.left == cmd.right {
            if self.pose != 0 {
                // New heading: the side we turned toward is now ahead.
                self.ahead_mm = if self.pose < 0 { self.left_mm } else { self.right_mm };
                self.pose = 0;
                core::mem::swap(&mut self.left_mm, &mut self.right_mm);
            }
            self.moving = true;
        } else {
            self.moving = false;
            self.pose += if cmd.left < cmd.right { -1 } else { 1 };
        }
    }

    fn sample(&mut self) -> u16 {
        match self.pose {
            0 => {
                if self.moving {
                    self.ahead_mm = self.ahead_mm.saturating_sub(STEP_MM);
                }
                self.ahead_mm
            }
            p if p < 0 => self.left_mm,
            _ => self.right_mm,
        }
    }
}

/// Drive that logs commands and moves the simulated room.
pub struct SimDrive {
    room: Rc<RefCell<Room>>,
}

impl Drive for SimDrive {
    type Error = Infallible;

    fn send_motion(
        &mut self,
        cmd: MotionCommand,
    ) -> Result<(), Self::Error> {
        tracing::info!(left = %cmd.left, right = %cmd.right, "motion");
        self.room.borrow_mut().apply(cmd);
        Ok(())
    }
}

/// Distance sensor reading from the simulated room.
pub struct SimTof {
    room: Rc<RefCell<Room>>,
}

impl DistanceSensor for SimTof {
    type Error = Infallible;

    fn read_distance(&mut self) -> Result<u16, Self::Error> {
        Ok(self.room.borrow_mut().sample())
    }

    fn stop_ranging(&mut self) -> Result<(), Self::Error> {
        tracing::info!("ranging stopped");
        Ok(())
    }
}

/// Drive and sensor sharing one room.
pub fn rover() -> (SimDrive, SimTof) {
    let room = Rc::new(RefCell::new(Room::new()));
    (
        SimDrive { room: room.clone() },
        SimTof { room },
    )
}
