//! Utility re-exports for the rover.
//!
//! This module re-exports the hardware seams, drivers and the avoidance
//! behavior:
//!
//! - `controllers`: drive link and distance-sensor drivers
//! - `behavior`: avoidance configuration, scan logic and the control loop
//! - `cancel`: cooperative stop token shared with signal handlers

pub mod behavior;
pub mod cancel;
pub mod controllers;

pub use behavior::{AvoidanceConfig, AvoidanceLoop, Clock, Direction};
pub use cancel::StopToken;
pub use controllers::{DistanceSensor, Drive, MotionCommand};
