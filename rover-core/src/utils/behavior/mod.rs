//! Obstacle-avoidance behavior.
//!
//! - `config`: tunable speeds, thresholds and dwell times
//! - `scan`: look-around step plan and left/right decision rule
//! - `avoidance`: the cruise / avoid / stop control loop

pub mod avoidance;
pub mod config;
pub mod scan;

pub use avoidance::{AvoidanceError, AvoidanceLoop, LoopState, Phase, TickOutcome};
pub use config::{AvoidanceConfig, SensorFaultPolicy};
pub use scan::{choose_direction, Direction, ScanReport};

/// Monotonic millisecond clock used for the forward re-assert timer.
pub trait Clock {
    /// Milliseconds since an arbitrary, fixed origin.
    fn now_ms(&self) -> u64;
}

impl<T: Clock + ?Sized> Clock for &T {
    fn now_ms(&self) -> u64 {
        T::now_ms(self)
    }
}
