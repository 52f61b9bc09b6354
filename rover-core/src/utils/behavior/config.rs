//! Avoidance tuning.
//!
//! Turn angles come from dwell time at a fixed wheel differential, not from
//! feedback, so `turn_speed`, `scan_dwell_ms` and `clear_turn_ms` need
//! calibrating per chassis and floor.

use serde::{Deserialize, Serialize};

use super::Direction;

pub const DEFAULT_CRUISE_SPEED: f32 = 0.3;
pub const DEFAULT_TURN_SPEED: f32 = 0.4;
pub const DEFAULT_OBSTACLE_THRESHOLD_MM: u16 = 400;
pub const DEFAULT_REASSERT_INTERVAL_MS: u32 = 2_000;
pub const DEFAULT_TICK_INTERVAL_MS: u32 = 100;
pub const DEFAULT_SCAN_DWELL_MS: u32 = 1_000;
pub const DEFAULT_CLEAR_TURN_MS: u32 = 2_000;

/// What to do when a distance read fails.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SensorFaultPolicy {
    /// Shut down on the first failed read.
    #[default]
    Abort,
    /// Try up to this many reads in total before shutting down.
    Retry(u8),
}

impl SensorFaultPolicy {
    /// Total number of read attempts per sample, at least one.
    pub fn attempts(self) -> u8 {
        match self {
            SensorFaultPolicy::Abort => 1,
            SensorFaultPolicy::Retry(n) => n.max(1),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct AvoidanceConfig {
    /// Wheel speed while cruising forward.
    pub cruise_speed: f32,
    /// Differential magnitude for in-place rotation.
    pub turn_speed: f32,
    /// Readings at or below this distance trigger avoidance.
    pub obstacle_threshold_mm: u16,
    /// Keep-alive period for re-sending the forward command.
    pub reassert_interval_ms: u32,
    /// Sleep between distance polls.
    pub tick_interval_ms: u32,
    /// Rotation time per scan leg.
    pub scan_dwell_ms: u32,
    /// Rotation time toward the chosen side.
    pub clear_turn_ms: u32,
    /// Direction taken when both sides read the same.
    pub tie_break: Direction,
    pub sensor_fault: SensorFaultPolicy,
}

impl Default for AvoidanceConfig {
    fn default() -> Self {
        AvoidanceConfig {
            cruise_speed: DEFAULT_CRUISE_SPEED,
            turn_speed: DEFAULT_TURN_SPEED,
            obstacle_threshold_mm: DEFAULT_OBSTACLE_THRESHOLD_MM,
            reassert_interval_ms: DEFAULT_REASSERT_INTERVAL_MS,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            scan_dwell_ms: DEFAULT_SCAN_DWELL_MS,
            clear_turn_ms: DEFAULT_CLEAR_TURN_MS,
            tie_break: Direction::Right,
            sensor_fault: SensorFaultPolicy::Abort,
        }
    }
}
