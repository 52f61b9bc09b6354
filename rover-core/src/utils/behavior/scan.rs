//! Look-around scan plan and the left/right decision.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Left,
    Right,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }
}

/// One leg of the scan: rotate, dwell, then optionally sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanStep {
    pub rotate: Direction,
    pub sample: Option<Direction>,
}

/// Look left, swing back through centre to the right, return to centre.
///
/// The two right legs cover the return-to-centre and the right pose; the
/// sequence is fixed and does not depend on the sampled distances.
pub const SCAN_SEQUENCE: [ScanStep; 4] = [
    ScanStep {
        rotate: Direction::Left,
        sample: Some(Direction::Left),
    },
    ScanStep {
        rotate: Direction::Right,
        sample: None,
    },
    ScanStep {
        rotate: Direction::Right,
        sample: Some(Direction::Right),
    },
    ScanStep {
        rotate: Direction::Left,
        sample: None,
    },
];

/// Result of one look-around.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanReport {
    pub left_mm: u16,
    pub right_mm: u16,
    pub chosen: Direction,
}

/// Pick the side with more room; equal readings go to `tie_break`.
pub fn choose_direction(
    left_mm: u16,
    right_mm: u16,
    tie_break: Direction,
) -> Direction {
    match left_mm.cmp(&right_mm) {
        core::cmp::Ordering::Greater => Direction::Left,
        core::cmp::Ordering::Less => Direction::Right,
        core::cmp::Ordering::Equal => tie_break,
    }
}
