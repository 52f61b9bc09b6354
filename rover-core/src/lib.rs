//! Core drivers and the obstacle-avoidance behavior for a ToF-equipped
//! differential-drive rover on no-std platforms.
//!
//! For a runnable host application, see `rover-app/rover-pi`.
#![no_std]

extern crate alloc;

pub mod utils;
