//! Cruise / avoid / stop control loop.
//!
//! The loop is strictly sequential: one distance poll per tick, a fixed sleep
//! after every tick, and a blocking look-around when something is closer than
//! the threshold. All waits are sliced to the tick interval so a stop request
//! is seen within one slice.

use embedded_hal::delay::DelayNs;

use super::{
    choose_direction,
    scan::SCAN_SEQUENCE,
    AvoidanceConfig,
    Clock,
    Direction,
    ScanReport,
};
use crate::utils::{
    cancel::StopToken,
    controllers::{DistanceSensor, Drive, MotionCommand},
};

/// Errors that end the loop.
#[derive(Debug)]
pub enum AvoidanceError<E: core::fmt::Debug> {
    /// The distance sensor failed more often than the fault policy allows.
    Sensor(E),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Cruising,
    Avoiding,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopState {
    pub phase: Phase,
    /// Clock time of the most recent forward command.
    pub last_forward_ms: u64,
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Path ahead is open.
    Clear { distance_mm: u16 },
    /// An obstacle was avoided and cruising resumed.
    Avoided(ScanReport),
    /// The loop is in its terminal state.
    Stopped,
}

pub struct AvoidanceLoop<D, S, DL, C> {
    drive: D,
    sensor: S,
    delay: DL,
    clock: C,
    config: AvoidanceConfig,
    state: LoopState,
}

impl<D, S, DL, C> AvoidanceLoop<D, S, DL, C>
where
    D: Drive,
    S: DistanceSensor,
    DL: DelayNs,
    C: Clock,
{
    pub fn new(
        drive: D,
        sensor: S,
        delay: DL,
        clock: C,
        config: AvoidanceConfig,
    ) -> Self {
        let last_forward_ms = clock.now_ms();
        AvoidanceLoop {
            drive,
            sensor,
            delay,
            clock,
            config,
            state: LoopState {
                phase: Phase::Cruising,
                last_forward_ms,
            },
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn config(&self) -> &AvoidanceConfig {
        &self.config
    }

    pub fn into_parts(self) -> (D, S, DL, C) {
        (self.drive, self.sensor, self.delay, self.clock)
    }

    /// Issue the first forward command and start the re-assert timer.
    pub fn start(&mut self) {
        if self.state.phase == Phase::Stopped {
            return;
        }
        self.state.phase = Phase::Cruising;
        self.forward();
        tracing::info!(speed = %self.config.cruise_speed, "cruising");
    }

    /// Run until a stop is requested or the sensor fails.
    ///
    /// The shutdown sequence has always run by the time this returns.
    pub fn run(
        &mut self,
        stop: &StopToken,
    ) -> Result<(), AvoidanceError<S::Error>> {
        if !stop.is_stop_requested() {
            self.start();
        }
        loop {
            if let TickOutcome::Stopped = self.tick(stop)? {
                return Ok(());
            }
        }
    }

    /// One loop iteration, including the trailing tick sleep.
    pub fn tick(
        &mut self,
        stop: &StopToken,
    ) -> Result<TickOutcome, AvoidanceError<S::Error>> {
        if self.state.phase == Phase::Stopped {
            return Ok(TickOutcome::Stopped);
        }
        if stop.is_stop_requested() {
            self.shutdown();
            return Ok(TickOutcome::Stopped);
        }

        let now = self.clock.now_ms();
        if now.saturating_sub(self.state.last_forward_ms) >= u64::from(self.config.reassert_interval_ms) {
            tracing::debug!("re-asserting forward command");
            self.forward();
        }

        let distance_mm = self.sample()?;
        tracing::info!("Distance: {}mm", distance_mm);

        let outcome = if distance_mm <= self.config.obstacle_threshold_mm {
            tracing::info!(distance_mm, "obstacle detected, stopping");
            match self.avoid(stop)? {
                Some(report) => TickOutcome::Avoided(report),
                None => {
                    self.shutdown();
                    return Ok(TickOutcome::Stopped);
                }
            }
        } else {
            TickOutcome::Clear { distance_mm }
        };

        if !self.dwell(self.config.tick_interval_ms, stop) {
            self.shutdown();
            return Ok(TickOutcome::Stopped);
        }
        Ok(outcome)
    }

    /// Stop the motors and release the sensor. Runs at most once.
    pub fn shutdown(&mut self) {
        if self.state.phase == Phase::Stopped {
            return;
        }
        tracing::info!("shutting down: stopping motors and ranging");
        self.send(MotionCommand::stop());
        if let Err(error) = self.sensor.stop_ranging() {
            tracing::warn!(?error, "failed to stop ranging");
        }
        self.state.phase = Phase::Stopped;
    }

    /// Stop, look around, turn toward the open side and resume cruising.
    ///
    /// Returns `None` if a stop was requested part way through.
    fn avoid(
        &mut self,
        stop: &StopToken,
    ) -> Result<Option<ScanReport>, AvoidanceError<S::Error>> {
        self.state.phase = Phase::Avoiding;
        self.send(MotionCommand::stop());

        let (mut left_mm, mut right_mm) = (0u16, 0u16);
        for step in SCAN_SEQUENCE {
            self.send(MotionCommand::rotate(step.rotate, self.config.turn_speed));
            if !self.dwell(self.config.scan_dwell_ms, stop) {
                return Ok(None);
            }
            if let Some(side) = step.sample {
                let mm = self.sample()?;
                match side {
                    Direction::Left => {
                        tracing::info!("Left distance: {}mm", mm);
                        left_mm = mm;
                    }
                    Direction::Right => {
                        tracing::info!("Right distance: {}mm", mm);
                        right_mm = mm;
                    }
                }
            }
        }

        let chosen = choose_direction(left_mm, right_mm, self.config.tie_break);
        tracing::info!("Choosing the {} path.", chosen.as_str());

        self.send(MotionCommand::rotate(chosen, self.config.turn_speed));
        if !self.dwell(self.config.clear_turn_ms, stop) {
            return Ok(None);
        }

        self.forward();
        self.state.phase = Phase::Cruising;
        Ok(Some(ScanReport {
            left_mm,
            right_mm,
            chosen,
        }))
    }

    /// Read a distance under the configured fault policy.
    ///
    /// A final failure shuts the loop down before it is returned.
    fn sample(&mut self) -> Result<u16, AvoidanceError<S::Error>> {
        let attempts = self.config.sensor_fault.attempts();
        let mut attempt = 1;
        loop {
            match self.sensor.read_distance() {
                Ok(mm) => return Ok(mm),
                Err(error) if attempt < attempts => {
                    tracing::warn!(?error, attempt, "distance read failed, retrying");
                    attempt += 1;
                }
                Err(error) => {
                    tracing::error!(?error, "distance read failed");
                    self.shutdown();
                    return Err(AvoidanceError::Sensor(error));
                }
            }
        }
    }

    /// Block for `ms`, checking for a stop request every tick interval.
    ///
    /// Returns `false` if the wait was cut short by a stop request.
    fn dwell(
        &mut self,
        ms: u32,
        stop: &StopToken,
    ) -> bool {
        let slice = self.config.tick_interval_ms.max(1);
        let mut remaining = ms;
        while remaining > 0 {
            if stop.is_stop_requested() {
                return false;
            }
            let step = remaining.min(slice);
            self.delay.delay_ms(step);
            remaining -= step;
        }
        !stop.is_stop_requested()
    }

    fn forward(&mut self) {
        self.send(MotionCommand::forward(self.config.cruise_speed));
        self.state.last_forward_ms = self.clock.now_ms();
    }

    /// Fire-and-forget send; nothing goes out once stopped.
    fn send(
        &mut self,
        cmd: MotionCommand,
    ) {
        if self.state.phase == Phase::Stopped {
            return;
        }
        if let Err(error) = self.drive.send_motion(cmd) {
            tracing::warn!(?error, left = %cmd.left, right = %cmd.right, "drive command failed");
        }
    }
}
