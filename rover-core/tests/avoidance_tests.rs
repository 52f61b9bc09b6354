use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use rover_core::utils::behavior::{
    AvoidanceConfig,
    AvoidanceError,
    AvoidanceLoop,
    Clock,
    Direction,
    Phase,
    ScanReport,
    SensorFaultPolicy,
    TickOutcome,
};
use rover_core::utils::controllers::{DistanceSensor, Drive, MotionCommand};
use rover_core::utils::StopToken;

const FORWARD: MotionCommand = MotionCommand::forward(0.3);
const STOP: MotionCommand = MotionCommand::STOP;
const LEFT: MotionCommand = MotionCommand::rotate(Direction::Left, 0.4);
const RIGHT: MotionCommand = MotionCommand::rotate(Direction::Right, 0.4);

#[derive(Debug, Clone, Copy, PartialEq)]
enum Event {
    Motion(MotionCommand),
    StopRanging,
}

type Log = Rc<RefCell<Vec<Event>>>;

#[derive(Debug, Clone, Copy, PartialEq)]
struct SensorFault;

/// Simulated time in nanoseconds, advanced only by the delay.
#[derive(Clone, Default)]
struct SimClock(Rc<Cell<u64>>);

impl Clock for SimClock {
    fn now_ms(&self) -> u64 {
        self.0.get() / 1_000_000
    }
}

/// Delay that moves the simulated clock and can raise a stop request once a
/// given time is reached, standing in for a Ctrl-C arriving mid-wait.
struct SimDelay {
    clock: SimClock,
    stop: Rc<StopToken>,
    stop_at_ms: Option<u64>,
}

impl DelayNs for SimDelay {
    fn delay_ns(
        &mut self,
        ns: u32,
    ) {
        self.clock.0.set(self.clock.0.get() + u64::from(ns));
        if let Some(at) = self.stop_at_ms {
            if self.clock.now_ms() >= at {
                self.stop.request_stop();
            }
        }
    }
}

struct Recorder(Log);

impl Drive for Recorder {
    type Error = Infallible;

    fn send_motion(
        &mut self,
        cmd: MotionCommand,
    ) -> Result<(), Self::Error> {
        self.0.borrow_mut().push(Event::Motion(cmd));
        Ok(())
    }
}

/// Plays back a fixed list of readings. Once the list runs out it asks the
/// loop to stop and reports open space.
struct ScriptedSensor {
    readings: VecDeque<Result<u16, SensorFault>>,
    log: Log,
    stop: Rc<StopToken>,
}

impl DistanceSensor for ScriptedSensor {
    type Error = SensorFault;

    fn read_distance(&mut self) -> Result<u16, Self::Error> {
        match self.readings.pop_front() {
            Some(reading) => reading,
            None => {
                self.stop.request_stop();
                Ok(2_000)
            }
        }
    }

    fn stop_ranging(&mut self) -> Result<(), Self::Error> {
        self.log.borrow_mut().push(Event::StopRanging);
        Ok(())
    }
}

type SimLoop = AvoidanceLoop<Recorder, ScriptedSensor, SimDelay, SimClock>;

struct Rig {
    avoid: SimLoop,
    log: Log,
    clock: SimClock,
    stop: Rc<StopToken>,
}

impl Rig {
    fn new(
        readings: &[Result<u16, SensorFault>],
        config: AvoidanceConfig,
    ) -> Self {
        Self::with_stop_at(readings, config, None)
    }

    fn with_stop_at(
        readings: &[Result<u16, SensorFault>],
        config: AvoidanceConfig,
        stop_at_ms: Option<u64>,
    ) -> Self {
        let log: Log = Rc::default();
        let clock = SimClock::default();
        let stop = Rc::new(StopToken::new());
        let sensor = ScriptedSensor {
            readings: readings.iter().copied().collect(),
            log: log.clone(),
            stop: stop.clone(),
        };
        let delay = SimDelay {
            clock: clock.clone(),
            stop: stop.clone(),
            stop_at_ms,
        };
        let avoid = AvoidanceLoop::new(Recorder(log.clone()), sensor, delay, clock.clone(), config);
        Rig {
            avoid,
            log,
            clock,
            stop,
        }
    }

    fn motions(&self) -> Vec<MotionCommand> {
        self.log
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Event::Motion(cmd) => Some(*cmd),
                Event::StopRanging => None,
            })
            .collect()
    }

    fn stop_ranging_count(&self) -> usize {
        self.log
            .borrow()
            .iter()
            .filter(|e| **e == Event::StopRanging)
            .count()
    }

    fn tick(&mut self) -> TickOutcome {
        self.avoid.tick(&self.stop).unwrap()
    }
}

fn ok(readings: &[u16]) -> Vec<Result<u16, SensorFault>> {
    readings.iter().map(|&mm| Ok(mm)).collect()
}

#[test]
fn obstacle_run_produces_documented_command_trace() {
    let mut rig = Rig::new(&ok(&[1000, 1000, 350, 200, 600]), AvoidanceConfig::default());
    rig.avoid.run(&rig.stop).unwrap();

    assert_eq!(
        rig.motions(),
        vec![FORWARD, STOP, LEFT, RIGHT, RIGHT, LEFT, RIGHT, FORWARD, STOP]
    );
    assert_eq!(rig.stop_ranging_count(), 1);
    assert_eq!(rig.log.borrow().last(), Some(&Event::StopRanging));
    assert_eq!(rig.avoid.state().phase, Phase::Stopped);
}

#[test]
fn forward_is_reasserted_only_after_interval() {
    let mut rig = Rig::new(&ok(&[1000; 21]), AvoidanceConfig::default());
    rig.avoid.start();

    // Ticks at t = 0, 100, ..., 1900 ms.
    for _ in 0..20 {
        assert!(matches!(rig.tick(), TickOutcome::Clear { distance_mm: 1000 }));
        assert_eq!(rig.avoid.state().phase, Phase::Cruising);
    }
    assert_eq!(rig.motions(), vec![FORWARD]);

    // t = 2000 ms
    rig.tick();
    assert_eq!(rig.motions(), vec![FORWARD, FORWARD]);
    assert_eq!(rig.avoid.state().last_forward_ms, 2_000);
}

#[test]
fn threshold_is_inclusive() {
    let mut rig = Rig::new(&ok(&[401, 400, 900, 100]), AvoidanceConfig::default());
    rig.avoid.start();

    assert!(matches!(rig.tick(), TickOutcome::Clear { distance_mm: 401 }));
    assert_eq!(rig.motions(), vec![FORWARD]);

    let outcome = rig.tick();
    assert_eq!(
        outcome,
        TickOutcome::Avoided(ScanReport {
            left_mm: 900,
            right_mm: 100,
            chosen: Direction::Left,
        })
    );
    assert_eq!(
        rig.motions(),
        vec![FORWARD, STOP, LEFT, RIGHT, RIGHT, LEFT, LEFT, FORWARD]
    );
}

#[test]
fn scan_sequence_is_fixed_regardless_of_readings() {
    for (left, right, chosen) in [
        (500, 300, Direction::Left),
        (300, 500, Direction::Right),
        (400, 400, Direction::Right),
    ] {
        let mut rig = Rig::new(&ok(&[10, left, right]), AvoidanceConfig::default());
        rig.avoid.start();
        let outcome = rig.tick();
        assert_eq!(
            outcome,
            TickOutcome::Avoided(ScanReport {
                left_mm: left,
                right_mm: right,
                chosen,
            })
        );
        let motions = rig.motions();
        assert_eq!(&motions[..6], &[FORWARD, STOP, LEFT, RIGHT, RIGHT, LEFT]);
        assert_eq!(motions[6], MotionCommand::rotate(chosen, 0.4));
        assert_eq!(motions[7], FORWARD);
    }
}

#[test]
fn tie_break_is_configurable() {
    let config = AvoidanceConfig {
        tie_break: Direction::Left,
        ..AvoidanceConfig::default()
    };
    let mut rig = Rig::new(&ok(&[10, 400, 400]), config);
    rig.avoid.start();
    match rig.tick() {
        TickOutcome::Avoided(report) => assert_eq!(report.chosen, Direction::Left),
        other => panic!("expected avoidance, got {:?}", other),
    }
}

#[test]
fn avoidance_resets_reassert_timer() {
    let mut rig = Rig::new(&ok(&[350, 200, 600]), AvoidanceConfig::default());
    rig.avoid.start();
    assert!(matches!(rig.tick(), TickOutcome::Avoided(_)));

    // Four scan legs, the clearing turn, then one tick sleep.
    let now = rig.clock.now_ms();
    assert_eq!(now, 4 * 1_000 + 2_000 + 100);
    let state = rig.avoid.state();
    assert_eq!(state.phase, Phase::Cruising);
    assert_eq!(state.last_forward_ms, now - 100);

    let sent_before = rig.motions().len();
    rig.avoid.tick(&StopToken::new()).unwrap();
    assert_eq!(rig.motions().len(), sent_before);
}

#[test]
fn stop_during_scan_shuts_down_once() {
    let mut rig = Rig::with_stop_at(&ok(&[350, 200]), AvoidanceConfig::default(), Some(1_500));
    rig.avoid.run(&rig.stop).unwrap();

    assert_eq!(rig.motions(), vec![FORWARD, STOP, LEFT, RIGHT, STOP]);
    assert_eq!(rig.stop_ranging_count(), 1);
    // Cancellation is observed within one tick slice of the request.
    assert_eq!(rig.clock.now_ms(), 1_500);

    assert_eq!(rig.tick(), TickOutcome::Stopped);
    rig.avoid.shutdown();
    assert_eq!(rig.motions().len(), 5);
    assert_eq!(rig.stop_ranging_count(), 1);
}

#[test]
fn stop_during_clear_turn_shuts_down_once() {
    // Scan ends at 4000 ms, so 4500 ms lands inside the 2000 ms clearing turn.
    let mut rig = Rig::with_stop_at(&ok(&[350, 200, 600]), AvoidanceConfig::default(), Some(4_500));
    rig.avoid.start();

    assert_eq!(rig.tick(), TickOutcome::Stopped);
    assert_eq!(
        rig.motions(),
        vec![FORWARD, STOP, LEFT, RIGHT, RIGHT, LEFT, RIGHT, STOP]
    );
    assert_eq!(rig.stop_ranging_count(), 1);
    assert_eq!(rig.clock.now_ms(), 4_500);
    assert_eq!(rig.avoid.state().phase, Phase::Stopped);
}

#[test]
fn stop_before_first_tick_only_shuts_down() {
    let mut rig = Rig::new(&ok(&[1000]), AvoidanceConfig::default());
    rig.stop.request_stop();
    rig.avoid.run(&rig.stop).unwrap();

    assert_eq!(rig.motions(), vec![STOP]);
    assert_eq!(rig.stop_ranging_count(), 1);
}

#[test]
fn sensor_failure_aborts_after_shutdown() {
    let mut rig = Rig::new(&[Ok(1000), Err(SensorFault)], AvoidanceConfig::default());
    let result = rig.avoid.run(&rig.stop);

    assert!(matches!(result, Err(AvoidanceError::Sensor(SensorFault))));
    assert_eq!(rig.motions(), vec![FORWARD, STOP]);
    assert_eq!(rig.stop_ranging_count(), 1);
    assert_eq!(rig.avoid.state().phase, Phase::Stopped);
}

#[test]
fn retry_policy_rides_out_transient_faults() {
    let config = AvoidanceConfig {
        sensor_fault: SensorFaultPolicy::Retry(3),
        ..AvoidanceConfig::default()
    };
    let mut rig = Rig::new(&[Err(SensorFault), Err(SensorFault), Ok(1000)], config);
    rig.avoid.start();
    assert_eq!(rig.tick(), TickOutcome::Clear { distance_mm: 1000 });
    assert_eq!(rig.motions(), vec![FORWARD]);
}

#[test]
fn retry_policy_gives_up_after_attempts() {
    let config = AvoidanceConfig {
        sensor_fault: SensorFaultPolicy::Retry(2),
        ..AvoidanceConfig::default()
    };
    let mut rig = Rig::new(&[Err(SensorFault), Err(SensorFault), Ok(1000)], config);
    rig.avoid.start();
    assert!(matches!(
        rig.avoid.tick(&rig.stop),
        Err(AvoidanceError::Sensor(SensorFault))
    ));
    assert_eq!(rig.motions(), vec![FORWARD, STOP]);
}

struct DeadLink(Rc<Cell<usize>>);

impl Drive for DeadLink {
    type Error = &'static str;

    fn send_motion(
        &mut self,
        _cmd: MotionCommand,
    ) -> Result<(), Self::Error> {
        self.0.set(self.0.get() + 1);
        Err("port closed")
    }
}

#[test]
fn drive_failures_are_not_fatal() {
    let sends = Rc::new(Cell::new(0));
    let log: Log = Rc::default();
    let stop = Rc::new(StopToken::new());
    let clock = SimClock::default();
    let sensor = ScriptedSensor {
        readings: ok(&[1000, 1000]).into(),
        log: log.clone(),
        stop: stop.clone(),
    };
    let delay = SimDelay {
        clock: clock.clone(),
        stop: stop.clone(),
        stop_at_ms: None,
    };
    let mut avoid = AvoidanceLoop::new(
        DeadLink(sends.clone()),
        sensor,
        delay,
        clock,
        AvoidanceConfig::default(),
    );

    avoid.run(&stop).unwrap();
    // start forward + shutdown stop, no retries
    assert_eq!(sends.get(), 2);
    assert_eq!(*log.borrow(), vec![Event::StopRanging]);
}
