//! Plan execution driver.
//!
//! Walks an agent through an ordered [`Plan`], one step at a time:
//!
//! ```text
//! Idle -> Resolving(i) -> Moving(i) -> Settling(i) -> Resolving(i + 1) -> ... -> Done
//! ```
//!
//! A step whose name is missing from the [`LocationMap`] is skipped and goes
//! straight to the next `Resolving`. An unreachable target counts as an
//! instantly finished movement and still settles. Nothing here aborts a plan
//! that has started; only a stop request ends it early.

use std::time::{Duration, Instant};

use spin_sleep::SpinSleeper;
use tokio::time;
use tracing::{debug, info};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::NavigationError;
use crate::map::point_types::Cell;
use crate::mover::{MoveOutcome, MoveStatus, Mover};
use crate::plan::{LocationMap, Plan};
use crate::signal::StopSignal;

/// Driver timing parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DriverConfig {
    /// Pause after each completed movement.
    pub settle_pause: Duration,
    /// Period of the movement update loop.
    pub tick_interval: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            settle_pause: Duration::from_millis(200),
            tick_interval: Duration::from_millis(20),
        }
    }
}

impl DriverConfig {
    /// Checks that the tick interval is non-zero.
    pub fn validate(&self) -> Result<(), NavigationError> {
        if self.tick_interval.is_zero() {
            return Err(NavigationError::InvalidInterval(
                "tick interval must be non-zero",
            ));
        }
        Ok(())
    }
}

/// Where the driver is in the plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// Not started.
    Idle,
    /// Looking up the target cell of step `i`.
    Resolving(usize),
    /// Moving toward the target of step `i`.
    Moving(usize),
    /// Pausing after step `i`.
    Settling(usize),
    /// Every step was handled, or the plan was stopped.
    Done,
}

/// What happened while executing a plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriverReport {
    /// Steps in the plan.
    pub steps: usize,
    /// Steps whose movement completed, including zero-length ones.
    pub moved: usize,
    /// Steps skipped because their name did not resolve.
    pub skipped: usize,
    /// Steps whose target could not be reached.
    pub unreachable: usize,
    /// Waypoints reached across all movements.
    pub waypoints: usize,
    /// True if a stop request ended the plan early.
    pub stopped: bool,
}

/// Executes one plan for one agent.
#[derive(Debug)]
pub struct PlanDriver {
    name: String,
    plan: Plan,
    locations: LocationMap,
    mover: Mover,
    config: DriverConfig,
    stop: StopSignal,
    state: DriverState,
    settle_left: Duration,
    report: DriverReport,
}

impl PlanDriver {
    /// Creates a driver for `plan`, resolving names through `locations`.
    pub fn new(
        name: impl Into<String>,
        plan: Plan,
        locations: LocationMap,
        mover: Mover,
        config: DriverConfig,
    ) -> Result<Self, NavigationError> {
        config.validate()?;
        let report = DriverReport {
            steps: plan.len(),
            ..DriverReport::default()
        };
        Ok(PlanDriver {
            name: name.into(),
            plan,
            locations,
            mover,
            config,
            stop: StopSignal::never(),
            state: DriverState::Idle,
            settle_left: Duration::ZERO,
            report,
        })
    }

    /// Replaces the stop signal checked between steps and advances.
    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    /// Agent name used in log events.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The plan being executed.
    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    /// Current state.
    pub fn state(&self) -> DriverState {
        self.state
    }

    /// True once the plan has finished or was stopped.
    pub fn is_done(&self) -> bool {
        self.state == DriverState::Done
    }

    /// Counters collected so far.
    pub fn report(&self) -> &DriverReport {
        &self.report
    }

    /// The agent's mover.
    pub fn mover(&self) -> &Mover {
        &self.mover
    }

    /// Mutable access to the agent's mover, e.g. to teleport before a run.
    pub fn mover_mut(&mut self) -> &mut Mover {
        &mut self.mover
    }

    /// Emits the plan trace and leaves `Idle`.
    fn start(&mut self) {
        info!(agent = %self.name, steps = self.plan.len(), "{}", self.plan.describe());
        self.state = DriverState::Resolving(0);
    }

    fn finish(&mut self) {
        self.state = DriverState::Done;
        info!(
            agent = %self.name,
            moved = self.report.moved,
            skipped = self.report.skipped,
            unreachable = self.report.unreachable,
            waypoints = self.report.waypoints,
            "Plan complete"
        );
    }

    fn abort(&mut self) {
        self.mover.halt();
        self.report.stopped = true;
        self.state = DriverState::Done;
        info!(agent = %self.name, "Plan stopped");
    }

    /// Resolves step `index`, counting a skip when the name is unknown.
    fn resolve(&mut self, index: usize) -> Option<Cell> {
        let step = self.plan.get(index)?;
        match self.locations.resolve(&step.name) {
            Some(cell) => Some(cell),
            None => {
                debug!(agent = %self.name, step = index, name = %step.name, "No location for step, skipping");
                self.report.skipped += 1;
                None
            }
        }
    }

    fn enter_settling(&mut self, index: usize) {
        self.settle_left = self.config.settle_pause;
        self.state = DriverState::Settling(index);
    }

    /// Performs one bounded update covering `dt`.
    ///
    /// Resolution is instantaneous, so a tick may pass several skipped steps
    /// before it starts a movement. Time is only consumed while moving or
    /// settling.
    pub fn tick(&mut self, mut dt: Duration) -> DriverState {
        loop {
            match self.state {
                DriverState::Idle => self.start(),
                DriverState::Resolving(index) => {
                    if self.stop.is_stopped() {
                        self.abort();
                        break;
                    }
                    if index >= self.plan.len() {
                        self.finish();
                        break;
                    }
                    let Some(target) = self.resolve(index) else {
                        self.state = DriverState::Resolving(index + 1);
                        continue;
                    };
                    match self.mover.begin(target) {
                        MoveStatus::Moving => self.state = DriverState::Moving(index),
                        MoveStatus::Arrived | MoveStatus::Idle => {
                            self.report.moved += 1;
                            self.enter_settling(index);
                        }
                        MoveStatus::Unreachable => {
                            self.report.unreachable += 1;
                            self.enter_settling(index);
                        }
                    }
                    break;
                }
                DriverState::Moving(index) => {
                    if self.stop.is_stopped() {
                        self.abort();
                        break;
                    }
                    match self.mover.advance(dt.as_secs_f32()) {
                        MoveStatus::Moving => {}
                        MoveStatus::Arrived | MoveStatus::Idle | MoveStatus::Unreachable => {
                            self.report.moved += 1;
                            self.report.waypoints += self.mover.waypoints_traversed();
                            info!(agent = %self.name, step = index, cell = %self.mover.cell(), "Step reached");
                            self.enter_settling(index);
                        }
                    }
                    break;
                }
                DriverState::Settling(index) => {
                    if self.stop.is_stopped() {
                        self.abort();
                        break;
                    }
                    self.settle_left = self.settle_left.saturating_sub(dt);
                    if self.settle_left.is_zero() {
                        self.state = DriverState::Resolving(index + 1);
                        // The next movement starts fresh within this tick.
                        dt = Duration::ZERO;
                        continue;
                    }
                    break;
                }
                DriverState::Done => break,
            }
        }
        self.state
    }

    /// Runs the whole plan, suspending on `tokio` timers.
    ///
    /// Returns once every step was handled or a stop was requested.
    pub async fn run(&mut self) -> DriverReport {
        if self.state == DriverState::Idle {
            self.start();
        }
        let start_index = match self.state {
            DriverState::Resolving(i) | DriverState::Moving(i) => i,
            DriverState::Settling(i) => i + 1,
            DriverState::Idle | DriverState::Done => return self.report,
        };

        for index in start_index..self.plan.len() {
            if self.stop.is_stopped() {
                self.abort();
                return self.report;
            }
            self.state = DriverState::Resolving(index);
            let Some(target) = self.resolve(index) else {
                continue;
            };

            self.state = DriverState::Moving(index);
            let outcome = self
                .mover
                .move_to(target, self.config.tick_interval, &self.stop)
                .await;
            match outcome {
                MoveOutcome::Arrived { waypoints } => {
                    self.report.moved += 1;
                    self.report.waypoints += waypoints;
                    info!(agent = %self.name, step = index, cell = %target, "Step reached");
                }
                MoveOutcome::Unreachable => {
                    debug!(agent = %self.name, step = index, cell = %target, "Target unreachable");
                    self.report.unreachable += 1;
                }
                MoveOutcome::Stopped => {
                    self.abort();
                    return self.report;
                }
            }

            self.enter_settling(index);
            let interrupted = tokio::select! {
                _ = time::sleep(self.config.settle_pause) => false,
                _ = self.stop.stopped() => true,
            };
            if interrupted {
                self.abort();
                return self.report;
            }
        }

        self.finish();
        self.report
    }

    /// Runs the whole plan on the calling thread, ticking at the configured
    /// interval. Meant for dedicated threads outside an async runtime.
    pub fn run_blocking(&mut self) -> DriverReport {
        let sleeper = SpinSleeper::new(10_000);
        let mut last = Instant::now();
        self.tick(Duration::ZERO);
        while !self.is_done() {
            sleeper.sleep(self.config.tick_interval);
            let now = Instant::now();
            self.tick(now - last);
            last = now;
        }
        self.report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::grid::GridMap;
    use crate::map::point_types::WorldPoint;
    use crate::mover::MoverConfig;
    use crate::plan::PlanStep;
    use crate::signal::stop_channel;
    use std::sync::Arc;

    fn grid(width: u32, height: u32, blocked: &[Cell]) -> Arc<GridMap> {
        Arc::new(
            GridMap::new(width, height, 1.0, WorldPoint::origin())
                .unwrap()
                .with_blocked(blocked.iter().copied())
                .unwrap(),
        )
    }

    fn step(name: &str, col: f32, row: f32) -> PlanStep {
        PlanStep::new(name, WorldPoint::new(col, 0.0, row))
    }

    fn driver(grid: &Arc<GridMap>, start: Cell, plan: Plan, locations: LocationMap) -> PlanDriver {
        let mover = Mover::new(
            Arc::clone(grid),
            MoverConfig::default(),
            grid.grid_to_world(start),
        )
        .unwrap();
        PlanDriver::new("tester", plan, locations, mover, DriverConfig::default()).unwrap()
    }

    fn tick_to_done(driver: &mut PlanDriver, dt: Duration) -> Vec<DriverState> {
        let mut seen = vec![driver.state()];
        for _ in 0..100_000 {
            let state = driver.tick(dt);
            if seen.last() != Some(&state) {
                seen.push(state);
            }
            if state == DriverState::Done {
                return seen;
            }
        }
        panic!("driver never finished");
    }

    #[test]
    fn test_rejects_zero_tick_interval() {
        let config = DriverConfig {
            tick_interval: Duration::ZERO,
            ..DriverConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(err, NavigationError::InvalidInterval("tick interval must be non-zero"));
        assert_eq!(err.to_string(), "Invalid tick interval: tick interval must be non-zero");
    }

    #[test]
    fn test_tick_walks_state_machine() {
        let grid = grid(5, 5, &[]);
        let plan: Plan = [step("A", 2.0, 0.0), step("B", 2.0, 2.0)].into_iter().collect();
        let locations = LocationMap::from_plan(&plan);
        let mut driver = driver(&grid, Cell::new(0, 0), plan, locations);

        let seen = tick_to_done(&mut driver, Duration::from_millis(20));
        assert_eq!(
            seen,
            vec![
                DriverState::Idle,
                DriverState::Moving(0),
                DriverState::Settling(0),
                DriverState::Moving(1),
                DriverState::Settling(1),
                DriverState::Done,
            ]
        );
        assert_eq!(driver.mover().cell(), Cell::new(2, 2));
        let report = driver.report();
        assert_eq!(report.moved, 2);
        assert_eq!(report.waypoints, 4);
        assert!(!report.stopped);
    }

    #[test]
    fn test_unresolved_step_is_skipped_without_moving() {
        let grid = grid(5, 5, &[]);
        let plan: Plan = [step("Ghost", 4.0, 4.0)].into_iter().collect();
        let mut driver = driver(&grid, Cell::new(1, 1), plan, LocationMap::new());
        let before = *driver.mover().position();

        let seen = tick_to_done(&mut driver, Duration::from_millis(20));
        assert_eq!(seen, vec![DriverState::Idle, DriverState::Done]);
        assert_eq!(*driver.mover().position(), before);
        assert_eq!(driver.report().skipped, 1);
        assert_eq!(driver.report().moved, 0);
    }

    #[test]
    fn test_unreachable_step_still_settles() {
        let wall: Vec<Cell> = (0..5).map(|row| Cell::new(2, row)).collect();
        let grid = grid(5, 5, &wall);
        let plan: Plan = [step("Far", 4.0, 0.0), step("Near", 1.0, 0.0)].into_iter().collect();
        let locations = LocationMap::from_plan(&plan);
        let mut driver = driver(&grid, Cell::new(0, 0), plan, locations);

        let seen = tick_to_done(&mut driver, Duration::from_millis(20));
        assert_eq!(seen[1], DriverState::Settling(0));
        assert_eq!(driver.report().unreachable, 1);
        assert_eq!(driver.report().moved, 1);
        assert_eq!(driver.mover().cell(), Cell::new(1, 0));
    }

    #[test]
    fn test_stop_between_steps_ends_plan() {
        let grid = grid(5, 5, &[]);
        let plan: Plan = [step("A", 1.0, 0.0), step("B", 4.0, 4.0)].into_iter().collect();
        let locations = LocationMap::from_plan(&plan);
        let (handle, signal) = stop_channel();
        let mut driver =
            driver(&grid, Cell::new(0, 0), plan, locations).with_stop_signal(signal);

        while driver.tick(Duration::from_millis(20)) != DriverState::Settling(0) {}
        handle.stop();
        while driver.tick(Duration::from_millis(20)) != DriverState::Done {}

        assert!(driver.report().stopped);
        assert_eq!(driver.report().moved, 1);
        assert_eq!(driver.mover().cell(), Cell::new(1, 0));
    }

    #[test]
    fn test_stop_during_settle_ends_plan_on_next_tick() {
        let grid = grid(5, 5, &[]);
        let plan: Plan = [step("Here", 0.0, 0.0), step("B", 4.0, 4.0)].into_iter().collect();
        let locations = LocationMap::from_plan(&plan);
        let (handle, signal) = stop_channel();
        let mut driver =
            driver(&grid, Cell::new(0, 0), plan, locations).with_stop_signal(signal);

        assert_eq!(driver.tick(Duration::ZERO), DriverState::Settling(0));
        handle.stop();

        assert_eq!(driver.tick(Duration::from_millis(1)), DriverState::Done);
        assert!(driver.report().stopped);
        assert_eq!(driver.report().moved, 1);
        assert_eq!(driver.mover().cell(), Cell::new(0, 0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_pauses_between_steps() {
        let grid = grid(5, 5, &[]);
        // Both steps resolve to the start cell: no travel, only settle pauses.
        let plan: Plan = [step("Here", 2.0, 2.0), step("AlsoHere", 2.9, 2.1)]
            .into_iter()
            .collect();
        let locations = LocationMap::from_plan(&plan);
        let mut driver = driver(&grid, Cell::new(2, 2), plan, locations);
        let started = time::Instant::now();

        let report = driver.run().await;

        assert_eq!(report.moved, 2);
        assert_eq!(report.waypoints, 0);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(400) && elapsed < Duration::from_millis(410));
        assert_eq!(driver.state(), DriverState::Done);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_during_settle() {
        let grid = grid(5, 5, &[]);
        let plan: Plan = [step("Here", 0.0, 0.0), step("There", 4.0, 4.0)].into_iter().collect();
        let locations = LocationMap::from_plan(&plan);
        let (handle, signal) = stop_channel();
        let mut driver =
            driver(&grid, Cell::new(0, 0), plan, locations).with_stop_signal(signal);

        let stopper = async {
            time::sleep(Duration::from_millis(100)).await;
            handle.stop();
        };
        let (report, _) = tokio::join!(driver.run(), stopper);

        assert!(report.stopped);
        assert_eq!(report.moved, 1);
        assert_eq!(driver.mover().cell(), Cell::new(0, 0));
    }

    #[test]
    fn test_run_blocking_completes() {
        let grid = grid(3, 1, &[]);
        let plan: Plan = [step("End", 2.0, 0.0)].into_iter().collect();
        let locations = LocationMap::from_plan(&plan);
        let mover = Mover::new(
            Arc::clone(&grid),
            MoverConfig {
                speed: 50.0,
                arrive_epsilon: 0.05,
            },
            grid.grid_to_world(Cell::new(0, 0)),
        )
        .unwrap();
        let config = DriverConfig {
            settle_pause: Duration::from_millis(5),
            tick_interval: Duration::from_millis(2),
        };
        let mut driver = PlanDriver::new("blocking", plan, locations, mover, config).unwrap();

        let report = driver.run_blocking();
        assert_eq!(report.moved, 1);
        assert_eq!(report.waypoints, 2);
        assert_eq!(driver.mover().cell(), Cell::new(2, 0));
    }
}
