//! Waypoint-following mover for a single agent.
//!
//! The mover owns the agent's continuous position. A movement request computes
//! a path from the agent's current cell to a target cell, then walks the path
//! one waypoint at a time: each advance moves the agent in a straight line on
//! the ground plane toward the next waypoint center, at a fixed speed scaled
//! by elapsed time. Once within the arrival tolerance the horizontal position
//! is snapped exactly onto the waypoint center. Height is never changed.
//!
//! Two ways to drive it:
//! * [`Mover::begin`] + [`Mover::advance`] perform one bounded update per call,
//!   for hosts with their own tick loop.
//! * [`Mover::move_to`] suspends on a `tokio` interval until the movement
//!   finishes or a stop is requested.

#![warn(missing_docs)]

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};
use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::astar::find_path;
use crate::error::NavigationError;
use crate::map::grid::GridMap;
use crate::map::point_types::{Cell, WorldPoint};
use crate::signal::StopSignal;

/// Mover tuning parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct MoverConfig {
    /// Travel speed in world units per second.
    pub speed: f32,
    /// Horizontal distance under which a waypoint counts as reached.
    pub arrive_epsilon: f32,
}

impl Default for MoverConfig {
    fn default() -> Self {
        Self {
            speed: 4.0,
            arrive_epsilon: 0.05,
        }
    }
}

impl MoverConfig {
    /// Checks that speed and tolerance are positive and finite.
    pub fn validate(&self) -> Result<(), NavigationError> {
        if !self.speed.is_finite() || self.speed <= 0.0 {
            return Err(NavigationError::InvalidSpeed("must be positive and finite"));
        }
        if !self.arrive_epsilon.is_finite() || self.arrive_epsilon <= 0.0 {
            return Err(NavigationError::InvalidTolerance(
                "must be positive and finite",
            ));
        }
        Ok(())
    }
}

/// Result of a single step-API call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveStatus {
    /// A movement is in progress.
    Moving,
    /// The movement reached its target cell.
    Arrived,
    /// No path to the target exists; the agent did not move.
    Unreachable,
    /// No movement is active.
    Idle,
}

/// Result of an asynchronous [`Mover::move_to`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Target reached after walking `waypoints` path cells past the start.
    Arrived {
        /// Number of waypoints reached, excluding the start cell.
        waypoints: usize,
    },
    /// No path to the target exists; the agent did not move.
    Unreachable,
    /// A stop was requested before the target was reached.
    Stopped,
}

/// Receives every position change of a mover.
pub trait PositionObserver: Send {
    /// Called after the position changed.
    fn on_position(&mut self, position: &WorldPoint);
}

impl<F> PositionObserver for F
where
    F: FnMut(&WorldPoint) + Send,
{
    fn on_position(&mut self, position: &WorldPoint) {
        self(position)
    }
}

/// The path being walked and the index of the next unreached waypoint.
#[derive(Debug, Clone)]
struct ActiveMove {
    path: Vec<Cell>,
    next: usize,
}

/// Moves one agent along grid paths.
pub struct Mover {
    grid: Arc<GridMap>,
    config: MoverConfig,
    position: WorldPoint,
    active: Option<ActiveMove>,
    /// Waypoints reached by the current or last movement.
    traversed: usize,
    observer: Option<Box<dyn PositionObserver>>,
}

impl std::fmt::Debug for Mover {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mover")
            .field("config", &self.config)
            .field("position", &self.position)
            .field("active", &self.active)
            .field("traversed", &self.traversed)
            .finish_non_exhaustive()
    }
}

impl Mover {
    /// Creates a mover at `position` on a shared grid.
    pub fn new(
        grid: Arc<GridMap>,
        config: MoverConfig,
        position: WorldPoint,
    ) -> Result<Self, NavigationError> {
        config.validate()?;
        Ok(Mover {
            grid,
            config,
            position,
            active: None,
            traversed: 0,
            observer: None,
        })
    }

    /// Attaches an observer that sees every position change.
    pub fn with_observer(mut self, observer: Box<dyn PositionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// The grid this mover navigates.
    pub fn grid(&self) -> &Arc<GridMap> {
        &self.grid
    }

    /// Mover parameters.
    pub fn config(&self) -> &MoverConfig {
        &self.config
    }

    /// Current continuous position.
    pub fn position(&self) -> &WorldPoint {
        &self.position
    }

    /// Cell containing the current position.
    pub fn cell(&self) -> Cell {
        self.grid.world_to_grid(&self.position)
    }

    /// True while a movement is in progress.
    pub fn is_moving(&self) -> bool {
        self.active.is_some()
    }

    /// Waypoints left in the current movement.
    pub fn remaining_waypoints(&self) -> usize {
        self.active
            .as_ref()
            .map_or(0, |active| active.path.len() - active.next)
    }

    /// Waypoints reached by the current or most recent movement.
    pub fn waypoints_traversed(&self) -> usize {
        self.traversed
    }

    /// Places the agent at `position`, dropping any active movement.
    pub fn teleport(&mut self, position: WorldPoint) {
        self.active = None;
        self.position = position;
        self.notify();
    }

    /// Abandons the active movement, leaving the agent where it is.
    pub fn halt(&mut self) {
        self.active = None;
    }

    fn notify(&mut self) {
        if let Some(observer) = self.observer.as_mut() {
            observer.on_position(&self.position);
        }
    }

    /// Starts a movement toward `target`.
    ///
    /// Any active movement is dropped. Returns [`MoveStatus::Unreachable`]
    /// when no path exists, [`MoveStatus::Arrived`] when the agent already
    /// stands in `target`, and [`MoveStatus::Moving`] otherwise.
    pub fn begin(&mut self, target: Cell) -> MoveStatus {
        self.active = None;
        self.traversed = 0;

        let start = self.cell();
        let Some(path) = find_path(&self.grid, start, target) else {
            debug!(%start, %target, "No path to target");
            return MoveStatus::Unreachable;
        };

        if path.len() <= 1 {
            return MoveStatus::Arrived;
        }

        debug!(%start, %target, waypoints = path.len() - 1, "Path committed");
        self.active = Some(ActiveMove { path, next: 1 });
        MoveStatus::Moving
    }

    /// Performs one bounded update covering `dt` seconds.
    ///
    /// If the agent is within tolerance of the next waypoint it is snapped onto
    /// it and the movement advances to the following waypoint. Otherwise the
    /// agent moves toward the waypoint by `speed * dt`, never past it.
    pub fn advance(&mut self, dt: f32) -> MoveStatus {
        let Some(active) = self.active.as_mut() else {
            return MoveStatus::Idle;
        };

        let waypoint = self.grid.grid_to_world(active.path[active.next]);
        let mut delta = waypoint - self.position;
        delta.y = 0.0;

        let epsilon = self.config.arrive_epsilon;
        if delta.norm_squared() <= epsilon * epsilon {
            self.position.x = waypoint.x;
            self.position.z = waypoint.z;
            active.next += 1;
            self.traversed += 1;

            let finished = active.next >= active.path.len();
            if finished {
                self.active = None;
            }
            self.notify();
            return if finished {
                MoveStatus::Arrived
            } else {
                MoveStatus::Moving
            };
        }

        let distance = delta.norm();
        let step = (self.config.speed * dt.max(0.0)).min(distance);
        if step > 0.0 {
            self.position += delta * (step / distance);
            self.notify();
        }
        MoveStatus::Moving
    }

    /// Moves to `target`, suspending on a `tick` interval between advances.
    ///
    /// Each advance is scaled by the time actually elapsed since the previous
    /// tick. Returns immediately with [`MoveOutcome::Unreachable`] when there
    /// is no path. The stop signal is checked before every advance.
    pub async fn move_to(&mut self, target: Cell, tick: Duration, stop: &StopSignal) -> MoveOutcome {
        if stop.is_stopped() {
            return MoveOutcome::Stopped;
        }
        match self.begin(target) {
            MoveStatus::Unreachable => return MoveOutcome::Unreachable,
            MoveStatus::Arrived | MoveStatus::Idle => return MoveOutcome::Arrived { waypoints: 0 },
            MoveStatus::Moving => {}
        }

        let mut ticker = time::interval(tick.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last = ticker.tick().await;

        loop {
            let now = ticker.tick().await;
            if stop.is_stopped() {
                self.halt();
                return MoveOutcome::Stopped;
            }
            let dt = (now - last).as_secs_f32();
            last = now;

            match self.advance(dt) {
                MoveStatus::Moving => {}
                MoveStatus::Arrived | MoveStatus::Idle | MoveStatus::Unreachable => {
                    return MoveOutcome::Arrived {
                        waypoints: self.traversed,
                    };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::stop_channel;
    use rstest::rstest;
    use std::sync::Mutex;

    fn grid(width: u32, height: u32, blocked: &[Cell]) -> Arc<GridMap> {
        Arc::new(
            GridMap::new(width, height, 1.0, WorldPoint::origin())
                .unwrap()
                .with_blocked(blocked.iter().copied())
                .unwrap(),
        )
    }

    fn mover_at(grid: &Arc<GridMap>, cell: Cell, height: f32) -> Mover {
        let mut position = grid.grid_to_world(cell);
        position.y = height;
        Mover::new(Arc::clone(grid), MoverConfig::default(), position).unwrap()
    }

    fn drive(mover: &mut Mover, dt: f32) -> usize {
        let mut ticks = 0;
        while mover.advance(dt) == MoveStatus::Moving {
            ticks += 1;
            assert!(ticks < 100_000, "mover never arrived");
        }
        ticks
    }

    #[test]
    fn test_config_validation() {
        assert!(MoverConfig::default().validate().is_ok());
        let slow = MoverConfig {
            speed: 0.0,
            ..MoverConfig::default()
        };
        assert!(matches!(slow.validate(), Err(NavigationError::InvalidSpeed(_))));
        let loose = MoverConfig {
            arrive_epsilon: f32::INFINITY,
            ..MoverConfig::default()
        };
        assert!(matches!(
            loose.validate(),
            Err(NavigationError::InvalidTolerance(_))
        ));
    }

    #[rstest]
    #[case(0.001)]
    #[case(0.016)]
    #[case(0.25)]
    #[case(10.0)]
    fn test_arrival_snaps_to_target_center(#[case] dt: f32) {
        let grid = grid(6, 6, &[Cell::new(2, 0), Cell::new(2, 1)]);
        let mut mover = mover_at(&grid, Cell::new(0, 0), 0.9);

        assert_eq!(mover.begin(Cell::new(4, 1)), MoveStatus::Moving);
        drive(&mut mover, dt);

        let center = grid.grid_to_world(Cell::new(4, 1));
        assert_eq!(mover.position().x, center.x);
        assert_eq!(mover.position().z, center.z);
        assert_eq!(mover.position().y, 0.9, "height untouched");
        assert_eq!(mover.cell(), Cell::new(4, 1));
        assert!(!mover.is_moving());
        assert_eq!(mover.advance(dt), MoveStatus::Idle);
    }

    #[test]
    fn test_waypoints_traversed_matches_path_length() {
        let grid = grid(5, 5, &[]);
        let mut mover = mover_at(&grid, Cell::new(0, 0), 0.0);
        mover.begin(Cell::new(4, 4));
        assert_eq!(mover.remaining_waypoints(), 8);
        drive(&mut mover, 0.05);
        assert_eq!(mover.waypoints_traversed(), 8);
    }

    #[test]
    fn test_unreachable_target_leaves_agent_in_place() {
        let wall: Vec<Cell> = (0..4).map(|row| Cell::new(2, row)).collect();
        let grid = grid(5, 4, &wall);
        let mut mover = mover_at(&grid, Cell::new(0, 0), 0.9);
        let before = *mover.position();

        assert_eq!(mover.begin(Cell::new(4, 0)), MoveStatus::Unreachable);
        assert!(!mover.is_moving());
        assert_eq!(*mover.position(), before);
    }

    #[test]
    fn test_target_is_current_cell() {
        let grid = grid(3, 3, &[]);
        let mut mover = mover_at(&grid, Cell::new(1, 1), 0.0);
        assert_eq!(mover.begin(Cell::new(1, 1)), MoveStatus::Arrived);
        assert_eq!(mover.waypoints_traversed(), 0);
    }

    #[test]
    fn test_single_advance_is_bounded_by_speed() {
        let grid = grid(5, 1, &[]);
        let mut mover = mover_at(&grid, Cell::new(0, 0), 0.0);
        mover.begin(Cell::new(4, 0));
        let x0 = mover.position().x;
        assert_eq!(mover.advance(0.1), MoveStatus::Moving);
        assert!((mover.position().x - x0 - 0.4).abs() < 1e-5);
        assert_eq!(mover.position().z, 0.5);
    }

    #[test]
    fn test_observer_sees_final_position() {
        let seen: Arc<Mutex<Vec<WorldPoint>>> = Arc::default();
        let sink = Arc::clone(&seen);
        let grid = grid(3, 3, &[]);
        let mut mover = mover_at(&grid, Cell::new(0, 0), 0.0).with_observer(Box::new(
            move |p: &WorldPoint| sink.lock().unwrap().push(*p),
        ));

        mover.begin(Cell::new(2, 0));
        drive(&mut mover, 0.1);

        let seen = seen.lock().unwrap();
        assert!(!seen.is_empty());
        assert_eq!(*seen.last().unwrap(), grid.grid_to_world(Cell::new(2, 0)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_move_to_arrives_over_time() {
        let grid = grid(5, 5, &[]);
        let mut mover = mover_at(&grid, Cell::new(0, 0), 0.9);
        let started = tokio::time::Instant::now();

        let outcome = mover
            .move_to(Cell::new(4, 0), Duration::from_millis(20), &StopSignal::never())
            .await;

        assert_eq!(outcome, MoveOutcome::Arrived { waypoints: 4 });
        assert_eq!(mover.cell(), Cell::new(4, 0));
        // 4 units at 4 units/s is at least one second of simulated time.
        assert!(started.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_move_to_unreachable_returns_immediately() {
        let grid = grid(3, 3, &[Cell::new(2, 2)]);
        let mut mover = mover_at(&grid, Cell::new(0, 0), 0.0);
        let started = tokio::time::Instant::now();
        let outcome = mover
            .move_to(Cell::new(2, 2), Duration::from_millis(20), &StopSignal::never())
            .await;
        assert_eq!(outcome, MoveOutcome::Unreachable);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_move_to_stops_mid_waypoint() {
        let grid = grid(10, 1, &[]);
        let mut mover = mover_at(&grid, Cell::new(0, 0), 0.0);
        let (handle, signal) = stop_channel();

        let stopper = async {
            tokio::time::sleep(Duration::from_millis(110)).await;
            handle.stop();
        };
        let (outcome, _) = tokio::join!(
            mover.move_to(Cell::new(9, 0), Duration::from_millis(20), &signal),
            stopper
        );

        assert_eq!(outcome, MoveOutcome::Stopped);
        assert!(!mover.is_moving());
        assert!(mover.position().x > 0.5 && mover.position().x < 9.5);
    }
}
