//! Assembles a mover and a plan driver for one agent.

use std::sync::Arc;

use tracing::warn;

use crate::driver::{DriverConfig, PlanDriver};
use crate::error::NavigationError;
use crate::map::grid::GridMap;
use crate::map::point_types::Cell;
use crate::mover::{Mover, MoverConfig, PositionObserver};
use crate::plan::{LocationMap, Plan};
use crate::signal::StopSignal;

/// Builder for a [`PlanDriver`] and the [`Mover`] it owns.
///
/// The grid and the plan are required. Everything else has a default: start
/// cell (0, 0), spawn height 0, default mover and driver configs, and a
/// location map derived from the plan with [`LocationMap::from_plan`].
#[derive(Default)]
pub struct AgentBuilder {
    name: String,
    grid: Option<Arc<GridMap>>,
    plan: Option<Plan>,
    locations: Option<LocationMap>,
    start: Cell,
    spawn_height: f32,
    mover_config: MoverConfig,
    driver_config: DriverConfig,
    observer: Option<Box<dyn PositionObserver>>,
    stop: Option<StopSignal>,
}

impl AgentBuilder {
    /// Starts a builder for the agent called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Shared grid to navigate.
    pub fn grid(mut self, grid: Arc<GridMap>) -> Self {
        self.grid = Some(grid);
        self
    }

    /// Plan to execute.
    pub fn plan(mut self, plan: Plan) -> Self {
        self.plan = Some(plan);
        self
    }

    /// Name to cell lookup; derived from the plan when not set.
    pub fn locations(mut self, locations: LocationMap) -> Self {
        self.locations = Some(locations);
        self
    }

    /// Spawn cell and the agent's height above the grid's ground plane.
    pub fn start(mut self, cell: Cell, spawn_height: f32) -> Self {
        self.start = cell;
        self.spawn_height = spawn_height;
        self
    }

    /// Mover parameters.
    pub fn mover_config(mut self, config: MoverConfig) -> Self {
        self.mover_config = config;
        self
    }

    /// Driver timing.
    pub fn driver_config(mut self, config: DriverConfig) -> Self {
        self.driver_config = config;
        self
    }

    /// Observer for every position change.
    pub fn observer(mut self, observer: Box<dyn PositionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Stop signal for the run.
    pub fn stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = Some(stop);
        self
    }

    /// Validates the setup and builds the driver.
    ///
    /// # Errors
    /// * [`NavigationError::MissingCollaborator`] if no grid or plan was given.
    /// * Config validation errors from [`MoverConfig::validate`] and
    ///   [`DriverConfig::validate`].
    pub fn build(self) -> Result<PlanDriver, NavigationError> {
        let grid = self
            .grid
            .ok_or(NavigationError::MissingCollaborator("grid"))?;
        let plan = self
            .plan
            .ok_or(NavigationError::MissingCollaborator("plan"))?;
        let locations = self
            .locations
            .unwrap_or_else(|| LocationMap::from_plan(&plan));

        if !grid.walkable(self.start) {
            warn!(agent = %self.name, start = %self.start, "Agent spawns on a cell that is not walkable");
        }

        let mut position = grid.grid_to_world(self.start);
        position.y += self.spawn_height;

        let mut mover = Mover::new(grid, self.mover_config, position)?;
        if let Some(observer) = self.observer {
            mover = mover.with_observer(observer);
        }

        let driver = PlanDriver::new(self.name, plan, locations, mover, self.driver_config)?;
        Ok(match self.stop {
            Some(stop) => driver.with_stop_signal(stop),
            None => driver,
        })
    }
}
