use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use std::time::Duration;
use tracing::{error, info, warn};

use gridwalk_navigation::{
    Cell, DriverConfig, GridMap, LocationMap, MoverConfig, NavigationError, Plan, PlanStep,
    WorldPoint,
};

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
/// Names an extra TOML file layered over the defaults.
const CONFIG_PATH_VAR: &str = "GRIDWALK_CONFIG";
const ENV_PREFIX: &str = "GRIDWALK";

/// Everything the runner reads at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Required; a missing grid aborts the run before any agent starts.
    pub grid: Option<GridSettings>,
    #[serde(default)]
    pub mover: MoverConfig,
    #[serde(default)]
    pub driver: DriverSettings,
    #[serde(default)]
    pub agents: Vec<AgentSettings>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GridSettings {
    pub width: u32,
    pub height: u32,
    #[serde(default = "default_cell_size")]
    pub cell_size: f32,
    #[serde(default)]
    pub origin: [f32; 3],
    #[serde(default)]
    pub blocked: Vec<[i32; 2]>,
}

/// How plan positions are turned into cells.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanPositions {
    /// `x` and `z` are already column and row.
    #[default]
    Cells,
    /// Positions are world coordinates on the grid.
    World,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DriverSettings {
    pub settle_ms: u64,
    pub tick_ms: u64,
    pub plan_positions: PlanPositions,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            settle_ms: 200,
            tick_ms: 20,
            plan_positions: PlanPositions::Cells,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentSettings {
    pub name: String,
    #[serde(default)]
    pub start: [i32; 2],
    #[serde(default = "default_spawn_height")]
    pub spawn_height: f32,
    #[serde(default)]
    pub plan: Vec<PlanStep>,
}

fn default_cell_size() -> f32 {
    1.0
}

fn default_spawn_height() -> f32 {
    0.9
}

impl Settings {
    /// Parses settings from a TOML string.
    #[cfg(test)]
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from_str(text, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    /// Builds the shared grid described by `[grid]`.
    ///
    /// Blocked entries outside the bounds are skipped with a warning.
    pub fn build_grid(&self) -> Result<GridMap, NavigationError> {
        let settings = self
            .grid
            .as_ref()
            .ok_or(NavigationError::MissingCollaborator("grid"))?;
        let [x, y, z] = settings.origin;
        let mut grid = GridMap::new(
            settings.width,
            settings.height,
            settings.cell_size,
            WorldPoint::new(x, y, z),
        )?;
        for &[col, row] in &settings.blocked {
            let cell = Cell::new(col, row);
            if grid.in_bounds(cell) {
                grid.block(cell)?;
            } else {
                warn!(%cell, "Ignoring blocked cell outside grid bounds");
            }
        }
        Ok(grid)
    }

    pub fn driver_config(&self) -> DriverConfig {
        DriverConfig {
            settle_pause: Duration::from_millis(self.driver.settle_ms),
            tick_interval: Duration::from_millis(self.driver.tick_ms),
        }
    }
}

impl AgentSettings {
    pub fn start_cell(&self) -> Cell {
        Cell::new(self.start[0], self.start[1])
    }

    pub fn plan(&self) -> Plan {
        self.plan.iter().cloned().collect()
    }

    pub fn locations(&self, plan: &Plan, grid: &GridMap, mode: PlanPositions) -> LocationMap {
        match mode {
            PlanPositions::Cells => LocationMap::from_plan(plan),
            PlanPositions::World => LocationMap::from_plan_on_grid(plan, grid),
        }
    }
}

pub fn load_settings() -> Result<Settings, ConfigError> {
    info!("Attempting to load configuration from {}", DEFAULT_CONFIG_PATH);

    let mut builder = Config::builder()
        .add_source(File::new(DEFAULT_CONFIG_PATH, FileFormat::Toml).required(true));
    if let Ok(path) = std::env::var(CONFIG_PATH_VAR) {
        info!("Layering configuration from {}", path);
        builder = builder.add_source(File::new(&path, FileFormat::Toml).required(true));
    }
    let settings = builder
        .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()
        .and_then(|config| config.try_deserialize::<Settings>());

    match settings {
        Ok(settings) => {
            info!(agents = settings.agents.len(), "Successfully loaded configuration");
            Ok(settings)
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            Err(e)
        }
    }
}
