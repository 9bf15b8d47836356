//! Grid navigation for plan-driven agents.
//!
//! * [`map`] - the static grid: bounds, obstacles, cell/world conversion and
//!   4-connected neighbors.
//! * [`astar`] - shortest paths between cells with a Manhattan heuristic.
//! * [`mover`] - walks an agent's continuous position along a path.
//! * [`plan`] and [`driver`] - execute an ordered list of named targets, one
//!   movement at a time with a settle pause between steps.
//!
//! One process owns a single [`GridMap`] behind an `Arc`; each agent owns its
//! own [`Mover`] and [`PlanDriver`] and only reads the grid.

pub mod agent;
pub mod astar;
pub mod driver;
pub mod error;
pub mod map;
pub mod mover;
pub mod plan;
pub mod signal;

pub use agent::AgentBuilder;
pub use astar::{PathResult, find_path, find_path_detailed, find_path_world, manhattan_distance};
pub use driver::{DriverConfig, DriverReport, DriverState, PlanDriver};
pub use error::NavigationError;
pub use map::{Cell, GridMap, WorldPoint};
pub use mover::{MoveOutcome, MoveStatus, Mover, MoverConfig, PositionObserver};
pub use plan::{LocationMap, Plan, PlanStep};
pub use signal::{StopHandle, StopSignal, stop_channel};
