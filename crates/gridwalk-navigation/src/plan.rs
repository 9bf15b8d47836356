//! Ordered plans and the name to cell lookup used to execute them.

use crate::map::grid::GridMap;
use crate::map::point_types::{Cell, WorldPoint};

use std::collections::HashMap;
use std::fmt::Write;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One named target of a plan.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PlanStep {
    /// Location name, e.g. `"SkinAnimal"`.
    pub name: String,
    /// Target position as supplied by the planner.
    pub position: WorldPoint,
}

impl PlanStep {
    /// Creates a new `PlanStep`.
    pub fn new(name: impl Into<String>, position: WorldPoint) -> Self {
        Self {
            name: name.into(),
            position,
        }
    }
}

/// An ordered sequence of plan steps with unique names.
///
/// Behaves like an insertion-ordered dictionary: adding a name that is
/// already present is ignored and the first entry wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Plan {
    steps: Vec<PlanStep>,
}

impl Plan {
    /// Creates an empty plan.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a step. Returns `false` if the name was already present.
    pub fn push(&mut self, step: PlanStep) -> bool {
        if self.steps.iter().any(|s| s.name == step.name) {
            return false;
        }
        self.steps.push(step);
        true
    }

    /// Steps in execution order.
    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    /// Step at `index`.
    pub fn get(&self, index: usize) -> Option<&PlanStep> {
        self.steps.get(index)
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// True if the plan has no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Iterates the steps in order.
    pub fn iter(&self) -> std::slice::Iter<'_, PlanStep> {
        self.steps.iter()
    }

    /// Human-readable listing of every step and its position.
    pub fn describe(&self) -> String {
        let mut out = String::from("Full plan:");
        for (i, step) in self.steps.iter().enumerate() {
            let p = &step.position;
            let _ = write!(
                out,
                "\n  {}. {} at ({:.2}, {:.2}, {:.2})",
                i + 1,
                step.name,
                p.x,
                p.y,
                p.z
            );
        }
        out
    }
}

impl FromIterator<PlanStep> for Plan {
    fn from_iter<I: IntoIterator<Item = PlanStep>>(iter: I) -> Self {
        let mut plan = Plan::new();
        for step in iter {
            plan.push(step);
        }
        plan
    }
}

impl<'a> IntoIterator for &'a Plan {
    type Item = &'a PlanStep;
    type IntoIter = std::slice::Iter<'a, PlanStep>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}

/// Resolves plan step names to target cells.
///
/// Built once before execution and only read while a plan runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationMap {
    cells: HashMap<String, Cell>,
}

impl LocationMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the map from plan positions read as cell coordinates.
    ///
    /// The horizontal components `x` and `z` are truncated toward zero to a
    /// column and row. Height is ignored.
    pub fn from_plan(plan: &Plan) -> Self {
        let mut map = LocationMap::new();
        for step in plan {
            let cell = Cell::new(step.position.x as i32, step.position.z as i32);
            map.cells.entry(step.name.clone()).or_insert(cell);
        }
        map
    }

    /// Builds the map from plan positions read as world positions, using the
    /// grid's [`GridMap::world_to_grid`].
    pub fn from_plan_on_grid(plan: &Plan, grid: &GridMap) -> Self {
        let mut map = LocationMap::new();
        for step in plan {
            let cell = grid.world_to_grid(&step.position);
            map.cells.entry(step.name.clone()).or_insert(cell);
        }
        map
    }

    /// Sets the cell for a name, returning the previous one.
    pub fn insert(&mut self, name: impl Into<String>, cell: Cell) -> Option<Cell> {
        self.cells.insert(name.into(), cell)
    }

    /// Removes a name from the map.
    pub fn remove(&mut self, name: &str) -> Option<Cell> {
        self.cells.remove(name)
    }

    /// Looks up the target cell of a step name.
    pub fn resolve(&self, name: &str) -> Option<Cell> {
        self.cells.get(name).copied()
    }

    /// Number of known names.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// True if no names are known.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
