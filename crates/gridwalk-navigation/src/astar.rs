//! A* shortest-path search over a [`GridMap`].
//!
//! f(n) = g(n) + h(n), where g is the number of 4-connected steps taken from
//! the start and h is the Manhattan distance to the goal. Every step costs 1,
//! so h never overestimates and is consistent: the first time the goal is
//! popped from the open set its path is optimal.
//!
//! Search nodes live in a per-call arena and refer to their predecessor by
//! index. The open set is a binary heap ordered by smallest f, then smallest
//! h, then insertion order (FIFO). The order is fixed so that repeated calls on
//! the same grid return the same path. Entries made stale by a later
//! improvement are skipped when popped.
//!
//! Each call owns all of its bookkeeping, so any number of agents can search
//! the same shared grid concurrently.

use crate::map::grid::GridMap;
use crate::map::point_types::{Cell, WorldPoint};

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Marks a cell that has no arena node yet.
const UNDISCOVERED: u32 = u32::MAX;

/// Represents the result of an A* pathfinding operation with metadata.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PathResult<T> {
    /// The computed path from start to goal (both inclusive), if one was found.
    pub path: Option<Vec<T>>,
    /// The total cost of the path (number of steps).
    pub total_cost: Option<u32>,
    /// The number of nodes expanded during the search.
    pub nodes_explored: usize,
    /// The length of the path (number of waypoints).
    pub path_length: usize,
}

impl<T> PathResult<T> {
    /// Creates a new PathResult for a successful path.
    pub fn success(path: Vec<T>, total_cost: u32, nodes_explored: usize) -> Self {
        let path_length = path.len();
        Self {
            path: Some(path),
            total_cost: Some(total_cost),
            nodes_explored,
            path_length,
        }
    }

    /// Creates a new PathResult for a failed path search.
    pub fn failure(nodes_explored: usize) -> Self {
        Self {
            path: None,
            total_cost: None,
            nodes_explored,
            path_length: 0,
        }
    }

    /// Returns true if a path was found.
    pub fn is_success(&self) -> bool {
        self.path.is_some()
    }

    /// Returns the path if one was found.
    pub fn into_path(self) -> Option<Vec<T>> {
        self.path
    }
}

impl<T> fmt::Display for PathResult<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(_) => write!(
                f,
                "PathResult {{ success: true, path_length: {}, total_cost: {}, nodes_explored: {} }}",
                self.path_length,
                self.total_cost.unwrap_or(0),
                self.nodes_explored
            ),
            None => write!(
                f,
                "PathResult {{ success: false, nodes_explored: {} }}",
                self.nodes_explored
            ),
        }
    }
}

/// Calculates the Manhattan distance between two cells.
pub fn manhattan_distance(a: Cell, b: Cell) -> u32 {
    a.col.abs_diff(b.col) + a.row.abs_diff(b.row)
}

/// One discovered cell. Parent links form a tree rooted at the start node.
#[derive(Copy, Clone, Debug)]
struct SearchNode {
    cell: Cell,
    g: u32,
    h: u32,
    parent: Option<u32>,
}

/// Heap entry pointing into the node arena.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
struct OpenEntry {
    f: u32,
    h: u32,
    g: u32,
    seq: u64,
    node: u32,
}

// BinaryHeap is a max-heap; flip every comparison so the best entry is on top.
impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .cmp(&self.f)
            .then_with(|| other.h.cmp(&self.h))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Walks parent links from `node` back to the start and returns the cells in
/// start-to-goal order.
fn reconstruct_path(arena: &[SearchNode], mut node: u32) -> Vec<Cell> {
    let mut path = Vec::new();
    loop {
        let current = &arena[node as usize];
        path.push(current.cell);
        match current.parent {
            Some(parent) => node = parent,
            None => break,
        }
    }
    path.reverse();
    path
}

/// Finds a shortest path from `start` to `goal`.
///
/// # Returns
/// * `Option<Vec<Cell>>` - The cells from start to goal (both inclusive), or
///   `None` if either end is not walkable or no path exists.
pub fn find_path(grid: &GridMap, start: Cell, goal: Cell) -> Option<Vec<Cell>> {
    find_path_detailed(grid, start, goal).into_path()
}

/// Finds a shortest path from `start` to `goal` with detailed results.
///
/// # Returns
/// * `PathResult<Cell>` - Detailed pathfinding result with metadata.
pub fn find_path_detailed(grid: &GridMap, start: Cell, goal: Cell) -> PathResult<Cell> {
    let mut nodes_explored = 0;

    if !grid.walkable(start) || !grid.walkable(goal) {
        return PathResult::failure(nodes_explored);
    }

    let cell_count = grid.cell_count();
    let mut slots = vec![UNDISCOVERED; cell_count];
    let mut closed = vec![false; cell_count];
    let mut arena: Vec<SearchNode> = Vec::new();
    let mut open_set = BinaryHeap::new();
    let mut seq: u64 = 0;

    let h = manhattan_distance(start, goal);
    arena.push(SearchNode {
        cell: start,
        g: 0,
        h,
        parent: None,
    });
    if let Some(index) = grid.index_of(start) {
        slots[index] = 0;
    }
    open_set.push(OpenEntry {
        f: h,
        h,
        g: 0,
        seq,
        node: 0,
    });

    while let Some(entry) = open_set.pop() {
        let current = arena[entry.node as usize];
        let Some(current_index) = grid.index_of(current.cell) else {
            continue;
        };
        if closed[current_index] || entry.g != current.g {
            continue;
        }
        nodes_explored += 1;

        if current.cell == goal {
            let path = reconstruct_path(&arena, entry.node);
            return PathResult::success(path, current.g, nodes_explored);
        }

        closed[current_index] = true;

        for neighbor in grid.neighbors4(current.cell) {
            let Some(neighbor_index) = grid.index_of(neighbor) else {
                continue;
            };
            if closed[neighbor_index] {
                continue;
            }

            let tentative_g = current.g + 1;
            let slot = slots[neighbor_index];
            let node = if slot == UNDISCOVERED {
                let node = arena.len() as u32;
                arena.push(SearchNode {
                    cell: neighbor,
                    g: tentative_g,
                    h: manhattan_distance(neighbor, goal),
                    parent: Some(entry.node),
                });
                slots[neighbor_index] = node;
                node
            } else if tentative_g < arena[slot as usize].g {
                let known = &mut arena[slot as usize];
                known.g = tentative_g;
                known.parent = Some(entry.node);
                slot
            } else {
                continue;
            };

            let known = arena[node as usize];
            seq += 1;
            open_set.push(OpenEntry {
                f: known.g + known.h,
                h: known.h,
                g: known.g,
                seq,
                node,
            });
        }
    }

    PathResult::failure(nodes_explored)
}

/// Finds a path between two world positions.
///
/// Both positions are converted with [`GridMap::world_to_grid`]; the returned
/// waypoints are the centers of the path cells.
pub fn find_path_world(
    grid: &GridMap,
    start_world: &WorldPoint,
    goal_world: &WorldPoint,
) -> Option<Vec<WorldPoint>> {
    let start = grid.world_to_grid(start_world);
    let goal = grid.world_to_grid(goal_world);
    find_path(grid, start, goal).map(|cells| {
        cells
            .into_iter()
            .map(|cell| grid.grid_to_world(cell))
            .collect()
    })
}
