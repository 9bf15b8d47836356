//! Static 2D navigation grid.
//!
//! A [`GridMap`] is a bounded rectangle of square cells laid on the ground
//! plane, plus a set of blocked cells. It answers walkability queries, converts
//! between cells and continuous world positions and enumerates 4-connected
//! neighbors. All queries are pure functions of the grid state.
//!
//! Editing obstacles needs `&mut GridMap`. Agents share the grid through an
//! `Arc<GridMap>` while a plan runs, so it cannot change under a search. Callers
//! that wrap the grid in their own interior mutability must not edit obstacles
//! while any search or neighbor iteration is in flight.

#![warn(missing_docs)]

use crate::error::NavigationError;
use crate::map::point_types::{Cell, WorldPoint};

/// Neighbor offsets in enumeration order: right, left, up, down.
const DIRECTIONS: [Cell; 4] = [Cell::RIGHT, Cell::LEFT, Cell::UP, Cell::DOWN];

/// Bounded grid with a cell size, a world origin and blocked cells.
#[derive(Clone, Debug)]
pub struct GridMap {
    /// Number of columns.
    width: u32,
    /// Number of rows.
    height: u32,
    /// Edge length of one square cell in world units.
    cell_size: f32,
    /// World position of the corner of cell (0, 0).
    origin: WorldPoint,
    /// Row-major blocked flags, one per cell.
    blocked: Vec<bool>,
    /// Number of `true` entries in `blocked`.
    blocked_count: usize,
}

impl GridMap {
    /// Creates a new grid with every cell walkable.
    ///
    /// # Arguments
    /// * `width` - Number of columns, must be non-zero
    /// * `height` - Number of rows, must be non-zero
    /// * `cell_size` - Edge length of a cell in world units, must be positive and finite
    /// * `origin` - World position of the outer corner of cell (0, 0)
    ///
    /// # Returns
    /// * `Result<Self, NavigationError>` - The grid or an error if parameters are invalid
    pub fn new(
        width: u32,
        height: u32,
        cell_size: f32,
        origin: WorldPoint,
    ) -> Result<Self, NavigationError> {
        if width == 0 || height == 0 {
            return Err(NavigationError::InvalidDimensions(
                "width and height must be non-zero",
            ));
        }
        if width > i32::MAX as u32 || height > i32::MAX as u32 {
            return Err(NavigationError::InvalidDimensions(
                "width and height must fit a signed cell index",
            ));
        }
        if !cell_size.is_finite() || cell_size <= 0.0 {
            return Err(NavigationError::InvalidResolution(
                "cell size must be positive and finite",
            ));
        }

        let total_cells = (width as usize)
            .checked_mul(height as usize)
            .ok_or(NavigationError::InvalidDimensions(
                "grid dimensions too large, would cause overflow",
            ))?;

        Ok(GridMap {
            width,
            height,
            cell_size,
            origin,
            blocked: vec![false; total_cells],
            blocked_count: 0,
        })
    }

    /// Consumes the grid and returns it with the given cells blocked.
    ///
    /// Fails with [`NavigationError::OutOfBounds`] if any cell lies outside the grid.
    pub fn with_blocked<I>(mut self, cells: I) -> Result<Self, NavigationError>
    where
        I: IntoIterator<Item = Cell>,
    {
        for cell in cells {
            self.block(cell)?;
        }
        Ok(self)
    }

    /// Number of columns.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Edge length of one cell in world units.
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// World position of the outer corner of cell (0, 0).
    pub fn origin(&self) -> &WorldPoint {
        &self.origin
    }

    /// Total number of cells in the grid.
    pub fn cell_count(&self) -> usize {
        self.blocked.len()
    }

    /// Number of blocked cells.
    pub fn blocked_count(&self) -> usize {
        self.blocked_count
    }

    /// Dense row-major index of an in-bounds cell.
    pub fn index_of(&self, cell: Cell) -> Option<usize> {
        if self.in_bounds(cell) {
            Some(cell.row as usize * self.width as usize + cell.col as usize)
        } else {
            None
        }
    }

    /// True if the cell lies inside the grid rectangle.
    pub fn in_bounds(&self, cell: Cell) -> bool {
        cell.col >= 0
            && (cell.col as u32) < self.width
            && cell.row >= 0
            && (cell.row as u32) < self.height
    }

    /// True if the cell is in bounds and marked as an obstacle.
    pub fn is_blocked(&self, cell: Cell) -> bool {
        self.index_of(cell).is_some_and(|i| self.blocked[i])
    }

    /// True iff the cell is in bounds and not blocked.
    pub fn walkable(&self, cell: Cell) -> bool {
        self.index_of(cell).is_some_and(|i| !self.blocked[i])
    }

    /// Marks a cell as an obstacle.
    pub fn block(&mut self, cell: Cell) -> Result<(), NavigationError> {
        self.set_blocked(cell, true)
    }

    /// Clears an obstacle from a cell.
    pub fn unblock(&mut self, cell: Cell) -> Result<(), NavigationError> {
        self.set_blocked(cell, false)
    }

    fn set_blocked(&mut self, cell: Cell, value: bool) -> Result<(), NavigationError> {
        let index = self
            .index_of(cell)
            .ok_or(NavigationError::OutOfBounds("cell outside grid bounds"))?;
        if self.blocked[index] != value {
            self.blocked[index] = value;
            if value {
                self.blocked_count += 1;
            } else {
                self.blocked_count -= 1;
            }
        }
        Ok(())
    }

    /// Converts a cell to the world position of its center.
    ///
    /// The height component is the origin's height (the ground plane). Cells
    /// outside the grid are converted too, which keeps the mapping total.
    pub fn grid_to_world(&self, cell: Cell) -> WorldPoint {
        let half = self.cell_size * 0.5;
        WorldPoint::new(
            self.origin.x + cell.col as f32 * self.cell_size + half,
            self.origin.y,
            self.origin.z + cell.row as f32 * self.cell_size + half,
        )
    }

    /// Converts a world position to the cell containing it.
    ///
    /// Uses floor division on the ground-plane axes; height is ignored. The
    /// result may be out of bounds.
    pub fn world_to_grid(&self, position: &WorldPoint) -> Cell {
        let local = *position - self.origin;
        Cell::new(
            (local.x / self.cell_size).floor() as i32,
            (local.z / self.cell_size).floor() as i32,
        )
    }

    /// Lazily yields the walkable 4-connected neighbors of a cell.
    ///
    /// Order is right, left, up, down.
    pub fn neighbors4(&self, cell: Cell) -> impl Iterator<Item = Cell> + '_ {
        DIRECTIONS
            .iter()
            .map(move |offset| cell + *offset)
            .filter(move |neighbor| self.walkable(*neighbor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn open_grid(width: u32, height: u32) -> GridMap {
        GridMap::new(width, height, 1.0, WorldPoint::origin()).unwrap()
    }

    #[test]
    fn test_new_rejects_invalid_parameters() {
        let origin = WorldPoint::origin();
        assert!(matches!(
            GridMap::new(0, 5, 1.0, origin),
            Err(NavigationError::InvalidDimensions(_))
        ));
        assert!(matches!(
            GridMap::new(5, 0, 1.0, origin),
            Err(NavigationError::InvalidDimensions(_))
        ));
        assert!(matches!(
            GridMap::new(5, 5, 0.0, origin),
            Err(NavigationError::InvalidResolution(_))
        ));
        assert!(matches!(
            GridMap::new(5, 5, f32::NAN, origin),
            Err(NavigationError::InvalidResolution(_))
        ));
        assert!(matches!(
            GridMap::new(5, 5, -1.0, origin),
            Err(NavigationError::InvalidResolution(_))
        ));
    }

    #[test]
    fn test_walkable_requires_bounds_and_free_cell() {
        let grid = open_grid(4, 3)
            .with_blocked([Cell::new(1, 1)])
            .unwrap();

        assert!(grid.walkable(Cell::new(0, 0)));
        assert!(grid.walkable(Cell::new(3, 2)));
        assert!(!grid.walkable(Cell::new(1, 1)));
        assert!(!grid.walkable(Cell::new(4, 0)));
        assert!(!grid.walkable(Cell::new(0, 3)));
        assert!(!grid.walkable(Cell::new(-1, 0)));
        assert_eq!(grid.blocked_count(), 1);
        assert_eq!(grid.cell_count(), 12);
    }

    #[test]
    fn test_block_and_unblock() {
        let mut grid = open_grid(3, 3);
        grid.block(Cell::new(2, 2)).unwrap();
        grid.block(Cell::new(2, 2)).unwrap();
        assert!(grid.is_blocked(Cell::new(2, 2)));
        assert_eq!(grid.blocked_count(), 1);

        grid.unblock(Cell::new(2, 2)).unwrap();
        assert!(grid.walkable(Cell::new(2, 2)));
        assert_eq!(grid.blocked_count(), 0);

        assert_eq!(
            grid.block(Cell::new(3, 0)),
            Err(NavigationError::OutOfBounds("cell outside grid bounds"))
        );
    }

    #[test]
    fn test_grid_to_world_returns_cell_center_on_ground_plane() {
        let grid = GridMap::new(10, 10, 0.5, WorldPoint::new(-2.0, 1.5, 3.0)).unwrap();
        let center = grid.grid_to_world(Cell::new(2, 4));
        assert!((center.x - (-2.0 + 1.0 + 0.25)).abs() < 1e-6);
        assert!((center.y - 1.5).abs() < 1e-6);
        assert!((center.z - (3.0 + 2.0 + 0.25)).abs() < 1e-6);
    }

    #[test]
    fn test_world_to_grid_floors_and_ignores_height() {
        let grid = GridMap::new(10, 10, 2.0, WorldPoint::new(1.0, 0.0, 1.0)).unwrap();
        assert_eq!(grid.world_to_grid(&WorldPoint::new(1.0, 9.0, 1.0)), Cell::new(0, 0));
        assert_eq!(grid.world_to_grid(&WorldPoint::new(2.99, 0.0, 5.5)), Cell::new(0, 2));
        assert_eq!(grid.world_to_grid(&WorldPoint::new(0.5, 0.0, 1.0)), Cell::new(-1, 0));
    }

    #[rstest]
    #[case(1.0, WorldPoint::origin())]
    #[case(0.25, WorldPoint::new(-3.0, 0.0, 7.5))]
    #[case(3.0, WorldPoint::new(100.0, -2.0, -100.0))]
    fn test_round_trip_cell_world_cell(#[case] cell_size: f32, #[case] origin: WorldPoint) {
        let grid = GridMap::new(20, 15, cell_size, origin).unwrap();
        for row in 0..15 {
            for col in 0..20 {
                let cell = Cell::new(col, row);
                assert_eq!(grid.world_to_grid(&grid.grid_to_world(cell)), cell);
            }
        }
    }

    #[test]
    fn test_neighbors4_order_and_filtering() {
        let grid = open_grid(3, 3).with_blocked([Cell::new(1, 2)]).unwrap();

        let center: Vec<Cell> = grid.neighbors4(Cell::new(1, 1)).collect();
        assert_eq!(center, vec![Cell::new(2, 1), Cell::new(0, 1), Cell::new(1, 0)]);

        let corner: Vec<Cell> = grid.neighbors4(Cell::new(0, 0)).collect();
        assert_eq!(corner, vec![Cell::new(1, 0), Cell::new(0, 1)]);
    }

    #[test]
    fn test_neighbor_symmetry() {
        let grid = open_grid(6, 6)
            .with_blocked([Cell::new(2, 2), Cell::new(3, 2), Cell::new(0, 5)])
            .unwrap();

        for row in -1..7 {
            for col in -1..7 {
                let a = Cell::new(col, row);
                if !grid.walkable(a) {
                    continue;
                }
                for b in grid.neighbors4(a) {
                    assert!(
                        grid.neighbors4(b).any(|n| n == a),
                        "{} lists {} but not the reverse",
                        a,
                        b
                    );
                }
            }
        }
    }
}
