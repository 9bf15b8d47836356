use gridwalk_navigation::{Cell, GridMap, WorldPoint, find_path_detailed};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let seed = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(7u64);
    let mut rng = StdRng::seed_from_u64(seed);

    let start = Cell::new(0, 0);
    let goal = Cell::new(19, 9);

    let mut grid = GridMap::new(20, 10, 1.0, WorldPoint::origin())?;
    for row in 0..10 {
        for col in 0..20 {
            let cell = Cell::new(col, row);
            if cell != start && cell != goal && rng.random_bool(0.25) {
                grid.block(cell)?;
            }
        }
    }

    println!("Grid (seed {}):", seed);
    print_grid(&grid, start, goal, None);

    let result = find_path_detailed(&grid, start, goal);
    println!("\n{}", result);

    if let Some(path) = result.into_path() {
        let path_set: HashSet<Cell> = path.into_iter().collect();
        println!("\nGrid with path:");
        print_grid(&grid, start, goal, Some(&path_set));
    } else {
        println!("\nNo path found.");
    }

    Ok(())
}

fn print_grid(grid: &GridMap, start: Cell, goal: Cell, path: Option<&HashSet<Cell>>) {
    // Print from top to bottom (reverse row order for visual clarity)
    for row in (0..grid.height() as i32).rev() {
        print!("{:>2} ", row);
        for col in 0..grid.width() as i32 {
            let cell = Cell::new(col, row);
            let glyph = if cell == start {
                'S'
            } else if cell == goal {
                'G'
            } else if path.is_some_and(|p| p.contains(&cell)) {
                '*'
            } else if grid.is_blocked(cell) {
                'X'
            } else {
                '.'
            };
            print!("{} ", glyph);
        }
        println!();
    }
}
