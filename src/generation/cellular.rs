//! Cellular-automata cave field
//!
//! Random wall fill followed by neighbor-count smoothing, then a solid border.

use rand::Rng;

use crate::grid::{OccupancyGrid, Tile};

/// Fill a `width` x `height` grid, each tile wall with `fill_percent`% chance
pub fn random_fill<R: Rng + ?Sized>(
    width: usize,
    height: usize,
    fill_percent: u32,
    rng: &mut R,
) -> OccupancyGrid {
    let mut grid = OccupancyGrid::filled(width, height, Tile::Empty);
    for x in 0..width as i32 {
        for y in 0..height as i32 {
            if rng.gen_range(0..100) < fill_percent {
                grid.set(x, y, Tile::Wall);
            }
        }
    }
    grid
}

/// Count walls in the 3x3 block centered on `(x, y)`
///
/// The center tile is included and tiles outside the grid count as wall.
pub fn wall_neighbor_count(grid: &OccupancyGrid, x: i32, y: i32) -> u32 {
    let mut count = 0;
    for nx in x - 1..=x + 1 {
        for ny in y - 1..=y + 1 {
            if grid.is_wall(nx, ny) {
                count += 1;
            }
        }
    }
    count
}

/// One smoothing pass, updated in place in column-major scan order
///
/// Later tiles in the scan see the already-updated state of earlier ones.
pub fn smooth(grid: &mut OccupancyGrid, wall_threshold: u32, empty_threshold: u32) {
    for x in 0..grid.width() as i32 {
        for y in 0..grid.height() as i32 {
            let count = wall_neighbor_count(grid, x, y);
            if count > wall_threshold {
                grid.set(x, y, Tile::Wall);
            } else if count < empty_threshold {
                grid.set(x, y, Tile::Empty);
            }
        }
    }
}

/// Surround the grid with a solid wall border of `thickness` tiles
pub fn pad_border(grid: &OccupancyGrid, thickness: usize) -> OccupancyGrid {
    let width = grid.width() + thickness * 2;
    let height = grid.height() + thickness * 2;
    let offset = thickness as i32;
    let mut padded = OccupancyGrid::filled(width, height, Tile::Wall);
    for x in 0..grid.width() as i32 {
        for y in 0..grid.height() as i32 {
            if let Some(tile) = grid.get(x, y) {
                padded.set(x + offset, y + offset, tile);
            }
        }
    }
    padded
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_fill_extremes() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let all_empty = random_fill(12, 8, 0, &mut rng);
        assert_eq!(all_empty.count(Tile::Wall), 0);

        let all_wall = random_fill(12, 8, 100, &mut rng);
        assert_eq!(all_wall.count(Tile::Empty), 0);
    }

    #[test]
    fn test_fill_determinism() {
        let a = random_fill(30, 20, 45, &mut ChaCha8Rng::seed_from_u64(42));
        let b = random_fill(30, 20, 45, &mut ChaCha8Rng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn test_neighbor_count_outside_is_wall() {
        let grid = OccupancyGrid::filled(5, 5, Tile::Empty);
        // Corner tile: 5 of its 9 block tiles are outside
        assert_eq!(wall_neighbor_count(&grid, 0, 0), 5);
        // Edge tile: 3 outside
        assert_eq!(wall_neighbor_count(&grid, 2, 0), 3);
        assert_eq!(wall_neighbor_count(&grid, 2, 2), 0);
    }

    #[test]
    fn test_smooth_removes_isolated_wall() {
        let mut grid = OccupancyGrid::from_rows(&[
            ".......",
            ".......",
            ".......",
            "...#...",
            ".......",
            ".......",
            ".......",
        ]);
        smooth(&mut grid, 4, 4);
        assert_eq!(grid.get(3, 3), Some(Tile::Empty));
    }

    #[test]
    fn test_smooth_fills_isolated_hole() {
        let mut grid = OccupancyGrid::from_rows(&["#####", "#####", "##.##", "#####", "#####"]);
        smooth(&mut grid, 4, 4);
        assert_eq!(grid.count(Tile::Empty), 0);
    }

    #[test]
    fn test_pad_border() {
        let grid = OccupancyGrid::filled(4, 2, Tile::Empty);
        let padded = pad_border(&grid, 3);
        assert_eq!(padded.width(), 10);
        assert_eq!(padded.height(), 8);
        assert_eq!(padded.count(Tile::Empty), 8);
        assert_eq!(padded.get(3, 3), Some(Tile::Empty));
        assert_eq!(padded.get(2, 3), Some(Tile::Wall));
        assert_eq!(padded.get(6, 4), Some(Tile::Empty));
        assert_eq!(padded.get(7, 4), Some(Tile::Wall));
    }
}
