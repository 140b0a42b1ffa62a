//! Connected-region analysis and small-region repair

use std::collections::VecDeque;

use crate::grid::{OccupancyGrid, Tile, TileCoord};

/// A surviving empty region
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    /// Every tile of the region
    pub tiles: Vec<TileCoord>,
    /// Tiles touching a wall, once per touching wall (duplicates kept)
    pub edge_tiles: Vec<TileCoord>,
    /// Indices of rooms this room has a passage to
    pub connections: Vec<usize>,
    /// Exits opened from this room so far
    pub exits: usize,
}

impl Room {
    /// Build a room from its tiles, collecting edge tiles against `grid`
    pub fn new(tiles: Vec<TileCoord>, grid: &OccupancyGrid) -> Self {
        let mut edge_tiles = Vec::new();
        for &tile in &tiles {
            for x in tile.x - 1..=tile.x + 1 {
                for y in tile.y - 1..=tile.y + 1 {
                    if (x == tile.x || y == tile.y) && grid.get(x, y) == Some(Tile::Wall) {
                        edge_tiles.push(tile);
                    }
                }
            }
        }

        Self {
            tiles,
            edge_tiles,
            connections: Vec::new(),
            exits: 0,
        }
    }

    /// Number of tiles in the room
    #[inline]
    pub fn size(&self) -> usize {
        self.tiles.len()
    }

    /// Whether a passage to `other` was already carved
    #[inline]
    pub fn is_connected(&self, other: usize) -> bool {
        self.connections.contains(&other)
    }
}

/// Outcome of [`consolidate_regions`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionReport {
    /// Wall regions opened up for being too small
    pub walls_opened: usize,
    /// Empty regions filled in for being too small
    pub empties_filled: usize,
    /// Rooms built from the empty regions that survived
    pub rooms: Vec<Room>,
}

/// Flood fill the 4-connected region of the tile type found at `start`
///
/// Tiles are marked in `visited` (row-major, same layout as the grid).
pub fn flood_region(grid: &OccupancyGrid, start: TileCoord, visited: &mut [bool]) -> Vec<TileCoord> {
    let Some(kind) = grid.get(start.x, start.y) else {
        return Vec::new();
    };
    let width = grid.width();
    let index = |c: TileCoord| c.y as usize * width + c.x as usize;

    let mut tiles = Vec::new();
    let mut queue = VecDeque::new();
    visited[index(start)] = true;
    queue.push_back(start);

    while let Some(tile) = queue.pop_front() {
        tiles.push(tile);
        let neighbors = [
            TileCoord::new(tile.x - 1, tile.y),
            TileCoord::new(tile.x + 1, tile.y),
            TileCoord::new(tile.x, tile.y - 1),
            TileCoord::new(tile.x, tile.y + 1),
        ];
        for next in neighbors {
            if grid.get(next.x, next.y) == Some(kind) && !visited[index(next)] {
                visited[index(next)] = true;
                queue.push_back(next);
            }
        }
    }

    tiles
}

/// All 4-connected regions of one tile type, in scan order
pub fn find_regions(grid: &OccupancyGrid, kind: Tile) -> Vec<Vec<TileCoord>> {
    let mut visited = vec![false; grid.width() * grid.height()];
    let mut regions = Vec::new();

    for x in 0..grid.width() as i32 {
        for y in 0..grid.height() as i32 {
            let idx = y as usize * grid.width() + x as usize;
            if !visited[idx] && grid.get(x, y) == Some(kind) {
                regions.push(flood_region(grid, TileCoord::new(x, y), &mut visited));
            }
        }
    }

    regions
}

/// Remove small regions and build rooms
///
/// Wall regions under `min_wall_area` become empty, then empty regions under
/// `min_empty_area` become wall. Every remaining empty region is a room.
/// Running it again on its own output converts nothing.
pub fn consolidate_regions(
    grid: &mut OccupancyGrid,
    min_wall_area: usize,
    min_empty_area: usize,
) -> RegionReport {
    let walls_opened = flip_small_regions(grid, Tile::Wall, min_wall_area);
    let empties_filled = flip_small_regions(grid, Tile::Empty, min_empty_area);

    let rooms = find_regions(grid, Tile::Empty)
        .into_iter()
        .map(|tiles| Room::new(tiles, grid))
        .collect();

    RegionReport {
        walls_opened,
        empties_filled,
        rooms,
    }
}

fn flip_small_regions(grid: &mut OccupancyGrid, kind: Tile, min_area: usize) -> usize {
    let mut flipped = 0;
    for region in find_regions(grid, kind) {
        if region.len() < min_area {
            for tile in region {
                grid.set_coord(tile, kind.flipped());
            }
            flipped += 1;
        }
    }
    flipped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_regions_four_connected() {
        // Diagonal empties are separate regions
        let grid = OccupancyGrid::from_rows(&["#####", "#.###", "##.##", "#####"]);
        let regions = find_regions(&grid, Tile::Empty);
        assert_eq!(regions.len(), 2);
        assert!(regions.iter().all(|r| r.len() == 1));

        let walls = find_regions(&grid, Tile::Wall);
        assert_eq!(walls.len(), 1);
        assert_eq!(walls[0].len(), 18);
    }

    #[test]
    fn test_small_regions_removed() {
        let mut grid = OccupancyGrid::from_rows(&[
            "##########",
            "#......#.#",
            "#.##...###",
            "#......###",
            "##########",
        ]);
        let report = consolidate_regions(&mut grid, 5, 5);
        // The 2-tile pillar opens, the lone pocket at (8, 1) fills
        assert_eq!(report.walls_opened, 1);
        assert_eq!(report.empties_filled, 1);
        assert_eq!(report.rooms.len(), 1);
        assert_eq!(grid.get(2, 2), Some(Tile::Empty));
        assert_eq!(grid.get(8, 1), Some(Tile::Wall));
        assert_eq!(report.rooms[0].size(), 18);
    }

    #[test]
    fn test_consolidate_idempotent() {
        let mut grid = OccupancyGrid::from_rows(&[
            "############",
            "#....#.....#",
            "#.##.#..#..#",
            "#....####..#",
            "#.#........#",
            "##....##.#.#",
            "############",
        ]);
        consolidate_regions(&mut grid, 5, 5);
        let before = grid.clone();

        let second = consolidate_regions(&mut grid, 5, 5);
        assert_eq!(second.walls_opened, 0);
        assert_eq!(second.empties_filled, 0);
        assert_eq!(grid, before);
    }

    #[test]
    fn test_edge_tile_multiplicity() {
        // Single room tile surrounded on all four sides by wall
        let grid = OccupancyGrid::from_rows(&["###", "#.#", "###"]);
        let room = Room::new(vec![TileCoord::new(1, 1)], &grid);
        assert_eq!(room.edge_tiles.len(), 4);
        assert!(room.edge_tiles.iter().all(|&t| t == TileCoord::new(1, 1)));

        // Interior tiles of a larger room are not edges
        let grid = OccupancyGrid::from_rows(&["#####", "#...#", "#...#", "#...#", "#####"]);
        let tiles = find_regions(&grid, Tile::Empty).remove(0);
        let room = Room::new(tiles, &grid);
        assert!(!room.edge_tiles.contains(&TileCoord::new(2, 2)));
        // Corner tile of the room touches two walls
        let corner = room
            .edge_tiles
            .iter()
            .filter(|&&t| t == TileCoord::new(1, 1))
            .count();
        assert_eq!(corner, 2);
    }
}
