//! Occupancy grid shared by every generation stage

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Occupancy of a single tile
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tile {
    /// Walkable space
    Empty,
    /// Solid rock
    Wall,
}

impl Tile {
    /// The opposite occupancy
    #[inline]
    pub fn flipped(self) -> Tile {
        match self {
            Tile::Empty => Tile::Wall,
            Tile::Wall => Tile::Empty,
        }
    }
}

/// Integer (column, row) tile position
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TileCoord {
    /// Column
    pub x: i32,
    /// Row
    pub y: i32,
}

impl TileCoord {
    /// Create a coordinate
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another tile
    #[inline]
    pub fn distance_squared(self, other: TileCoord) -> i32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Euclidean distance to another tile
    #[inline]
    pub fn distance(self, other: TileCoord) -> f32 {
        (self.distance_squared(other) as f32).sqrt()
    }
}

/// Row-major 2D grid of tiles
///
/// `(0, 0)` is the bottom-left tile; `x` grows with columns and `y` with rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccupancyGrid {
    width: usize,
    height: usize,
    tiles: Vec<Tile>,
}

impl OccupancyGrid {
    /// Create a grid filled with one tile type
    pub fn filled(width: usize, height: usize, tile: Tile) -> Self {
        Self {
            width,
            height,
            tiles: vec![tile; width * height],
        }
    }

    /// Build a grid from text rows, `#` for wall and anything else for empty
    ///
    /// `rows[0]` is row `y = 0`. Rows shorter than the longest row are padded
    /// with walls.
    pub fn from_rows(rows: &[&str]) -> Self {
        let height = rows.len();
        let width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0);
        let mut grid = Self::filled(width, height, Tile::Wall);
        for (y, row) in rows.iter().enumerate() {
            for (x, ch) in row.chars().enumerate() {
                let tile = if ch == '#' { Tile::Wall } else { Tile::Empty };
                grid.set(x as i32, y as i32, tile);
            }
        }
        grid
    }

    /// Grid width in tiles
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Grid height in tiles
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Whether `(x, y)` lies inside the grid
    #[inline]
    pub fn in_range(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    /// Tile at `(x, y)`, or `None` outside the grid
    #[inline]
    pub fn get(&self, x: i32, y: i32) -> Option<Tile> {
        if !self.in_range(x, y) {
            return None;
        }
        Some(self.tiles[y as usize * self.width + x as usize])
    }

    /// Whether `(x, y)` is a wall; tiles outside the grid count as wall
    #[inline]
    pub fn is_wall(&self, x: i32, y: i32) -> bool {
        self.get(x, y).map_or(true, |t| t == Tile::Wall)
    }

    /// Set a tile; writes outside the grid are ignored
    #[inline]
    pub fn set(&mut self, x: i32, y: i32, tile: Tile) {
        if self.in_range(x, y) {
            self.tiles[y as usize * self.width + x as usize] = tile;
        }
    }

    /// Set a tile by coordinate
    #[inline]
    pub fn set_coord(&mut self, coord: TileCoord, tile: Tile) {
        self.set(coord.x, coord.y, tile);
    }

    /// Number of tiles of the given type
    pub fn count(&self, tile: Tile) -> usize {
        self.tiles.iter().filter(|&&t| t == tile).count()
    }

    /// Whether `(x, y)` lies on the outermost ring of the grid
    #[inline]
    pub fn is_border(&self, x: i32, y: i32) -> bool {
        self.in_range(x, y)
            && (x == 0 || y == 0 || x as usize == self.width - 1 || y as usize == self.height - 1)
    }

    /// Whether `(x, y)` is one of the four grid corners
    #[inline]
    pub fn is_corner(&self, x: i32, y: i32) -> bool {
        let right = self.width as i32 - 1;
        let top = self.height as i32 - 1;
        (x == 0 || x == right) && (y == 0 || y == top)
    }

    /// Iterate the border ring column by column, `x` outer and `y` inner
    pub fn border_tiles(&self) -> impl Iterator<Item = TileCoord> + '_ {
        let (w, h) = (self.width as i32, self.height as i32);
        (0..w)
            .flat_map(move |x| (0..h).map(move |y| TileCoord::new(x, y)))
            .filter(move |c| self.is_border(c.x, c.y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_out_of_range() {
        let grid = OccupancyGrid::filled(3, 2, Tile::Empty);
        assert_eq!(grid.get(0, 0), Some(Tile::Empty));
        assert_eq!(grid.get(3, 0), None);
        assert_eq!(grid.get(-1, 1), None);
        assert!(grid.is_wall(-1, 1));
        assert!(!grid.is_wall(2, 1));
    }

    #[test]
    fn test_from_rows() {
        let grid = OccupancyGrid::from_rows(&["###", "#.#", "###"]);
        assert_eq!(grid.width(), 3);
        assert_eq!(grid.height(), 3);
        assert_eq!(grid.count(Tile::Empty), 1);
        assert_eq!(grid.get(1, 1), Some(Tile::Empty));
    }

    #[test]
    fn test_border_ring() {
        let grid = OccupancyGrid::filled(4, 3, Tile::Wall);
        let border: Vec<TileCoord> = grid.border_tiles().collect();
        // 4x3 grid: everything except the 2 interior tiles
        assert_eq!(border.len(), 10);
        assert!(!border.contains(&TileCoord::new(1, 1)));
        assert!(grid.is_corner(3, 2));
        assert!(grid.is_corner(0, 0));
        assert!(!grid.is_corner(1, 0));
    }

    #[test]
    fn test_distance() {
        let a = TileCoord::new(0, 0);
        let b = TileCoord::new(3, 4);
        assert_eq!(a.distance_squared(b), 25);
        assert!((a.distance(b) - 5.0).abs() < 1e-6);
    }
}
