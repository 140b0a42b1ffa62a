//! Exits: doorways carved through a piece's border

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::grid::TileCoord;

/// Binary exit identifier, a distinct power of two within one piece
///
/// Summing (or OR-ing) the ids of a subset yields its quantum-mesh key.
pub type ExitId = u32;

/// Border wall an exit opens through
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WallDir {
    /// Top row
    North,
    /// Right column
    East,
    /// Bottom row
    South,
    /// Left column
    West,
    /// Position did not resolve to a wall (a corner)
    Error,
}

impl WallDir {
    /// The wall a neighbor must expose to connect to this one
    ///
    /// `Error` has no opposite.
    pub fn opposite(self) -> Option<WallDir> {
        match self {
            WallDir::North => Some(WallDir::South),
            WallDir::East => Some(WallDir::West),
            WallDir::South => Some(WallDir::North),
            WallDir::West => Some(WallDir::East),
            WallDir::Error => None,
        }
    }

    /// Next wall clockwise
    pub fn clockwise(self) -> WallDir {
        match self {
            WallDir::North => WallDir::East,
            WallDir::East => WallDir::South,
            WallDir::South => WallDir::West,
            WallDir::West => WallDir::North,
            WallDir::Error => WallDir::Error,
        }
    }

    /// Classify a border tile of a `width` x `height` grid
    ///
    /// Column 0 is west, row 0 is south, any other tile short of the top row is
    /// east, the rest of the top row is north. The top-right corner is `Error`.
    pub fn for_border_tile(tile: TileCoord, width: usize, height: usize) -> WallDir {
        let (w, h) = (width as i32, height as i32);
        if tile.x == 0 {
            WallDir::West
        } else if tile.y == 0 {
            WallDir::South
        } else if tile.y < h - 1 {
            WallDir::East
        } else if tile.x < w - 1 {
            WallDir::North
        } else {
            WallDir::Error
        }
    }
}

/// A doorway on the border of a piece
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exit {
    /// Border tile the corridor reaches
    pub coords: TileCoord,
    /// Wall the exit opens through
    pub wall_dir: WallDir,
    /// Power-of-two identifier
    pub id: ExitId,
}

impl Exit {
    /// Create an exit
    pub fn new(coords: TileCoord, wall_dir: WallDir, id: ExitId) -> Self {
        Self {
            coords,
            wall_dir,
            id,
        }
    }

    /// Id for the exit placed after `existing` others: `2^existing`
    #[inline]
    pub fn id_for_index(existing: usize) -> ExitId {
        1 << existing
    }

    /// Whether another exit can connect to this one
    #[inline]
    pub fn faces(&self, other: &Exit) -> bool {
        self.wall_dir.opposite() == Some(other.wall_dir)
    }

    /// Rotate a quarter turn clockwise inside a square piece of side `width`
    pub fn rotate_clockwise(&mut self, width: usize) {
        self.wall_dir = self.wall_dir.clockwise();
        let last = width as i32 - 1;
        self.coords = TileCoord::new(self.coords.y, last - self.coords.x);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_layout() {
        assert_eq!(Exit::id_for_index(0), 1);
        assert_eq!(Exit::id_for_index(1), 2);
        assert_eq!(Exit::id_for_index(2), 4);
        assert_eq!(Exit::id_for_index(5), 32);
    }

    #[test]
    fn test_opposites() {
        assert_eq!(WallDir::North.opposite(), Some(WallDir::South));
        assert_eq!(WallDir::East.opposite(), Some(WallDir::West));
        assert_eq!(WallDir::South.opposite(), Some(WallDir::North));
        assert_eq!(WallDir::West.opposite(), Some(WallDir::East));
        assert_eq!(WallDir::Error.opposite(), None);
    }

    #[test]
    fn test_border_classification() {
        let (w, h) = (10, 8);
        assert_eq!(WallDir::for_border_tile(TileCoord::new(0, 4), w, h), WallDir::West);
        assert_eq!(WallDir::for_border_tile(TileCoord::new(4, 0), w, h), WallDir::South);
        assert_eq!(WallDir::for_border_tile(TileCoord::new(9, 4), w, h), WallDir::East);
        assert_eq!(WallDir::for_border_tile(TileCoord::new(4, 7), w, h), WallDir::North);
        assert_eq!(WallDir::for_border_tile(TileCoord::new(9, 7), w, h), WallDir::Error);
    }

    #[test]
    fn test_faces() {
        let a = Exit::new(TileCoord::new(9, 3), WallDir::East, 1);
        let b = Exit::new(TileCoord::new(0, 5), WallDir::West, 2);
        let c = Exit::new(TileCoord::new(3, 0), WallDir::South, 4);
        assert!(a.faces(&b));
        assert!(b.faces(&a));
        assert!(!a.faces(&c));
    }

    #[test]
    fn test_rotate_clockwise() {
        let mut exit = Exit::new(TileCoord::new(3, 9), WallDir::North, 1);
        exit.rotate_clockwise(10);
        assert_eq!(exit.wall_dir, WallDir::East);
        assert_eq!(exit.coords, TileCoord::new(9, 6));

        for _ in 0..3 {
            exit.rotate_clockwise(10);
        }
        assert_eq!(exit.wall_dir, WallDir::North);
        assert_eq!(exit.coords, TileCoord::new(3, 9));
    }
}
