//! Piece and world configuration with validating builders
//!
//! The same `WorldConfig` (seed included) always produces the identical world.

use rand::Rng;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{CaveError, Result};

/// Size of the cellular-automata field before border padding
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapSize {
    /// Every piece uses the same field size
    Fixed {
        /// Field width in tiles
        width: usize,
        /// Field height in tiles
        height: usize,
    },
    /// Each dimension is drawn independently from `min..max`
    Randomized {
        /// Inclusive lower bound
        min: usize,
        /// Exclusive upper bound
        max: usize,
    },
}

impl MapSize {
    /// Draw the field dimensions, rounding odd values up to even
    pub fn dimensions<R: Rng + ?Sized>(self, rng: &mut R) -> (usize, usize) {
        let (width, height) = match self {
            MapSize::Fixed { width, height } => (width, height),
            MapSize::Randomized { min, max } => {
                let height = rng.gen_range(min..max);
                let width = rng.gen_range(min..max);
                (width, height)
            }
        };
        (round_up_even(width), round_up_even(height))
    }

    fn validate(self) -> Result<Self> {
        match self {
            MapSize::Fixed { width, height } if width < 2 || height < 2 => {
                Err(CaveError::InvalidConfig(format!(
                    "fixed map size must be at least 2x2 (got {}x{})",
                    width, height
                )))
            }
            MapSize::Randomized { min, max } if min < 2 || min >= max => {
                Err(CaveError::InvalidConfig(format!(
                    "randomized map size needs 2 <= min < max (got {}..{})",
                    min, max
                )))
            }
            size => Ok(size),
        }
    }
}

impl Default for MapSize {
    fn default() -> Self {
        MapSize::Fixed {
            width: 50,
            height: 25,
        }
    }
}

#[inline]
fn round_up_even(value: usize) -> usize {
    value + value % 2
}

/// Parameters of the single-piece cave pipeline
///
/// Distances named `max_*_distance` are compared against *squared* tile
/// distances, strictly.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PieceConfig {
    /// Field size before padding
    pub map_size: MapSize,
    /// Chance (0-100) that a tile starts as wall
    pub fill_percent: u32,
    /// Number of smoothing passes
    pub smooth_passes: usize,
    /// A tile with more wall neighbors than this becomes wall
    pub wall_threshold: u32,
    /// A tile with fewer wall neighbors than this becomes empty
    pub empty_threshold: u32,
    /// Requested border thickness (forced odd, see [`PieceConfig::border_thickness`])
    pub border_size: usize,
    /// Wall regions smaller than this are opened up
    pub min_wall_area: usize,
    /// Empty regions smaller than this are filled in
    pub min_empty_area: usize,
    /// Connection cap per room
    pub max_room_connections: usize,
    /// Squared-distance cutoff between room edge tiles
    pub max_distance_between_rooms: i32,
    /// Squared-distance cutoff between a room edge tile and the border
    pub max_exit_distance: i32,
    /// Exit cap per room
    pub max_exits_per_room: usize,
    /// Exit cap per piece, bounds the 2^n quantum precompute
    pub max_exits_per_piece: usize,
    /// Minimum edge-tile index spacing between exits of one room
    pub space_between_exits: usize,
    /// Minimum Euclidean spacing between exits on the border
    pub min_border_exit_distance: f32,
    /// Radius of the disk cleared along corridors
    pub passage_radius: i32,
    /// Full pipeline attempts before giving up
    pub max_attempts: usize,
    /// Height of extruded walls
    pub wall_height: f32,
}

impl PieceConfig {
    /// Border thickness actually applied (always odd)
    #[inline]
    pub fn border_thickness(&self) -> usize {
        if self.border_size % 2 == 0 {
            self.border_size + 1
        } else {
            self.border_size
        }
    }
}

impl Default for PieceConfig {
    fn default() -> Self {
        Self {
            map_size: MapSize::default(),
            fill_percent: 38,
            smooth_passes: 3,
            wall_threshold: 4,
            empty_threshold: 4,
            border_size: 2,
            min_wall_area: 5,
            min_empty_area: 5,
            max_room_connections: 1,
            max_distance_between_rooms: 15,
            max_exit_distance: 30,
            max_exits_per_room: 2,
            max_exits_per_piece: 6,
            space_between_exits: 10,
            min_border_exit_distance: 5.0,
            passage_radius: 2,
            max_attempts: 10,
            wall_height: 5.0,
        }
    }
}

/// Builder for [`PieceConfig`] with range validation
///
/// # Example
///
/// ```rust
/// use rust_quantum_caves::*;
///
/// let config = PieceConfigBuilder::new()
///     .map_size(MapSize::Fixed { width: 40, height: 30 })
///     .unwrap()
///     .fill_percent(45)
///     .unwrap()
///     .passage_radius(1)
///     .unwrap()
///     .build();
///
/// assert_eq!(config.border_thickness(), 3);
/// ```
#[derive(Debug, Clone, Default)]
pub struct PieceConfigBuilder {
    config: PieceConfig,
}

impl PieceConfigBuilder {
    /// Start from the defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the field size
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for sizes under 2 or an empty random range
    pub fn map_size(mut self, size: MapSize) -> Result<Self> {
        self.config.map_size = size.validate()?;
        Ok(self)
    }

    /// Set the initial wall percentage
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if `percent > 100`
    pub fn fill_percent(mut self, percent: u32) -> Result<Self> {
        if percent > 100 {
            return Err(CaveError::InvalidConfig(format!(
                "fill percent must be <= 100 (got {})",
                percent
            )));
        }
        self.config.fill_percent = percent;
        Ok(self)
    }

    /// Set the number of smoothing passes
    pub fn smooth_passes(mut self, passes: usize) -> Self {
        self.config.smooth_passes = passes;
        self
    }

    /// Set the smoothing thresholds
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if a threshold exceeds the 9-tile neighborhood
    pub fn thresholds(mut self, wall: u32, empty: u32) -> Result<Self> {
        if wall > 9 || empty > 9 {
            return Err(CaveError::InvalidConfig(format!(
                "smoothing thresholds must be <= 9 (got wall {}, empty {})",
                wall, empty
            )));
        }
        self.config.wall_threshold = wall;
        self.config.empty_threshold = empty;
        Ok(self)
    }

    /// Set the border thickness (even values are bumped to the next odd)
    pub fn border_size(mut self, size: usize) -> Self {
        self.config.border_size = size;
        self
    }

    /// Set the region repair areas
    pub fn min_areas(mut self, wall: usize, empty: usize) -> Self {
        self.config.min_wall_area = wall;
        self.config.min_empty_area = empty;
        self
    }

    /// Set the room connection cap and squared-distance cutoff
    pub fn room_connections(mut self, max_connections: usize, max_distance: i32) -> Self {
        self.config.max_room_connections = max_connections;
        self.config.max_distance_between_rooms = max_distance;
        self
    }

    /// Set the exit placement parameters
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if `per_piece` is 0 or above 16
    pub fn exits(
        mut self,
        per_room: usize,
        per_piece: usize,
        max_distance: i32,
        space_between: usize,
        min_border_distance: f32,
    ) -> Result<Self> {
        if per_piece == 0 || per_piece > 16 {
            return Err(CaveError::InvalidConfig(format!(
                "exits per piece must be in 1..=16 (got {})",
                per_piece
            )));
        }
        self.config.max_exits_per_room = per_room;
        self.config.max_exits_per_piece = per_piece;
        self.config.max_exit_distance = max_distance;
        self.config.space_between_exits = space_between;
        self.config.min_border_exit_distance = min_border_distance;
        Ok(self)
    }

    /// Set the corridor radius
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if `radius` is negative
    pub fn passage_radius(mut self, radius: i32) -> Result<Self> {
        if radius < 0 {
            return Err(CaveError::InvalidConfig(format!(
                "passage radius must be >= 0 (got {})",
                radius
            )));
        }
        self.config.passage_radius = radius;
        Ok(self)
    }

    /// Set the number of full pipeline attempts
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if `attempts` is 0
    pub fn max_attempts(mut self, attempts: usize) -> Result<Self> {
        if attempts == 0 {
            return Err(CaveError::InvalidConfig(
                "max attempts must be at least 1".to_string(),
            ));
        }
        self.config.max_attempts = attempts;
        Ok(self)
    }

    /// Set the wall extrusion height
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if `height <= 0.0`
    pub fn wall_height(mut self, height: f32) -> Result<Self> {
        if height <= 0.0 {
            return Err(CaveError::InvalidConfig(format!(
                "wall height must be positive (got {})",
                height
            )));
        }
        self.config.wall_height = height;
        Ok(self)
    }

    /// Build the configuration
    pub fn build(self) -> PieceConfig {
        self.config
    }
}

/// Configuration for assembling a world of pieces
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldConfig {
    /// Seed for the world's random stream
    pub seed: u64,
    /// Pieces generated eagerly before graph building
    pub pool_size: usize,
    /// Total piece-resolution steps allowed during graph expansion
    pub expansion_budget: usize,
    /// Fresh pieces tried when no pooled piece fits an exit
    pub new_piece_attempts: usize,
    /// Side length of the backdrop void grid, in nodes
    pub backdrop_size: usize,
    /// Whether the backdrop mesh carries a floor quad
    pub backdrop_floor: bool,
    /// Height of the floor quad
    pub floor_height: f32,
    /// Vertex snapping resolution used when welding combined meshes
    pub weld_resolution: f32,
    /// Beyond this distance two conflicting visible exits are both dropped
    pub conflict_cutoff_distance: f32,
    /// Per-piece pipeline parameters
    pub piece: PieceConfig,
}

impl Default for WorldConfig {
    fn default() -> Self {
        WorldConfigBuilder::new().build()
    }
}

/// Builder for [`WorldConfig`]
///
/// # Example
///
/// ```rust
/// use rust_quantum_caves::*;
///
/// let config = WorldConfigBuilder::new()
///     .seed(7)
///     .pool_size(4)
///     .unwrap()
///     .backdrop_size(256)
///     .unwrap()
///     .build();
///
/// assert_eq!(config.seed, 7);
/// assert_eq!(config.expansion_budget, 1000);
/// ```
#[derive(Debug, Clone)]
pub struct WorldConfigBuilder {
    seed: Option<u64>,
    pool_size: usize,
    expansion_budget: usize,
    new_piece_attempts: usize,
    backdrop_size: usize,
    backdrop_floor: bool,
    floor_height: f32,
    weld_resolution: f32,
    conflict_cutoff_distance: f32,
    piece: PieceConfig,
}

impl WorldConfigBuilder {
    /// Create a builder with default values
    ///
    /// Defaults:
    /// - seed: random
    /// - pool_size: 20
    /// - expansion_budget: 1000
    /// - new_piece_attempts: 100
    /// - backdrop_size: 500
    /// - backdrop_floor: true at height 4.0
    /// - weld_resolution: 0.5
    /// - conflict_cutoff_distance: 7.0
    pub fn new() -> Self {
        Self {
            seed: None,
            pool_size: 20,
            expansion_budget: 1000,
            new_piece_attempts: 100,
            backdrop_size: 500,
            backdrop_floor: true,
            floor_height: 4.0,
            weld_resolution: 0.5,
            conflict_cutoff_distance: 7.0,
            piece: PieceConfig::default(),
        }
    }

    /// Set the world seed
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the eager pool size
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if `size` is 0
    pub fn pool_size(mut self, size: usize) -> Result<Self> {
        if size == 0 {
            return Err(CaveError::InvalidConfig(
                "pool size must be at least 1".to_string(),
            ));
        }
        self.pool_size = size;
        Ok(self)
    }

    /// Set the expansion budget and the new-piece attempt bound
    pub fn expansion_limits(mut self, budget: usize, new_piece_attempts: usize) -> Self {
        self.expansion_budget = budget;
        self.new_piece_attempts = new_piece_attempts;
        self
    }

    /// Set the backdrop grid size
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if `size < 4`
    pub fn backdrop_size(mut self, size: usize) -> Result<Self> {
        if size < 4 {
            return Err(CaveError::InvalidConfig(format!(
                "backdrop size must be >= 4 (got {})",
                size
            )));
        }
        self.backdrop_size = size;
        Ok(self)
    }

    /// Enable or disable the backdrop floor
    pub fn backdrop_floor(mut self, enabled: bool, height: f32) -> Self {
        self.backdrop_floor = enabled;
        self.floor_height = height;
        self
    }

    /// Set the weld snapping resolution
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if `resolution <= 0.0`
    pub fn weld_resolution(mut self, resolution: f32) -> Result<Self> {
        if resolution <= 0.0 {
            return Err(CaveError::InvalidConfig(format!(
                "weld resolution must be positive (got {})",
                resolution
            )));
        }
        self.weld_resolution = resolution;
        Ok(self)
    }

    /// Set the conflicting-exit cutoff distance
    pub fn conflict_cutoff_distance(mut self, distance: f32) -> Self {
        self.conflict_cutoff_distance = distance;
        self
    }

    /// Set the per-piece pipeline parameters
    pub fn piece(mut self, piece: PieceConfig) -> Self {
        self.piece = piece;
        self
    }

    /// Build the configuration
    ///
    /// If no seed was provided, draws one from the thread RNG.
    pub fn build(self) -> WorldConfig {
        let seed = self.seed.unwrap_or_else(rand::random);

        WorldConfig {
            seed,
            pool_size: self.pool_size,
            expansion_budget: self.expansion_budget,
            new_piece_attempts: self.new_piece_attempts,
            backdrop_size: self.backdrop_size,
            backdrop_floor: self.backdrop_floor,
            floor_height: self.floor_height,
            weld_resolution: self.weld_resolution,
            conflict_cutoff_distance: self.conflict_cutoff_distance,
            piece: self.piece,
        }
    }
}

impl Default for WorldConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_border_forced_odd() {
        let config = PieceConfigBuilder::new().border_size(2).build();
        assert_eq!(config.border_thickness(), 3);

        let config = PieceConfigBuilder::new().border_size(5).build();
        assert_eq!(config.border_thickness(), 5);
    }

    #[test]
    fn test_fixed_size_rounds_to_even() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let size = MapSize::Fixed {
            width: 31,
            height: 20,
        };
        assert_eq!(size.dimensions(&mut rng), (32, 20));
    }

    #[test]
    fn test_randomized_size_in_range_and_even() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let size = MapSize::Randomized { min: 20, max: 41 };
        for _ in 0..50 {
            let (w, h) = size.dimensions(&mut rng);
            assert!(w % 2 == 0 && h % 2 == 0);
            assert!((20..=41).contains(&w));
            assert!((20..=41).contains(&h));
        }
    }

    #[test]
    fn test_piece_builder_validation() {
        assert!(PieceConfigBuilder::new().fill_percent(101).is_err());
        assert!(PieceConfigBuilder::new().passage_radius(-1).is_err());
        assert!(PieceConfigBuilder::new().max_attempts(0).is_err());
        assert!(PieceConfigBuilder::new().wall_height(0.0).is_err());
        assert!(PieceConfigBuilder::new().thresholds(10, 4).is_err());
        assert!(PieceConfigBuilder::new()
            .map_size(MapSize::Randomized { min: 30, max: 30 })
            .is_err());
        assert!(PieceConfigBuilder::new()
            .exits(2, 0, 30, 10, 5.0)
            .is_err());
    }

    #[test]
    fn test_piece_defaults() {
        let config = PieceConfig::default();
        assert_eq!(config.fill_percent, 38);
        assert_eq!(config.smooth_passes, 3);
        assert_eq!(config.max_attempts, 10);
        assert_eq!(config.max_exits_per_room, 2);
    }

    #[test]
    fn test_world_builder_defaults() {
        let config = WorldConfigBuilder::new().seed(3).build();
        assert_eq!(config.seed, 3);
        assert_eq!(config.pool_size, 20);
        assert_eq!(config.expansion_budget, 1000);
        assert_eq!(config.new_piece_attempts, 100);
        assert_eq!(config.backdrop_size, 500);
        assert!(config.backdrop_floor);
    }

    #[test]
    fn test_world_builder_validation() {
        assert!(WorldConfigBuilder::new().pool_size(0).is_err());
        assert!(WorldConfigBuilder::new().backdrop_size(3).is_err());
        assert!(WorldConfigBuilder::new().weld_resolution(0.0).is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_config_serialization() {
        let config = WorldConfigBuilder::new().seed(12345).build();

        let json = serde_json::to_string(&config).unwrap();
        let restored: WorldConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(config, restored);
    }
}
