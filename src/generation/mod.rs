//! Cave map generation pipeline
//!
//! Produces one finished occupancy grid plus its exit list:
//! random fill, smoothing, border padding, region repair, room links, exits.

mod cellular;
mod passages;
mod regions;

pub use cellular::{pad_border, random_fill, smooth, wall_neighbor_count};
pub use passages::{carve_disk, carve_passage, connect_closest_rooms, line, place_exits};
pub use regions::{consolidate_regions, find_regions, flood_region, RegionReport, Room};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, warn};

use crate::config::PieceConfig;
use crate::error::{CaveError, Result};
use crate::exit::Exit;
use crate::grid::OccupancyGrid;

/// A finished cave map ready for triangulation
#[derive(Debug, Clone)]
pub struct CaveMap {
    /// Padded occupancy grid
    pub grid: OccupancyGrid,
    /// Exits in placement order (ids 1, 2, 4, ...)
    pub exits: Vec<Exit>,
    /// Rooms as they stood after passages and exits were carved
    pub rooms: Vec<Room>,
    /// Pipeline attempts it took, starting at 1
    pub attempts: usize,
    /// Seed of the fill stream for the successful attempt
    pub fill_seed: u64,
}

/// Run the full cave pipeline, retrying while no exit could be placed
///
/// # Errors
///
/// Returns `GenerationExhausted` if every one of `config.max_attempts`
/// attempts ends with zero exits.
///
/// # Example
///
/// ```rust
/// use rand::SeedableRng;
/// use rand_chacha::ChaCha8Rng;
/// use rust_quantum_caves::*;
///
/// let config = PieceConfigBuilder::new()
///     .map_size(MapSize::Fixed { width: 30, height: 20 })
///     .unwrap()
///     .build();
/// let mut rng = ChaCha8Rng::seed_from_u64(42);
///
/// if let Ok(map) = generate_cave_map(&config, &mut rng) {
///     assert!(!map.exits.is_empty());
///     assert_eq!(map.grid.width(), 36);
/// }
/// ```
pub fn generate_cave_map<R: Rng + ?Sized>(config: &PieceConfig, rng: &mut R) -> Result<CaveMap> {
    for attempt in 1..=config.max_attempts {
        let (width, height) = config.map_size.dimensions(rng);
        let fill_seed: u64 = rng.gen();
        let mut fill_rng = ChaCha8Rng::seed_from_u64(fill_seed);

        let mut field = random_fill(width, height, config.fill_percent, &mut fill_rng);
        for _ in 0..config.smooth_passes {
            smooth(&mut field, config.wall_threshold, config.empty_threshold);
        }

        let mut grid = pad_border(&field, config.border_thickness());
        let report = consolidate_regions(&mut grid, config.min_wall_area, config.min_empty_area);
        let mut rooms = report.rooms;

        let passages = connect_closest_rooms(
            &mut grid,
            &mut rooms,
            config.max_room_connections,
            config.max_distance_between_rooms,
            config.passage_radius,
        );
        let exits = place_exits(&mut grid, &mut rooms, config);

        debug!(
            attempt,
            width = grid.width(),
            height = grid.height(),
            rooms = rooms.len(),
            passages,
            exits = exits.len(),
            "cave map attempt"
        );

        if !exits.is_empty() {
            return Ok(CaveMap {
                grid,
                exits,
                rooms,
                attempts: attempt,
                fill_seed,
            });
        }
    }

    warn!(attempts = config.max_attempts, "no exits after every attempt");
    Err(CaveError::GenerationExhausted {
        attempts: config.max_attempts,
    })
}
