//! WorldPiece: one generated cave piece and its place in the piece graph

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use glam::{Vec2, Vec3};
use rand::Rng;
use tracing::debug;

use crate::config::PieceConfig;
use crate::error::{CaveError, Result};
use crate::exit::{Exit, ExitId, WallDir};
use crate::generation::{generate_cave_map, CaveMap};
use crate::grid::OccupancyGrid;
use crate::mesh::{MeshData, PieceMeshes};

#[cfg(feature = "spatial-index")]
use crate::spatial::ExitIndex;

/// Index of a piece in the world arena
pub type PieceId = usize;

/// Height of exit markers and perimeter samples above the ceiling plane
pub const EXIT_SAMPLE_HEIGHT: f32 = 1.5;

/// Side length of the square sampled around each exit
pub const EXIT_PERIMETER_SIZE: f32 = 1.5;

/// Samples per side of an exit perimeter square
const PERIMETER_STEPS: usize = 8;

/// Immutable geometry shared between a piece and all of its clones
#[derive(Debug)]
pub struct PieceGeometry {
    /// Finished occupancy grid
    pub grid: OccupancyGrid,
    /// Ceiling, walls and outlines generated from `grid`
    pub meshes: PieceMeshes,
    /// Exits keyed by id
    pub exits: BTreeMap<ExitId, Exit>,
    /// Exit ids grouped by the wall they open through, in placement order
    pub exit_conflicts: BTreeMap<WallDir, Vec<ExitId>>,
    #[cfg(feature = "spatial-index")]
    exit_index: ExitIndex,
}

/// Merged meshes for one quantum key
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CombinedMeshes {
    /// Own ceiling, neighbor ceilings and the backdrop, welded
    pub ceiling: MeshData,
    /// Own walls and neighbor walls, welded (key 0 keeps the raw own walls)
    pub walls: MeshData,
}

/// A cave piece placed (or waiting to be placed) in the world graph
///
/// Clones share [`PieceGeometry`] with their source and own independent
/// navigation and offset maps.
///
/// # Examples
///
/// ```
/// use rand::SeedableRng;
/// use rand_chacha::ChaCha8Rng;
/// use rust_quantum_caves::*;
///
/// let config = PieceConfigBuilder::new()
///     .map_size(MapSize::Fixed { width: 30, height: 20 })
///     .unwrap()
///     .build();
/// let mut rng = ChaCha8Rng::seed_from_u64(3);
///
/// if let Ok(piece) = WorldPiece::generate(0, &config, &mut rng) {
///     assert_eq!(piece.width(), 36);
///     for id in piece.exit_ids() {
///         assert!(id.is_power_of_two());
///         assert_eq!(piece.neighbor(id), None);
///     }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct WorldPiece {
    id: PieceId,
    source: PieceId,
    used: bool,
    geometry: Arc<PieceGeometry>,
    navigation: BTreeMap<ExitId, Option<PieceId>>,
    offsets: BTreeMap<ExitId, Vec3>,
    quantum: HashMap<u32, Arc<CombinedMeshes>>,
    markers: Vec<Vec3>,
}

impl WorldPiece {
    /// Generate a fresh piece with the cave pipeline
    ///
    /// # Errors
    ///
    /// Returns `GenerationExhausted` when no attempt produced an exit.
    pub fn generate<R: Rng + ?Sized>(id: PieceId, config: &PieceConfig, rng: &mut R) -> Result<Self> {
        let map = generate_cave_map(config, rng)?;
        debug!(
            piece = id,
            exits = map.exits.len(),
            attempts = map.attempts,
            "generated piece"
        );
        Ok(Self::from_map(id, map, config.wall_height))
    }

    /// Build a piece from a finished cave map
    pub fn from_map(id: PieceId, map: CaveMap, wall_height: f32) -> Self {
        Self::from_grid(id, map.grid, &map.exits, wall_height)
    }

    /// Build a piece from a grid and its exits
    pub fn from_grid(id: PieceId, grid: OccupancyGrid, exits: &[Exit], wall_height: f32) -> Self {
        let meshes = PieceMeshes::generate(&grid, wall_height);

        let mut exit_conflicts: BTreeMap<WallDir, Vec<ExitId>> = BTreeMap::new();
        for exit in exits {
            exit_conflicts.entry(exit.wall_dir).or_default().push(exit.id);
        }
        let exit_map: BTreeMap<ExitId, Exit> = exits.iter().map(|e| (e.id, *e)).collect();

        #[cfg(feature = "spatial-index")]
        let exit_index = {
            let points: Vec<(ExitId, Vec2)> = exits
                .iter()
                .map(|e| (e.id, local_exit_point(&grid, e)))
                .collect();
            ExitIndex::new(&points)
        };

        let geometry = PieceGeometry {
            grid,
            meshes,
            exits: exit_map,
            exit_conflicts,
            #[cfg(feature = "spatial-index")]
            exit_index,
        };

        Self {
            id,
            source: id,
            used: false,
            navigation: exits.iter().map(|e| (e.id, None)).collect(),
            offsets: exits.iter().map(|e| (e.id, Vec3::ZERO)).collect(),
            geometry: Arc::new(geometry),
            quantum: HashMap::new(),
            markers: Vec::new(),
        }
    }

    /// Copy this piece under a new id
    ///
    /// The clone shares geometry, copies the current navigation, offsets and
    /// markers, and starts with an empty quantum cache.
    pub fn clone_as(&self, id: PieceId) -> Self {
        Self {
            id,
            source: self.source,
            used: true,
            geometry: Arc::clone(&self.geometry),
            navigation: self.navigation.clone(),
            offsets: self.offsets.clone(),
            quantum: HashMap::new(),
            markers: self.markers.clone(),
        }
    }

    /// Arena id
    #[inline]
    pub fn id(&self) -> PieceId {
        self.id
    }

    /// Id of the generated piece whose geometry this one shares
    #[inline]
    pub fn source(&self) -> PieceId {
        self.source
    }

    /// Whether graph expansion has reached this piece
    #[inline]
    pub fn is_used(&self) -> bool {
        self.used
    }

    pub(crate) fn mark_used(&mut self) {
        self.used = true;
    }

    /// Width in tiles, border included
    #[inline]
    pub fn width(&self) -> usize {
        self.geometry.grid.width()
    }

    /// Height in tiles, border included
    #[inline]
    pub fn height(&self) -> usize {
        self.geometry.grid.height()
    }

    /// Shared geometry
    pub fn geometry(&self) -> &Arc<PieceGeometry> {
        &self.geometry
    }

    /// Whether two pieces share the same geometry allocation
    pub fn shares_geometry(&self, other: &WorldPiece) -> bool {
        Arc::ptr_eq(&self.geometry, &other.geometry)
    }

    /// Finished occupancy grid
    pub fn grid(&self) -> &OccupancyGrid {
        &self.geometry.grid
    }

    /// Ceiling mesh in piece-local coordinates
    pub fn ceiling(&self) -> &MeshData {
        &self.geometry.meshes.ceiling
    }

    /// Wall mesh in piece-local coordinates
    pub fn walls(&self) -> &MeshData {
        &self.geometry.meshes.walls
    }

    /// All exits in id order
    pub fn exits(&self) -> impl Iterator<Item = &Exit> {
        self.geometry.exits.values()
    }

    /// Exit ids in ascending order
    pub fn exit_ids(&self) -> impl Iterator<Item = ExitId> + '_ {
        self.geometry.exits.keys().copied()
    }

    /// Look up an exit
    pub fn exit(&self, exit: ExitId) -> Option<&Exit> {
        self.geometry.exits.get(&exit)
    }

    /// Exit ids per wall direction
    pub fn exit_conflicts(&self) -> &BTreeMap<WallDir, Vec<ExitId>> {
        &self.geometry.exit_conflicts
    }

    /// Navigation map: exit id to neighbor, `None` while unresolved
    pub fn navigation(&self) -> &BTreeMap<ExitId, Option<PieceId>> {
        &self.navigation
    }

    /// Connection offsets per exit
    pub fn offsets(&self) -> &BTreeMap<ExitId, Vec3> {
        &self.offsets
    }

    /// Neighbor through an exit, `None` if unresolved or unknown
    pub fn neighbor(&self, exit: ExitId) -> Option<PieceId> {
        self.navigation.get(&exit).copied().flatten()
    }

    /// Whether every exit leads somewhere
    pub fn is_resolved(&self) -> bool {
        self.navigation.values().all(Option::is_some)
    }

    /// Exits with no neighbor yet, ascending
    pub fn unresolved_exits(&self) -> Vec<ExitId> {
        self.navigation
            .iter()
            .filter(|(_, n)| n.is_none())
            .map(|(&id, _)| id)
            .collect()
    }

    /// Exits with a neighbor, ascending
    pub fn resolved_exits(&self) -> Vec<ExitId> {
        self.navigation
            .iter()
            .filter(|(_, n)| n.is_some())
            .map(|(&id, _)| id)
            .collect()
    }

    /// Translation from this piece's center to the neighbor's center
    ///
    /// # Errors
    ///
    /// Returns `ExitNotFound` for an unknown exit and `UnresolvedExit` when
    /// nothing is connected through it yet.
    pub fn connection_offset(&self, exit: ExitId) -> Result<Vec3> {
        match self.navigation.get(&exit) {
            None => Err(CaveError::ExitNotFound {
                piece: self.id,
                exit,
            }),
            Some(None) => Err(CaveError::UnresolvedExit {
                piece: self.id,
                exit,
            }),
            Some(Some(_)) => Ok(self.offsets.get(&exit).copied().unwrap_or(Vec3::ZERO)),
        }
    }

    /// Record a link through `exit`, returning the neighbor it replaced
    pub(crate) fn link(&mut self, exit: ExitId, neighbor: PieceId, offset: Vec3) -> Option<PieceId> {
        let previous = self.navigation.insert(exit, Some(neighbor)).flatten();
        self.offsets.insert(exit, offset);
        previous
    }

    /// First exit (lowest id) that can connect to `target`
    pub fn compatible_exit(&self, target: &Exit) -> Option<ExitId> {
        let wanted = target.wall_dir.opposite()?;
        self.exits().find(|e| e.wall_dir == wanted).map(|e| e.id)
    }

    /// Exit tile position relative to the piece center, whole units
    ///
    /// # Errors
    ///
    /// Returns `ExitNotFound` for an unknown exit.
    pub fn exit_local_position(&self, exit: ExitId) -> Result<Vec3> {
        let found = self.exit(exit).ok_or(CaveError::ExitNotFound {
            piece: self.id,
            exit,
        })?;
        Ok(local_exit_point(self.grid(), found).extend(0.0))
    }

    /// Exit position in world space when the piece center sits at `origin`
    ///
    /// # Errors
    ///
    /// Returns `ExitNotFound` for an unknown exit.
    pub fn exit_world_position(&self, origin: Vec3, exit: ExitId) -> Result<Vec3> {
        let local = self.exit_local_position(exit)?;
        Ok(Vec3::new(
            origin.x + local.x,
            origin.y + local.y,
            EXIT_SAMPLE_HEIGHT,
        ))
    }

    /// Sample points around every exit, for visibility checks
    ///
    /// Each exit gets a square of side [`EXIT_PERIMETER_SIZE`] around its world
    /// position, eight samples per side taken in step with one another.
    pub fn exit_perimeter_positions(&self, origin: Vec3) -> BTreeMap<ExitId, Vec<Vec3>> {
        let half = EXIT_PERIMETER_SIZE / 2.0;
        self.exits()
            .map(|exit| {
                let local = local_exit_point(self.grid(), exit);
                let center = Vec3::new(origin.x + local.x, origin.y + local.y, EXIT_SAMPLE_HEIGHT);
                let mut samples = Vec::with_capacity(PERIMETER_STEPS * 4);
                for k in 0..PERIMETER_STEPS {
                    let i = -half + 0.1 * k as f32;
                    samples.push(center + Vec3::new(-half, i, 0.0));
                    samples.push(center + Vec3::new(i, half, 0.0));
                    samples.push(center + Vec3::new(half, -i, 0.0));
                    samples.push(center + Vec3::new(-i, -half, 0.0));
                }
                (exit.id, samples)
            })
            .collect()
    }

    /// Whether a piece-local point lies inside the footprint
    pub fn contains_local(&self, local: Vec2) -> bool {
        let half_w = (self.width() / 2) as f32;
        let half_h = (self.height() / 2) as f32;
        local.x.abs() <= half_w && local.y.abs() <= half_h
    }

    /// Exit the viewer is leaving through, if `position` is outside the footprint
    ///
    /// Returns the exit nearest to the position, or `None` while inside.
    pub fn departing_exit(&self, origin: Vec3, position: Vec3) -> Option<ExitId> {
        let local = (position - origin).truncate();
        if self.contains_local(local) {
            return None;
        }
        self.nearest_exit(local)
    }

    #[cfg(feature = "spatial-index")]
    fn nearest_exit(&self, local: Vec2) -> Option<ExitId> {
        self.geometry.exit_index.find_nearest(local)
    }

    #[cfg(not(feature = "spatial-index"))]
    fn nearest_exit(&self, local: Vec2) -> Option<ExitId> {
        self.exits()
            .map(|e| (e.id, local_exit_point(self.grid(), e).distance_squared(local)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }

    /// Cached combined meshes for a quantum key
    pub fn quantum_mesh(&self, key: u32) -> Option<&Arc<CombinedMeshes>> {
        self.quantum.get(&key)
    }

    /// Number of cached quantum keys
    pub fn quantum_len(&self) -> usize {
        self.quantum.len()
    }

    /// Cached quantum keys, ascending
    pub fn quantum_keys(&self) -> Vec<u32> {
        let mut keys: Vec<u32> = self.quantum.keys().copied().collect();
        keys.sort_unstable();
        keys
    }

    pub(crate) fn set_quantum(&mut self, cache: HashMap<u32, Arc<CombinedMeshes>>) {
        self.quantum = cache;
    }

    /// Markers placed in this piece, piece-local
    pub fn markers(&self) -> &[Vec3] {
        &self.markers
    }

    pub(crate) fn push_marker(&mut self, position: Vec3) {
        self.markers.push(position);
    }
}

/// Exit tile relative to the piece center: `(-(w/2) + x, -(h/2) + y)`
fn local_exit_point(grid: &OccupancyGrid, exit: &Exit) -> Vec2 {
    let half_w = (grid.width() / 2) as i32;
    let half_h = (grid.height() / 2) as i32;
    Vec2::new(
        (exit.coords.x - half_w) as f32,
        (exit.coords.y - half_h) as f32,
    )
}
