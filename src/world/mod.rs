//! World assembly: the piece arena, graph expansion and mesh lookup
//!
//! The world owns every piece in an arena indexed by [`PieceId`]. Graph
//! expansion resolves exits breadth-first from a start piece, reusing pooled
//! pieces (cloning them when their matching exit is taken) and generating new
//! ones on demand.

mod clones;
mod quantum;

pub use clones::CloneIndex;
pub use quantum::{composite_piece, exit_subsets};

use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;

use glam::Vec3;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use crate::config::WorldConfig;
use crate::error::{CaveError, Result};
use crate::exit::{Exit, ExitId};
use crate::mesh::BackdropGrid;
use crate::piece::{CombinedMeshes, PieceId, WorldPiece};

/// One recorded connect operation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Connection {
    /// Piece and exit on the side that asked for a neighbor
    pub from: (PieceId, ExitId),
    /// Piece and exit it was joined to
    pub to: (PieceId, ExitId),
    /// Offset from `from`'s center to `to`'s center
    pub offset: Vec3,
}

/// An unbounded cave world built from connected pieces
///
/// # Examples
///
/// ```no_run
/// use rust_quantum_caves::*;
///
/// let config = WorldConfigBuilder::new()
///     .seed(42)
///     .pool_size(8)
///     .unwrap()
///     .backdrop_size(256)
///     .unwrap()
///     .build();
///
/// let world = World::generate(config).unwrap();
/// let start = world.start().unwrap();
///
/// // Everything visible from the start piece: its own geometry only
/// let meshes = world.combined_mesh(start, 0).unwrap();
/// println!("{} ceiling triangles", meshes.ceiling.triangle_count());
/// ```
#[derive(Debug)]
pub struct World {
    config: WorldConfig,
    rng: ChaCha8Rng,
    pieces: Vec<WorldPiece>,
    clones: CloneIndex,
    connections: Vec<Connection>,
    start: Option<PieceId>,
    backdrop: BackdropGrid,
}

impl World {
    /// Create an empty world seeded from `config.seed`
    pub fn new(config: WorldConfig) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            backdrop: BackdropGrid::new(config.backdrop_size),
            config,
            pieces: Vec::new(),
            clones: CloneIndex::new(),
            connections: Vec::new(),
            start: None,
        }
    }

    /// Fill the pool, expand the graph from a random pool piece and
    /// precompute every quantum mesh
    ///
    /// # Errors
    ///
    /// Propagates `GenerationExhausted` from pool filling,
    /// `GraphExpansionExhausted` from expansion and `InvalidWorldCoordinates`
    /// from compositing.
    pub fn generate(config: WorldConfig) -> Result<Self> {
        let mut world = Self::new(config);
        world.fill_pool()?;
        let start = world.choose_start()?;
        world.build_graph(start)?;
        world.precompute_quantum_meshes()?;
        Ok(world)
    }

    /// Configuration this world was built with
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Generate `pool_size` pieces up front
    ///
    /// # Errors
    ///
    /// Returns `GenerationExhausted` if any pooled piece fails to generate.
    pub fn fill_pool(&mut self) -> Result<()> {
        for _ in 0..self.config.pool_size {
            self.spawn_piece()?;
        }
        info!(pieces = self.pieces.len(), "piece pool filled");
        Ok(())
    }

    /// Generate one piece and add it to the arena
    ///
    /// # Errors
    ///
    /// Returns `GenerationExhausted` when the cave pipeline gives up.
    pub fn spawn_piece(&mut self) -> Result<PieceId> {
        let id = self.pieces.len();
        let piece = WorldPiece::generate(id, &self.config.piece, &mut self.rng)?;
        self.pieces.push(piece);
        Ok(id)
    }

    /// Insert an already built piece, reassigning nothing
    ///
    /// The piece's id must equal the current arena length.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the id does not match its arena slot.
    pub fn insert_piece(&mut self, piece: WorldPiece) -> Result<PieceId> {
        let id = self.pieces.len();
        if piece.id() != id {
            return Err(CaveError::InvalidConfig(format!(
                "piece id {} does not match arena slot {}",
                piece.id(),
                id
            )));
        }
        self.pieces.push(piece);
        Ok(id)
    }

    /// Pick a random pooled piece as the start
    ///
    /// # Errors
    ///
    /// Returns `PieceNotFound(0)` when the arena is empty.
    pub fn choose_start(&mut self) -> Result<PieceId> {
        if self.pieces.is_empty() {
            return Err(CaveError::PieceNotFound(0));
        }
        let start = self.rng.gen_range(0..self.pieces.len());
        self.start = Some(start);
        Ok(start)
    }

    /// Piece the graph was expanded from
    pub fn start(&self) -> Option<PieceId> {
        self.start
    }

    /// All pieces, indexed by id
    pub fn pieces(&self) -> &[WorldPiece] {
        &self.pieces
    }

    /// Number of pieces in the arena
    pub fn piece_count(&self) -> usize {
        self.pieces.len()
    }

    /// Look up a piece
    ///
    /// # Errors
    ///
    /// Returns `PieceNotFound` for an unknown id.
    pub fn piece(&self, id: PieceId) -> Result<&WorldPiece> {
        self.pieces.get(id).ok_or(CaveError::PieceNotFound(id))
    }

    fn piece_mut(&mut self, id: PieceId) -> Result<&mut WorldPiece> {
        self.pieces.get_mut(id).ok_or(CaveError::PieceNotFound(id))
    }

    /// Clone-equivalence index
    pub fn clone_index(&self) -> &CloneIndex {
        &self.clones
    }

    /// Every connect operation in order
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Resolve exits breadth-first starting at `start`
    ///
    /// Each dequeued piece counts against `expansion_budget`. For every
    /// unresolved exit the arena is searched in random order for a piece with
    /// an exit on the opposite wall; a candidate whose matching exit is already
    /// taken is cloned first. With no candidate, fresh pieces are generated.
    ///
    /// # Errors
    ///
    /// Returns `GraphExpansionExhausted` when the budget or the fresh-piece
    /// bound trips; the pieces resolved so far stay in the world.
    pub fn build_graph(&mut self, start: PieceId) -> Result<()> {
        self.piece(start)?;
        self.start.get_or_insert(start);

        let mut queue = VecDeque::from([start]);
        let mut steps = 0;

        while let Some(current) = queue.pop_front() {
            steps += 1;
            if steps > self.config.expansion_budget {
                warn!(
                    piece = current,
                    budget = self.config.expansion_budget,
                    "graph expansion budget exhausted"
                );
                return Err(CaveError::GraphExpansionExhausted {
                    piece: current,
                    reason: format!(
                        "expansion budget of {} exhausted",
                        self.config.expansion_budget
                    ),
                });
            }

            self.piece_mut(current)?.mark_used();
            let exits: Vec<ExitId> = self.pieces[current].exit_ids().collect();

            for exit in exits {
                if self.pieces[current].neighbor(exit).is_some() {
                    continue;
                }
                let target = *self.pieces[current]
                    .exit(exit)
                    .ok_or(CaveError::ExitNotFound { piece: current, exit })?;

                let (next, next_exit) = match self.find_pooled_match(current, &target) {
                    Some((candidate, candidate_exit)) => {
                        if self.pieces[candidate].neighbor(candidate_exit).is_some() {
                            (self.clone_piece(candidate)?, candidate_exit)
                        } else {
                            (candidate, candidate_exit)
                        }
                    }
                    None => self.generate_match(current, &target)?,
                };

                self.connect(current, exit, next, next_exit)?;
                self.pieces[next].mark_used();
                queue.push_back(next);
            }
        }

        info!(
            pieces = self.pieces.len(),
            clones = self.clones.len(),
            steps,
            "piece graph resolved"
        );
        Ok(())
    }

    fn find_pooled_match(&mut self, current: PieceId, target: &Exit) -> Option<(PieceId, ExitId)> {
        let mut order: Vec<PieceId> = (0..self.pieces.len()).collect();
        order.shuffle(&mut self.rng);
        order
            .into_iter()
            .filter(|&candidate| candidate != current)
            .find_map(|candidate| {
                self.pieces[candidate]
                    .compatible_exit(target)
                    .map(|exit| (candidate, exit))
            })
    }

    fn generate_match(&mut self, current: PieceId, target: &Exit) -> Result<(PieceId, ExitId)> {
        for attempt in 1..=self.config.new_piece_attempts {
            let id = self.pieces.len();
            let piece = match WorldPiece::generate(id, &self.config.piece, &mut self.rng) {
                Ok(piece) => piece,
                Err(CaveError::GenerationExhausted { attempts }) => {
                    debug!(attempt, attempts, "fresh piece failed to generate");
                    continue;
                }
                Err(e) => return Err(e),
            };
            if let Some(exit) = piece.compatible_exit(target) {
                debug!(piece = id, attempt, "generated matching piece");
                self.pieces.push(piece);
                return Ok((id, exit));
            }
        }

        warn!(piece = current, "no compatible piece could be generated");
        Err(CaveError::GraphExpansionExhausted {
            piece: current,
            reason: format!(
                "no compatible piece after {} attempts",
                self.config.new_piece_attempts
            ),
        })
    }

    /// Copy a piece under a fresh id and record it in the clone index
    ///
    /// # Errors
    ///
    /// Returns `PieceNotFound` for an unknown source.
    pub fn clone_piece(&mut self, source: PieceId) -> Result<PieceId> {
        let id = self.pieces.len();
        let clone = self.piece(source)?.clone_as(id);
        self.pieces.push(clone);
        self.clones.record(source, id);
        debug!(source, clone = id, "cloned piece");
        Ok(id)
    }

    /// Join `exit_a` of piece `a` to `exit_b` of piece `b`
    ///
    /// Navigation is set both ways. The offset from `a` to `b` is
    /// `exit_a - exit_b` in piece-local whole units, and `b` gets its negation.
    /// Existing links on either side are overwritten.
    ///
    /// # Errors
    ///
    /// Returns `PieceNotFound` or `ExitNotFound` for unknown ids.
    pub fn connect(&mut self, a: PieceId, exit_a: ExitId, b: PieceId, exit_b: ExitId) -> Result<()> {
        let pos_a = self.piece(a)?.exit_local_position(exit_a)?;
        let pos_b = self.piece(b)?.exit_local_position(exit_b)?;
        let offset = pos_a - pos_b;

        if let Some(previous) = self.piece_mut(a)?.link(exit_a, b, offset) {
            debug!(piece = a, exit = exit_a, previous, "overwrote connection");
        }
        if let Some(previous) = self.piece_mut(b)?.link(exit_b, a, -offset) {
            debug!(piece = b, exit = exit_b, previous, "overwrote connection");
        }

        self.connections.push(Connection {
            from: (a, exit_a),
            to: (b, exit_b),
            offset,
        });
        Ok(())
    }

    /// Composite the quantum cache of every piece reached by expansion
    ///
    /// # Errors
    ///
    /// Returns `InvalidWorldCoordinates` when a footprint misses the backdrop.
    pub fn precompute_quantum_meshes(&mut self) -> Result<()> {
        for id in 0..self.pieces.len() {
            if !self.pieces[id].is_used() {
                continue;
            }
            let cache = composite_piece(&self.pieces, id, &mut self.backdrop, &self.config)?;
            self.pieces[id].set_quantum(cache);
        }
        info!(pieces = self.pieces.len(), "quantum meshes ready");
        Ok(())
    }

    /// Combined meshes of `piece` for a quantum key
    ///
    /// # Errors
    ///
    /// Returns `PieceNotFound` or `MeshNotCached`.
    pub fn combined_mesh(&self, piece: PieceId, key: u32) -> Result<Arc<CombinedMeshes>> {
        self.piece(piece)?
            .quantum_mesh(key)
            .cloned()
            .ok_or(CaveError::MeshNotCached { piece, key })
    }

    /// Combined meshes of `piece` with the given neighbors shown
    ///
    /// Exits that are unknown or unresolved are left out of the key.
    ///
    /// # Errors
    ///
    /// Returns `PieceNotFound` or `MeshNotCached`.
    pub fn combined_mesh_for_exits(
        &self,
        piece: PieceId,
        exits: &[ExitId],
    ) -> Result<Arc<CombinedMeshes>> {
        let current = self.piece(piece)?;
        let key = exits
            .iter()
            .copied()
            .filter(|&exit| current.neighbor(exit).is_some())
            .collect::<BTreeSet<ExitId>>()
            .into_iter()
            .sum();
        self.combined_mesh(piece, key)
    }

    /// Quantum key for what a viewer at `viewer` can see
    ///
    /// `visible` lists the exits the viewer sees (unresolved or unknown ids are
    /// ignored). When the first two exits on one wall are both visible, only
    /// the nearer one is kept, or neither if even the nearer one is farther
    /// than `conflict_cutoff_distance`.
    ///
    /// # Errors
    ///
    /// Returns `PieceNotFound` for an unknown piece.
    pub fn visible_quantum_key(
        &self,
        piece: PieceId,
        origin: Vec3,
        viewer: Vec3,
        visible: &[ExitId],
    ) -> Result<u32> {
        let current = self.piece(piece)?;
        let visible: BTreeSet<ExitId> = visible
            .iter()
            .copied()
            .filter(|&exit| current.neighbor(exit).is_some())
            .collect();
        let mut key: u32 = visible.iter().sum();

        for ids in current.exit_conflicts().values() {
            if ids.len() < 2 || !visible.contains(&ids[0]) || !visible.contains(&ids[1]) {
                continue;
            }
            let a = current.exit_world_position(origin, ids[0])?.distance(viewer);
            let b = current.exit_world_position(origin, ids[1])?.distance(viewer);
            let (farther, closer_distance) = if a > b { (ids[0], b) } else { (ids[1], a) };

            if closer_distance > self.config.conflict_cutoff_distance {
                key -= ids[0] + ids[1];
            } else {
                key -= farther;
            }
        }

        Ok(key)
    }

    /// Neighbor through `exit` and the translation to add to the world origin
    ///
    /// # Errors
    ///
    /// Returns `PieceNotFound`, `ExitNotFound` or `UnresolvedExit`.
    pub fn traverse(&self, piece: PieceId, exit: ExitId) -> Result<(PieceId, Vec3)> {
        let current = self.piece(piece)?;
        let offset = current.connection_offset(exit)?;
        let next = current
            .neighbor(exit)
            .ok_or(CaveError::UnresolvedExit { piece, exit })?;
        Ok((next, offset))
    }

    /// Switch pieces once the viewer walks out of the current footprint
    ///
    /// Returns the new piece and its world origin, or `None` while the viewer
    /// is still inside.
    ///
    /// # Errors
    ///
    /// Returns `UnresolvedExit` when the viewer leaves through an exit with no
    /// neighbor.
    pub fn follow_viewer(
        &self,
        piece: PieceId,
        origin: Vec3,
        viewer: Vec3,
    ) -> Result<Option<(PieceId, Vec3)>> {
        let Some(exit) = self.piece(piece)?.departing_exit(origin, viewer) else {
            return Ok(None);
        };
        let (next, offset) = self.traverse(piece, exit)?;
        debug!(from = piece, to = next, exit, "viewer changed piece");
        Ok(Some((next, origin + offset)))
    }

    /// Place a marker at a piece-local position, on the piece and all its clones
    ///
    /// # Errors
    ///
    /// Returns `PieceNotFound` for an unknown piece.
    pub fn add_marker(&mut self, piece: PieceId, position: Vec3) -> Result<()> {
        self.piece_mut(piece)?.push_marker(position);
        let relatives = self.clones.clones_of(piece).to_vec();
        for relative in relatives {
            self.piece_mut(relative)?.push_marker(position);
        }
        Ok(())
    }

    /// Markers of every resolved neighbor, moved into `piece`'s local frame
    ///
    /// # Errors
    ///
    /// Returns `PieceNotFound` for an unknown piece or dangling neighbor.
    pub fn neighbor_markers(&self, piece: PieceId) -> Result<Vec<(ExitId, Vec3)>> {
        let current = self.piece(piece)?;
        let mut markers = Vec::new();
        for exit in current.resolved_exits() {
            let (next, offset) = self.traverse(piece, exit)?;
            for marker in self.piece(next)?.markers() {
                markers.push((exit, *marker + offset));
            }
        }
        Ok(markers)
    }
}
