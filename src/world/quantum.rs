//! Quantum mesh compositor
//!
//! For every subset of a piece's resolved exits, the piece's own meshes are
//! merged with each selected neighbor's meshes (moved by the connection
//! offset) and a backdrop rebuilt for exactly that subset. The subset's key is
//! the sum of its exit ids.

use std::collections::HashMap;
use std::sync::Arc;

use glam::Vec3;
use tracing::debug;

use crate::config::WorldConfig;
use crate::error::{CaveError, Result};
use crate::exit::ExitId;
use crate::mesh::{weld_mesh, BackdropGrid};
use crate::piece::{CombinedMeshes, PieceId, WorldPiece};

/// Every subset of `exits` paired with its key, empty subset first
pub fn exit_subsets(exits: &[ExitId]) -> Vec<(u32, Vec<ExitId>)> {
    (0u32..1 << exits.len())
        .map(|mask| {
            let subset: Vec<ExitId> = exits
                .iter()
                .enumerate()
                .filter(|(bit, _)| mask & (1 << bit) != 0)
                .map(|(_, &id)| id)
                .collect();
            (subset.iter().sum(), subset)
        })
        .collect()
}

/// Build the full quantum cache of one piece
///
/// Key 0 is the piece alone over the full backdrop, with its walls as
/// generated. Every other key welds both ceiling and walls.
///
/// # Errors
///
/// Returns `InvalidWorldCoordinates` when a footprint does not fit the
/// backdrop, or `PieceNotFound` if a neighbor id is dangling.
pub fn composite_piece(
    pieces: &[WorldPiece],
    id: PieceId,
    backdrop: &mut BackdropGrid,
    config: &WorldConfig,
) -> Result<HashMap<u32, Arc<CombinedMeshes>>> {
    let piece = pieces.get(id).ok_or(CaveError::PieceNotFound(id))?;
    let own = backdrop.footprint(id, Vec3::ZERO, piece.width(), piece.height())?;
    let floor = config.backdrop_floor.then_some(config.floor_height);

    let resolved = piece.resolved_exits();
    let mut cache = HashMap::with_capacity(1 << resolved.len());

    for (key, subset) in exit_subsets(&resolved) {
        backdrop.reset();
        backdrop.map_piece(&own);

        let mut ceiling = piece.ceiling().clone();
        let mut walls = piece.walls().clone();

        for &exit in &subset {
            let neighbor_id = piece.neighbor(exit).ok_or(CaveError::UnresolvedExit { piece: id, exit })?;
            let neighbor = pieces
                .get(neighbor_id)
                .ok_or(CaveError::PieceNotFound(neighbor_id))?;
            let offset = piece.connection_offset(exit)?;

            ceiling.append_translated(neighbor.ceiling(), offset);
            walls.append_translated(neighbor.walls(), offset);

            let footprint = backdrop.footprint(neighbor_id, offset, neighbor.width(), neighbor.height())?;
            backdrop.map_piece(&footprint);
        }

        ceiling.append_translated(&backdrop.triangulate(floor), Vec3::ZERO);
        let ceiling = weld_mesh(&ceiling, config.weld_resolution);
        let walls = if key == 0 {
            walls
        } else {
            weld_mesh(&walls, config.weld_resolution)
        };

        cache.insert(key, Arc::new(CombinedMeshes { ceiling, walls }));
    }

    debug!(piece = id, entries = cache.len(), "quantum meshes composited");
    Ok(cache)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subsets_cover_every_key() {
        let subsets = exit_subsets(&[1, 2, 8]);
        assert_eq!(subsets.len(), 8);
        assert_eq!(subsets[0], (0, vec![]));

        let mut keys: Vec<u32> = subsets.iter().map(|(k, _)| *k).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec![0, 1, 2, 3, 8, 9, 10, 11]);

        for (key, subset) in &subsets {
            let or = subset.iter().fold(0, |acc, id| acc | id);
            assert_eq!(*key, or);
        }
    }

    #[test]
    fn test_no_exits_single_subset() {
        assert_eq!(exit_subsets(&[]), vec![(0, vec![])]);
    }
}
