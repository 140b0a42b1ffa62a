//! Spatial indexing for fast position-to-exit lookups
//!
//! This module is only available with the `spatial-index` feature.

#[cfg(feature = "spatial-index")]
use glam::Vec2;
#[cfg(feature = "spatial-index")]
use kiddo::immutable::float::kdtree::ImmutableKdTree;
#[cfg(feature = "spatial-index")]
use kiddo::SquaredEuclidean;

#[cfg(feature = "spatial-index")]
use crate::exit::ExitId;

/// KD-tree over the piece-local positions of a piece's exits
///
/// Answers "which doorway is the viewer walking out of" in O(log n), which
/// is what piece switching asks every time the viewer leaves the footprint.
#[cfg(feature = "spatial-index")]
#[derive(Clone)]
pub struct ExitIndex {
    tree: Option<ImmutableKdTree<f32, usize, 2, 32>>,
    ids: Vec<ExitId>,
}

#[cfg(feature = "spatial-index")]
impl ExitIndex {
    /// Build the index from `(exit id, piece-local position)` pairs
    ///
    /// # Example
    ///
    /// ```
    /// use rust_quantum_caves::*;
    /// use glam::Vec2;
    ///
    /// # #[cfg(feature = "spatial-index")]
    /// # {
    /// let index = ExitIndex::new(&[
    ///     (1, Vec2::new(-10.0, 0.0)),
    ///     (2, Vec2::new(10.0, 3.0)),
    /// ]);
    ///
    /// assert_eq!(index.find_nearest(Vec2::new(12.0, 0.0)), Some(2));
    /// # }
    /// ```
    pub fn new(exits: &[(ExitId, Vec2)]) -> Self {
        let points: Vec<[f32; 2]> = exits.iter().map(|(_, p)| [p.x, p.y]).collect();
        let tree = if points.is_empty() {
            None
        } else {
            Some(ImmutableKdTree::new_from_slice(&points))
        };

        Self {
            tree,
            ids: exits.iter().map(|(id, _)| *id).collect(),
        }
    }

    /// Number of indexed exits
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the index holds no exits
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Find the exit closest to a piece-local position
    pub fn find_nearest(&self, position: Vec2) -> Option<ExitId> {
        let tree = self.tree.as_ref()?;
        let result = tree.nearest_one::<SquaredEuclidean>(&[position.x, position.y]);
        self.ids.get(result.item as usize).copied()
    }
}

#[cfg(feature = "spatial-index")]
impl std::fmt::Debug for ExitIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExitIndex").field("ids", &self.ids).finish()
    }
}

#[cfg(test)]
#[cfg(feature = "spatial-index")]
mod tests {
    use super::*;

    #[test]
    fn test_exit_index_basic() {
        let index = ExitIndex::new(&[
            (1, Vec2::new(-17.0, 2.0)),
            (2, Vec2::new(5.0, 12.0)),
            (4, Vec2::new(17.0, -4.0)),
            (8, Vec2::new(0.0, -12.0)),
        ]);
        assert_eq!(index.len(), 4);

        assert_eq!(index.find_nearest(Vec2::new(-19.0, 0.0)), Some(1));
        assert_eq!(index.find_nearest(Vec2::new(4.0, 14.0)), Some(2));
        assert_eq!(index.find_nearest(Vec2::new(18.5, -4.0)), Some(4));
        assert_eq!(index.find_nearest(Vec2::new(1.0, -13.0)), Some(8));
    }

    #[test]
    fn test_exit_index_empty() {
        let index = ExitIndex::new(&[]);
        assert!(index.is_empty());
        assert_eq!(index.find_nearest(Vec2::ZERO), None);
    }
}
