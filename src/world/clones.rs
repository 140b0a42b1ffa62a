//! Clone-equivalence index

use std::collections::BTreeMap;

use crate::piece::PieceId;

/// For every cloned piece, the other ids sharing its geometry ancestry
///
/// Updated at clone time so every member of a class lists every other
/// member. Pieces never cloned have no entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloneIndex {
    classes: BTreeMap<PieceId, Vec<PieceId>>,
}

impl CloneIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `clone` was copied from `original`
    pub fn record(&mut self, original: PieceId, clone: PieceId) {
        match self.classes.get(&original).cloned() {
            Some(members) => {
                let mut clone_members = members.clone();
                clone_members.push(original);
                for member in &members {
                    self.classes.entry(*member).or_default().push(clone);
                }
                self.classes.entry(original).or_default().push(clone);
                self.classes.insert(clone, clone_members);
            }
            None => {
                self.classes.insert(original, vec![clone]);
                self.classes.insert(clone, vec![original]);
            }
        }
    }

    /// Other members of the class of `piece`, in recording order
    pub fn clones_of(&self, piece: PieceId) -> &[PieceId] {
        self.classes.get(&piece).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whole class of `piece`, itself included, sorted
    pub fn class_of(&self, piece: PieceId) -> Vec<PieceId> {
        let mut class: Vec<PieceId> = self.clones_of(piece).to_vec();
        class.push(piece);
        class.sort_unstable();
        class
    }

    /// Number of pieces with at least one clone relative
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Whether nothing was cloned yet
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_clone_pairs_up() {
        let mut index = CloneIndex::new();
        index.record(3, 10);
        assert_eq!(index.clones_of(3), &[10]);
        assert_eq!(index.clones_of(10), &[3]);
        assert!(index.clones_of(4).is_empty());
    }

    #[test]
    fn test_classes_stay_transitive() {
        let mut index = CloneIndex::new();
        index.record(0, 5);
        // Cloning the clone joins the same class
        index.record(5, 8);
        index.record(0, 9);

        for id in [0, 5, 8, 9] {
            assert_eq!(index.class_of(id), vec![0, 5, 8, 9]);
            assert!(!index.clones_of(id).contains(&id));
        }
        assert_eq!(index.len(), 4);
    }

    #[test]
    fn test_separate_classes() {
        let mut index = CloneIndex::new();
        index.record(0, 2);
        index.record(1, 3);
        assert_eq!(index.class_of(0), vec![0, 2]);
        assert_eq!(index.class_of(3), vec![1, 3]);
    }
}
