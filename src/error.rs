//! Error types for cave generation and world assembly

use thiserror::Error;

use crate::exit::ExitId;
use crate::piece::PieceId;

/// Errors that can occur while generating pieces, building the piece graph,
/// or compositing meshes
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CaveError {
    /// Configuration validation failed
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The cave pipeline produced no exits on every attempt
    ///
    /// The piece must be treated as ungenerated.
    #[error("generation exhausted: no exits after {attempts} attempts")]
    GenerationExhausted {
        /// Number of full pipeline attempts made
        attempts: usize,
    },

    /// The graph expansion budget or the new-piece search bound was hit
    ///
    /// The world is left partially resolved.
    #[error("graph expansion exhausted at piece {piece}: {reason}")]
    GraphExpansionExhausted {
        /// Piece being resolved when the bound tripped
        piece: PieceId,
        /// Which bound tripped
        reason: String,
    },

    /// A footprint does not land on integral, in-bounds backdrop cells
    #[error("invalid world coordinates for piece {piece}: {detail}")]
    InvalidWorldCoordinates {
        /// Piece whose footprint was being placed
        piece: PieceId,
        /// Offending placement
        detail: String,
    },

    /// Requested piece id does not exist in the world arena
    #[error("piece not found: {0}")]
    PieceNotFound(PieceId),

    /// Requested exit id does not exist on the piece
    #[error("exit {exit} not found on piece {piece}")]
    ExitNotFound {
        /// Piece queried
        piece: PieceId,
        /// Missing exit id
        exit: ExitId,
    },

    /// The exit has no neighbor yet
    #[error("exit {exit} on piece {piece} is unresolved")]
    UnresolvedExit {
        /// Piece queried
        piece: PieceId,
        /// Unresolved exit id
        exit: ExitId,
    },

    /// No combined mesh was precomputed under this key
    #[error("no combined mesh for piece {piece} under key {key}")]
    MeshNotCached {
        /// Piece queried
        piece: PieceId,
        /// Summed exit bitmask
        key: u32,
    },
}

/// Result type alias for cave operations
pub type Result<T> = std::result::Result<T, CaveError>;
