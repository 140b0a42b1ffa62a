//! Procedural cave worlds made of connectable pieces
//!
//! Each piece is a cellular-automata cave with carved passages and border
//! exits, meshed into a marching-squares ceiling and extruded walls. Pieces
//! are joined exit to exit into a graph that may reuse (clone) pieces, so the
//! world can loop back on itself. For every piece, the meshes seen through
//! each combination of open exits are composited ahead of time.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use rust_quantum_caves::*;
//!
//! let config = WorldConfigBuilder::new()
//!     .seed(42)
//!     .pool_size(10).unwrap()
//!     .backdrop_size(256).unwrap()
//!     .build();
//!
//! let world = World::generate(config).unwrap();
//! let start = world.start().unwrap();
//!
//! // A viewer standing at the start piece's center, seeing every exit
//! let piece = world.piece(start).unwrap();
//! let visible: Vec<ExitId> = piece.exit_ids().collect();
//! let key = world
//!     .visible_quantum_key(start, Vec3::ZERO, Vec3::new(0.0, 0.0, 1.5), &visible)
//!     .unwrap();
//!
//! let meshes = world.combined_mesh(start, key).unwrap();
//! println!("Rendering {} ceiling triangles", meshes.ceiling.triangle_count());
//! ```
//!
//! # Features
//!
//! - `spatial-index` (default): KD-tree lookup of the exit a viewer leaves through
//! - `serde`: Serialization support for configuration and grid types

// Modules
pub mod error;
pub mod config;
pub mod grid;
pub mod exit;
pub mod generation;
pub mod mesh;
pub mod piece;
pub mod world;

#[cfg(feature = "spatial-index")]
pub mod spatial;

// Re-export core types for convenience
pub use error::{CaveError, Result};
pub use config::{MapSize, PieceConfig, PieceConfigBuilder, WorldConfig, WorldConfigBuilder};
pub use grid::{OccupancyGrid, Tile, TileCoord};
pub use exit::{Exit, ExitId, WallDir};
pub use generation::{generate_cave_map, CaveMap, Room};
pub use mesh::{weld_mesh, BackdropGrid, MeshData, Outline, PieceMeshes};
pub use piece::{CombinedMeshes, PieceId, WorldPiece};
pub use world::{CloneIndex, Connection, World};

#[cfg(feature = "spatial-index")]
pub use spatial::ExitIndex;

// Re-export glam vectors for convenience
pub use glam::{Vec2, Vec3};
