//! Complete workflow demonstration for rust_quantum_caves

use rust_quantum_caves::*;

fn main() -> Result<()> {
    println!("=== rust_quantum_caves Demo ===\n");

    // Step 1: Configure pieces and world
    println!("Step 1: Configuring world...");
    let piece = PieceConfigBuilder::new()
        .map_size(MapSize::Randomized { min: 36, max: 56 })?
        .build();
    let config = WorldConfigBuilder::new()
        .seed(12345)
        .pool_size(10)?
        .backdrop_size(300)?
        .piece(piece)
        .build();
    println!("  Seed: {}", config.seed);
    println!("  Pool size: {}", config.pool_size);
    println!("  Backdrop: {}x{} nodes", config.backdrop_size, config.backdrop_size);

    // Step 2: Generate and connect
    println!("\nStep 2: Generating world...");
    let world = World::generate(config)?;
    let start = world.start().unwrap_or(0);
    println!("  Pieces: {}", world.piece_count());
    println!("  Connections: {}", world.connections().len());
    println!("  Pieces with clones: {}", world.clone_index().len());
    println!("  Start piece: {}", start);

    // Step 3: Inspect the start piece
    println!("\nStep 3: Start piece:");
    let current = world.piece(start)?;
    println!("  Size: {}x{}", current.width(), current.height());
    for exit in current.exits() {
        let neighbor = current.neighbor(exit.id);
        let offset = current.connection_offset(exit.id)?;
        println!(
            "  Exit {:>2} {:?} at ({}, {}) -> piece {:?}, offset {:?}",
            exit.id, exit.wall_dir, exit.coords.x, exit.coords.y, neighbor, offset
        );
    }

    // Step 4: Quantum meshes
    println!("\nStep 4: Quantum meshes:");
    for key in current.quantum_keys() {
        let meshes = world.combined_mesh(start, key)?;
        println!(
            "  Key {:>2}: ceiling {} tris, walls {} tris",
            key,
            meshes.ceiling.triangle_count(),
            meshes.walls.triangle_count()
        );
    }

    // Step 5: Walk out through the first exit
    println!("\nStep 5: Walking through an exit...");
    if let Some(exit) = current.exit_ids().next() {
        let target = current.exit_world_position(Vec3::ZERO, exit)?;
        let outside = target + (target - Vec3::new(0.0, 0.0, target.z)).normalize_or_zero() * 2.0;
        match world.follow_viewer(start, Vec3::ZERO, outside)? {
            Some((next, origin)) => println!("  Now in piece {} with origin {:?}", next, origin),
            None => println!("  Still inside piece {}", start),
        }
    }

    // Memory estimate
    let mut bytes = 0;
    for piece in world.pieces().iter().filter(|p| p.is_used()) {
        for key in piece.quantum_keys() {
            let meshes = world.combined_mesh(piece.id(), key)?;
            for mesh in [&meshes.ceiling, &meshes.walls] {
                bytes += mesh.positions.len() * 12 + mesh.normals.len() * 12 + mesh.indices.len() * 4;
            }
        }
    }
    println!("\nQuantum cache memory: {:.2} MB", bytes as f32 / 1024.0 / 1024.0);

    println!("\n=== Demo Complete ===");
    Ok(())
}
