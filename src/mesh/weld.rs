//! Vertex snapping and welding for composited meshes

use std::collections::HashMap;

use super::MeshData;

/// Snap every vertex to a grid of `resolution`, merge vertices sharing a
/// snapped position, drop collapsed triangles and recompute normals
///
/// Merged vertices take the snapped position.
pub fn weld_mesh(mesh: &MeshData, resolution: f32) -> MeshData {
    if mesh.positions.is_empty() {
        return MeshData::default();
    }

    let mut welded = MeshData::default();
    let mut key_map: HashMap<(i64, i64, i64), u32> = HashMap::with_capacity(mesh.positions.len());
    let mut remap = Vec::with_capacity(mesh.positions.len());

    for position in &mesh.positions {
        let key = quantize_position(*position, resolution);
        let index = *key_map.entry(key).or_insert_with(|| {
            let index = welded.positions.len() as u32;
            welded.positions.push([
                key.0 as f32 * resolution,
                key.1 as f32 * resolution,
                key.2 as f32 * resolution,
            ]);
            index
        });
        remap.push(index);
    }

    for tri in mesh.indices.chunks_exact(3) {
        let a = remap[tri[0] as usize];
        let b = remap[tri[1] as usize];
        let c = remap[tri[2] as usize];
        if a == b || b == c || a == c {
            continue;
        }
        welded.push_triangle(a, b, c);
    }

    welded.recalculate_normals();
    welded
}

fn quantize_position(position: [f32; 3], resolution: f32) -> (i64, i64, i64) {
    (
        quantize_scalar(position[0], resolution),
        quantize_scalar(position[1], resolution),
        quantize_scalar(position[2], resolution),
    )
}

fn quantize_scalar(value: f32, resolution: f32) -> i64 {
    (value / resolution).round() as i64
}
