//! Mesh generation for cave pieces and the backdrop
//!
//! Generates engine-agnostic mesh data from occupancy grids.

mod backdrop;
mod marching;
mod weld;

pub use backdrop::{BackdropGrid, Footprint};
pub use marching::{
    build_walls, square_configuration, trace_outlines, triangulate_grid, Outline, PieceMeshes,
};
pub use weld::weld_mesh;

use glam::Vec3;

/// Engine-agnostic mesh data output
///
/// Contains raw vertex data suitable for any rendering engine:
/// - Bevy: Convert to `Mesh` with attributes
/// - Godot: Convert to `ArrayMesh`
/// - wgpu: Use directly as vertex buffers
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    /// Vertex positions (3D coordinates)
    pub positions: Vec<[f32; 3]>,
    /// Vertex normals, one per position once computed
    pub normals: Vec<[f32; 3]>,
    /// Triangle indices
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Get the number of vertices
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Get the number of triangles
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Check if mesh is empty
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Push a vertex and return its index
    pub fn push_vertex(&mut self, position: Vec3) -> u32 {
        let index = self.positions.len() as u32;
        self.positions.push(position.to_array());
        index
    }

    /// Push one triangle
    pub fn push_triangle(&mut self, a: u32, b: u32, c: u32) {
        self.indices.extend_from_slice(&[a, b, c]);
    }

    /// Append another mesh, moving its vertices by `offset`
    ///
    /// Normals are carried over only when both meshes have them.
    pub fn append_translated(&mut self, other: &MeshData, offset: Vec3) {
        let carry_normals =
            self.normals.len() == self.positions.len() && other.normals.len() == other.positions.len();
        if !carry_normals {
            self.normals.clear();
        }

        let base = self.positions.len() as u32;
        self.positions
            .extend(other.positions.iter().map(|p| (Vec3::from(*p) + offset).to_array()));
        if carry_normals {
            self.normals.extend_from_slice(&other.normals);
        }
        self.indices.extend(other.indices.iter().map(|i| i + base));
    }

    /// Recompute per-vertex normals from face normals
    ///
    /// Vertices touching no valid face get `[0, 1, 0]`.
    pub fn recalculate_normals(&mut self) {
        let mut normals = vec![Vec3::ZERO; self.positions.len()];
        for tri in self.indices.chunks_exact(3) {
            let (i0, i1, i2) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
            let p0 = Vec3::from(self.positions[i0]);
            let p1 = Vec3::from(self.positions[i1]);
            let p2 = Vec3::from(self.positions[i2]);
            let normal = (p1 - p0).cross(p2 - p0);
            if normal.length_squared() <= 1e-12 {
                continue;
            }
            let normal = normal.normalize();
            normals[i0] += normal;
            normals[i1] += normal;
            normals[i2] += normal;
        }

        self.normals = normals
            .into_iter()
            .map(|n| {
                if n.length() > 1e-6 {
                    n.normalize().to_array()
                } else {
                    [0.0, 1.0, 0.0]
                }
            })
            .collect();
    }

    /// Axis-aligned bounds as `(min, max)`, or `None` for an empty mesh
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let mut iter = self.positions.iter().map(|p| Vec3::from(*p));
        let first = iter.next()?;
        Some(iter.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_quad() -> MeshData {
        let mut mesh = MeshData::default();
        let a = mesh.push_vertex(Vec3::new(0.0, 0.0, 0.0));
        let b = mesh.push_vertex(Vec3::new(0.0, 1.0, 0.0));
        let c = mesh.push_vertex(Vec3::new(1.0, 1.0, 0.0));
        let d = mesh.push_vertex(Vec3::new(1.0, 0.0, 0.0));
        mesh.push_triangle(a, b, c);
        mesh.push_triangle(a, c, d);
        mesh
    }

    #[test]
    fn test_counts() {
        let mesh = unit_quad();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.triangle_count(), 2);
        assert!(!mesh.is_empty());
        assert!(MeshData::default().is_empty());
    }

    #[test]
    fn test_append_translated() {
        let mut mesh = unit_quad();
        mesh.append_translated(&unit_quad(), Vec3::new(10.0, 0.0, 0.0));
        assert_eq!(mesh.vertex_count(), 8);
        assert_eq!(mesh.triangle_count(), 4);
        assert_eq!(mesh.positions[4], [10.0, 0.0, 0.0]);
        assert_eq!(&mesh.indices[6..9], &[4, 5, 6]);

        let (lo, hi) = mesh.bounds().unwrap();
        assert_eq!(lo, Vec3::ZERO);
        assert_eq!(hi, Vec3::new(11.0, 1.0, 0.0));
    }

    #[test]
    fn test_recalculate_normals() {
        let mut mesh = unit_quad();
        mesh.recalculate_normals();
        assert_eq!(mesh.normals.len(), 4);
        // Clockwise when seen from +z, so normals face -z
        for n in &mesh.normals {
            assert!((n[2] + 1.0).abs() < 1e-6);
        }
    }
}
