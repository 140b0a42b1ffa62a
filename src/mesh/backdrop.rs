//! Backdrop void grid behind the visible pieces
//!
//! A square lattice of nodes, all active by default. Mapping a piece footprint
//! deactivates its interior nodes so the backdrop leaves a hole the piece
//! ceiling fills. Triangulation grows the largest all-active square it can
//! from each cell and covers what is left with marching squares.

use glam::{Vec2, Vec3};

use super::marching::{square_configuration, MarchingSquares};
use super::MeshData;
use crate::error::{CaveError, Result};
use crate::piece::PieceId;

/// Node rectangle a piece covers, inclusive corners
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Footprint {
    /// Bottom-left node
    pub min: (usize, usize),
    /// Top-right node
    pub max: (usize, usize),
}

/// Void grid of `size` x `size` nodes centered on the world origin
#[derive(Debug, Clone)]
pub struct BackdropGrid {
    size: usize,
    active: Vec<bool>,
}

impl BackdropGrid {
    /// Create a fully active grid
    pub fn new(size: usize) -> Self {
        Self {
            size,
            active: vec![true; size * size],
        }
    }

    /// Side length in nodes
    pub fn size(&self) -> usize {
        self.size
    }

    /// Reactivate every node
    pub fn reset(&mut self) {
        self.active.fill(true);
    }

    fn half(&self) -> usize {
        self.size / 2
    }

    /// Whether node `(x, y)` is active; nodes outside the grid are not
    #[inline]
    pub fn is_active(&self, x: usize, y: usize) -> bool {
        x < self.size && y < self.size && self.active[y * self.size + x]
    }

    /// Number of active nodes
    pub fn active_count(&self) -> usize {
        self.active.iter().filter(|&&a| a).count()
    }

    /// World position of node `(x, y)`
    pub fn node_position(&self, x: usize, y: usize) -> Vec2 {
        let half = self.half() as f32;
        Vec2::new(x as f32 - half, y as f32 - half)
    }

    /// Node rectangle for a `width` x `height` piece centered at `center`
    ///
    /// # Errors
    ///
    /// Returns `InvalidWorldCoordinates` if the corners do not land on whole
    /// nodes or fall outside the grid.
    pub fn footprint(
        &self,
        piece: PieceId,
        center: Vec3,
        width: usize,
        height: usize,
    ) -> Result<Footprint> {
        if self.size < 2 {
            return Err(CaveError::InvalidWorldCoordinates {
                piece,
                detail: format!("backdrop of {} nodes holds no squares", self.size),
            });
        }

        let half = self.half() as f32;
        let min_x = half + center.x - width as f32 / 2.0;
        let min_y = half + center.y - height as f32 / 2.0;

        if (min_x - min_x.round()).abs() > 1e-3 || (min_y - min_y.round()).abs() > 1e-3 {
            return Err(CaveError::InvalidWorldCoordinates {
                piece,
                detail: format!("bottom-left corner ({}, {}) is not integral", min_x, min_y),
            });
        }

        let (min_x, min_y) = (min_x.round(), min_y.round());
        let max_x = min_x + width as f32;
        let max_y = min_y + height as f32;
        let last = (self.size - 1) as f32;
        if min_x < 0.0 || min_y < 0.0 || max_x > last || max_y > last {
            return Err(CaveError::InvalidWorldCoordinates {
                piece,
                detail: format!(
                    "footprint ({}, {})..({}, {}) outside backdrop of {} nodes",
                    min_x, min_y, max_x, max_y, self.size
                ),
            });
        }

        Ok(Footprint {
            min: (min_x as usize, min_y as usize),
            max: (max_x as usize, max_y as usize),
        })
    }

    fn set_interior(&mut self, footprint: &Footprint, value: bool) {
        for x in footprint.min.0 + 1..footprint.max.0 {
            for y in footprint.min.1 + 1..footprint.max.1 {
                if x < self.size && y < self.size {
                    self.active[y * self.size + x] = value;
                }
            }
        }
    }

    /// Deactivate the nodes strictly inside a footprint
    pub fn map_piece(&mut self, footprint: &Footprint) {
        self.set_interior(footprint, false);
    }

    /// Reactivate the nodes strictly inside a footprint
    pub fn unmap_piece(&mut self, footprint: &Footprint) {
        self.set_interior(footprint, true);
    }

    /// Whether all four corners of square `(x, y)` are active
    #[inline]
    fn square_active(&self, x: usize, y: usize) -> bool {
        self.is_active(x, y)
            && self.is_active(x + 1, y)
            && self.is_active(x, y + 1)
            && self.is_active(x + 1, y + 1)
    }

    fn ring_free(&self, x: usize, y: usize, p: usize, visited: &[bool]) -> bool {
        let squares = self.size - 1;
        let free = |sx: usize, sy: usize| !visited[sy * squares + sx] && self.square_active(sx, sy);
        (x..=x + p).all(|sx| free(sx, y + p)) && (y..=y + p).all(|sy| free(x + p, sy))
    }

    /// Triangulate the active area, optionally adding a floor quad at `floor`
    pub fn triangulate(&self, floor: Option<f32>) -> MeshData {
        let mut mesh = MeshData::default();
        if self.size < 2 {
            return mesh;
        }

        let squares = self.size - 1;
        let mut visited = vec![false; squares * squares];

        for x in 0..squares {
            for y in 0..squares {
                if visited[y * squares + x] || !self.square_active(x, y) {
                    continue;
                }

                let mut p = 1;
                while x + p < squares && y + p < squares && self.ring_free(x, y, p, &visited) {
                    p += 1;
                }

                for sx in x..x + p {
                    for sy in y..y + p {
                        visited[sy * squares + sx] = true;
                    }
                }

                let corner = |nx: usize, ny: usize| self.node_position(nx, ny).extend(0.0);
                let bl = mesh.push_vertex(corner(x, y));
                let tl = mesh.push_vertex(corner(x, y + p));
                let tr = mesh.push_vertex(corner(x + p, y + p));
                let br = mesh.push_vertex(corner(x + p, y));
                mesh.push_triangle(bl, tl, tr);
                mesh.push_triangle(bl, tr, br);
            }
        }

        let origin = self.node_position(0, 0);
        let mut fallback = MarchingSquares::new(self.size, self.size, origin, 1.0, 0.0);
        let active = |nx: usize, ny: usize| self.is_active(nx, ny);
        for x in 0..squares {
            for y in 0..squares {
                if visited[y * squares + x] {
                    continue;
                }
                let configuration = square_configuration(&active, x, y);
                if configuration != 0 {
                    fallback.add_square(x, y, configuration);
                }
            }
        }
        mesh.append_translated(&fallback.finish(), Vec3::ZERO);

        if let Some(z) = floor {
            let half = self.half() as f32;
            let bl = mesh.push_vertex(Vec3::new(-half, -half, z));
            let tl = mesh.push_vertex(Vec3::new(-half, half, z));
            let tr = mesh.push_vertex(Vec3::new(half, half, z));
            let br = mesh.push_vertex(Vec3::new(half, -half, z));
            mesh.push_triangle(bl, tl, tr);
            mesh.push_triangle(bl, tr, br);
        }

        mesh.recalculate_normals();
        mesh
    }
}
