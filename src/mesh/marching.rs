//! Marching-squares triangulation, outline tracing and wall extrusion
//!
//! Every grid point is a control node; between each pair of horizontally or
//! vertically adjacent nodes sits a midpoint node. A square's configuration
//! is `8*TL + 4*TR + 2*BR + 1*BL` over its active corners, and each
//! configuration maps to a fan of up to six points. Vertex indices are
//! assigned the first time a node is used, so adjacent squares share them.

use std::collections::HashSet;

use glam::{Vec2, Vec3};

use super::MeshData;
use crate::grid::OccupancyGrid;

#[derive(Debug, Clone, Copy)]
enum Node {
    Control(usize, usize),
    /// Midpoint between `(x, y)` and `(x, y + 1)`
    Above(usize, usize),
    /// Midpoint between `(x, y)` and `(x + 1, y)`
    Right(usize, usize),
}

/// Fan points of one square, named after its corners and edge midpoints
#[derive(Debug, Clone, Copy)]
enum Point {
    TopLeft,
    TopRight,
    BottomRight,
    BottomLeft,
    CenterLeft,
    CenterTop,
    CenterRight,
    CenterBottom,
}

fn fan_points(configuration: u8) -> &'static [Point] {
    use Point::*;
    match configuration {
        1 => &[CenterLeft, CenterBottom, BottomLeft],
        2 => &[BottomRight, CenterBottom, CenterRight],
        4 => &[TopRight, CenterRight, CenterTop],
        8 => &[TopLeft, CenterTop, CenterLeft],
        3 => &[CenterLeft, CenterRight, BottomRight, BottomLeft],
        6 => &[TopRight, BottomRight, CenterBottom, CenterTop],
        9 => &[TopLeft, CenterTop, CenterBottom, BottomLeft],
        12 => &[TopLeft, TopRight, CenterRight, CenterLeft],
        5 => &[CenterTop, TopRight, CenterRight, CenterBottom, BottomLeft, CenterLeft],
        10 => &[TopLeft, CenterTop, CenterRight, BottomRight, CenterBottom, CenterLeft],
        7 => &[TopRight, BottomRight, BottomLeft, CenterLeft, CenterTop],
        11 => &[BottomRight, BottomLeft, TopLeft, CenterTop, CenterRight],
        13 => &[BottomLeft, TopLeft, TopRight, CenterRight, CenterBottom],
        14 => &[TopLeft, TopRight, BottomRight, CenterBottom, CenterLeft],
        15 => &[TopLeft, TopRight, BottomRight, BottomLeft],
        _ => &[],
    }
}

/// Configuration of the square whose bottom-left node is `(x, y)`
pub fn square_configuration(active: &dyn Fn(usize, usize) -> bool, x: usize, y: usize) -> u8 {
    let mut configuration = 0;
    if active(x, y + 1) {
        configuration += 8;
    }
    if active(x + 1, y + 1) {
        configuration += 4;
    }
    if active(x + 1, y) {
        configuration += 2;
    }
    if active(x, y) {
        configuration += 1;
    }
    configuration
}

/// Shared-vertex marching-squares builder over a node lattice
pub(crate) struct MarchingSquares {
    width: usize,
    height: usize,
    origin: Vec2,
    spacing: f32,
    height_z: f32,
    vertices: Vec<Option<u32>>,
    mesh: MeshData,
}

impl MarchingSquares {
    /// Lattice of `width` x `height` nodes, node `(0, 0)` at `origin`
    pub(crate) fn new(width: usize, height: usize, origin: Vec2, spacing: f32, z: f32) -> Self {
        Self {
            width,
            height,
            origin,
            spacing,
            height_z: z,
            vertices: vec![None; width * height * 3],
            mesh: MeshData::default(),
        }
    }

    fn node_position(&self, node: Node) -> Vec3 {
        let (x, y, dx, dy) = match node {
            Node::Control(x, y) => (x, y, 0.0, 0.0),
            Node::Above(x, y) => (x, y, 0.0, 0.5),
            Node::Right(x, y) => (x, y, 0.5, 0.0),
        };
        let p = self.origin + Vec2::new(x as f32 + dx, y as f32 + dy) * self.spacing;
        Vec3::new(p.x, p.y, self.height_z)
    }

    fn vertex(&mut self, node: Node) -> u32 {
        let slot = match node {
            Node::Control(x, y) => (y * self.width + x) * 3,
            Node::Above(x, y) => (y * self.width + x) * 3 + 1,
            Node::Right(x, y) => (y * self.width + x) * 3 + 2,
        };
        if let Some(index) = self.vertices[slot] {
            return index;
        }
        let position = self.node_position(node);
        let index = self.mesh.push_vertex(position);
        self.vertices[slot] = Some(index);
        index
    }

    /// Emit the fan for the square with bottom-left node `(x, y)`
    pub(crate) fn add_square(&mut self, x: usize, y: usize, configuration: u8) {
        debug_assert!(x + 1 < self.width && y + 1 < self.height);
        let points = fan_points(configuration);
        if points.len() < 3 {
            return;
        }

        let fan: Vec<u32> = points
            .iter()
            .map(|&point| {
                let node = match point {
                    Point::TopLeft => Node::Control(x, y + 1),
                    Point::TopRight => Node::Control(x + 1, y + 1),
                    Point::BottomRight => Node::Control(x + 1, y),
                    Point::BottomLeft => Node::Control(x, y),
                    Point::CenterLeft => Node::Above(x, y),
                    Point::CenterTop => Node::Right(x, y + 1),
                    Point::CenterRight => Node::Above(x + 1, y),
                    Point::CenterBottom => Node::Right(x, y),
                };
                self.vertex(node)
            })
            .collect();

        for i in 1..fan.len() - 1 {
            self.mesh.push_triangle(fan[0], fan[i], fan[i + 1]);
        }
    }

    pub(crate) fn finish(self) -> MeshData {
        self.mesh
    }
}

/// Triangulate the wall tiles of `grid` as a flat ceiling at `z = 0`
///
/// The grid is centered on the origin with one unit per tile; control node
/// `(x, y)` sits at `(-w/2 + x + 0.5, -h/2 + y + 0.5)`.
pub fn triangulate_grid(grid: &OccupancyGrid) -> MeshData {
    let (width, height) = (grid.width(), grid.height());
    if width < 2 || height < 2 {
        return MeshData::default();
    }

    let origin = Vec2::new(-(width as f32) / 2.0 + 0.5, -(height as f32) / 2.0 + 0.5);
    let mut builder = MarchingSquares::new(width, height, origin, 1.0, 0.0);
    let active = |x: usize, y: usize| grid.is_wall(x as i32, y as i32);

    for x in 0..width - 1 {
        for y in 0..height - 1 {
            let configuration = square_configuration(&active, x, y);
            builder.add_square(x, y, configuration);
        }
    }

    let mut mesh = builder.finish();
    mesh.recalculate_normals();
    mesh
}

/// A traced boundary loop of a triangulated mesh
#[derive(Debug, Clone, PartialEq)]
pub struct Outline {
    /// Vertex indices in walk order; closed loops repeat the first at the end
    pub indices: Vec<u32>,
    /// Positions matching `indices`
    pub points: Vec<Vec3>,
}

impl Outline {
    /// Whether the loop ends where it started
    pub fn is_closed(&self) -> bool {
        self.indices.len() > 2 && self.indices.first() == self.indices.last()
    }

    /// Points where the walk changes direction, collinear runs removed
    pub fn corners(&self) -> Vec<Vec3> {
        let points: &[Vec3] = if self.is_closed() {
            &self.points[..self.points.len() - 1]
        } else {
            &self.points
        };
        let n = points.len();
        if n < 3 {
            return points.to_vec();
        }

        let closed = self.is_closed();
        (0..n)
            .filter(|&i| {
                if !closed && (i == 0 || i == n - 1) {
                    return true;
                }
                let prev = points[(i + n - 1) % n];
                let next = points[(i + 1) % n];
                let turn = (points[i] - prev).cross(next - points[i]);
                turn.length_squared() > 1e-8
            })
            .map(|i| points[i])
            .collect()
    }
}

/// Triangles touching each vertex
fn triangles_by_vertex(mesh: &MeshData) -> Vec<Vec<usize>> {
    let mut map = vec![Vec::new(); mesh.positions.len()];
    for (t, tri) in mesh.indices.chunks_exact(3).enumerate() {
        for &v in tri {
            map[v as usize].push(t);
        }
    }
    map
}

/// Whether `a -> b` runs against the winding of `tri`
///
/// Each boundary edge lies in one triangle, so this picks one consistent
/// walk direction for every loop.
fn follows_winding(tri: &[u32], a: u32, b: u32) -> bool {
    let pos_a = tri.iter().position(|&v| v == a);
    let pos_b = tri.iter().position(|&v| v == b);
    match (pos_a, pos_b) {
        (Some(pa), Some(pb)) => (pa + 3 - pb) % 3 == 1,
        _ => false,
    }
}

struct OutlineTracer<'a> {
    mesh: &'a MeshData,
    by_vertex: Vec<Vec<usize>>,
    checked: HashSet<u32>,
}

impl<'a> OutlineTracer<'a> {
    fn shared_triangles(&self, a: u32, b: u32) -> usize {
        self.by_vertex[a as usize]
            .iter()
            .filter(|&&t| self.mesh.indices[t * 3..t * 3 + 3].contains(&b))
            .count()
    }

    fn is_outline_edge(&self, a: u32, b: u32) -> bool {
        a != b && self.shared_triangles(a, b) == 1
    }

    fn next_outline_vertex(&self, from: u32) -> Option<u32> {
        for &t in &self.by_vertex[from as usize] {
            let tri = &self.mesh.indices[t * 3..t * 3 + 3];
            for &candidate in tri {
                if candidate != from
                    && !self.checked.contains(&candidate)
                    && follows_winding(tri, from, candidate)
                    && self.is_outline_edge(from, candidate)
                {
                    return Some(candidate);
                }
            }
        }
        None
    }
}

/// Trace every boundary loop of a mesh
///
/// An edge is on the boundary when exactly one triangle contains it. Loops
/// are closed by repeating the first vertex when the last one links back.
pub fn trace_outlines(mesh: &MeshData) -> Vec<Outline> {
    let mut tracer = OutlineTracer {
        mesh,
        by_vertex: triangles_by_vertex(mesh),
        checked: HashSet::new(),
    };
    let mut outlines = Vec::new();

    for start in 0..mesh.positions.len() as u32 {
        if tracer.checked.contains(&start) {
            continue;
        }
        let Some(mut next) = tracer.next_outline_vertex(start) else {
            tracer.checked.insert(start);
            continue;
        };

        tracer.checked.insert(start);
        let mut indices = vec![start];
        loop {
            tracer.checked.insert(next);
            indices.push(next);
            match tracer.next_outline_vertex(next) {
                Some(v) => next = v,
                None => break,
            }
        }
        if tracer.is_outline_edge(next, start) {
            indices.push(start);
        }

        let points = indices
            .iter()
            .map(|&i| Vec3::from(mesh.positions[i as usize]))
            .collect();
        outlines.push(Outline { indices, points });
    }

    outlines
}

/// Extrude each outline into a strip between `z` and `z + height`
pub fn build_walls(outlines: &[Outline], height: f32) -> MeshData {
    let mut walls = MeshData::default();
    let lift = Vec3::new(0.0, 0.0, height);

    for outline in outlines {
        for (i, &point) in outline.points.iter().enumerate() {
            let s = walls.push_vertex(point);
            walls.push_vertex(point + lift);
            if i > 0 {
                walls.push_triangle(s, s - 1, s - 2);
                walls.push_triangle(s, s + 1, s - 1);
            }
        }
    }

    walls.recalculate_normals();
    walls
}

/// Geometry generated from one finished cave grid
#[derive(Debug, Clone, Default)]
pub struct PieceMeshes {
    /// Flat ceiling over the wall tiles
    pub ceiling: MeshData,
    /// Vertical walls extruded from the ceiling outlines
    pub walls: MeshData,
    /// Boundary loops of the ceiling
    pub outlines: Vec<Outline>,
}

impl PieceMeshes {
    /// Triangulate a grid, trace its outlines and extrude the walls
    pub fn generate(grid: &OccupancyGrid, wall_height: f32) -> Self {
        let ceiling = triangulate_grid(grid);
        let outlines = trace_outlines(&ceiling);
        let walls = build_walls(&outlines, wall_height);
        Self {
            ceiling,
            walls,
            outlines,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Tile;
    use std::collections::HashMap;

    fn boundary_edges(mesh: &MeshData) -> HashSet<(u32, u32)> {
        let mut counts: HashMap<(u32, u32), usize> = HashMap::new();
        for tri in mesh.indices.chunks_exact(3) {
            for (a, b) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
                *counts.entry((a.min(b), a.max(b))).or_insert(0) += 1;
            }
        }
        counts
            .into_iter()
            .filter(|&(_, c)| c == 1)
            .map(|(e, _)| e)
            .collect()
    }

    fn assert_loops_cover_boundary(mesh: &MeshData, outlines: &[Outline]) {
        let boundary = boundary_edges(mesh);
        let mut seen: HashMap<(u32, u32), usize> = HashMap::new();
        for outline in outlines {
            assert!(outline.is_closed());
            for pair in outline.indices.windows(2) {
                let (a, b) = (pair[0], pair[1]);
                *seen.entry((a.min(b), a.max(b))).or_insert(0) += 1;
            }
        }
        assert_eq!(seen.len(), boundary.len());
        for edge in &boundary {
            assert_eq!(seen.get(edge), Some(&1));
        }
    }

    #[test]
    fn test_configuration_bits() {
        let grid = OccupancyGrid::from_rows(&["#.", ".#"]);
        // rows[0] is y = 0: BL wall, BR empty, TL empty, TR wall
        let active = |x: usize, y: usize| grid.is_wall(x as i32, y as i32);
        assert_eq!(square_configuration(&active, 0, 0), 1 + 4);
    }

    #[test]
    fn test_solid_grid_single_loop() {
        let grid = OccupancyGrid::filled(10, 10, Tile::Wall);
        let meshes = PieceMeshes::generate(&grid, 5.0);

        // 81 squares, all configuration 15
        assert_eq!(meshes.ceiling.triangle_count(), 162);
        assert_eq!(meshes.ceiling.vertex_count(), 100);

        assert_eq!(meshes.outlines.len(), 1);
        let outline = &meshes.outlines[0];
        assert!(outline.is_closed());
        assert_eq!(outline.indices.len(), 37);

        let corners = outline.corners();
        assert_eq!(corners.len(), 4);
        for corner in corners {
            assert!((corner.x.abs() - 4.5).abs() < 1e-6);
            assert!((corner.y.abs() - 4.5).abs() < 1e-6);
        }

        assert_loops_cover_boundary(&meshes.ceiling, &meshes.outlines);
    }

    #[test]
    fn test_hole_produces_two_loops() {
        let grid = OccupancyGrid::from_rows(&["#####", "#####", "##.##", "#####", "#####"]);
        let meshes = PieceMeshes::generate(&grid, 5.0);

        assert_eq!(meshes.outlines.len(), 2);
        let mut lengths: Vec<usize> = meshes.outlines.iter().map(|o| o.indices.len()).collect();
        lengths.sort_unstable();
        assert_eq!(lengths, vec![5, 17]);

        assert_loops_cover_boundary(&meshes.ceiling, &meshes.outlines);
    }

    #[test]
    fn test_cave_loops_cover_boundary() {
        let grid = OccupancyGrid::from_rows(&[
            "##########",
            "#....#####",
            "#.##...###",
            "#.##.#..##",
            "#....#..##",
            "###..##..#",
            "#.......##",
            "##########",
        ]);
        let meshes = PieceMeshes::generate(&grid, 5.0);
        assert!(!meshes.outlines.is_empty());
        assert_loops_cover_boundary(&meshes.ceiling, &meshes.outlines);
    }

    #[test]
    fn test_walls_extrude_each_loop() {
        let grid = OccupancyGrid::filled(4, 4, Tile::Wall);
        let meshes = PieceMeshes::generate(&grid, 5.0);

        // 12 boundary nodes + closure, two vertices each, two triangles per quad
        assert_eq!(meshes.walls.vertex_count(), 13 * 2);
        assert_eq!(meshes.walls.triangle_count(), 12 * 2);
        assert_eq!(meshes.walls.normals.len(), meshes.walls.vertex_count());

        let (lo, hi) = meshes.walls.bounds().unwrap();
        assert_eq!(lo.z, 0.0);
        assert_eq!(hi.z, 5.0);
    }

    #[test]
    fn test_empty_grid_has_no_geometry() {
        let grid = OccupancyGrid::filled(6, 6, Tile::Empty);
        let meshes = PieceMeshes::generate(&grid, 5.0);
        assert!(meshes.ceiling.is_empty());
        assert!(meshes.outlines.is_empty());
        assert!(meshes.walls.is_empty());
    }
}
