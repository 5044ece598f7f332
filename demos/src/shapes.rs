//! Procedural shapes packed into one shared geometry.

use strata_core::bounds::BoundingBox;
use strata_core::math::Vec3;
use strata_graphics::{MeshGeometryDescriptor, SubmeshGeometry};

/// Vertex layout used by the demo shapes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ShapeVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

/// Vertices and 16-bit indices of one shape.
#[derive(Debug, Clone, Default)]
pub struct ShapeData {
    pub vertices: Vec<ShapeVertex>,
    pub indices: Vec<u16>,
}

impl ShapeData {
    /// Axis-aligned bounds of the vertices.
    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::from_points(self.vertices.iter().map(|v| Vec3::from(v.position)))
            .unwrap_or_default()
    }
}

/// A box centered at the origin, four vertices per face.
pub fn cube(width: f32, height: f32, depth: f32) -> ShapeData {
    let half = Vec3::new(width, height, depth) * 0.5;
    let faces = [
        (Vec3::x(), Vec3::z(), Vec3::y()),
        (-Vec3::x(), -Vec3::z(), Vec3::y()),
        (Vec3::y(), Vec3::x(), Vec3::z()),
        (-Vec3::y(), Vec3::x(), -Vec3::z()),
        (Vec3::z(), -Vec3::x(), Vec3::y()),
        (-Vec3::z(), Vec3::x(), Vec3::y()),
    ];

    let mut shape = ShapeData::default();
    for (normal, u, v) in faces {
        let base = shape.vertices.len() as u16;
        for (su, sv) in [(-1.0, -1.0), (-1.0, 1.0), (1.0, 1.0), (1.0, -1.0)] {
            let position = (normal + u * su + v * sv).component_mul(&half);
            shape.vertices.push(ShapeVertex {
                position: position.into(),
                normal: normal.into(),
                uv: [(su + 1.0) * 0.5, (1.0 - sv) * 0.5],
            });
        }
        shape
            .indices
            .extend([base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    shape
}

/// A flat `rows x cols` vertex grid in the XZ plane.
pub fn grid(width: f32, depth: f32, rows: u16, cols: u16) -> ShapeData {
    let rows = rows.max(2);
    let cols = cols.max(2);
    let dx = width / (cols - 1) as f32;
    let dz = depth / (rows - 1) as f32;

    let mut shape = ShapeData::default();
    for i in 0..rows {
        let z = depth * 0.5 - i as f32 * dz;
        for j in 0..cols {
            let x = -width * 0.5 + j as f32 * dx;
            shape.vertices.push(ShapeVertex {
                position: [x, 0.0, z],
                normal: [0.0, 1.0, 0.0],
                uv: [j as f32 / (cols - 1) as f32, i as f32 / (rows - 1) as f32],
            });
        }
    }
    for i in 0..rows - 1 {
        for j in 0..cols - 1 {
            let a = i * cols + j;
            let b = a + 1;
            let c = a + cols;
            let d = c + 1;
            shape.indices.extend([a, b, c, c, b, d]);
        }
    }
    shape
}

/// Pack the box and the grid into one vertex/index buffer pair named `shapes`.
pub fn build_shapes() -> MeshGeometryDescriptor {
    let cube = cube(1.5, 1.5, 1.5);
    let grid = grid(20.0, 30.0, 60, 40);

    let cube_submesh =
        SubmeshGeometry::new(cube.indices.len() as u32, 0, 0).with_bounds(cube.bounds());
    let grid_submesh = SubmeshGeometry::new(
        grid.indices.len() as u32,
        cube.indices.len() as u32,
        cube.vertices.len() as i32,
    )
    .with_bounds(grid.bounds());

    let vertices: Vec<ShapeVertex> = cube.vertices.iter().chain(&grid.vertices).copied().collect();
    let indices: Vec<u16> = cube.indices.iter().chain(&grid.indices).copied().collect();

    MeshGeometryDescriptor::new("shapes")
        .with_vertices(&vertices)
        .with_indices_u16(&indices)
        .with_submesh("box", cube_submesh)
        .with_submesh("grid", grid_submesh)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cube_counts_and_bounds() {
        let cube = cube(2.0, 4.0, 6.0);
        assert_eq!(cube.vertices.len(), 24);
        assert_eq!(cube.indices.len(), 36);
        let bounds = cube.bounds();
        assert_eq!(bounds.extents, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(bounds.center, Vec3::zeros());
    }

    #[test]
    fn test_grid_indices_in_range() {
        let grid = grid(10.0, 10.0, 4, 5);
        assert_eq!(grid.vertices.len(), 20);
        assert_eq!(grid.indices.len(), 3 * 4 * 6);
        assert!(grid.indices.iter().all(|&i| (i as usize) < grid.vertices.len()));
    }

    #[test]
    fn test_build_shapes_offsets_grid() {
        let desc = build_shapes();
        let grid = desc.submeshes["grid"];
        assert_eq!(grid.start_index_location, 36);
        assert_eq!(grid.base_vertex_location, 24);
        assert_eq!(desc.vertex_stride as usize, std::mem::size_of::<ShapeVertex>());
    }
}
