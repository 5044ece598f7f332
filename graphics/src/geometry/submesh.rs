//! Draw ranges inside a shared vertex/index buffer pair.

use strata_core::bounds::BoundingBox;

use crate::types::DrawIndexedIndirectArgs;

/// One drawable range of a [`MeshGeometry`](super::MeshGeometry).
///
/// Several submeshes can share one vertex and index buffer; each draws
/// `index_count` indices starting at `start_index_location`, with
/// `base_vertex_location` added to every index.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SubmeshGeometry {
    /// Number of indices to draw.
    pub index_count: u32,
    /// First index, in elements.
    pub start_index_location: u32,
    /// Value added to each index before reading the vertex buffer.
    pub base_vertex_location: i32,
    /// Object-space bounds of the range.
    pub bounds: BoundingBox,
}

impl SubmeshGeometry {
    /// Create a submesh covering `index_count` indices from `start_index_location`.
    pub fn new(index_count: u32, start_index_location: u32, base_vertex_location: i32) -> Self {
        Self {
            index_count,
            start_index_location,
            base_vertex_location,
            bounds: BoundingBox::default(),
        }
    }

    /// Set the bounding box.
    pub fn with_bounds(mut self, bounds: BoundingBox) -> Self {
        self.bounds = bounds;
        self
    }

    /// One past the last index this range reads.
    pub fn end_index_location(&self) -> u64 {
        self.start_index_location as u64 + self.index_count as u64
    }

    /// Indexed indirect-draw arguments for `instance_count` instances.
    pub fn draw_args(&self, instance_count: u32) -> DrawIndexedIndirectArgs {
        DrawIndexedIndirectArgs::new(self.index_count, instance_count)
            .with_first_index(self.start_index_location)
            .with_base_vertex(self.base_vertex_location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draw_args() {
        let submesh = SubmeshGeometry::new(36, 12, 24);
        let args = submesh.draw_args(3);
        assert_eq!(args.index_count, 36);
        assert_eq!(args.instance_count, 3);
        assert_eq!(args.first_index, 12);
        assert_eq!(args.base_vertex, 24);
        assert_eq!(args.first_instance, 0);
    }

    #[test]
    fn test_end_index_does_not_overflow() {
        let submesh = SubmeshGeometry::new(u32::MAX, u32::MAX, 0);
        assert_eq!(submesh.end_index_location(), 2 * u32::MAX as u64);
    }
}
