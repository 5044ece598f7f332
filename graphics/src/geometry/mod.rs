//! Geometry store.
//!
//! A [`MeshGeometry`] owns one vertex buffer and one index buffer in
//! device-local memory, the CPU copies they were built from, and a set of
//! named [`SubmeshGeometry`] ranges drawn out of them.
//!
//! # Lifecycle
//!
//! 1. [`MeshGeometry::build`] validates the data, records two staged uploads
//!    into a command list, and keeps the staging buffers.
//! 2. The command list is submitted; its fence signals once the copies ran.
//! 3. [`MeshGeometry::dispose_transients`] releases the staging buffers. The
//!    GPU buffers and CPU copies stay for the lifetime of the geometry.

mod submesh;

use std::collections::BTreeMap;
use std::sync::Arc;

use strata_core::mesh::IndexFormat;

use crate::command::CommandList;
use crate::device::GraphicsDevice;
use crate::error::GraphicsError;
use crate::resources::{Buffer, GpuResidentBuffer, UploadStagingBuffer};
use crate::transfer;
use crate::types::BufferUsage;

pub use submesh::SubmeshGeometry;

/// Descriptor for building a [`MeshGeometry`].
///
/// ```
/// use strata_graphics::{MeshGeometryDescriptor, SubmeshGeometry};
///
/// let positions: [[f32; 3]; 3] = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
/// let desc = MeshGeometryDescriptor::new("triangle")
///     .with_vertices(&positions)
///     .with_indices_u16(&[0, 1, 2])
///     .with_submesh("tri", SubmeshGeometry::new(3, 0, 0));
/// assert_eq!(desc.vertex_stride, 12);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MeshGeometryDescriptor {
    /// Name used for lookups and buffer labels.
    pub name: String,
    /// Raw vertex bytes; layout is up to the caller.
    pub vertex_data: Vec<u8>,
    /// Bytes per vertex.
    pub vertex_stride: u32,
    /// Raw little-endian index bytes.
    pub index_data: Vec<u8>,
    /// Width of each index.
    pub index_format: IndexFormat,
    /// Named draw ranges.
    pub submeshes: BTreeMap<String, SubmeshGeometry>,
}

impl MeshGeometryDescriptor {
    /// Create an empty descriptor.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set vertices from a slice of plain-old-data vertices.
    pub fn with_vertices<V: bytemuck::Pod>(mut self, vertices: &[V]) -> Self {
        self.vertex_data = bytemuck::cast_slice(vertices).to_vec();
        self.vertex_stride = std::mem::size_of::<V>() as u32;
        self
    }

    /// Set raw vertex bytes and stride.
    pub fn with_vertex_bytes(mut self, data: Vec<u8>, stride: u32) -> Self {
        self.vertex_data = data;
        self.vertex_stride = stride;
        self
    }

    /// Set 16-bit indices.
    pub fn with_indices_u16(mut self, indices: &[u16]) -> Self {
        self.index_data = strata_core::mesh::encode_indices_u16(indices);
        self.index_format = IndexFormat::Uint16;
        self
    }

    /// Set 32-bit indices.
    pub fn with_indices_u32(mut self, indices: &[u32]) -> Self {
        self.index_data = strata_core::mesh::encode_indices_u32(indices);
        self.index_format = IndexFormat::Uint32;
        self
    }

    /// Set raw index bytes and format.
    pub fn with_index_bytes(mut self, data: Vec<u8>, format: IndexFormat) -> Self {
        self.index_data = data;
        self.index_format = format;
        self
    }

    /// Add or replace a named draw range.
    pub fn with_submesh(mut self, name: impl Into<String>, submesh: SubmeshGeometry) -> Self {
        self.submeshes.insert(name.into(), submesh);
        self
    }
}

/// Vertex-buffer binding parameters, borrowed from a live geometry.
#[derive(Debug, Clone, Copy)]
pub struct VertexBufferView<'a> {
    /// Buffer to bind.
    pub buffer: &'a Buffer,
    /// Byte offset of the first vertex.
    pub offset: u64,
    /// Bytes visible through the view.
    pub size_in_bytes: u64,
    /// Bytes per vertex.
    pub stride_in_bytes: u32,
}

/// Index-buffer binding parameters, borrowed from a live geometry.
#[derive(Debug, Clone, Copy)]
pub struct IndexBufferView<'a> {
    /// Buffer to bind.
    pub buffer: &'a Buffer,
    /// Byte offset of the first index.
    pub offset: u64,
    /// Bytes visible through the view.
    pub size_in_bytes: u64,
    /// Width of each index.
    pub format: IndexFormat,
}

/// Vertex and index data resident on the GPU, with named submeshes.
#[derive(Debug)]
pub struct MeshGeometry {
    name: String,
    vertex_data: Vec<u8>,
    index_data: Vec<u8>,
    vertex_buffer: GpuResidentBuffer,
    index_buffer: GpuResidentBuffer,
    vertex_uploader: Option<UploadStagingBuffer>,
    index_uploader: Option<UploadStagingBuffer>,
    vertex_stride: u32,
    index_format: IndexFormat,
    submeshes: BTreeMap<String, SubmeshGeometry>,
}

impl MeshGeometry {
    /// Validate `descriptor` and record uploads of its buffers into `commands`.
    ///
    /// # Errors
    ///
    /// - [`GraphicsError::InvalidParameter`] for empty data, a zero stride, or
    ///   byte lengths that are not whole vertices/indices;
    /// - [`GraphicsError::InvalidSubmesh`] if a submesh reads past the index
    ///   buffer or addresses a vertex outside the vertex buffer;
    /// - [`GraphicsError::ResourceCreation`] if a GPU allocation fails.
    ///
    /// On error `commands` is left as it was before the call.
    #[track_caller]
    pub fn build(
        device: &Arc<GraphicsDevice>,
        commands: &mut CommandList,
        descriptor: MeshGeometryDescriptor,
    ) -> Result<Self, GraphicsError> {
        validate(&descriptor)?;

        let MeshGeometryDescriptor {
            name,
            vertex_data,
            vertex_stride,
            index_data,
            index_format,
            submeshes,
        } = descriptor;

        let recorded = commands.len();
        let (vertex_buffer, vertex_uploader) = transfer::upload(
            device,
            commands,
            &format!("{name}_vertices"),
            vertex_data.len() as u64,
            BufferUsage::VERTEX,
            &vertex_data,
        )?
        .into_parts();
        let (index_buffer, index_uploader) = match transfer::upload(
            device,
            commands,
            &format!("{name}_indices"),
            index_data.len() as u64,
            BufferUsage::INDEX,
            &index_data,
        ) {
            Ok(upload) => upload.into_parts(),
            Err(e) => {
                log::error!("geometry `{}`: abandoning vertex upload: {}", name, e);
                commands.truncate(recorded);
                return Err(e);
            }
        };

        log::debug!(
            "Built geometry `{}`: {} vertices, {} indices, {} submeshes",
            name,
            vertex_data.len() / vertex_stride as usize,
            index_format.count(index_data.len()),
            submeshes.len()
        );

        Ok(Self {
            name,
            vertex_data,
            index_data,
            vertex_buffer,
            index_buffer,
            vertex_uploader: Some(vertex_uploader),
            index_uploader: Some(index_uploader),
            vertex_stride,
            index_format,
            submeshes,
        })
    }

    /// Geometry name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a submesh by name.
    ///
    /// An unknown name is a programming error; callers are expected to
    /// propagate it rather than recover.
    pub fn resolve(&self, submesh: &str) -> Result<&SubmeshGeometry, GraphicsError> {
        self.submeshes.get(submesh).ok_or_else(|| {
            log::error!("geometry `{}` has no submesh `{}`", self.name, submesh);
            GraphicsError::SubmeshNotFound {
                geometry: self.name.clone(),
                submesh: submesh.to_string(),
            }
        })
    }

    /// Whether a submesh with this name exists.
    pub fn contains(&self, submesh: &str) -> bool {
        self.submeshes.contains_key(submesh)
    }

    /// All submeshes, ordered by name.
    pub fn submeshes(&self) -> impl Iterator<Item = (&str, &SubmeshGeometry)> {
        self.submeshes.iter().map(|(name, s)| (name.as_str(), s))
    }

    /// Vertex-buffer binding for the whole vertex buffer.
    pub fn vertex_buffer_view(&self) -> VertexBufferView<'_> {
        VertexBufferView {
            buffer: self.vertex_buffer.buffer(),
            offset: 0,
            size_in_bytes: self.vertex_byte_size(),
            stride_in_bytes: self.vertex_stride,
        }
    }

    /// Index-buffer binding for the whole index buffer.
    pub fn index_buffer_view(&self) -> IndexBufferView<'_> {
        IndexBufferView {
            buffer: self.index_buffer.buffer(),
            offset: 0,
            size_in_bytes: self.index_byte_size(),
            format: self.index_format,
        }
    }

    /// GPU vertex buffer.
    pub fn vertex_buffer(&self) -> &GpuResidentBuffer {
        &self.vertex_buffer
    }

    /// GPU index buffer.
    pub fn index_buffer(&self) -> &GpuResidentBuffer {
        &self.index_buffer
    }

    /// CPU copy of the vertex bytes.
    pub fn vertex_data(&self) -> &[u8] {
        &self.vertex_data
    }

    /// CPU copy of the index bytes.
    pub fn index_data(&self) -> &[u8] {
        &self.index_data
    }

    /// Bytes per vertex.
    pub fn vertex_stride(&self) -> u32 {
        self.vertex_stride
    }

    /// Width of each index.
    pub fn index_format(&self) -> IndexFormat {
        self.index_format
    }

    /// Total vertex bytes.
    pub fn vertex_byte_size(&self) -> u64 {
        self.vertex_data.len() as u64
    }

    /// Total index bytes.
    pub fn index_byte_size(&self) -> u64 {
        self.index_data.len() as u64
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> u32 {
        (self.vertex_data.len() / self.vertex_stride as usize) as u32
    }

    /// Number of indices.
    pub fn index_count(&self) -> u32 {
        self.index_format.count(self.index_data.len()) as u32
    }

    /// Whether staging buffers are still held.
    pub fn has_transients(&self) -> bool {
        self.vertex_uploader.is_some() || self.index_uploader.is_some()
    }

    /// Release the staging buffers used to upload this geometry.
    ///
    /// Idempotent once it has succeeded.
    ///
    /// # Errors
    ///
    /// - [`GraphicsError::StagingBufferInFlight`] if a copy reading a staging
    ///   buffer has not completed yet. Nothing is released in that case; wait
    ///   on the upload's fence and call again.
    /// - [`GraphicsError::TransferFailed`] if the GPU failed to execute a copy.
    ///   The GPU buffers never received their data.
    pub fn dispose_transients(&mut self) -> Result<(), GraphicsError> {
        for uploader in [&self.vertex_uploader, &self.index_uploader]
            .into_iter()
            .flatten()
        {
            if uploader.copy_failed() {
                log::error!("Upload from `{}` failed on the GPU", uploader.label());
                return Err(GraphicsError::TransferFailed {
                    label: uploader.label().to_string(),
                });
            }
            if !uploader.is_retired() {
                log::warn!(
                    "Refusing to release `{}`: GPU copy still pending",
                    uploader.label()
                );
                return Err(GraphicsError::StagingBufferInFlight {
                    label: uploader.label().to_string(),
                });
            }
        }

        if self.has_transients() {
            log::debug!("Releasing staging buffers of `{}`", self.name);
        }
        self.vertex_uploader = None;
        self.index_uploader = None;
        Ok(())
    }
}

fn validate(descriptor: &MeshGeometryDescriptor) -> Result<(), GraphicsError> {
    let name = &descriptor.name;
    let invalid = |reason: String| {
        log::error!("geometry `{}`: {}", name, reason);
        GraphicsError::InvalidParameter(format!("geometry `{name}`: {reason}"))
    };

    if descriptor.vertex_stride == 0 {
        return Err(invalid("vertex stride is zero".to_string()));
    }
    if descriptor.vertex_data.is_empty() || descriptor.index_data.is_empty() {
        return Err(invalid("vertex and index data must not be empty".to_string()));
    }
    if descriptor.vertex_data.len() % descriptor.vertex_stride as usize != 0 {
        return Err(invalid(format!(
            "{} vertex bytes are not a multiple of stride {}",
            descriptor.vertex_data.len(),
            descriptor.vertex_stride
        )));
    }
    if descriptor.index_data.len() % descriptor.index_format.size() != 0 {
        return Err(invalid(format!(
            "{} index bytes are not a multiple of {:?} width",
            descriptor.index_data.len(),
            descriptor.index_format
        )));
    }

    let vertex_count = (descriptor.vertex_data.len() / descriptor.vertex_stride as usize) as i64;
    let indices = descriptor.index_format.decode(&descriptor.index_data);

    for (submesh_name, submesh) in &descriptor.submeshes {
        let invalid_submesh = |reason: String| {
            log::error!("geometry `{}` submesh `{}`: {}", name, submesh_name, reason);
            GraphicsError::InvalidSubmesh {
                geometry: name.clone(),
                submesh: submesh_name.clone(),
                reason,
            }
        };

        let start = submesh.start_index_location as usize;
        let end = submesh.end_index_location();
        if end > indices.len() as u64 {
            return Err(invalid_submesh(format!(
                "indices {}..{} exceed index count {}",
                start,
                end,
                indices.len()
            )));
        }

        let base = submesh.base_vertex_location as i64;
        for &index in &indices[start..end as usize] {
            let vertex = base + index as i64;
            if !(0..vertex_count).contains(&vertex) {
                return Err(invalid_submesh(format!(
                    "index {index} with base vertex {base} addresses vertex {vertex} of {vertex_count}"
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::{BackendType, GraphicsInstance, InstanceParameters};

    fn create_test_device() -> Arc<GraphicsDevice> {
        let params = InstanceParameters::new().with_backend(BackendType::Dummy);
        GraphicsInstance::with_parameters(params)
            .unwrap()
            .create_device()
            .unwrap()
    }

    fn quad_and_triangle() -> MeshGeometryDescriptor {
        let vertices: [[f32; 3]; 7] = [
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
            [2.0, 0.0, 0.0],
            [3.0, 0.0, 0.0],
            [2.5, 1.0, 0.0],
        ];
        MeshGeometryDescriptor::new("shapes")
            .with_vertices(&vertices)
            .with_indices_u16(&[0, 1, 2, 0, 2, 3, 0, 1, 2])
            .with_submesh("quad", SubmeshGeometry::new(6, 0, 0))
            .with_submesh("triangle", SubmeshGeometry::new(3, 6, 4))
    }

    #[test]
    fn test_build_and_resolve() {
        let device = create_test_device();
        let mut commands = device.create_command_list("load");
        let geometry = MeshGeometry::build(&device, &mut commands, quad_and_triangle()).unwrap();

        assert_eq!(geometry.vertex_count(), 7);
        assert_eq!(geometry.index_count(), 9);
        assert_eq!(geometry.vertex_stride(), 12);
        assert_eq!(geometry.index_format(), IndexFormat::Uint16);
        assert_eq!(geometry.index_byte_size(), 18);
        // Two staged uploads of three commands each.
        assert_eq!(commands.len(), 6);

        let triangle = geometry.resolve("triangle").unwrap();
        assert_eq!(triangle.start_index_location, 6);
        assert_eq!(triangle.base_vertex_location, 4);
        assert!(triangle.end_index_location() <= geometry.index_count() as u64);
    }

    #[test]
    fn test_resolve_unknown() {
        let device = create_test_device();
        let mut commands = device.create_command_list("load");
        let geometry = MeshGeometry::build(&device, &mut commands, quad_and_triangle()).unwrap();
        for name in ["", "Quad", "circle", "triangle "] {
            assert!(matches!(
                geometry.resolve(name),
                Err(GraphicsError::SubmeshNotFound { .. })
            ));
        }
    }

    #[test]
    fn test_views() {
        let device = create_test_device();
        let mut commands = device.create_command_list("load");
        let geometry = MeshGeometry::build(&device, &mut commands, quad_and_triangle()).unwrap();

        let vbv = geometry.vertex_buffer_view();
        assert_eq!(vbv.size_in_bytes, 84);
        assert_eq!(vbv.stride_in_bytes, 12);
        assert_eq!(vbv.buffer.label(), Some("shapes_vertices"));

        let ibv = geometry.index_buffer_view();
        assert_eq!(ibv.size_in_bytes, 18);
        assert_eq!(ibv.format, IndexFormat::Uint16);
        assert_eq!(ibv.buffer.label(), Some("shapes_indices"));
    }

    #[test]
    fn test_submesh_past_index_buffer() {
        let device = create_test_device();
        let mut commands = device.create_command_list("load");
        let desc = quad_and_triangle().with_submesh("overflow", SubmeshGeometry::new(4, 6, 0));
        assert!(matches!(
            MeshGeometry::build(&device, &mut commands, desc),
            Err(GraphicsError::InvalidSubmesh { ref submesh, .. }) if submesh == "overflow"
        ));
        assert!(commands.is_empty());
    }

    #[test]
    fn test_submesh_base_vertex_past_vertex_buffer() {
        let device = create_test_device();
        let mut commands = device.create_command_list("load");
        let desc = quad_and_triangle().with_submesh("shifted", SubmeshGeometry::new(3, 6, 5));
        assert!(matches!(
            MeshGeometry::build(&device, &mut commands, desc),
            Err(GraphicsError::InvalidSubmesh { .. })
        ));
    }

    #[test]
    fn test_negative_base_vertex_below_zero() {
        let device = create_test_device();
        let mut commands = device.create_command_list("load");
        let desc = quad_and_triangle().with_submesh("negative", SubmeshGeometry::new(3, 0, -1));
        assert!(MeshGeometry::build(&device, &mut commands, desc).is_err());
    }

    #[test]
    fn test_partial_vertex_rejected() {
        let device = create_test_device();
        let mut commands = device.create_command_list("load");
        let desc = MeshGeometryDescriptor::new("bad")
            .with_vertex_bytes(vec![0; 13], 12)
            .with_indices_u16(&[0]);
        assert!(matches!(
            MeshGeometry::build(&device, &mut commands, desc),
            Err(GraphicsError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_dispose_transients_idempotent() {
        let device = create_test_device();
        let mut commands = device.create_command_list("load");
        let mut geometry =
            MeshGeometry::build(&device, &mut commands, quad_and_triangle()).unwrap();
        assert!(geometry.has_transients());

        device.submit(commands).unwrap().wait();
        geometry.dispose_transients().unwrap();
        assert!(!geometry.has_transients());
        geometry.dispose_transients().unwrap();
        assert!(!geometry.has_transients());

        // GPU and CPU data survive.
        assert_eq!(
            device
                .read_buffer(geometry.index_buffer().buffer(), 0, 18)
                .unwrap(),
            geometry.index_data()
        );
    }

    #[test]
    fn test_failed_index_allocation_records_nothing() {
        // Vertex target and staging fit (2 x 84 bytes), the index target does not.
        let params = InstanceParameters::new()
            .with_backend(BackendType::Dummy)
            .with_memory_budget(180);
        let device = GraphicsInstance::with_parameters(params)
            .unwrap()
            .create_device()
            .unwrap();
        let mut commands = device.create_command_list("load");

        let result = MeshGeometry::build(&device, &mut commands, quad_and_triangle());
        assert!(matches!(
            result,
            Err(GraphicsError::ResourceCreation { ref label, .. }) if label == "shapes_indices"
        ));
        assert!(commands.is_empty());
    }

    #[test]
    fn test_failed_copy_blocks_dispose() {
        let params = InstanceParameters::new()
            .with_backend(BackendType::Dummy)
            .with_deferred_completion(true);
        let device = GraphicsInstance::with_parameters(params)
            .unwrap()
            .create_device()
            .unwrap();
        let mut commands = device.create_command_list("load");
        let mut geometry =
            MeshGeometry::build(&device, &mut commands, quad_and_triangle()).unwrap();
        let fence = device.submit(commands).unwrap();
        fence.fail();

        assert!(matches!(
            geometry.dispose_transients(),
            Err(GraphicsError::TransferFailed { ref label }) if label == "shapes_vertices_uploader"
        ));
        assert!(geometry.has_transients());
    }

    #[test]
    fn test_dispose_before_submit_refused() {
        let device = create_test_device();
        let mut commands = device.create_command_list("load");
        let mut geometry =
            MeshGeometry::build(&device, &mut commands, quad_and_triangle()).unwrap();

        assert!(matches!(
            geometry.dispose_transients(),
            Err(GraphicsError::StagingBufferInFlight { ref label }) if label == "shapes_vertices_uploader"
        ));
        assert!(geometry.has_transients());

        device.submit(commands).unwrap();
        assert!(geometry.dispose_transients().is_ok());
    }
}
