//! Buffer types and descriptors.

use bitflags::bitflags;

use super::{MemoryLocation, ResourceState};

bitflags! {
    /// Usage flags for buffers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        /// Buffer can be used as a vertex buffer.
        const VERTEX = 1 << 0;
        /// Buffer can be used as an index buffer.
        const INDEX = 1 << 1;
        /// Buffer can be used as a uniform (constant) buffer.
        const UNIFORM = 1 << 2;
        /// Buffer can be used as a storage buffer.
        const STORAGE = 1 << 3;
        /// Buffer can be used as an indirect buffer.
        const INDIRECT = 1 << 4;
        /// Buffer can be copied from.
        const COPY_SRC = 1 << 5;
        /// Buffer can be copied to.
        const COPY_DST = 1 << 6;
    }
}

impl Default for BufferUsage {
    fn default() -> Self {
        Self::empty()
    }
}

/// Descriptor for creating a buffer.
///
/// ```
/// use strata_graphics::{BufferDescriptor, BufferUsage, MemoryLocation};
///
/// let desc = BufferDescriptor::new(1024, BufferUsage::COPY_SRC)
///     .with_memory(MemoryLocation::CpuToGpu)
///     .with_label("box_uploader");
/// assert_eq!(desc.label.as_deref(), Some("box_uploader"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct BufferDescriptor {
    /// Debug label for the buffer.
    pub label: Option<String>,
    /// Size in bytes.
    pub size: u64,
    /// Usage flags.
    pub usage: BufferUsage,
    /// Memory heap.
    pub memory: MemoryLocation,
    /// State the buffer is created in.
    pub initial_state: ResourceState,
}

impl BufferDescriptor {
    /// Create a new device-local buffer descriptor.
    pub fn new(size: u64, usage: BufferUsage) -> Self {
        Self {
            label: None,
            size,
            usage,
            memory: MemoryLocation::GpuOnly,
            initial_state: ResourceState::Common,
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the memory heap.
    pub fn with_memory(mut self, memory: MemoryLocation) -> Self {
        self.memory = memory;
        self
    }

    /// Set the initial residency state.
    pub fn with_initial_state(mut self, state: ResourceState) -> Self {
        self.initial_state = state;
        self
    }

    /// The label, or `"unnamed"` if none was set.
    pub fn label_or_default(&self) -> &str {
        self.label.as_deref().unwrap_or("unnamed")
    }
}

/// Arguments for an indexed indirect draw call.
///
/// This struct matches the GPU layout for `wgpu::DrawIndexedIndirect`.
/// The buffer containing these arguments must have [`BufferUsage::INDIRECT`].
///
/// # Memory Layout
///
/// - Total size: 20 bytes
/// - Alignment: 4 bytes
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DrawIndexedIndirectArgs {
    /// Number of indices to draw.
    pub index_count: u32,
    /// Number of instances to draw.
    pub instance_count: u32,
    /// Index of the first index to draw.
    pub first_index: u32,
    /// Value added to each index before reading from the vertex buffer.
    pub base_vertex: i32,
    /// Instance ID of the first instance to draw.
    pub first_instance: u32,
}

impl DrawIndexedIndirectArgs {
    /// Size of the struct in bytes.
    pub const SIZE: u64 = std::mem::size_of::<Self>() as u64;

    /// Create new indexed indirect draw arguments.
    pub fn new(index_count: u32, instance_count: u32) -> Self {
        Self {
            index_count,
            instance_count,
            first_index: 0,
            base_vertex: 0,
            first_instance: 0,
        }
    }

    /// Set the first index.
    pub fn with_first_index(mut self, first_index: u32) -> Self {
        self.first_index = first_index;
        self
    }

    /// Set the base vertex offset.
    pub fn with_base_vertex(mut self, base_vertex: i32) -> Self {
        self.base_vertex = base_vertex;
        self
    }

    /// Convert to bytes for uploading to a buffer.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_defaults() {
        let desc = BufferDescriptor::new(64, BufferUsage::VERTEX);
        assert_eq!(desc.memory, MemoryLocation::GpuOnly);
        assert_eq!(desc.initial_state, ResourceState::Common);
        assert_eq!(desc.label_or_default(), "unnamed");
    }

    #[test]
    fn test_descriptor_builders() {
        let desc = BufferDescriptor::new(64, BufferUsage::UNIFORM)
            .with_memory(MemoryLocation::CpuToGpu)
            .with_initial_state(ResourceState::GenericRead)
            .with_label("pass_cb");
        assert_eq!(desc.memory, MemoryLocation::CpuToGpu);
        assert_eq!(desc.initial_state, ResourceState::GenericRead);
        assert_eq!(desc.label_or_default(), "pass_cb");
    }

    #[test]
    fn test_indexed_args_layout() {
        assert_eq!(DrawIndexedIndirectArgs::SIZE, 20);
        let args = DrawIndexedIndirectArgs::new(36, 1)
            .with_first_index(6)
            .with_base_vertex(-4);
        let bytes = args.as_bytes();
        assert_eq!(bytes.len(), 20);
        assert_eq!(&bytes[8..12], &6u32.to_ne_bytes());
        assert_eq!(&bytes[12..16], &(-4i32).to_ne_bytes());
    }
}
