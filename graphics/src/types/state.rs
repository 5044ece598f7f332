//! Memory residency classes and resource states.

/// Memory heap a buffer lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MemoryLocation {
    /// Device-local memory. Fast for the GPU, not CPU-writable.
    #[default]
    GpuOnly,
    /// Upload heap. CPU-writable, GPU-readable.
    CpuToGpu,
    /// Readback heap. GPU-writable, CPU-readable.
    GpuToCpu,
}

impl MemoryLocation {
    /// Whether the CPU may write into buffers of this class.
    pub fn is_cpu_writable(&self) -> bool {
        matches!(self, Self::CpuToGpu)
    }
}

/// Residency state of a buffer as seen by the GPU.
///
/// Transitions between states are explicit barriers recorded in a
/// [`CommandList`](crate::CommandList).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResourceState {
    /// No pending usage; freshly created default-heap buffers start here.
    #[default]
    Common,
    /// Destination of a copy.
    CopyDest,
    /// Source of a copy.
    CopySource,
    /// Readable by any shader stage or input assembler.
    GenericRead,
}

impl ResourceState {
    /// Whether a copy may read from a buffer in this state.
    pub fn can_copy_from(&self) -> bool {
        matches!(self, Self::CopySource | Self::GenericRead)
    }
}
