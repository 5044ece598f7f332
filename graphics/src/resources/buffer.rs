//! GPU buffer resources.
//!
//! [`Buffer`] is the raw device allocation. The two ownership wrappers encode
//! what the buffer is for:
//! - [`GpuResidentBuffer`] lives in device-local memory and tracks its
//!   residency state as commands are recorded against it;
//! - [`UploadStagingBuffer`] lives in the upload heap and may feed exactly one
//!   copy, after which it stays bound to that copy's fence.
//!
//! None of them is `Clone`: every buffer has a single owner.

use std::sync::{Arc, Weak};

use crate::backend::GpuBuffer;
use crate::device::GraphicsDevice;
use crate::frame::Fence;
use crate::types::{BufferDescriptor, BufferUsage, MemoryLocation, ResourceState};

/// A GPU buffer resource.
///
/// Buffers are created by [`GraphicsDevice::create_buffer`] and hold a weak
/// reference back to their parent device.
pub struct Buffer {
    device: Weak<GraphicsDevice>,
    descriptor: BufferDescriptor,
    raw: GpuBuffer,
}

impl Buffer {
    /// Create a new buffer (called by GraphicsDevice).
    pub(crate) fn new(
        device: Weak<GraphicsDevice>,
        descriptor: BufferDescriptor,
        raw: GpuBuffer,
    ) -> Self {
        Self {
            device,
            descriptor,
            raw,
        }
    }

    /// Get the parent device, if it still exists.
    pub fn device(&self) -> Option<Arc<GraphicsDevice>> {
        self.device.upgrade()
    }

    /// Get the buffer descriptor.
    pub fn descriptor(&self) -> &BufferDescriptor {
        &self.descriptor
    }

    /// Get the buffer size in bytes.
    pub fn size(&self) -> u64 {
        self.descriptor.size
    }

    /// Get the buffer usage flags.
    pub fn usage(&self) -> BufferUsage {
        self.descriptor.usage
    }

    /// Get the memory heap.
    pub fn memory(&self) -> MemoryLocation {
        self.descriptor.memory
    }

    /// Get the buffer label, if set.
    pub fn label(&self) -> Option<&str> {
        self.descriptor.label.as_deref()
    }

    /// Backend handle.
    pub fn raw(&self) -> &GpuBuffer {
        &self.raw
    }
}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("size", &self.descriptor.size)
            .field("usage", &self.descriptor.usage)
            .field("memory", &self.descriptor.memory)
            .field("label", &self.descriptor.label)
            .finish()
    }
}

static_assertions::assert_impl_all!(Buffer: Send, Sync);

/// Device-local buffer with a tracked residency state.
#[derive(Debug)]
pub struct GpuResidentBuffer {
    buffer: Buffer,
    state: ResourceState,
}

impl GpuResidentBuffer {
    pub(crate) fn new(buffer: Buffer) -> Self {
        let state = buffer.descriptor().initial_state;
        Self { buffer, state }
    }

    /// The underlying buffer.
    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    /// State after the last recorded command.
    pub fn state(&self) -> ResourceState {
        self.state
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.buffer.size()
    }

    /// Debug label.
    pub fn label(&self) -> &str {
        self.buffer.descriptor().label_or_default()
    }

    pub(crate) fn set_state(&mut self, state: ResourceState) {
        self.state = state;
    }
}

/// Upload-heap buffer feeding a single GPU copy.
#[derive(Debug)]
pub struct UploadStagingBuffer {
    buffer: Buffer,
    pending: Option<Fence>,
}

impl UploadStagingBuffer {
    pub(crate) fn new(buffer: Buffer) -> Self {
        Self {
            buffer,
            pending: None,
        }
    }

    /// The underlying buffer.
    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.buffer.size()
    }

    /// Debug label.
    pub fn label(&self) -> &str {
        self.buffer.descriptor().label_or_default()
    }

    /// Whether a copy reading this buffer has been recorded.
    pub fn is_consumed(&self) -> bool {
        self.pending.is_some()
    }

    /// Fence of the command list whose copy reads this buffer.
    pub fn pending_fence(&self) -> Option<&Fence> {
        self.pending.as_ref()
    }

    /// Whether the buffer may be released.
    ///
    /// True once the copy reading it has completed, or if no copy was ever
    /// recorded. Does not poll the backend; a fence that nobody waits on or
    /// queries stays unsignaled.
    pub fn is_retired(&self) -> bool {
        self.pending.as_ref().is_none_or(Fence::is_signaled)
    }

    /// Whether the copy reading this buffer was executed and failed.
    pub fn copy_failed(&self) -> bool {
        self.pending.as_ref().is_some_and(Fence::is_failed)
    }

    pub(crate) fn bind_to(&mut self, fence: Fence) {
        self.pending = Some(fence);
    }
}
