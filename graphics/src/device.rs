//! Graphics device.
//!
//! The [`GraphicsDevice`] is the main interface for creating GPU resources,
//! recording and submitting command lists, and writing CPU data into upload
//! memory. It is created by [`GraphicsInstance::create_device`].
//!
//! Fallible calls are `#[track_caller]`: a failure carries an
//! [`ErrorSite`] pointing at the code that made the call.

use std::sync::Arc;

use crate::backend::{DeviceLimits, GpuBackend};
use crate::command::CommandList;
use crate::error::{ErrorSite, GraphicsError};
use crate::frame::{Fence, FramePipeline, FramesInFlight};
use crate::instance::GraphicsInstance;
use crate::resources::Buffer;
use crate::types::BufferDescriptor;

/// A graphics device for creating GPU resources.
///
/// # Thread Safety
///
/// `GraphicsDevice` is `Send + Sync` and can be safely shared across threads.
///
/// # Example
///
/// ```ignore
/// let instance = GraphicsInstance::new()?;
/// let device = instance.create_device()?;
///
/// let buffer = device.create_buffer(&BufferDescriptor::new(1024, BufferUsage::VERTEX))?;
/// ```
pub struct GraphicsDevice {
    instance: Arc<GraphicsInstance>,
    name: String,
    limits: DeviceLimits,
    backend: Arc<dyn GpuBackend>,
}

impl GraphicsDevice {
    /// Create a new graphics device (called by GraphicsInstance).
    pub(crate) fn new(instance: Arc<GraphicsInstance>, backend: Arc<dyn GpuBackend>) -> Arc<Self> {
        Arc::new(Self {
            instance,
            name: backend.name().to_string(),
            limits: backend.limits(),
            backend,
        })
    }

    /// Get the parent instance.
    pub fn instance(&self) -> &Arc<GraphicsInstance> {
        &self.instance
    }

    /// Get the device name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the device limits.
    pub fn limits(&self) -> &DeviceLimits {
        &self.limits
    }

    /// Create a GPU buffer.
    ///
    /// # Errors
    ///
    /// [`GraphicsError::ResourceCreation`] if the size is zero or exceeds device
    /// limits, or if the device is out of memory.
    #[track_caller]
    pub fn create_buffer(
        self: &Arc<Self>,
        descriptor: &BufferDescriptor,
    ) -> Result<Buffer, GraphicsError> {
        let site = ErrorSite::capture("create_buffer");
        let label = descriptor.label_or_default();

        if descriptor.size == 0 || descriptor.size > self.limits.max_buffer_size {
            log::error!(
                "create_buffer `{}`: size {} outside 1..={}",
                label,
                descriptor.size,
                self.limits.max_buffer_size
            );
            return Err(GraphicsError::ResourceCreation {
                site,
                label: label.to_string(),
                source: crate::backend::BackendError::InvalidParameter(format!(
                    "buffer size {} outside 1..={}",
                    descriptor.size, self.limits.max_buffer_size
                )),
            });
        }

        let raw = self.backend.create_buffer(descriptor).map_err(|source| {
            log::error!("create_buffer `{}` failed: {}", label, source);
            GraphicsError::ResourceCreation {
                site,
                label: label.to_string(),
                source,
            }
        })?;

        log::trace!(
            "GraphicsDevice: created buffer {:?}, size={}, memory={:?}",
            descriptor.label,
            descriptor.size,
            descriptor.memory
        );

        Ok(Buffer::new(Arc::downgrade(self), descriptor.clone(), raw))
    }

    /// Copy `data` into a CPU-writable buffer at `offset`.
    ///
    /// # Errors
    ///
    /// [`GraphicsError::InvalidParameter`] if the buffer is not in the upload heap
    /// or the range does not fit; [`GraphicsError::DeviceOperation`] if the
    /// backend rejects the write.
    #[track_caller]
    pub fn write_buffer(
        &self,
        buffer: &Buffer,
        offset: u64,
        data: &[u8],
    ) -> Result<(), GraphicsError> {
        let site = ErrorSite::capture("write_buffer");

        if !buffer.memory().is_cpu_writable() {
            return Err(GraphicsError::InvalidParameter(format!(
                "buffer {:?} in {:?} memory is not CPU-writable",
                buffer.label(),
                buffer.memory()
            )));
        }
        if offset
            .checked_add(data.len() as u64)
            .is_none_or(|end| end > buffer.size())
        {
            return Err(GraphicsError::InvalidParameter(format!(
                "write of {} bytes at {} exceeds buffer {:?} ({} bytes)",
                data.len(),
                offset,
                buffer.label(),
                buffer.size()
            )));
        }

        self.backend
            .write_buffer(buffer.raw(), offset, data)
            .map_err(|source| GraphicsError::DeviceOperation { site, source })
    }

    /// Start recording a command list.
    pub fn create_command_list(&self, label: impl Into<String>) -> CommandList {
        CommandList::new(label, self.backend.create_fence())
    }

    /// Submit a command list for execution.
    ///
    /// Returns the list's completion fence.
    #[track_caller]
    pub fn submit(&self, mut commands: CommandList) -> Result<Fence, GraphicsError> {
        let site = ErrorSite::capture("submit");
        let fence = commands.completion().clone();

        log::debug!(
            "Submitting `{}`: {} commands (fence {})",
            commands.label(),
            commands.len(),
            fence.id()
        );

        self.backend
            .submit(commands.commands(), &fence)
            .map_err(|source| {
                log::error!("submit `{}` failed: {}", commands.label(), source);
                GraphicsError::DeviceOperation { site, source }
            })?;
        commands.mark_submitted();

        Ok(fence)
    }

    /// Read `size` bytes of `buffer` back to the CPU, waiting for the GPU.
    #[track_caller]
    pub fn read_buffer(
        &self,
        buffer: &Buffer,
        offset: u64,
        size: u64,
    ) -> Result<Vec<u8>, GraphicsError> {
        let site = ErrorSite::capture("read_buffer");
        self.backend
            .read_buffer(buffer.raw(), offset, size)
            .map_err(|source| GraphicsError::DeviceOperation { site, source })
    }

    /// Create a frame pipeline pacing `frames_in_flight` frames.
    pub fn create_pipeline(&self, frames_in_flight: FramesInFlight) -> FramePipeline {
        FramePipeline::new(frames_in_flight)
    }
}

impl std::fmt::Debug for GraphicsDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphicsDevice")
            .field("name", &self.name)
            .field("limits", &self.limits)
            .finish()
    }
}

static_assertions::assert_impl_all!(GraphicsDevice: Send, Sync);
