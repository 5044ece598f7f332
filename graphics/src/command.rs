//! Command recording.
//!
//! A [`CommandList`] records residency transitions and buffer copies in
//! program order. Recording validates what can be known on the CPU (states,
//! bounds, single use of staging buffers), so a list that records cleanly is
//! one the device can execute.

use crate::backend::GpuBuffer;
use crate::error::GraphicsError;
use crate::frame::Fence;
use crate::resources::{GpuResidentBuffer, UploadStagingBuffer};
use crate::types::ResourceState;

/// Specifies a region for buffer-to-buffer copy operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BufferCopyRegion {
    /// Offset in bytes from the start of the source buffer.
    pub src_offset: u64,
    /// Offset in bytes from the start of the destination buffer.
    pub dst_offset: u64,
    /// Number of bytes to copy.
    pub size: u64,
}

impl BufferCopyRegion {
    /// Create a new buffer copy region.
    pub fn new(src_offset: u64, dst_offset: u64, size: u64) -> Self {
        Self {
            src_offset,
            dst_offset,
            size,
        }
    }

    /// Create a region that copies the entire source buffer from the beginning.
    pub fn whole(size: u64) -> Self {
        Self {
            src_offset: 0,
            dst_offset: 0,
            size,
        }
    }

    fn fits(offset: u64, size: u64, capacity: u64) -> bool {
        offset.checked_add(size).is_some_and(|end| end <= capacity)
    }
}

/// A recorded GPU command, as handed to a backend.
#[derive(Debug, Clone)]
pub enum Command {
    /// Residency barrier on one buffer.
    Transition {
        buffer: GpuBuffer,
        before: ResourceState,
        after: ResourceState,
    },
    /// Copy `region` from `src` into `dst`.
    CopyBuffer {
        src: GpuBuffer,
        dst: GpuBuffer,
        region: BufferCopyRegion,
    },
}

/// Ordered list of GPU commands.
///
/// Created with [`GraphicsDevice::create_command_list`] and consumed by
/// [`GraphicsDevice::submit`]. The list's completion fence exists from
/// creation, so staging buffers recorded into it can be tied to it before
/// submission.
///
/// A list dropped without being submitted signals its fence: nothing it
/// recorded will ever run.
///
/// [`GraphicsDevice::create_command_list`]: crate::GraphicsDevice::create_command_list
/// [`GraphicsDevice::submit`]: crate::GraphicsDevice::submit
#[derive(Debug)]
pub struct CommandList {
    label: String,
    commands: Vec<Command>,
    completion: Fence,
    submitted: bool,
}

impl CommandList {
    pub(crate) fn new(label: impl Into<String>, completion: Fence) -> Self {
        Self {
            label: label.into(),
            commands: Vec::new(),
            completion,
            submitted: false,
        }
    }

    /// Debug label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Recorded commands, in execution order.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Number of recorded commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Fence signaled when this list has finished executing.
    pub fn completion(&self) -> &Fence {
        &self.completion
    }

    /// Record a residency transition of `buffer` to `after`.
    ///
    /// Transitions to the state the buffer is already in record nothing.
    pub fn transition(&mut self, buffer: &mut GpuResidentBuffer, after: ResourceState) {
        let before = buffer.state();
        if before == after {
            return;
        }
        log::trace!(
            "{}: transition `{}` {:?} -> {:?}",
            self.label,
            buffer.label(),
            before,
            after
        );
        self.commands.push(Command::Transition {
            buffer: buffer.buffer().raw().clone(),
            before,
            after,
        });
        buffer.set_state(after);
    }

    /// Record a copy from a staging buffer into a resident buffer.
    ///
    /// `dst` must already be in [`ResourceState::CopyDest`]. The staging buffer
    /// becomes bound to this list's fence; recording it a second time, here or
    /// in any other list, fails with [`GraphicsError::StagingBufferReused`].
    pub fn copy_from_staging(
        &mut self,
        staging: &mut UploadStagingBuffer,
        dst: &GpuResidentBuffer,
        region: BufferCopyRegion,
    ) -> Result<(), GraphicsError> {
        if staging.is_consumed() {
            log::error!("{}: staging buffer `{}` reused", self.label, staging.label());
            return Err(GraphicsError::StagingBufferReused {
                label: staging.label().to_string(),
            });
        }
        if dst.state() != ResourceState::CopyDest {
            return Err(GraphicsError::InvalidResourceState {
                label: dst.label().to_string(),
                expected: ResourceState::CopyDest,
                actual: dst.state(),
            });
        }
        if !BufferCopyRegion::fits(region.src_offset, region.size, staging.size())
            || !BufferCopyRegion::fits(region.dst_offset, region.size, dst.size())
        {
            return Err(GraphicsError::InvalidParameter(format!(
                "copy region {:?} exceeds `{}` ({} bytes) or `{}` ({} bytes)",
                region,
                staging.label(),
                staging.size(),
                dst.label(),
                dst.size()
            )));
        }

        log::trace!(
            "{}: copy {} bytes `{}` -> `{}`",
            self.label,
            region.size,
            staging.label(),
            dst.label()
        );
        self.commands.push(Command::CopyBuffer {
            src: staging.buffer().raw().clone(),
            dst: dst.buffer().raw().clone(),
            region,
        });
        staging.bind_to(self.completion.clone());
        Ok(())
    }

    /// Drop every command recorded after the first `len`.
    ///
    /// Used to abandon a multi-step recording that failed part way; residency
    /// states advanced by the dropped commands belong to buffers that are
    /// discarded along with them.
    pub(crate) fn truncate(&mut self, len: usize) {
        if len < self.commands.len() {
            log::trace!(
                "{}: discarding {} commands",
                self.label,
                self.commands.len() - len
            );
            self.commands.truncate(len);
        }
    }

    /// Hand the commands to the backend; the list no longer owns its fence's outcome.
    pub(crate) fn mark_submitted(&mut self) {
        self.submitted = true;
    }
}

impl Drop for CommandList {
    fn drop(&mut self) {
        if !self.submitted {
            if !self.commands.is_empty() {
                log::warn!(
                    "CommandList `{}` dropped with {} unsubmitted commands",
                    self.label,
                    self.commands.len()
                );
            }
            self.completion.signal();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::{BackendType, GraphicsInstance, InstanceParameters};
    use crate::types::{BufferDescriptor, BufferUsage, MemoryLocation};

    type Fixture = (
        std::sync::Arc<crate::GraphicsDevice>,
        GpuResidentBuffer,
        UploadStagingBuffer,
    );

    fn buffers(size: u64) -> Fixture {
        let instance = GraphicsInstance::with_parameters(
            InstanceParameters::new().with_backend(BackendType::Dummy),
        )
        .unwrap();
        let device = instance.create_device().unwrap();
        let target = device
            .create_buffer(
                &BufferDescriptor::new(size, BufferUsage::COPY_DST)
                    .with_memory(MemoryLocation::GpuOnly)
                    .with_initial_state(ResourceState::Common)
                    .with_label("target"),
            )
            .unwrap();
        let staging = device
            .create_buffer(
                &BufferDescriptor::new(size, BufferUsage::COPY_SRC)
                    .with_memory(MemoryLocation::CpuToGpu)
                    .with_initial_state(ResourceState::GenericRead)
                    .with_label("staging"),
            )
            .unwrap();
        (
            device,
            GpuResidentBuffer::new(target),
            UploadStagingBuffer::new(staging),
        )
    }

    #[test]
    fn test_transition_to_same_state_records_nothing() {
        let (device, mut target, _staging) = buffers(16);
        let mut list = device.create_command_list("noop");
        list.transition(&mut target, ResourceState::Common);
        assert!(list.is_empty());

        list.transition(&mut target, ResourceState::CopyDest);
        assert_eq!(list.len(), 1);
        assert_eq!(target.state(), ResourceState::CopyDest);
    }

    #[test]
    fn test_region_out_of_bounds_rejected() {
        let (device, mut target, mut staging) = buffers(16);
        let mut list = device.create_command_list("bounds");
        list.transition(&mut target, ResourceState::CopyDest);

        let result =
            list.copy_from_staging(&mut staging, &target, BufferCopyRegion::new(0, 8, 16));
        assert!(matches!(result, Err(GraphicsError::InvalidParameter(_))));
        assert!(!staging.is_consumed());

        list.copy_from_staging(&mut staging, &target, BufferCopyRegion::new(8, 0, 8))
            .unwrap();
        assert!(staging.is_consumed());
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_truncate_discards_tail() {
        let (device, mut target, _staging) = buffers(16);
        let mut list = device.create_command_list("rollback");
        list.transition(&mut target, ResourceState::CopyDest);
        list.transition(&mut target, ResourceState::GenericRead);
        list.truncate(1);
        assert_eq!(list.len(), 1);
        list.truncate(4);
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_region_overflow_rejected() {
        assert!(!BufferCopyRegion::fits(u64::MAX, 2, u64::MAX));
        assert!(BufferCopyRegion::fits(4, 12, 16));
    }
}
