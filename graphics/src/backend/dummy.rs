//! Dummy GPU backend for testing and development.
//!
//! Buffers live in host memory, so everything written, copied and read back
//! can be verified without GPU hardware. The backend also plays the role of a
//! strict validation layer: commands that touch a buffer in the wrong
//! residency state fail instead of silently working.
//!
//! Two knobs model a real device:
//! - a memory budget, past which buffer creation fails with
//!   [`BackendError::OutOfMemory`];
//! - deferred completion, where submissions are queued and only execute (and
//!   signal their fence) when a fence waits on or polls the queue.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::command::Command;
use crate::frame::{Fence, FencePoller};
use crate::instance::InstanceParameters;
use crate::types::{BufferDescriptor, MemoryLocation, ResourceState};

use super::{BackendError, DeviceLimits, GpuBackend, GpuBuffer};

/// Host-memory buffer owned by the dummy backend.
pub struct DummyBuffer {
    label: Option<String>,
    size: u64,
    memory: MemoryLocation,
    data: Mutex<Vec<u8>>,
    state: Mutex<ResourceState>,
    allocated: Arc<AtomicU64>,
}

impl DummyBuffer {
    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Memory heap the buffer was created in.
    pub fn memory(&self) -> MemoryLocation {
        self.memory
    }

    /// Residency state as of the last executed command.
    pub fn state(&self) -> ResourceState {
        *self.state.lock()
    }

    /// Snapshot of the buffer contents.
    pub fn contents(&self) -> Vec<u8> {
        self.data.lock().clone()
    }

    fn name(&self) -> &str {
        self.label.as_deref().unwrap_or("unnamed")
    }
}

impl Drop for DummyBuffer {
    fn drop(&mut self) {
        self.allocated.fetch_sub(self.size, Ordering::AcqRel);
    }
}

impl std::fmt::Debug for DummyBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DummyBuffer")
            .field("label", &self.label)
            .field("size", &self.size)
            .field("memory", &self.memory)
            .field("state", &self.state())
            .finish()
    }
}

#[derive(Debug)]
struct PendingSubmission {
    commands: Vec<Command>,
    fence: Fence,
}

/// Submissions waiting for the "GPU" to get to them.
#[derive(Debug, Default)]
struct DummyQueue {
    pending: Mutex<VecDeque<PendingSubmission>>,
}

impl DummyQueue {
    fn enqueue(&self, commands: &[Command], fence: &Fence) {
        self.pending.lock().push_back(PendingSubmission {
            commands: commands.to_vec(),
            fence: fence.clone(),
        });
    }

    /// Execute every queued submission in order. Returns how many ran.
    ///
    /// A submission that fails to execute fails its fence; later submissions
    /// still run.
    fn flush(&self) -> usize {
        let mut executed = 0;
        loop {
            // Pop under the lock, execute outside it.
            let Some(submission) = self.pending.lock().pop_front() else {
                break;
            };
            match execute(&submission.commands) {
                Ok(()) => submission.fence.signal(),
                Err(e) => {
                    log::error!(
                        "DummyBackend: deferred submission (fence {}) failed: {}",
                        submission.fence.id(),
                        e
                    );
                    submission.fence.fail();
                }
            }
            executed += 1;
        }
        executed
    }

    fn len(&self) -> usize {
        self.pending.lock().len()
    }
}

impl FencePoller for DummyQueue {
    fn poll(&self) {
        self.flush();
    }
}

/// Dummy GPU backend.
#[derive(Debug)]
pub struct DummyBackend {
    limits: DeviceLimits,
    memory_budget: Option<u64>,
    allocated: Arc<AtomicU64>,
    queue: Option<Arc<DummyQueue>>,
}

impl DummyBackend {
    /// Create a backend with no memory budget and immediate completion.
    pub fn new() -> Self {
        Self {
            limits: DeviceLimits::default(),
            memory_budget: None,
            allocated: Arc::new(AtomicU64::new(0)),
            queue: None,
        }
    }

    /// Create a backend configured by instance parameters.
    pub fn from_parameters(params: &InstanceParameters) -> Self {
        let mut backend = Self::new();
        if let Some(budget) = params.memory_budget {
            backend = backend.with_memory_budget(budget);
        }
        if params.deferred_completion {
            backend = backend.with_deferred_completion();
        }
        backend
    }

    /// Fail buffer creation once more than `bytes` are live.
    pub fn with_memory_budget(mut self, bytes: u64) -> Self {
        self.memory_budget = Some(bytes);
        self
    }

    /// Queue submissions until a fence polls or waits.
    pub fn with_deferred_completion(mut self) -> Self {
        self.queue = Some(Arc::new(DummyQueue::default()));
        self
    }

    /// Bytes currently allocated by live buffers.
    pub fn allocated_bytes(&self) -> u64 {
        self.allocated.load(Ordering::Acquire)
    }

    /// Submissions queued but not yet executed.
    pub fn pending_submissions(&self) -> usize {
        self.queue.as_ref().map_or(0, |q| q.len())
    }

    /// Execute all queued submissions. Returns how many ran.
    pub fn flush(&self) -> usize {
        self.queue.as_ref().map_or(0, |q| q.flush())
    }

    fn reserve(&self, size: u64) -> Result<(), BackendError> {
        let budget = self.memory_budget;
        self.allocated
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                let next = current.checked_add(size)?;
                match budget {
                    Some(limit) if next > limit => None,
                    _ => Some(next),
                }
            })
            .map(|_| ())
            .map_err(|_| BackendError::OutOfMemory)
    }
}

impl Default for DummyBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl GpuBackend for DummyBackend {
    fn name(&self) -> &'static str {
        "Dummy"
    }

    fn limits(&self) -> DeviceLimits {
        self.limits
    }

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<GpuBuffer, BackendError> {
        log::trace!(
            "DummyBackend: creating buffer {:?} (size: {}, memory: {:?})",
            descriptor.label,
            descriptor.size,
            descriptor.memory
        );

        if descriptor.size == 0 || descriptor.size > self.limits.max_buffer_size {
            return Err(BackendError::InvalidParameter(format!(
                "buffer size {} outside 1..={}",
                descriptor.size, self.limits.max_buffer_size
            )));
        }
        let len = usize::try_from(descriptor.size).map_err(|_| BackendError::OutOfMemory)?;

        self.reserve(descriptor.size)?;

        Ok(GpuBuffer::Dummy(Arc::new(DummyBuffer {
            label: descriptor.label.clone(),
            size: descriptor.size,
            memory: descriptor.memory,
            data: Mutex::new(vec![0u8; len]),
            state: Mutex::new(descriptor.initial_state),
            allocated: Arc::clone(&self.allocated),
        })))
    }

    fn write_buffer(
        &self,
        buffer: &GpuBuffer,
        offset: u64,
        data: &[u8],
    ) -> Result<(), BackendError> {
        let buffer = dummy_buffer(buffer)?;
        log::trace!(
            "DummyBackend: write_buffer {} offset={} len={}",
            buffer.name(),
            offset,
            data.len()
        );

        if !buffer.memory.is_cpu_writable() {
            return Err(BackendError::InvalidParameter(format!(
                "buffer `{}` in {:?} memory is not CPU-writable",
                buffer.name(),
                buffer.memory
            )));
        }
        let range = byte_range(buffer, offset, data.len() as u64)?;
        buffer.data.lock()[range].copy_from_slice(data);
        Ok(())
    }

    fn create_fence(&self) -> Fence {
        match &self.queue {
            Some(queue) => Fence::new_unsignaled().with_poller(queue.clone()),
            None => Fence::new_unsignaled(),
        }
    }

    fn submit(&self, commands: &[Command], fence: &Fence) -> Result<(), BackendError> {
        log::trace!(
            "DummyBackend: submit {} commands (fence {})",
            commands.len(),
            fence.id()
        );

        match &self.queue {
            Some(queue) => queue.enqueue(commands, fence),
            None => match execute(commands) {
                Ok(()) => fence.signal(),
                Err(e) => {
                    fence.fail();
                    return Err(e);
                }
            },
        }
        Ok(())
    }

    fn read_buffer(
        &self,
        buffer: &GpuBuffer,
        offset: u64,
        size: u64,
    ) -> Result<Vec<u8>, BackendError> {
        let buffer = dummy_buffer(buffer)?;
        log::trace!(
            "DummyBackend: read_buffer {} offset={} size={}",
            buffer.name(),
            offset,
            size
        );
        let range = byte_range(buffer, offset, size)?;
        Ok(buffer.data.lock()[range].to_vec())
    }
}

fn dummy_buffer(buffer: &GpuBuffer) -> Result<&Arc<DummyBuffer>, BackendError> {
    match buffer {
        GpuBuffer::Dummy(buffer) => Ok(buffer),
        #[cfg(feature = "wgpu-backend")]
        GpuBuffer::Wgpu(_) => Err(BackendError::InvalidParameter(
            "wgpu buffer passed to the dummy backend".to_string(),
        )),
    }
}

fn byte_range(
    buffer: &DummyBuffer,
    offset: u64,
    size: u64,
) -> Result<std::ops::Range<usize>, BackendError> {
    match offset.checked_add(size) {
        Some(end) if end <= buffer.size => Ok(offset as usize..end as usize),
        _ => Err(BackendError::InvalidParameter(format!(
            "range {}+{} out of bounds for `{}` ({} bytes)",
            offset,
            size,
            buffer.name(),
            buffer.size
        ))),
    }
}

/// Run commands in program order against host memory.
fn execute(commands: &[Command]) -> Result<(), BackendError> {
    for command in commands {
        match command {
            Command::Transition {
                buffer,
                before,
                after,
            } => {
                let buffer = dummy_buffer(buffer)?;
                let mut state = buffer.state.lock();
                if *state != *before {
                    return Err(BackendError::InvalidState(format!(
                        "transition of `{}` from {:?} but buffer is {:?}",
                        buffer.name(),
                        before,
                        *state
                    )));
                }
                log::trace!(
                    "DummyBackend: `{}` {:?} -> {:?}",
                    buffer.name(),
                    before,
                    after
                );
                *state = *after;
            }
            Command::CopyBuffer { src, dst, region } => {
                let src = dummy_buffer(src)?;
                let dst = dummy_buffer(dst)?;
                if Arc::ptr_eq(src, dst) {
                    return Err(BackendError::InvalidParameter(format!(
                        "copy from `{}` onto itself",
                        src.name()
                    )));
                }
                if !src.state().can_copy_from() {
                    return Err(BackendError::InvalidState(format!(
                        "copy source `{}` is {:?}",
                        src.name(),
                        src.state()
                    )));
                }
                if dst.state() != ResourceState::CopyDest {
                    return Err(BackendError::InvalidState(format!(
                        "copy destination `{}` is {:?}, expected CopyDest",
                        dst.name(),
                        dst.state()
                    )));
                }
                let src_range = byte_range(src, region.src_offset, region.size)?;
                let dst_range = byte_range(dst, region.dst_offset, region.size)?;
                let src_data = src.data.lock();
                dst.data.lock()[dst_range].copy_from_slice(&src_data[src_range]);
            }
        }
    }
    Ok(())
}
