//! wgpu GPU backend implementation.
//!
//! This backend uses wgpu for cross-platform GPU access, supporting
//! Vulkan, Metal, DX12, and WebGPU.
//!
//! wgpu tracks residency itself, so recorded transitions are only logged.
//! Copies and queue writes must be 4-byte aligned; buffers are allocated with
//! their size rounded up to that alignment and copy sizes are padded to it.

use std::sync::Arc;

use crate::alignment::{CONSTANT_BUFFER_ALIGNMENT, align_up, checked_align_up};
use crate::command::Command;
use crate::frame::{Fence, FencePoller};
use crate::types::{BufferDescriptor, BufferUsage};

use super::{BackendError, DeviceLimits, GpuBackend, GpuBuffer};

const COPY_ALIGNMENT: u64 = wgpu::COPY_BUFFER_ALIGNMENT;

/// wgpu-based GPU backend.
pub struct WgpuBackend {
    #[allow(dead_code)]
    instance: wgpu::Instance,
    adapter: wgpu::Adapter,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    poller: Arc<WgpuPoller>,
}

impl std::fmt::Debug for WgpuBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WgpuBackend")
            .field("adapter", &self.adapter.get_info().name)
            .finish()
    }
}

/// Drives wgpu's completion callbacks while a fence is queried or waited on.
struct WgpuPoller {
    device: Arc<wgpu::Device>,
}

impl FencePoller for WgpuPoller {
    fn poll(&self) {
        let _ = self.device.poll(wgpu::PollType::Poll);
    }

    fn block(&self) {
        let _ = self.device.poll(wgpu::PollType::wait_indefinitely());
    }
}

impl WgpuBackend {
    /// Create a new wgpu backend on the first high-performance adapter.
    pub fn new() -> Result<Self, BackendError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            flags: wgpu::InstanceFlags::default(),
            backend_options: wgpu::BackendOptions::default(),
            memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| BackendError::InitializationFailed(format!("No compatible GPU adapter: {e}")))?;

        log::info!("wgpu adapter: {:?}", adapter.get_info());

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("Strata Device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: wgpu::MemoryHints::default(),
            experimental_features: wgpu::ExperimentalFeatures::default(),
            trace: wgpu::Trace::Off,
        }))
        .map_err(|e| BackendError::InitializationFailed(format!("Device creation failed: {e}")))?;

        let device = Arc::new(device);
        Ok(Self {
            instance,
            adapter,
            poller: Arc::new(WgpuPoller {
                device: device.clone(),
            }),
            device,
            queue: Arc::new(queue),
        })
    }

    /// Get the wgpu device.
    pub fn device(&self) -> &Arc<wgpu::Device> {
        &self.device
    }

    /// Get the wgpu queue.
    pub fn queue(&self) -> &Arc<wgpu::Queue> {
        &self.queue
    }

    fn encode(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        command: &Command,
    ) -> Result<(), BackendError> {
        match command {
            Command::Transition { before, after, .. } => {
                log::trace!("WgpuBackend: transition {:?} -> {:?} (implicit)", before, after);
            }
            Command::CopyBuffer { src, dst, region } => {
                let src = wgpu_buffer(src)?;
                let dst = wgpu_buffer(dst)?;
                if region.src_offset % COPY_ALIGNMENT != 0 || region.dst_offset % COPY_ALIGNMENT != 0
                {
                    return Err(BackendError::InvalidParameter(format!(
                        "copy offsets {}/{} are not {}-byte aligned",
                        region.src_offset, region.dst_offset, COPY_ALIGNMENT
                    )));
                }
                let src_end = padded_end(region.src_offset, region.size)?;
                let dst_end = padded_end(region.dst_offset, region.size)?;
                if src_end > src.size() || dst_end > dst.size() {
                    return Err(BackendError::InvalidParameter(format!(
                        "padded copy of {} bytes does not fit",
                        src_end - region.src_offset
                    )));
                }
                let size = src_end - region.src_offset;
                encoder.copy_buffer_to_buffer(src, region.src_offset, dst, region.dst_offset, size);
            }
        }
        Ok(())
    }
}

impl GpuBackend for WgpuBackend {
    fn name(&self) -> &'static str {
        "wgpu Backend"
    }

    fn limits(&self) -> DeviceLimits {
        let limits = self.device.limits();
        DeviceLimits {
            max_buffer_size: limits.max_buffer_size,
            constant_buffer_alignment: CONSTANT_BUFFER_ALIGNMENT
                .max(limits.min_uniform_buffer_offset_alignment as u64),
        }
    }

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<GpuBuffer, BackendError> {
        let usage = convert_buffer_usage(descriptor.usage);
        let size = padded_end(0, descriptor.size)?;

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: descriptor.label.as_deref(),
            size,
            usage,
            mapped_at_creation: false,
        });
        let out_of_memory = pollster::block_on(self.device.pop_error_scope());
        let validation = pollster::block_on(self.device.pop_error_scope());

        if out_of_memory.is_some() {
            return Err(BackendError::OutOfMemory);
        }
        if let Some(error) = validation {
            return Err(BackendError::InvalidParameter(error.to_string()));
        }

        Ok(GpuBuffer::Wgpu(Arc::new(buffer)))
    }

    fn write_buffer(
        &self,
        buffer: &GpuBuffer,
        offset: u64,
        data: &[u8],
    ) -> Result<(), BackendError> {
        let buffer = wgpu_buffer(buffer)?;
        if offset % COPY_ALIGNMENT != 0 {
            return Err(BackendError::InvalidParameter(format!(
                "write offset {offset} is not {COPY_ALIGNMENT}-byte aligned"
            )));
        }

        let padded = align_up(data.len() as u64, COPY_ALIGNMENT);
        if padded == data.len() as u64 {
            self.queue.write_buffer(buffer, offset, data);
        } else {
            let mut bytes = data.to_vec();
            bytes.resize(padded as usize, 0);
            self.queue.write_buffer(buffer, offset, &bytes);
        }
        Ok(())
    }

    fn create_fence(&self) -> Fence {
        Fence::new_unsignaled().with_poller(self.poller.clone())
    }

    fn submit(&self, commands: &[Command], fence: &Fence) -> Result<(), BackendError> {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Command List Encoder"),
            });
        for command in commands {
            self.encode(&mut encoder, command)?;
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        let fence = fence.clone();
        self.queue.on_submitted_work_done(move || fence.signal());
        Ok(())
    }

    fn read_buffer(
        &self,
        buffer: &GpuBuffer,
        offset: u64,
        size: u64,
    ) -> Result<Vec<u8>, BackendError> {
        let source = wgpu_buffer(buffer)?;
        let start = offset - offset % COPY_ALIGNMENT;
        let end = padded_end(offset, size)?;
        if end > source.size() {
            return Err(BackendError::InvalidParameter(format!(
                "read {}+{} out of bounds ({} bytes)",
                offset,
                size,
                source.size()
            )));
        }

        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Read Staging Buffer"),
            size: end - start,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Read Buffer Encoder"),
            });
        encoder.copy_buffer_to_buffer(source, start, &staging, 0, end - start);
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| BackendError::Internal(e.to_string()))?;

        match rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(BackendError::Internal(e.to_string())),
            Err(_) => return Err(BackendError::DeviceLost),
        }

        let skip = (offset - start) as usize;
        let data = slice.get_mapped_range()[skip..skip + size as usize].to_vec();
        staging.unmap();
        Ok(data)
    }
}

fn wgpu_buffer(buffer: &GpuBuffer) -> Result<&Arc<wgpu::Buffer>, BackendError> {
    match buffer {
        GpuBuffer::Wgpu(buffer) => Ok(buffer),
        GpuBuffer::Dummy(_) => Err(BackendError::InvalidParameter(
            "dummy buffer passed to the wgpu backend".to_string(),
        )),
    }
}

/// End of `offset..offset + size` padded to the copy alignment.
fn padded_end(offset: u64, size: u64) -> Result<u64, BackendError> {
    offset
        .checked_add(size)
        .and_then(|end| checked_align_up(end, COPY_ALIGNMENT))
        .ok_or_else(|| {
            BackendError::InvalidParameter(format!("range {offset}+{size} overflows"))
        })
}

fn convert_buffer_usage(usage: BufferUsage) -> wgpu::BufferUsages {
    let mut result = wgpu::BufferUsages::empty();

    if usage.contains(BufferUsage::VERTEX) {
        result |= wgpu::BufferUsages::VERTEX;
    }
    if usage.contains(BufferUsage::INDEX) {
        result |= wgpu::BufferUsages::INDEX;
    }
    if usage.contains(BufferUsage::UNIFORM) {
        result |= wgpu::BufferUsages::UNIFORM;
    }
    if usage.contains(BufferUsage::STORAGE) {
        result |= wgpu::BufferUsages::STORAGE;
    }
    if usage.contains(BufferUsage::INDIRECT) {
        result |= wgpu::BufferUsages::INDIRECT;
    }

    // Every buffer can be written from the CPU queue and read back.
    result | wgpu::BufferUsages::COPY_SRC | wgpu::BufferUsages::COPY_DST
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_always_copyable() {
        let usage = convert_buffer_usage(BufferUsage::VERTEX);
        assert!(usage.contains(wgpu::BufferUsages::VERTEX));
        assert!(usage.contains(wgpu::BufferUsages::COPY_SRC | wgpu::BufferUsages::COPY_DST));
        assert!(!usage.contains(wgpu::BufferUsages::INDEX));
    }

    #[test]
    fn test_padded_end() {
        assert_eq!(padded_end(0, 10).unwrap(), 12);
        assert_eq!(padded_end(4, 4).unwrap(), 8);
        assert!(matches!(
            padded_end(u64::MAX - 1, 4),
            Err(BackendError::InvalidParameter(_))
        ));
        assert!(padded_end(0, u64::MAX).is_err());
    }

    #[test]
    fn test_uniform_and_storage_usage() {
        let usage = convert_buffer_usage(BufferUsage::UNIFORM | BufferUsage::STORAGE);
        assert!(usage.contains(wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::STORAGE));
    }
}
