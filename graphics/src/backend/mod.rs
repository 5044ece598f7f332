//! GPU backend abstraction layer.
//!
//! # Available Backends
//!
//! - `dummy` (default): in-memory software device for tests and headless runs
//! - `wgpu-backend` (default): cross-platform backend using wgpu
//!
//! Each backend implements [`GpuBackend`]: buffer creation, CPU writes into
//! upload memory, command submission with a completion fence, and blocking
//! readback for verification.

#[cfg(feature = "wgpu-backend")]
pub mod wgpu_backend;

pub mod dummy;
mod error;

use std::sync::Arc;

pub use dummy::{DummyBackend, DummyBuffer};
pub use error::BackendError;

use crate::command::Command;
use crate::error::GraphicsError;
use crate::frame::Fence;
use crate::instance::{BackendType, InstanceParameters};
use crate::types::BufferDescriptor;

/// Handle to a GPU buffer resource.
#[derive(Debug, Clone)]
pub enum GpuBuffer {
    /// Dummy backend buffer (host memory)
    Dummy(Arc<DummyBuffer>),
    /// wgpu backend buffer
    #[cfg(feature = "wgpu-backend")]
    Wgpu(Arc<wgpu::Buffer>),
}

/// Limits reported by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceLimits {
    /// Largest buffer that may be created, in bytes.
    pub max_buffer_size: u64,
    /// Required offset granularity of constant-buffer views.
    pub constant_buffer_alignment: u64,
}

impl Default for DeviceLimits {
    fn default() -> Self {
        Self {
            max_buffer_size: 1 << 30, // 1 GB
            constant_buffer_alignment: crate::alignment::CONSTANT_BUFFER_ALIGNMENT,
        }
    }
}

/// GPU backend trait for abstracting different GPU APIs.
pub trait GpuBackend: Send + Sync + 'static {
    /// Get the backend name.
    fn name(&self) -> &'static str;

    /// Device limits.
    fn limits(&self) -> DeviceLimits;

    /// Create a buffer resource.
    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<GpuBuffer, BackendError>;

    /// Copy bytes from the CPU into a CPU-writable buffer.
    fn write_buffer(&self, buffer: &GpuBuffer, offset: u64, data: &[u8])
    -> Result<(), BackendError>;

    /// Create an unsignaled fence wired to this backend.
    fn create_fence(&self) -> Fence;

    /// Execute `commands` in order and signal `fence` once they complete.
    fn submit(&self, commands: &[Command], fence: &Fence) -> Result<(), BackendError>;

    /// Read data from a buffer.
    ///
    /// This is a blocking operation that waits for the GPU to finish.
    fn read_buffer(&self, buffer: &GpuBuffer, offset: u64, size: u64)
    -> Result<Vec<u8>, BackendError>;
}

/// Creates the backend requested by `params`.
///
/// [`BackendType::Auto`] tries wgpu first and falls back to the dummy backend.
pub fn create_backend(params: &InstanceParameters) -> Result<Arc<dyn GpuBackend>, GraphicsError> {
    match params.backend {
        BackendType::Dummy => {
            log::info!("Using dummy backend");
            Ok(Arc::new(DummyBackend::from_parameters(params)))
        }
        BackendType::Wgpu => create_wgpu_backend(),
        BackendType::Auto => {
            #[cfg(feature = "wgpu-backend")]
            {
                match wgpu_backend::WgpuBackend::new() {
                    Ok(backend) => {
                        log::info!("Using wgpu backend");
                        return Ok(Arc::new(backend));
                    }
                    Err(e) => {
                        log::warn!("Failed to create wgpu backend: {}", e);
                    }
                }
            }

            log::info!("Using dummy backend");
            Ok(Arc::new(DummyBackend::from_parameters(params)))
        }
    }
}

#[cfg(feature = "wgpu-backend")]
fn create_wgpu_backend() -> Result<Arc<dyn GpuBackend>, GraphicsError> {
    let backend = wgpu_backend::WgpuBackend::new()
        .map_err(|e| GraphicsError::InitializationFailed(e.to_string()))?;
    log::info!("Using wgpu backend");
    Ok(Arc::new(backend))
}

#[cfg(not(feature = "wgpu-backend"))]
fn create_wgpu_backend() -> Result<Arc<dyn GpuBackend>, GraphicsError> {
    Err(GraphicsError::InitializationFailed(
        "wgpu backend not compiled in (enable the `wgpu-backend` feature)".to_string(),
    ))
}

/// Check if a real GPU backend is available.
pub fn has_gpu_backend() -> bool {
    cfg!(feature = "wgpu-backend")
}
