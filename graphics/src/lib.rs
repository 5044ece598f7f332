//! # Strata Graphics
//!
//! GPU resource substrate for a real-time renderer: moves CPU-authored data
//! onto the GPU and keeps per-frame copies of mutable data consistent while
//! the CPU runs several frames ahead.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`transfer::upload`] - staged copy into device-local memory
//! - [`MeshGeometry`] - shared vertex/index buffers with named submeshes
//! - [`ConstantMirror`] / [`ShadingBlock`] - N-way mirrored constants with a
//!   dirty countdown
//! - [`alignment`] - constant-buffer stride policy
//! - [`FramePipeline`] - frames-in-flight pacing
//! - Multiple backend support: wgpu and Dummy (for testing)
//!
//! ## Example
//!
//! ```ignore
//! use strata_graphics::*;
//!
//! let instance = GraphicsInstance::new()?;
//! let device = instance.create_device()?;
//!
//! let mut commands = device.create_command_list("load");
//! let mut boxes = MeshGeometry::build(&device, &mut commands, descriptor)?;
//! let load = device.submit(commands)?;
//!
//! let frames = FramesInFlight::DEFAULT;
//! let mut pipeline = device.create_pipeline(frames);
//! let mut materials = ConstantMirror::new(&device, "materials", frames, 16)?;
//! let mut brick = materials.create_block(MaterialConstants::default())?;
//!
//! loop {
//!     let slot = pipeline.begin_frame();
//!     materials.sync(slot, [&mut brick])?;
//!     let frame = device.create_command_list("frame");
//!     pipeline.end_frame(device.submit(frame)?);
//!     if load.is_signaled() && boxes.has_transients() {
//!         boxes.dispose_transients()?;
//!     }
//! }
//! ```

pub mod alignment;
pub mod backend;
pub mod command;
pub mod constants;
pub mod device;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod instance;
pub mod resources;
pub mod transfer;
pub mod types;

// Re-export main types for convenience
pub use backend::{BackendError, DeviceLimits, DummyBackend, GpuBackend};
pub use command::{BufferCopyRegion, Command, CommandList};
pub use constants::{
    Light, MAX_LIGHTS, Material, MaterialConstants, ObjectConstants, PassConstants,
};
pub use device::GraphicsDevice;
pub use error::{ErrorSite, GraphicsError};
pub use frame::{
    ConstantMirror, DirtyCountdown, DirtyState, Fence, FenceStatus, FramePipeline,
    FramesInFlight, ShadingBlock,
};
pub use geometry::{
    IndexBufferView, MeshGeometry, MeshGeometryDescriptor, SubmeshGeometry, VertexBufferView,
};
pub use instance::{BackendType, GraphicsInstance, InstanceParameters};
pub use resources::{Buffer, GpuResidentBuffer, UploadBuffer, UploadStagingBuffer};
pub use transfer::StagedUpload;
pub use types::{
    BufferDescriptor, BufferUsage, DrawIndexedIndirectArgs, MemoryLocation, ResourceState,
};

/// Graphics library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the graphics subsystem.
///
/// This should be called before using any graphics functionality.
pub fn init() {
    log::info!("Strata Graphics v{} initialized", VERSION);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_dummy_backend() {
        let backend = DummyBackend::new();
        assert!(backend.name() == "Dummy");
    }
}
