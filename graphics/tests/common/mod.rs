//! Common utilities for GPU integration tests.
//!
//! This module provides shared test infrastructure that can be reused
//! across different backend implementations.

use std::cell::RefCell;
use std::sync::Arc;

use strata_graphics::{
    BackendType, CommandList, Fence, FramePipeline, FramesInFlight, GraphicsDevice,
    GraphicsInstance, InstanceParameters, MeshGeometryDescriptor, SubmeshGeometry,
};

/// Route `log` output through the test harness. Safe to call repeatedly.
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Generate a deterministic byte pattern.
pub fn generate_test_pattern(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 256) as u8).collect()
}

// ============================================================================
// Backend Enumeration
// ============================================================================

/// Available GPU backends for testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// Dummy backend (host-memory device).
    Dummy,
    /// WebGPU backend (via wgpu).
    WebGpu,
}

impl Backend {
    /// Check if this backend is compiled in.
    pub fn is_available(&self) -> bool {
        match self {
            Backend::Dummy => true,
            #[cfg(feature = "wgpu-backend")]
            Backend::WebGpu => true,
            #[cfg(not(feature = "wgpu-backend"))]
            Backend::WebGpu => false,
        }
    }

    /// Get the backend name for display.
    #[allow(dead_code)]
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Dummy => "dummy",
            Backend::WebGpu => "webgpu",
        }
    }

    /// Convert to InstanceParameters for creating a GraphicsInstance.
    pub fn to_instance_parameters(self) -> InstanceParameters {
        match self {
            Backend::Dummy => InstanceParameters::new().with_backend(BackendType::Dummy),
            Backend::WebGpu => InstanceParameters::new().with_backend(BackendType::Wgpu),
        }
    }
}

// ============================================================================
// Test Context
// ============================================================================

/// Test context providing access to graphics resources.
///
/// Owns the instance, device and a frame pipeline for one test.
pub struct TestContext {
    /// The backend being tested.
    #[allow(dead_code)]
    pub backend: Backend,
    #[allow(dead_code)]
    instance: Arc<GraphicsInstance>,
    /// Graphics device for creating resources.
    pub device: Arc<GraphicsDevice>,
    pipeline: RefCell<FramePipeline>,
}

impl TestContext {
    /// Create a new test context for the given backend.
    ///
    /// Returns `None` if the backend is not compiled in or no adapter exists.
    pub fn new(backend: Backend) -> Option<Self> {
        Self::with_frames(backend, FramesInFlight::DEFAULT)
    }

    /// Create a context whose pipeline runs `frames` frames in flight.
    pub fn with_frames(backend: Backend, frames: FramesInFlight) -> Option<Self> {
        init_logger();
        if !backend.is_available() {
            return None;
        }

        let params = backend.to_instance_parameters();
        let instance = GraphicsInstance::with_parameters(params).ok()?;
        let device = instance.create_device().ok()?;
        let pipeline = device.create_pipeline(frames);

        Some(Self {
            backend,
            instance,
            device,
            pipeline: RefCell::new(pipeline),
        })
    }

    /// Submit `commands` and block until they have executed.
    pub fn submit_and_wait(&self, commands: CommandList) -> Fence {
        let fence = self.device.submit(commands).expect("Failed to submit");
        fence.wait();
        fence
    }

    /// Run one frame: wait for a free slot, let `record` fill a command list
    /// for it, submit, and advance the pipeline.
    pub fn run_frame(&self, record: impl FnOnce(usize, &mut CommandList)) {
        let mut pipeline = self.pipeline.borrow_mut();
        let slot = pipeline.begin_frame();
        let mut commands = self.device.create_command_list(format!("frame_{slot}"));
        record(slot, &mut commands);
        let fence = self.device.submit(commands).expect("Failed to submit frame");
        pipeline.end_frame(fence);
    }

    /// Block until every submitted frame has completed.
    pub fn wait_idle(&self) {
        self.pipeline.borrow().wait_idle();
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        // Ensure GPU is idle before cleanup
        self.pipeline.borrow().wait_idle();
    }
}

// ============================================================================
// Geometry Helpers
// ============================================================================

/// Vertex with position and texture coordinate.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct QuadVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

/// Two quads side by side in one vertex/index buffer pair.
///
/// `left` indexes vertices 0..4 directly; `right` reuses the same six indices
/// with a base vertex of 4.
#[allow(dead_code)]
pub fn two_quads(name: &str) -> MeshGeometryDescriptor {
    let quad = |x: f32| {
        [
            QuadVertex {
                position: [x, 0.0, 0.0],
                uv: [0.0, 1.0],
            },
            QuadVertex {
                position: [x + 1.0, 0.0, 0.0],
                uv: [1.0, 1.0],
            },
            QuadVertex {
                position: [x + 1.0, 1.0, 0.0],
                uv: [1.0, 0.0],
            },
            QuadVertex {
                position: [x, 1.0, 0.0],
                uv: [0.0, 0.0],
            },
        ]
    };
    let vertices: Vec<QuadVertex> = quad(-1.0).into_iter().chain(quad(0.5)).collect();

    MeshGeometryDescriptor::new(name)
        .with_vertices(&vertices)
        .with_indices_u16(&[0, 1, 2, 0, 2, 3, 0, 1, 2, 0, 2, 3])
        .with_submesh("left", SubmeshGeometry::new(6, 0, 0))
        .with_submesh("right", SubmeshGeometry::new(6, 6, 4))
}
