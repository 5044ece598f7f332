//! Graphics instance.
//!
//! The [`GraphicsInstance`] is the top-level entry point for the graphics system.
//! It owns the GPU backend and creates [`GraphicsDevice`]s on it.

use std::sync::{Arc, RwLock, Weak};

use crate::backend::{self, GpuBackend};
use crate::device::GraphicsDevice;
use crate::error::GraphicsError;

/// Which GPU backend to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BackendType {
    /// wgpu if an adapter is available, otherwise the dummy backend.
    #[default]
    Auto,
    /// In-memory software device.
    Dummy,
    /// wgpu; fails if no adapter is available.
    Wgpu,
}

impl std::str::FromStr for BackendType {
    type Err = GraphicsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "dummy" => Ok(Self::Dummy),
            "wgpu" => Ok(Self::Wgpu),
            other => Err(GraphicsError::InvalidParameter(format!(
                "unknown backend `{other}` (expected auto, dummy or wgpu)"
            ))),
        }
    }
}

/// Parameters for creating a [`GraphicsInstance`].
///
/// ```
/// use strata_graphics::{BackendType, InstanceParameters};
///
/// let params = InstanceParameters::new()
///     .with_backend(BackendType::Dummy)
///     .with_memory_budget(64 << 20)
///     .with_deferred_completion(true);
/// assert_eq!(params.memory_budget, Some(64 << 20));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InstanceParameters {
    /// Backend selection.
    pub backend: BackendType,
    /// Dummy backend only: bytes of live buffers before allocation fails.
    pub memory_budget: Option<u64>,
    /// Dummy backend only: run submissions when a fence is polled, not at submit.
    pub deferred_completion: bool,
}

impl InstanceParameters {
    /// Default parameters: automatic backend, no budget, immediate completion.
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the backend.
    pub fn with_backend(mut self, backend: BackendType) -> Self {
        self.backend = backend;
        self
    }

    /// Limit dummy-backend memory.
    pub fn with_memory_budget(mut self, bytes: u64) -> Self {
        self.memory_budget = Some(bytes);
        self
    }

    /// Defer dummy-backend execution until fences are polled.
    pub fn with_deferred_completion(mut self, deferred: bool) -> Self {
        self.deferred_completion = deferred;
        self
    }
}

/// The graphics instance owns the backend and the devices created on it.
///
/// # Thread Safety
///
/// `GraphicsInstance` is `Send + Sync` and can be safely shared across threads.
///
/// # Example
///
/// ```ignore
/// let instance = GraphicsInstance::new()?;
/// let device = instance.create_device()?;
/// ```
pub struct GraphicsInstance {
    /// Weak self-reference for creating devices.
    self_ref: RwLock<Weak<GraphicsInstance>>,
    /// Devices created by this instance.
    devices: RwLock<Vec<Arc<GraphicsDevice>>>,
    /// GPU backend for this instance.
    backend: Arc<dyn GpuBackend>,
}

impl GraphicsInstance {
    /// Create a new graphics instance with default parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the graphics system cannot be initialized.
    pub fn new() -> Result<Arc<Self>, GraphicsError> {
        Self::with_parameters(InstanceParameters::default())
    }

    /// Create a new graphics instance with explicit parameters.
    pub fn with_parameters(params: InstanceParameters) -> Result<Arc<Self>, GraphicsError> {
        log::info!("Creating GraphicsInstance ({:?})", params.backend);
        let backend = backend::create_backend(&params)?;
        Ok(Self::with_backend(backend))
    }

    /// Create an instance around an existing backend.
    pub fn with_backend(backend: Arc<dyn GpuBackend>) -> Arc<Self> {
        log::info!("Using GPU backend: {}", backend.name());

        let instance = Arc::new(Self {
            self_ref: RwLock::new(Weak::new()),
            devices: RwLock::new(Vec::new()),
            backend,
        });

        if let Ok(mut self_ref) = instance.self_ref.write() {
            *self_ref = Arc::downgrade(&instance);
        }

        instance
    }

    /// Get the GPU backend.
    pub fn backend(&self) -> &Arc<dyn GpuBackend> {
        &self.backend
    }

    /// Get the strong self-reference.
    fn arc_self(&self) -> Option<Arc<GraphicsInstance>> {
        self.self_ref.read().ok().and_then(|r| r.upgrade())
    }

    /// Create a graphics device on the instance's backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the instance is being torn down.
    pub fn create_device(&self) -> Result<Arc<GraphicsDevice>, GraphicsError> {
        let instance = self.arc_self().ok_or_else(|| {
            GraphicsError::InitializationFailed("instance has been dropped".to_string())
        })?;

        log::info!("Creating device on backend: {}", self.backend.name());
        let device = GraphicsDevice::new(instance, Arc::clone(&self.backend));

        if let Ok(mut devices) = self.devices.write() {
            devices.push(device.clone());
        }

        Ok(device)
    }

    /// Get all devices created by this instance.
    pub fn devices(&self) -> Vec<Arc<GraphicsDevice>> {
        self.devices
            .read()
            .map(|d| d.clone())
            .unwrap_or_else(|_| Vec::new())
    }

    /// Get the number of devices created by this instance.
    pub fn device_count(&self) -> usize {
        self.devices.read().map(|d| d.len()).unwrap_or(0)
    }
}

impl std::fmt::Debug for GraphicsInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphicsInstance")
            .field("backend", &self.backend.name())
            .field("device_count", &self.device_count())
            .finish()
    }
}

static_assertions::assert_impl_all!(GraphicsInstance: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;

    fn dummy_instance() -> Arc<GraphicsInstance> {
        GraphicsInstance::with_parameters(InstanceParameters::new().with_backend(BackendType::Dummy))
            .unwrap()
    }

    #[test]
    fn test_instance_creation() {
        let instance = dummy_instance();
        assert_eq!(instance.device_count(), 0);
        assert_eq!(instance.backend().name(), "Dummy");
    }

    #[test]
    fn test_create_device() {
        let instance = dummy_instance();
        let device = instance.create_device().unwrap();
        assert_eq!(device.name(), "Dummy");
        assert_eq!(instance.device_count(), 1);
    }

    #[test]
    fn test_device_has_instance_reference() {
        let instance = dummy_instance();
        let device = instance.create_device().unwrap();
        assert!(Arc::ptr_eq(device.instance(), &instance));
    }

    #[test]
    fn test_with_backend() {
        let instance = GraphicsInstance::with_backend(Arc::new(DummyBackend::new()));
        assert!(instance.create_device().is_ok());
    }

    #[test]
    fn test_backend_type_from_str() {
        assert_eq!("WGPU".parse::<BackendType>().unwrap(), BackendType::Wgpu);
        assert_eq!("dummy".parse::<BackendType>().unwrap(), BackendType::Dummy);
        assert!("vulkan".parse::<BackendType>().is_err());
    }
}
