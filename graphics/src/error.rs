//! Graphics error types.
//!
//! Failures fall in two groups. Resource-creation and device-operation
//! failures wrap a [`BackendError`] together with the [`ErrorSite`] of the
//! call that triggered them. Everything else is misuse of the API
//! (unknown submesh, reused staging buffer, mismatched frame count) and is
//! reported as soon as it is detected.

use std::fmt;
use std::panic::Location;

use thiserror::Error;

use crate::backend::BackendError;
use crate::types::ResourceState;

/// Location of the public call that failed.
///
/// Captured with `#[track_caller]`, so the file and line point at user code
/// rather than at the inside of this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorSite {
    /// Name of the failing operation.
    pub operation: &'static str,
    /// Source file of the caller.
    pub file: &'static str,
    /// Line in [`file`](Self::file).
    pub line: u32,
}

impl ErrorSite {
    /// Capture the caller's location for `operation`.
    #[track_caller]
    pub fn capture(operation: &'static str) -> Self {
        let location = Location::caller();
        Self {
            operation,
            file: location.file(),
            line: location.line(),
        }
    }
}

impl fmt::Display for ErrorSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} failed in {}; line {}",
            self.operation, self.file, self.line
        )
    }
}

/// Errors that can occur in the graphics system.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphicsError {
    /// Failed to initialize the graphics system.
    #[error("initialization failed: {0}")]
    InitializationFailed(String),

    /// Creating a GPU resource failed. Fatal for the operation that asked for it.
    #[error("{site}; resource `{label}`; error: {source}")]
    ResourceCreation {
        site: ErrorSite,
        label: String,
        #[source]
        source: BackendError,
    },

    /// A device call (write, submit, readback) failed.
    #[error("{site}; error: {source}")]
    DeviceOperation {
        site: ErrorSite,
        #[source]
        source: BackendError,
    },

    /// An invalid parameter was provided.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Lookup of a submesh name that was never registered.
    #[error("submesh `{submesh}` not found in geometry `{geometry}`")]
    SubmeshNotFound { geometry: String, submesh: String },

    /// A submesh range does not fit the geometry's buffers.
    #[error("submesh `{submesh}` of geometry `{geometry}` is invalid: {reason}")]
    InvalidSubmesh {
        geometry: String,
        submesh: String,
        reason: String,
    },

    /// A staging buffer was recorded as a copy source a second time.
    #[error("staging buffer `{label}` was already used for a transfer")]
    StagingBufferReused { label: String },

    /// A staging buffer was released while its copy may still be executing.
    #[error("staging buffer `{label}` is still read by a pending GPU copy")]
    StagingBufferInFlight { label: String },

    /// The GPU copy reading a staging buffer failed to execute.
    #[error("GPU copy from staging buffer `{label}` failed")]
    TransferFailed { label: String },

    /// A block or mirror was created for a different number of frames in flight.
    #[error("frames in flight mismatch: expected {expected}, got {actual}")]
    FrameCountMismatch { expected: u32, actual: u32 },

    /// Mirror slots were visited out of round-robin order.
    #[error("frame slot {actual} synchronized out of order, expected {expected}")]
    FrameOutOfOrder { expected: usize, actual: usize },

    /// A command was recorded against a buffer in the wrong residency state.
    #[error("buffer `{label}` is in state {actual:?}, expected {expected:?}")]
    InvalidResourceState {
        label: String,
        expected: ResourceState,
        actual: ResourceState,
    },

    /// A constant element index past the end of its mirror.
    #[error("constant index {index} out of range (capacity {capacity})")]
    ConstantIndexOutOfRange { index: u32, capacity: u32 },
}

impl GraphicsError {
    /// Whether this error reports a failure of the device rather than misuse of the API.
    pub fn is_device_failure(&self) -> bool {
        matches!(
            self,
            Self::ResourceCreation { .. }
                | Self::DeviceOperation { .. }
                | Self::TransferFailed { .. }
                | Self::InitializationFailed(_)
        )
    }
}
