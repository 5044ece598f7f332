//! GPU resources.
//!
//! - [`Buffer`] - raw device allocation
//! - [`GpuResidentBuffer`] - device-local buffer with residency tracking
//! - [`UploadStagingBuffer`] - single-use upload-heap buffer
//! - [`UploadBuffer`] - persistently CPU-written array of `T`

mod buffer;
mod upload_buffer;

pub use buffer::{Buffer, GpuResidentBuffer, UploadStagingBuffer};
pub use upload_buffer::UploadBuffer;
