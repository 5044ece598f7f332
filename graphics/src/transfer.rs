//! Staged transfer into device-local memory.
//!
//! Device-local buffers are not CPU-writable, so data reaches them through an
//! upload-heap staging buffer and a GPU copy:
//!
//! ```text
//! source bytes ──memcpy──► staging (CpuToGpu, GenericRead)
//!                               │ copy
//! target (GpuOnly): Common ──► CopyDest ──────► GenericRead
//! ```
//!
//! [`upload`] records the copy into a caller-provided [`CommandList`] and hands
//! back both buffers. The staging buffer must stay alive until the list's fence
//! has signaled; [`UploadStagingBuffer::is_retired`] reports when that is.

use std::sync::Arc;

use crate::command::{BufferCopyRegion, CommandList};
use crate::device::GraphicsDevice;
use crate::error::GraphicsError;
use crate::resources::{GpuResidentBuffer, UploadStagingBuffer};
use crate::types::{BufferDescriptor, BufferUsage, MemoryLocation, ResourceState};

/// Result of [`upload`]: the filled target and the staging buffer feeding it.
#[derive(Debug)]
pub struct StagedUpload {
    /// Device-local buffer, in [`ResourceState::GenericRead`] once the list runs.
    pub resident: GpuResidentBuffer,
    /// Upload-heap buffer read by the recorded copy.
    pub staging: UploadStagingBuffer,
}

impl StagedUpload {
    /// Split into `(resident, staging)`.
    pub fn into_parts(self) -> (GpuResidentBuffer, UploadStagingBuffer) {
        (self.resident, self.staging)
    }
}

/// Create a device-local buffer of `target_size` bytes filled with `source`.
///
/// The target is labelled `label` and the staging buffer `{label}_uploader`.
/// `usage` is extended with the copy flags the transfer needs. Bytes past
/// `source.len()` are zero.
///
/// # Errors
///
/// [`GraphicsError::ResourceCreation`] if either allocation fails or
/// `source` is larger than `target_size`. Nothing is recorded into `commands`
/// in that case.
#[track_caller]
pub fn upload(
    device: &Arc<GraphicsDevice>,
    commands: &mut CommandList,
    label: &str,
    target_size: u64,
    usage: BufferUsage,
    source: &[u8],
) -> Result<StagedUpload, GraphicsError> {
    let site = crate::error::ErrorSite::capture("upload");
    if source.len() as u64 > target_size {
        log::error!(
            "upload `{}`: {} source bytes do not fit {} target bytes",
            label,
            source.len(),
            target_size
        );
        return Err(GraphicsError::ResourceCreation {
            site,
            label: label.to_string(),
            source: crate::backend::BackendError::InvalidParameter(format!(
                "source of {} bytes exceeds target size {}",
                source.len(),
                target_size
            )),
        });
    }

    let target = device.create_buffer(
        &BufferDescriptor::new(
            target_size,
            usage | BufferUsage::COPY_DST | BufferUsage::COPY_SRC,
        )
        .with_memory(MemoryLocation::GpuOnly)
        .with_initial_state(ResourceState::Common)
        .with_label(label),
    )?;
    let staging = device.create_buffer(
        &BufferDescriptor::new(target_size, BufferUsage::COPY_SRC)
            .with_memory(MemoryLocation::CpuToGpu)
            .with_initial_state(ResourceState::GenericRead)
            .with_label(format!("{label}_uploader")),
    )?;
    device.write_buffer(&staging, 0, source)?;

    let mut resident = GpuResidentBuffer::new(target);
    let mut staging = UploadStagingBuffer::new(staging);

    commands.transition(&mut resident, ResourceState::CopyDest);
    commands.copy_from_staging(&mut staging, &resident, BufferCopyRegion::whole(target_size))?;
    commands.transition(&mut resident, ResourceState::GenericRead);

    log::debug!(
        "Staged upload `{}`: {} bytes into {} byte target",
        label,
        source.len(),
        target_size
    );

    Ok(StagedUpload { resident, staging })
}
