//! Persistently CPU-written element arrays.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::alignment;
use crate::device::GraphicsDevice;
use crate::error::GraphicsError;
use crate::types::{BufferDescriptor, BufferUsage, MemoryLocation, ResourceState};

use super::Buffer;

/// Upload-heap array of `element_count` values of `T`.
///
/// Constant-buffer arrays place each element at
/// [`constant_buffer_byte_size`](alignment::constant_buffer_byte_size) stride so
/// every element can be bound on its own; other arrays are tightly packed.
pub struct UploadBuffer<T: bytemuck::Pod> {
    device: Arc<GraphicsDevice>,
    buffer: Buffer,
    element_count: u32,
    element_stride: u64,
    is_constant_buffer: bool,
    _marker: PhantomData<T>,
}

impl<T: bytemuck::Pod> UploadBuffer<T> {
    /// Allocate the array. Contents start zeroed.
    #[track_caller]
    pub fn new(
        device: &Arc<GraphicsDevice>,
        label: impl Into<String>,
        element_count: u32,
        is_constant_buffer: bool,
    ) -> Result<Self, GraphicsError> {
        let element_size = std::mem::size_of::<T>() as u64;
        let (element_stride, usage) = if is_constant_buffer {
            (
                alignment::constant_buffer_byte_size(element_size as u32),
                BufferUsage::UNIFORM,
            )
        } else {
            (element_size, BufferUsage::STORAGE)
        };

        let descriptor = BufferDescriptor::new(element_stride * element_count as u64, usage)
            .with_memory(MemoryLocation::CpuToGpu)
            .with_initial_state(ResourceState::GenericRead)
            .with_label(label);
        let buffer = device.create_buffer(&descriptor)?;

        Ok(Self {
            device: Arc::clone(device),
            buffer,
            element_count,
            element_stride,
            is_constant_buffer,
            _marker: PhantomData,
        })
    }

    /// Overwrite element `index`.
    ///
    /// The caller guarantees the GPU is not reading this array right now.
    #[track_caller]
    pub fn copy_data(&self, index: u32, value: &T) -> Result<(), GraphicsError> {
        if index >= self.element_count {
            return Err(GraphicsError::ConstantIndexOutOfRange {
                index,
                capacity: self.element_count,
            });
        }
        self.device
            .write_buffer(&self.buffer, self.element_offset(index), bytemuck::bytes_of(value))
    }

    /// Byte offset of element `index`.
    pub fn element_offset(&self, index: u32) -> u64 {
        index as u64 * self.element_stride
    }

    /// Distance between consecutive elements, in bytes.
    pub fn element_stride(&self) -> u64 {
        self.element_stride
    }

    /// Number of elements.
    pub fn element_count(&self) -> u32 {
        self.element_count
    }

    /// Whether elements are laid out at constant-buffer stride.
    pub fn is_constant_buffer(&self) -> bool {
        self.is_constant_buffer
    }

    /// The underlying buffer.
    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }
}

impl<T: bytemuck::Pod> std::fmt::Debug for UploadBuffer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadBuffer")
            .field("label", &self.buffer.label())
            .field("element_count", &self.element_count)
            .field("element_stride", &self.element_stride)
            .field("is_constant_buffer", &self.is_constant_buffer)
            .finish()
    }
}
