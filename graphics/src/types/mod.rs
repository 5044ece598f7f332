//! Common types and descriptors for graphics resources.

mod buffer;
mod state;

pub use buffer::{BufferDescriptor, BufferUsage, DrawIndexedIndirectArgs};
pub use state::{MemoryLocation, ResourceState};
