//! Multi-frame-in-flight data consistency.
//!
//! The CPU runs up to N frames ahead of the GPU. Everything shader-visible that
//! the CPU keeps editing therefore lives in N copies, one per frame slot:
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │ FramePipeline    hands out slot f once the GPU is done with it     │
//! ├────────────────────────────────────────────────────────────────────┤
//! │ ConstantMirror   N UploadBuffer slots, one element per block       │
//! ├────────────────────────────────────────────────────────────────────┤
//! │ ShadingBlock     logical value + DirtyCountdown (Clean / Dirty(k)) │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All three are built for one [`FramesInFlight`]; mixing counts is rejected.

mod dirty;
mod mirror;
mod pipeline;
mod sync;

pub use dirty::{DirtyCountdown, DirtyState, FramesInFlight};
pub use mirror::{ConstantMirror, ShadingBlock};
pub use pipeline::FramePipeline;
pub use sync::{Fence, FencePoller, FenceStatus};
