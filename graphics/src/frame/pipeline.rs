//! Frames-in-flight pacing.
//!
//! [`FramePipeline`] hands out the frame slot the CPU may write this frame.
//! A slot becomes writable again only once the fence of the frame that last
//! used it has been signaled, which is the guarantee every
//! [`ConstantMirror`](super::ConstantMirror) write relies on.
//!
//! ```text
//! frames_in_flight = 3
//!
//! Slot 0: [Frame 0] ──► [Frame 3] ──► [Frame 6] ──►
//! Slot 1: [Frame 1] ──► [Frame 4] ──► [Frame 7] ──►
//! Slot 2: [Frame 2] ──► [Frame 5] ──► [Frame 8] ──►
//! ```

use std::time::{Duration, Instant};

use super::FramesInFlight;
use super::sync::Fence;

/// Manages multiple frames in flight for CPU-GPU parallelism.
///
/// # Thread Safety
///
/// `FramePipeline` is **not thread-safe**. It should be owned by a single
/// thread (typically the main/render thread).
#[derive(Debug)]
pub struct FramePipeline {
    /// Fences for each frame slot. `None` if slot hasn't been used yet.
    frame_fences: Vec<Option<Fence>>,

    /// Current frame slot index (0 to frames_in_flight - 1).
    current_slot: usize,

    frames_in_flight: FramesInFlight,

    /// Total frames started.
    frame_count: u64,
}

impl FramePipeline {
    /// Create a new frame pipeline.
    pub fn new(frames_in_flight: FramesInFlight) -> Self {
        Self {
            frame_fences: (0..frames_in_flight.as_usize()).map(|_| None).collect(),
            current_slot: 0,
            frames_in_flight,
            frame_count: 0,
        }
    }

    /// Begin a new frame.
    ///
    /// Blocks until the GPU has finished the previous frame that used the
    /// current slot, then returns that slot index.
    ///
    /// ```ignore
    /// loop {
    ///     let slot = pipeline.begin_frame();
    ///     materials.sync(slot, blocks)?;
    ///     let fence = device.submit(commands)?;
    ///     pipeline.end_frame(fence);
    /// }
    /// ```
    pub fn begin_frame(&mut self) -> usize {
        if let Some(fence) = &self.frame_fences[self.current_slot] {
            fence.wait();
        }

        self.frame_count += 1;

        log::trace!(
            "Begin frame {} (slot {})",
            self.frame_count,
            self.current_slot
        );

        self.current_slot
    }

    /// Begin a new frame with a timeout.
    ///
    /// Returns `None` if the slot did not become available in time.
    pub fn begin_frame_timeout(&mut self, timeout: Duration) -> Option<usize> {
        if let Some(fence) = &self.frame_fences[self.current_slot]
            && !fence.wait_timeout(timeout)
        {
            return None;
        }

        self.frame_count += 1;

        log::trace!(
            "Begin frame {} (slot {})",
            self.frame_count,
            self.current_slot
        );

        Some(self.current_slot)
    }

    /// End the current frame.
    ///
    /// Records the fence for this frame and advances to the next frame slot.
    pub fn end_frame(&mut self, fence: Fence) {
        log::trace!(
            "End frame {} (slot {}, fence {})",
            self.frame_count,
            self.current_slot,
            fence.id()
        );

        self.frame_fences[self.current_slot] = Some(fence);
        self.current_slot = (self.current_slot + 1) % self.frames_in_flight.as_usize();
    }

    /// Wait for all in-flight GPU work to complete.
    ///
    /// Call this before dropping resources the in-flight frames may read.
    pub fn wait_idle(&self) {
        log::trace!("Waiting for GPU idle ({} slots)", self.frames_in_flight);

        for (i, fence) in self.frame_fences.iter().enumerate() {
            if let Some(f) = fence {
                log::trace!("Waiting for slot {}...", i);
                f.wait();
            }
        }

        log::trace!("GPU idle");
    }

    /// Wait for all in-flight GPU work with a timeout.
    ///
    /// Returns `true` if GPU is idle, `false` if timeout elapsed.
    pub fn wait_idle_timeout(&self, timeout: Duration) -> bool {
        let start = Instant::now();

        for fence in self.frame_fences.iter().flatten() {
            let elapsed = start.elapsed();
            if elapsed >= timeout {
                return false;
            }
            if !fence.wait_timeout(timeout - elapsed) {
                return false;
            }
        }

        true
    }

    /// Get the number of frames in flight.
    pub fn frames_in_flight(&self) -> FramesInFlight {
        self.frames_in_flight
    }

    /// Get the current frame slot index.
    pub fn current_slot(&self) -> usize {
        self.current_slot
    }

    /// Get the total number of frames started.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Check if a specific frame slot is ready (non-blocking).
    ///
    /// Unused slots are ready; out-of-range slots never are.
    pub fn is_slot_ready(&self, slot: usize) -> bool {
        match self.frame_fences.get(slot) {
            Some(Some(fence)) => fence.query(),
            Some(None) => true,
            None => false,
        }
    }

    /// Check if all frame slots are ready (non-blocking).
    pub fn is_idle(&self) -> bool {
        self.frame_fences
            .iter()
            .all(|f| f.as_ref().is_none_or(|fence| fence.query()))
    }
}

impl Default for FramePipeline {
    fn default() -> Self {
        Self::new(FramesInFlight::default())
    }
}
