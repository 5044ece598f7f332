//! Frames-in-flight count and the dirty countdown built on it.

use std::num::NonZeroU32;

use crate::error::GraphicsError;

/// Number of frames the CPU may run ahead of the GPU.
///
/// Shared by the [`FramePipeline`](super::FramePipeline), every
/// [`ConstantMirror`](super::ConstantMirror) and every
/// [`ShadingBlock`](super::ShadingBlock) built for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FramesInFlight(NonZeroU32);

impl FramesInFlight {
    /// Three frames, enough for the CPU to stay two frames ahead.
    pub const DEFAULT: Self = Self(NonZeroU32::MIN.saturating_add(2));

    /// Create a frame count. Zero is rejected.
    pub fn new(count: u32) -> Result<Self, GraphicsError> {
        NonZeroU32::new(count).map(Self).ok_or_else(|| {
            GraphicsError::InvalidParameter("frames in flight must be at least 1".to_string())
        })
    }

    /// The count as `u32`.
    pub fn get(&self) -> u32 {
        self.0.get()
    }

    /// The count as `usize`, for slot indexing.
    pub fn as_usize(&self) -> usize {
        self.0.get() as usize
    }
}

impl Default for FramesInFlight {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl std::fmt::Display for FramesInFlight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Observable state of a [`DirtyCountdown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirtyState {
    /// Every mirror slot holds the current value.
    Clean,
    /// This many slots, visited in round-robin order, are still stale.
    Dirty(u32),
}

/// Counts how many per-frame copies of a value still need refreshing.
///
/// Slots are visited in strict round-robin order, so a single counter is
/// enough: after [`mark_dirty`](Self::mark_dirty) exactly N calls to
/// [`consume`](Self::consume) return `true`, one per slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirtyCountdown {
    frames_in_flight: FramesInFlight,
    remaining: u32,
}

impl DirtyCountdown {
    /// Create a countdown that starts dirty in every slot.
    pub fn new(frames_in_flight: FramesInFlight) -> Self {
        Self {
            frames_in_flight,
            remaining: frames_in_flight.get(),
        }
    }

    /// Reset to N, whatever the current count.
    pub fn mark_dirty(&mut self) {
        self.remaining = self.frames_in_flight.get();
    }

    /// Account for one slot refresh. Returns `false` if nothing was stale.
    pub fn consume(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }

    /// Number of slots still stale.
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Current state.
    pub fn state(&self) -> DirtyState {
        match self.remaining {
            0 => DirtyState::Clean,
            k => DirtyState::Dirty(k),
        }
    }

    /// Whether any slot is stale.
    pub fn is_dirty(&self) -> bool {
        self.remaining > 0
    }

    /// The N this countdown resets to.
    pub fn frames_in_flight(&self) -> FramesInFlight {
        self.frames_in_flight
    }
}
