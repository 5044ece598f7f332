//! Per-frame copies of mutable shading parameters.
//!
//! A [`ShadingBlock`] is the single CPU-authoritative value. Its
//! [`ConstantMirror`] owns N upload arrays, one per frame slot, and each block
//! owns one element in every array. [`ConstantMirror::sync`] refreshes the
//! slot for the frame being recorded:
//!
//! ```text
//! edit ──► Dirty(N) ──sync f──► Dirty(N-1) ──sync f+1──► ... ──► Clean
//!             ▲                                                    │
//!             └──────────────────────── edit ──────────────────────┘
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::dirty::{DirtyCountdown, DirtyState, FramesInFlight};
use crate::device::GraphicsDevice;
use crate::error::GraphicsError;
use crate::resources::UploadBuffer;

static NEXT_MIRROR_ID: AtomicU64 = AtomicU64::new(1);

/// A mutable shading parameter block with its dirty countdown.
///
/// Every mutating accessor resets the countdown to N, so all N mirror slots
/// pick up the latest value before the block reads as clean again. While dirty,
/// the block must be synced on consecutive slots; leaving it out of a frame's
/// [`ConstantMirror::sync`] makes the next one fail with
/// [`GraphicsError::FrameOutOfOrder`].
#[derive(Debug)]
pub struct ShadingBlock<T> {
    value: T,
    countdown: DirtyCountdown,
    index: u32,
    mirror_id: u64,
    last_slot: Option<usize>,
}

impl<T> ShadingBlock<T> {
    pub(crate) fn new(
        value: T,
        index: u32,
        frames_in_flight: FramesInFlight,
        mirror_id: u64,
    ) -> Self {
        Self {
            value,
            countdown: DirtyCountdown::new(frames_in_flight),
            index,
            mirror_id,
            last_slot: None,
        }
    }

    /// The current logical value.
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Element index of this block in every mirror slot.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Replace the value.
    pub fn set(&mut self, value: T) {
        self.value = value;
        self.mark_dirty();
    }

    /// Edit the value in place.
    pub fn modify(&mut self, f: impl FnOnce(&mut T)) {
        f(&mut self.value);
        self.mark_dirty();
    }

    /// Mutable access to the value. Marks the block dirty even if nothing is
    /// written through the reference.
    pub fn edit(&mut self) -> &mut T {
        self.mark_dirty();
        &mut self.value
    }

    /// Slot this block was last written to during the current countdown.
    pub fn last_slot(&self) -> Option<usize> {
        self.last_slot
    }

    /// Number of mirror slots still holding a stale value.
    pub fn frames_dirty(&self) -> u32 {
        self.countdown.remaining()
    }

    pub fn state(&self) -> DirtyState {
        self.countdown.state()
    }

    pub fn is_dirty(&self) -> bool {
        self.countdown.is_dirty()
    }

    pub fn frames_in_flight(&self) -> FramesInFlight {
        self.countdown.frames_in_flight()
    }

    // A fresh countdown may start on any slot.
    fn mark_dirty(&mut self) {
        self.countdown.mark_dirty();
        self.last_slot = None;
    }

    /// Slot a dirty block must be written to next, if its countdown has started.
    fn expected_slot(&self) -> Option<usize> {
        if !self.countdown.is_dirty() {
            return None;
        }
        let n = self.countdown.frames_in_flight().as_usize();
        self.last_slot.map(|last| (last + 1) % n)
    }
}

/// N parallel upload arrays of `T`, one per frame in flight.
///
/// The mirror hands out element indices through
/// [`create_block`](Self::create_block). Frames must be synced in the
/// round-robin order [`FramePipeline`](super::FramePipeline) produces; slot
/// `f` may only be written once the GPU has finished the frame that last read
/// it, which is what [`FramePipeline::begin_frame`](super::FramePipeline::begin_frame)
/// guarantees.
///
/// ```ignore
/// let mut materials = ConstantMirror::<MaterialConstants>::new(&device, "materials", frames, 64)?;
/// let mut brick = materials.create_block(MaterialConstants::default())?;
///
/// loop {
///     let slot = pipeline.begin_frame();
///     materials.sync(slot, [&mut brick])?;
///     // record and submit
/// }
/// ```
pub struct ConstantMirror<T: bytemuck::Pod> {
    id: u64,
    label: String,
    slots: Vec<UploadBuffer<T>>,
    frames_in_flight: FramesInFlight,
    capacity: u32,
    next_index: u32,
    last_frame: Option<usize>,
}

impl<T: bytemuck::Pod> ConstantMirror<T> {
    /// Allocate N slots of `capacity` constant-buffer elements each.
    ///
    /// Slots are labelled `{label}_frame{i}`.
    #[track_caller]
    pub fn new(
        device: &Arc<GraphicsDevice>,
        label: impl Into<String>,
        frames_in_flight: FramesInFlight,
        capacity: u32,
    ) -> Result<Self, GraphicsError> {
        let label = label.into();
        let mut slots = Vec::with_capacity(frames_in_flight.as_usize());
        for i in 0..frames_in_flight.as_usize() {
            slots.push(UploadBuffer::new(
                device,
                format!("{label}_frame{i}"),
                capacity,
                true,
            )?);
        }

        log::debug!(
            "ConstantMirror `{}`: {} slots x {} elements",
            label,
            frames_in_flight,
            capacity
        );

        Ok(Self {
            id: NEXT_MIRROR_ID.fetch_add(1, Ordering::Relaxed),
            label,
            slots,
            frames_in_flight,
            capacity,
            next_index: 0,
            last_frame: None,
        })
    }

    /// Allocate the next element index and wrap `value` in a block for it.
    ///
    /// The block starts dirty in all N slots.
    pub fn create_block(&mut self, value: T) -> Result<ShadingBlock<T>, GraphicsError> {
        if self.next_index >= self.capacity {
            log::error!("ConstantMirror `{}` is full ({})", self.label, self.capacity);
            return Err(GraphicsError::ConstantIndexOutOfRange {
                index: self.next_index,
                capacity: self.capacity,
            });
        }
        let index = self.next_index;
        self.next_index += 1;
        Ok(ShadingBlock::new(value, index, self.frames_in_flight, self.id))
    }

    /// Refresh slot `frame` from every dirty block, consuming one count each.
    ///
    /// Call once per frame with every block of the mirror; `frame` must follow
    /// the previously synced slot in round-robin order, and a dirty block must
    /// not skip a slot its countdown has reached. All blocks are checked before
    /// anything is written, so on a validation error no slot and no countdown
    /// changes. Returns the number of elements written.
    #[track_caller]
    pub fn sync<'a, I>(&mut self, frame: usize, blocks: I) -> Result<usize, GraphicsError>
    where
        I: IntoIterator<Item = &'a mut ShadingBlock<T>>,
        T: 'a,
    {
        self.check_frame(frame)?;
        if let Some(last) = self.last_frame {
            let expected = (last + 1) % self.frames_in_flight.as_usize();
            if frame != expected {
                log::error!(
                    "ConstantMirror `{}`: synced slot {} after {}",
                    self.label,
                    frame,
                    last
                );
                return Err(GraphicsError::FrameOutOfOrder {
                    expected,
                    actual: frame,
                });
            }
        }

        let mut blocks: Vec<&mut ShadingBlock<T>> = blocks.into_iter().collect();
        for block in &blocks {
            self.check_block(block)?;
            if let Some(expected) = block.expected_slot()
                && expected != frame
            {
                log::error!(
                    "ConstantMirror `{}`: block {} skipped slot {}",
                    self.label,
                    block.index,
                    expected
                );
                return Err(GraphicsError::FrameOutOfOrder {
                    expected,
                    actual: frame,
                });
            }
        }

        self.last_frame = Some(frame);

        let slot = &self.slots[frame];
        let mut written = 0;
        for block in blocks.iter_mut() {
            if block.countdown.is_dirty() {
                slot.copy_data(block.index, &block.value)?;
                block.countdown.consume();
                block.last_slot = Some(frame);
                written += 1;
            }
        }

        log::trace!(
            "ConstantMirror `{}`: slot {} refreshed {} elements",
            self.label,
            frame,
            written
        );
        Ok(written)
    }

    /// Write `value` straight into slot `frame`, bypassing dirty tracking.
    ///
    /// For data rewritten every frame, such as per-pass constants. Only the
    /// slot range is checked; unlike [`sync`](Self::sync) the round-robin
    /// order is not enforced, and `frame` does not affect
    /// [`last_frame`](Self::last_frame).
    #[track_caller]
    pub fn write(&self, frame: usize, index: u32, value: &T) -> Result<(), GraphicsError> {
        self.check_frame(frame)?;
        self.slots[frame].copy_data(index, value)
    }

    /// The upload array backing slot `frame`.
    pub fn slot(&self, frame: usize) -> Option<&UploadBuffer<T>> {
        self.slots.get(frame)
    }

    /// Byte offset of element `index` inside any slot.
    pub fn element_offset(&self, index: u32) -> u64 {
        self.slots
            .first()
            .map(|slot| slot.element_offset(index))
            .unwrap_or(0)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn frames_in_flight(&self) -> FramesInFlight {
        self.frames_in_flight
    }

    /// Elements per slot.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Blocks created so far.
    pub fn len(&self) -> u32 {
        self.next_index
    }

    pub fn is_empty(&self) -> bool {
        self.next_index == 0
    }

    /// Slot passed to the most recent successful [`sync`](Self::sync).
    pub fn last_frame(&self) -> Option<usize> {
        self.last_frame
    }

    fn check_frame(&self, frame: usize) -> Result<(), GraphicsError> {
        if frame >= self.frames_in_flight.as_usize() {
            return Err(GraphicsError::InvalidParameter(format!(
                "frame slot {} out of range for `{}` ({} frames in flight)",
                frame, self.label, self.frames_in_flight
            )));
        }
        Ok(())
    }

    fn check_block(&self, block: &ShadingBlock<T>) -> Result<(), GraphicsError> {
        if block.frames_in_flight() != self.frames_in_flight {
            log::error!(
                "ConstantMirror `{}`: block built for {} frames, mirror has {}",
                self.label,
                block.frames_in_flight(),
                self.frames_in_flight
            );
            return Err(GraphicsError::FrameCountMismatch {
                expected: self.frames_in_flight.get(),
                actual: block.frames_in_flight().get(),
            });
        }
        if block.mirror_id != self.id {
            return Err(GraphicsError::InvalidParameter(format!(
                "block {} was not created by `{}`",
                block.index, self.label
            )));
        }
        if block.index >= self.capacity {
            return Err(GraphicsError::ConstantIndexOutOfRange {
                index: block.index,
                capacity: self.capacity,
            });
        }
        Ok(())
    }
}

impl<T: bytemuck::Pod> std::fmt::Debug for ConstantMirror<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConstantMirror")
            .field("label", &self.label)
            .field("frames_in_flight", &self.frames_in_flight)
            .field("capacity", &self.capacity)
            .field("len", &self.next_index)
            .field("last_frame", &self.last_frame)
            .finish()
    }
}
