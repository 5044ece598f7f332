//! CPU-GPU synchronization primitives.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

static NEXT_FENCE_ID: AtomicU64 = AtomicU64::new(1);

/// Lets a fence drive the backend forward while the CPU waits on it.
///
/// Real devices complete work on their own but only report it when polled
/// (wgpu); the dummy backend with deferred completion executes queued work
/// only when asked.
pub trait FencePoller: Send + Sync {
    /// Make progress without blocking.
    fn poll(&self);

    /// Block until all submitted work has completed.
    fn block(&self) {
        self.poll();
    }
}

/// Status of a fence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FenceStatus {
    /// The fence has not yet been signaled.
    Unsignaled,
    /// The fence has been signaled (GPU work complete).
    Signaled,
    /// The GPU is done with the work, but executing it failed.
    Failed,
}

/// CPU-GPU synchronization primitive.
///
/// Every [`CommandList`](crate::CommandList) owns a fence from the moment it is
/// created; the backend signals it once the list has executed. Clones share
/// the same state.
///
/// ```ignore
/// let fence = device.submit(commands)?;
/// // Later, before releasing the staging buffers the list reads:
/// fence.wait();
/// assert_eq!(fence.status(), FenceStatus::Signaled);
/// ```
#[derive(Clone)]
pub struct Fence {
    id: u64,
    signaled: Arc<AtomicBool>,
    failed: Arc<AtomicBool>,
    poller: Option<Arc<dyn FencePoller>>,
}

impl Fence {
    /// Create a new fence in the unsignaled state.
    pub(crate) fn new_unsignaled() -> Self {
        Self {
            id: NEXT_FENCE_ID.fetch_add(1, Ordering::Relaxed),
            signaled: Arc::new(AtomicBool::new(false)),
            failed: Arc::new(AtomicBool::new(false)),
            poller: None,
        }
    }

    /// Create a new fence in the signaled state.
    #[cfg(test)]
    pub(crate) fn new_signaled() -> Self {
        let fence = Self::new_unsignaled();
        fence.signal();
        fence
    }

    /// Attach the poller used while waiting.
    pub(crate) fn with_poller(mut self, poller: Arc<dyn FencePoller>) -> Self {
        self.poller = Some(poller);
        self
    }

    /// Unique identifier, for logs.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Check the current status of the fence without polling the backend.
    pub fn status(&self) -> FenceStatus {
        if !self.signaled.load(Ordering::Acquire) {
            FenceStatus::Unsignaled
        } else if self.failed.load(Ordering::Acquire) {
            FenceStatus::Failed
        } else {
            FenceStatus::Signaled
        }
    }

    /// Check if the GPU is done with the guarded work (non-blocking, no
    /// polling). Also true when that work failed; see [`is_failed`](Self::is_failed).
    pub fn is_signaled(&self) -> bool {
        self.signaled.load(Ordering::Acquire)
    }

    /// Whether the guarded work was executed and failed.
    pub fn is_failed(&self) -> bool {
        self.status() == FenceStatus::Failed
    }

    /// Poll the backend once, then report whether the fence is signaled.
    pub fn query(&self) -> bool {
        if !self.is_signaled()
            && let Some(poller) = &self.poller
        {
            poller.poll();
        }
        self.is_signaled()
    }

    /// Wait for the fence to be signaled (blocking).
    ///
    /// Returns immediately if already signaled.
    pub fn wait(&self) {
        if self.is_signaled() {
            return;
        }
        if let Some(poller) = &self.poller {
            poller.block();
        }
        while !self.signaled.load(Ordering::Acquire) {
            if let Some(poller) = &self.poller {
                poller.poll();
            }
            std::hint::spin_loop();
        }
    }

    /// Wait for the fence with a timeout.
    ///
    /// Returns `true` if the fence was signaled, `false` if timeout elapsed.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let start = Instant::now();
        while !self.query() {
            if start.elapsed() >= timeout {
                return false;
            }
            std::thread::yield_now();
        }
        true
    }

    /// Signal the fence.
    ///
    /// Called by backends once the work guarded by the fence has executed.
    pub(crate) fn signal(&self) {
        self.signaled.store(true, Ordering::Release);
    }

    /// Signal the fence and mark the guarded work as failed.
    ///
    /// Waiters are released; [`status`](Self::status) reports
    /// [`FenceStatus::Failed`] from then on.
    pub(crate) fn fail(&self) {
        self.failed.store(true, Ordering::Release);
        self.signal();
    }
}

impl Default for Fence {
    fn default() -> Self {
        Self::new_unsignaled()
    }
}

impl std::fmt::Debug for Fence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fence")
            .field("id", &self.id)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

static_assertions::assert_impl_all!(Fence: Send, Sync);
