// ── Frame resources ──
//
// A fetched frame is an immutable, reference-counted byte buffer. The
// ledger counts every buffer it hands out and every buffer whose last
// reference is dropped, which makes "no orphaned frames" checkable.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use chrono::{DateTime, Utc};

use super::camera::CameraId;

/// Allocation counters shared by every frame of one session.
#[derive(Debug, Clone, Default)]
pub struct FrameLedger {
    inner: Arc<LedgerCounters>,
}

#[derive(Debug, Default)]
struct LedgerCounters {
    created: AtomicU64,
    released: AtomicU64,
}

impl FrameLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap freshly fetched image bytes in a tracked handle.
    pub fn register(&self, camera: CameraId, bytes: Bytes) -> FrameHandle {
        let seq = self.inner.created.fetch_add(1, Ordering::AcqRel) + 1;
        FrameHandle {
            inner: Arc::new(FrameBuffer {
                camera,
                seq,
                bytes,
                fetched_at: Utc::now(),
                ledger: Arc::clone(&self.inner),
            }),
        }
    }

    /// Total frames ever registered.
    pub fn created(&self) -> u64 {
        self.inner.created.load(Ordering::Acquire)
    }

    /// Frames whose last reference has been dropped.
    pub fn released(&self) -> u64 {
        self.inner.released.load(Ordering::Acquire)
    }

    /// Frames currently alive anywhere in the process.
    pub fn live(&self) -> u64 {
        // Read `released` first so a concurrent drop can only make the
        // result momentarily high, never underflow.
        let released = self.released();
        self.created().saturating_sub(released)
    }
}

/// Handle to one rendered frame.
///
/// Cloning shares the buffer. The frame is released when the last clone
/// is dropped.
#[derive(Clone)]
pub struct FrameHandle {
    inner: Arc<FrameBuffer>,
}

struct FrameBuffer {
    camera: CameraId,
    seq: u64,
    bytes: Bytes,
    fetched_at: DateTime<Utc>,
    ledger: Arc<LedgerCounters>,
}

impl Drop for FrameBuffer {
    fn drop(&mut self) {
        self.ledger.released.fetch_add(1, Ordering::AcqRel);
    }
}

impl FrameHandle {
    pub fn camera(&self) -> &CameraId {
        &self.inner.camera
    }

    /// Ledger-wide sequence number, increasing in fetch order.
    pub fn seq(&self) -> u64 {
        self.inner.seq
    }

    /// Encoded image bytes (JPEG from the reference service).
    pub fn bytes(&self) -> &Bytes {
        &self.inner.bytes
    }

    pub fn len(&self) -> usize {
        self.inner.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.bytes.is_empty()
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.inner.fetched_at
    }

    /// Whether two handles point at the same buffer.
    pub fn same_frame(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for FrameHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameHandle")
            .field("camera", &self.inner.camera)
            .field("seq", &self.inner.seq)
            .field("len", &self.inner.bytes.len())
            .finish_non_exhaustive()
    }
}
