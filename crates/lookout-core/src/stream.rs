// ── Reactive camera stream ──
//
// Subscription handle for consuming store changes.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::model::Camera;

/// Snapshot of every camera, in directory order.
pub type CameraSnapshot = Arc<Vec<Arc<Camera>>>;

/// A subscription to the camera table.
///
/// Provides both point-in-time snapshot access and change notification
/// via `changed()` or by converting to a `Stream`.
pub struct CameraStream {
    current: CameraSnapshot,
    receiver: watch::Receiver<CameraSnapshot>,
}

impl CameraStream {
    pub(crate) fn new(receiver: watch::Receiver<CameraSnapshot>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// Get the snapshot captured at creation (or the last `changed()`).
    pub fn current(&self) -> &CameraSnapshot {
        &self.current
    }

    /// Get the latest snapshot (may have changed since creation).
    pub fn latest(&self) -> CameraSnapshot {
        self.receiver.borrow().clone()
    }

    /// Wait for the next change, returning the new snapshot.
    /// Returns `None` if the store has been dropped.
    pub async fn changed(&mut self) -> Option<CameraSnapshot> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = snap.clone();
        Some(snap)
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators.
    pub fn into_stream(self) -> CameraWatchStream {
        CameraWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter yielding a snapshot each time the store changes.
pub struct CameraWatchStream {
    inner: WatchStream<CameraSnapshot>,
}

impl Stream for CameraWatchStream {
    type Item = CameraSnapshot;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use futures_util::StreamExt;

    use crate::model::{Camera, CameraId, StreamKind};
    use crate::store::StreamStore;

    #[tokio::test]
    async fn changed_yields_new_snapshots() {
        let store = StreamStore::default();
        let mut stream = store.subscribe();
        assert!(stream.current().is_empty());

        store.upsert(Camera::new(CameraId::from(1), "Dock", StreamKind::Live));
        let snap = stream.changed().await.unwrap();
        assert_eq!(snap.len(), 1);
        assert_eq!(stream.current().len(), 1);
    }

    #[tokio::test]
    async fn into_stream_starts_with_current_state() {
        let store = StreamStore::default();
        store.upsert(Camera::new(CameraId::from(1), "Dock", StreamKind::Live));

        let mut stream = store.subscribe().into_stream();
        let first = stream.next().await.unwrap();
        assert_eq!(first.len(), 1);
    }
}
