// ── Camera directory ──
//
// Populates the store from `GET /api/cameras`. Only live cameras are
// orchestrated. With probing enabled, each newly seen camera gets one
// frame request: a camera that answers with a frame is already running a
// pipeline on the service, anything else is treated as idle.

use futures_util::future::join_all;
use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::model::{Camera, CameraId};
use crate::service::DetectionService;
use crate::store::{FrameInstall, StreamStore};

/// What a directory load found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirectoryReport {
    /// Cameras the service listed, of any kind.
    pub total: usize,
    /// Live cameras now tracked by the store.
    pub live: usize,
    /// Live cameras seen for the first time in this load.
    pub added: usize,
    /// New cameras whose probe showed a running stream.
    pub probed_streaming: usize,
}

pub struct CameraDirectory;

impl CameraDirectory {
    /// Load (or refresh) the camera set into `store`.
    ///
    /// A listing failure leaves the store untouched. Probe failures are
    /// never errors: the camera simply starts out idle. Cameras already
    /// in the store keep their runtime state.
    pub async fn load<S: DetectionService>(
        service: &S,
        store: &StreamStore,
        probe: bool,
    ) -> Result<DirectoryReport, CoreError> {
        let records = service.list_cameras().await.map_err(|e| {
            warn!(error = %e, "camera listing failed");
            CoreError::Directory { reason: e.to_string() }
        })?;

        let total = records.len();
        let mut new_ids = Vec::new();
        for record in records {
            let camera = Camera::from(record);
            if !camera.stream_kind.is_live() {
                debug!(camera = %camera.id, kind = %camera.stream_kind, "skipping non-live camera");
                continue;
            }
            let id = camera.id.clone();
            if store.upsert(camera) {
                new_ids.push(id);
            }
        }

        let probed_streaming = if probe {
            let probes = new_ids.iter().map(|id| probe_camera(service, store, id));
            join_all(probes).await.into_iter().filter(|running| *running).count()
        } else {
            0
        };

        let report = DirectoryReport {
            total,
            live: store.len(),
            added: new_ids.len(),
            probed_streaming,
        };
        info!(
            total = report.total,
            live = report.live,
            added = report.added,
            streaming = report.probed_streaming,
            "camera directory loaded"
        );
        Ok(report)
    }
}

/// Returns `true` if the camera answered with a frame.
async fn probe_camera<S: DetectionService>(service: &S, store: &StreamStore, id: &CameraId) -> bool {
    let bytes = match service.fetch_frame(id).await {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!(camera = %id, error = %e, "probe found no running stream");
            return false;
        }
    };

    let Ok(epoch) = store.set_streaming(id, true, None) else {
        return false;
    };
    let frame = store.frame_ledger().register(id.clone(), bytes);
    if let FrameInstall::Installed(previous) = store.install_frame(id, epoch, frame) {
        drop(previous);
    }
    debug!(camera = %id, "probe found a running stream");
    true
}
