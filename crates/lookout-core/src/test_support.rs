// Scripted in-process detection service for deterministic tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bytes::Bytes;
use lookout_api::{CameraRecord, CameraRef, RealtimeStats};

use crate::model::{CameraId, DetectionModel};
use crate::service::DetectionService;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Call {
    Start,
    Stop,
}

#[derive(Default)]
pub(crate) struct FakeService {
    cameras: Mutex<Option<Vec<CameraRecord>>>,
    fail_start: Mutex<HashSet<CameraId>>,
    fail_stop: Mutex<HashSet<CameraId>>,
    /// Remaining frame failures per camera; `u32::MAX` fails forever.
    frame_failures: Mutex<HashMap<CameraId, u32>>,
    /// Cameras whose frame requests never resolve.
    hanging_frames: Mutex<HashSet<CameraId>>,
    /// Response latency per call, consumed one entry per request.
    delays: Mutex<HashMap<(Call, CameraId), VecDeque<Duration>>>,
    calls: Mutex<Vec<(Call, CameraId, Option<DetectionModel>)>>,
    fetches: AtomicUsize,
}

pub(crate) fn server_error() -> lookout_api::Error {
    lookout_api::Error::Status {
        status: 500,
        body: "inference worker crashed".into(),
    }
}

impl FakeService {
    /// A service listing live cameras with the given numeric ids.
    pub(crate) fn with_cameras(ids: &[u64]) -> Self {
        let records = ids
            .iter()
            .map(|id| CameraRecord {
                id: CameraRef::Number(*id),
                source_name: Some(format!("Camera {id}")),
                stream_type: Some("live".into()),
                stream: None,
                location: None,
            })
            .collect();
        let fake = Self::default();
        *fake.cameras.lock().unwrap() = Some(records);
        fake
    }

    pub(crate) fn push_camera(&self, record: CameraRecord) {
        self.cameras.lock().unwrap().get_or_insert_with(Vec::new).push(record);
    }

    pub(crate) fn fail_listing(&self) {
        *self.cameras.lock().unwrap() = None;
    }

    pub(crate) fn fail_start(&self, id: u64) {
        self.fail_start.lock().unwrap().insert(CameraId::from(id));
    }

    pub(crate) fn fail_stop(&self, id: u64) {
        self.fail_stop.lock().unwrap().insert(CameraId::from(id));
    }

    pub(crate) fn fail_frames(&self, id: u64, times: u32) {
        self.frame_failures.lock().unwrap().insert(CameraId::from(id), times);
    }

    pub(crate) fn hang_frames(&self, id: u64) {
        self.hanging_frames.lock().unwrap().insert(CameraId::from(id));
    }

    /// Delay the next start or stop responses for `id`, in request order.
    pub(crate) fn delay(&self, kind: Call, id: u64, delays: &[Duration]) {
        self.delays
            .lock()
            .unwrap()
            .entry((kind, CameraId::from(id)))
            .or_default()
            .extend(delays);
    }

    async fn respond_after_delay(&self, kind: Call, camera: &CameraId) {
        let delay = self
            .delays
            .lock()
            .unwrap()
            .get_mut(&(kind, camera.clone()))
            .and_then(VecDeque::pop_front);
        match delay {
            Some(delay) => tokio::time::sleep(delay).await,
            None => tokio::task::yield_now().await,
        }
    }

    pub(crate) fn calls(&self, kind: Call) -> Vec<CameraId> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(call, _, _)| *call == kind)
            .map(|(_, id, _)| id.clone())
            .collect()
    }

    pub(crate) fn models_started(&self) -> Vec<DetectionModel> {
        self.calls.lock().unwrap().iter().filter_map(|(_, _, model)| *model).collect()
    }

    pub(crate) fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl DetectionService for FakeService {
    async fn list_cameras(&self) -> Result<Vec<CameraRecord>, lookout_api::Error> {
        self.cameras.lock().unwrap().clone().ok_or_else(server_error)
    }

    async fn fetch_frame(&self, camera: &CameraId) -> Result<Bytes, lookout_api::Error> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let hang = self.hanging_frames.lock().unwrap().contains(camera);
        if hang {
            std::future::pending::<()>().await;
        }
        {
            let mut failures = self.frame_failures.lock().unwrap();
            if let Some(remaining) = failures.get_mut(camera) {
                if *remaining > 0 {
                    if *remaining != u32::MAX {
                        *remaining -= 1;
                    }
                    return Err(lookout_api::Error::Status {
                        status: 404,
                        body: "no frame".into(),
                    });
                }
            }
        }
        Ok(Bytes::from(format!("frame:{camera}")))
    }

    async fn start_stream(&self, camera: &CameraId, model: DetectionModel) -> Result<(), lookout_api::Error> {
        self.calls.lock().unwrap().push((Call::Start, camera.clone(), Some(model)));
        self.respond_after_delay(Call::Start, camera).await;
        if self.fail_start.lock().unwrap().contains(camera) {
            return Err(server_error());
        }
        Ok(())
    }

    async fn stop_stream(&self, camera: &CameraId) -> Result<(), lookout_api::Error> {
        self.calls.lock().unwrap().push((Call::Stop, camera.clone(), None));
        self.respond_after_delay(Call::Stop, camera).await;
        if self.fail_stop.lock().unwrap().contains(camera) {
            return Err(server_error());
        }
        Ok(())
    }

    async fn realtime_stats(&self) -> Result<RealtimeStats, lookout_api::Error> {
        Ok(RealtimeStats {
            total_detections: 42,
            active_cameras: u32::try_from(self.calls(Call::Start).len()).unwrap_or(u32::MAX),
            ..RealtimeStats::default()
        })
    }
}
