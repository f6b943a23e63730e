// ── Stream controller ──
//
// Turns operator intents into service calls and store updates. Every
// camera is handled independently: a failed call for one camera is
// recorded against that camera and never touches the others. Same-camera
// calls are not serialized here, so when two responses for one camera
// race, whichever settles last decides its state. Once the cancellation
// token fires, in-flight requests are abandoned and their responses are
// never applied.

use std::sync::Arc;

use futures_util::future::join_all;
use lookout_api::RealtimeStats;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::model::{Camera, CameraFault, CameraId, DetectionModel, StreamAction};
use crate::service::DetectionService;
use crate::store::StreamStore;

/// Result of a single-camera start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    /// The camera was already streaming; no request was sent.
    AlreadyStreaming,
}

/// Result of a single-camera stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped,
    /// The camera was already idle; no request was sent.
    AlreadyIdle,
}

/// Per-camera results of a `start_all` / `stop_all` fan-out.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub succeeded: Vec<CameraId>,
    pub failed: Vec<(CameraId, CoreError)>,
    /// Cameras that were already in the target state.
    pub skipped: usize,
}

impl BatchReport {
    /// `true` if no camera failed.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Number of cameras a request was sent for.
    pub fn attempted(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

/// Start/stop orchestration and model selection.
pub struct StreamController<S: DetectionService> {
    service: Arc<S>,
    store: Arc<StreamStore>,
    cancel: CancellationToken,
}

impl<S: DetectionService> Clone for StreamController<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            store: Arc::clone(&self.store),
            cancel: self.cancel.clone(),
        }
    }
}

impl<S: DetectionService> StreamController<S> {
    pub fn new(service: Arc<S>, store: Arc<StreamStore>) -> Self {
        Self {
            service,
            store,
            cancel: CancellationToken::new(),
        }
    }

    /// Tie this controller to a session's lifetime. After `cancel` fires,
    /// pending calls return [`CoreError::SessionClosed`] and leave the
    /// store untouched.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn store(&self) -> &Arc<StreamStore> {
        &self.store
    }

    // ── Aggregate operations ────────────────────────────────────────

    /// Start every idle camera with the currently selected model.
    ///
    /// Calls run concurrently; the report lists each camera's outcome.
    /// With no idle camera this is a no-op.
    pub async fn start_all(&self) -> BatchReport {
        let model = self.store.selected_model();
        let snapshot = self.store.snapshot();
        let targets: Vec<CameraId> = snapshot
            .iter()
            .filter(|c| !c.is_streaming)
            .map(|c| c.id.clone())
            .collect();
        let skipped = snapshot.len() - targets.len();
        debug!(count = targets.len(), model = %model, "starting all idle cameras");

        let futs = targets.iter().map(|id| self.start_camera(id, model));
        let results = join_all(futs).await;
        collect_report(targets, results, skipped)
    }

    /// Stop every streaming camera.
    ///
    /// A camera whose stop fails keeps streaming; the others are stopped
    /// and their frames released.
    pub async fn stop_all(&self) -> BatchReport {
        let snapshot = self.store.snapshot();
        let targets: Vec<CameraId> = snapshot
            .iter()
            .filter(|c| c.is_streaming)
            .map(|c| c.id.clone())
            .collect();
        let skipped = snapshot.len() - targets.len();
        debug!(count = targets.len(), "stopping all streaming cameras");

        let futs = targets.iter().map(|id| self.stop_camera(id));
        let results = join_all(futs).await;
        collect_report(targets, results, skipped)
    }

    // ── Single-camera operations ────────────────────────────────────

    pub async fn start_one(&self, id: &CameraId) -> Result<StartOutcome, CoreError> {
        let camera = self.lookup(id)?;
        if camera.is_streaming {
            debug!(camera = %id, "already streaming");
            return Ok(StartOutcome::AlreadyStreaming);
        }
        let model = self.store.selected_model();
        self.start_camera(id, model).await?;
        Ok(StartOutcome::Started)
    }

    pub async fn stop_one(&self, id: &CameraId) -> Result<StopOutcome, CoreError> {
        let camera = self.lookup(id)?;
        if !camera.is_streaming {
            debug!(camera = %id, "already idle");
            return Ok(StopOutcome::AlreadyIdle);
        }
        self.stop_camera(id).await?;
        Ok(StopOutcome::Stopped)
    }

    /// Select the model for streams started from now on. Running streams
    /// keep the model they were started with.
    pub fn select_model(&self, model: DetectionModel) {
        let previous = self.store.selected_model();
        self.store.select_model(model);
        if previous != model {
            info!(from = %previous, to = %model, "detection model selected");
        }
    }

    /// Aggregate detection counters from the service.
    pub async fn detection_stats(&self) -> Result<RealtimeStats, CoreError> {
        Ok(self.service.realtime_stats().await?)
    }

    // ── Private helpers ─────────────────────────────────────────────

    fn lookup(&self, id: &CameraId) -> Result<Arc<Camera>, CoreError> {
        self.store.camera(id).ok_or_else(|| CoreError::CameraNotFound {
            identifier: id.to_string(),
        })
    }

    async fn start_camera(&self, id: &CameraId, model: DetectionModel) -> Result<(), CoreError> {
        let response = tokio::select! {
            biased;
            () = self.cancel.cancelled() => {
                debug!(camera = %id, "session closed, start abandoned");
                return Err(CoreError::SessionClosed);
            }
            response = self.service.start_stream(id, model) => response,
        };
        match response {
            Ok(()) => {
                self.store.set_streaming(id, true, Some(model))?;
                self.store.clear_fault(id);
                info!(camera = %id, model = %model, "stream started");
                Ok(())
            }
            Err(e) => {
                warn!(camera = %id, error = %e, "failed to start stream");
                self.store
                    .record_fault(id, CameraFault::new(StreamAction::Start, e.to_string()));
                Err(CoreError::command(id, StreamAction::Start, &e))
            }
        }
    }

    async fn stop_camera(&self, id: &CameraId) -> Result<(), CoreError> {
        let response = tokio::select! {
            biased;
            () = self.cancel.cancelled() => {
                debug!(camera = %id, "session closed, stop abandoned");
                return Err(CoreError::SessionClosed);
            }
            response = self.service.stop_stream(id) => response,
        };
        match response {
            Ok(()) => {
                self.store.set_streaming(id, false, None)?;
                self.store.clear_fault(id);
                info!(camera = %id, "stream stopped");
                Ok(())
            }
            Err(e) => {
                warn!(camera = %id, error = %e, "failed to stop stream");
                self.store
                    .record_fault(id, CameraFault::new(StreamAction::Stop, e.to_string()));
                Err(CoreError::command(id, StreamAction::Stop, &e))
            }
        }
    }
}

fn collect_report(
    targets: Vec<CameraId>,
    results: Vec<Result<(), CoreError>>,
    skipped: usize,
) -> BatchReport {
    let mut report = BatchReport {
        skipped,
        ..BatchReport::default()
    };
    for (id, result) in targets.into_iter().zip(results) {
        match result {
            Ok(()) => report.succeeded.push(id),
            Err(e) => report.failed.push((id, e)),
        }
    }
    report
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::directory::CameraDirectory;
    use crate::test_support::{Call, FakeService};

    async fn setup(ids: &[u64]) -> (Arc<FakeService>, StreamController<FakeService>) {
        let service = Arc::new(FakeService::with_cameras(ids));
        let store = Arc::new(StreamStore::default());
        CameraDirectory::load(service.as_ref(), &store, false).await.unwrap();
        let controller = StreamController::new(Arc::clone(&service), store);
        (service, controller)
    }

    fn streaming(controller: &StreamController<FakeService>, id: u64) -> bool {
        controller.store().camera(&CameraId::from(id)).unwrap().is_streaming
    }

    #[tokio::test]
    async fn start_all_starts_every_idle_camera() {
        let (_, controller) = setup(&[1, 2]).await;

        let report = controller.start_all().await;

        assert!(report.is_complete());
        assert_eq!(report.succeeded, vec![CameraId::from(1), CameraId::from(2)]);
        assert!(streaming(&controller, 1));
        assert!(streaming(&controller, 2));
        assert!(controller.store().is_any_streaming());
    }

    #[tokio::test]
    async fn start_all_isolates_a_failing_camera() {
        let (service, controller) = setup(&[1, 2, 3]).await;
        service.fail_start(2);

        let report = controller.start_all().await;

        assert!(streaming(&controller, 1));
        assert!(!streaming(&controller, 2));
        assert!(streaming(&controller, 3));
        assert_eq!(report.succeeded.len(), 2);
        assert_eq!(report.failed.len(), 1);
        let (failed_id, err) = &report.failed[0];
        assert_eq!(failed_id, &CameraId::from(2));
        assert!(matches!(err, CoreError::Command { action: StreamAction::Start, .. }));

        let fault = controller.store().camera(&CameraId::from(2)).unwrap().last_error.clone();
        assert_eq!(fault.map(|f| f.action), Some(StreamAction::Start));
    }

    #[tokio::test]
    async fn start_all_with_nothing_idle_is_a_noop() {
        let (service, controller) = setup(&[1]).await;
        controller.start_all().await;

        let report = controller.start_all().await;

        assert_eq!(report.attempted(), 0);
        assert_eq!(report.skipped, 1);
        assert_eq!(service.calls(Call::Start).len(), 1);
    }

    #[tokio::test]
    async fn stop_all_keeps_failed_cameras_streaming() {
        let (service, controller) = setup(&[1, 2]).await;
        controller.start_all().await;
        service.fail_stop(1);

        let report = controller.stop_all().await;

        assert_eq!(report.succeeded, vec![CameraId::from(2)]);
        assert!(streaming(&controller, 1));
        assert!(!streaming(&controller, 2));
        controller.store().check_invariants().unwrap();
    }

    #[tokio::test]
    async fn stop_one_on_idle_camera_sends_nothing() {
        let (service, controller) = setup(&[1]).await;

        let outcome = controller.stop_one(&CameraId::from(1)).await.unwrap();

        assert_eq!(outcome, StopOutcome::AlreadyIdle);
        assert!(service.calls(Call::Stop).is_empty());
        assert!(!streaming(&controller, 1));
    }

    #[tokio::test]
    async fn start_one_on_streaming_camera_sends_nothing() {
        let (service, controller) = setup(&[1]).await;
        controller.start_one(&CameraId::from(1)).await.unwrap();

        let outcome = controller.start_one(&CameraId::from(1)).await.unwrap();

        assert_eq!(outcome, StartOutcome::AlreadyStreaming);
        assert_eq!(service.calls(Call::Start).len(), 1);
    }

    #[tokio::test]
    async fn unknown_camera_is_reported() {
        let (_, controller) = setup(&[1]).await;
        let err = controller.start_one(&CameraId::from(99)).await.unwrap_err();
        assert!(matches!(err, CoreError::CameraNotFound { .. }));
    }

    #[tokio::test]
    async fn model_change_does_not_touch_running_streams() {
        let (service, controller) = setup(&[1, 2]).await;
        controller.start_one(&CameraId::from(1)).await.unwrap();

        controller.select_model(DetectionModel::Pose);

        let running = controller.store().camera(&CameraId::from(1)).unwrap();
        assert!(running.is_streaming);
        assert_eq!(running.active_model, Some(DetectionModel::ObjectDetection));
        assert_eq!(service.calls(Call::Stop).len(), 0);

        controller.start_one(&CameraId::from(2)).await.unwrap();
        assert_eq!(
            service.models_started(),
            vec![DetectionModel::ObjectDetection, DetectionModel::Pose]
        );
    }

    #[tokio::test]
    async fn successful_retry_clears_the_fault() {
        let (service, controller) = setup(&[1]).await;
        service.fail_stop(1);
        controller.start_one(&CameraId::from(1)).await.unwrap();
        controller.stop_one(&CameraId::from(1)).await.unwrap_err();
        assert!(controller.store().camera(&CameraId::from(1)).unwrap().last_error.is_some());

        let healthy = Arc::new(FakeService::with_cameras(&[1]));
        let retried = StreamController::new(healthy, Arc::clone(controller.store()));
        retried.stop_one(&CameraId::from(1)).await.unwrap();

        let camera = controller.store().camera(&CameraId::from(1)).unwrap();
        assert!(camera.last_error.is_none());
        assert!(!camera.is_streaming);
    }

    /// Races `start_all` against an operator restarting then stopping
    /// camera 1 while the aggregate's own start for camera 1 is in flight.
    /// Returns camera 1's final state.
    async fn race_start_all_with_stop_one(stop_latency: Duration) -> Arc<Camera> {
        let (service, controller) = setup(&[1, 2]).await;
        service.delay(
            Call::Start,
            1,
            &[Duration::from_millis(100), Duration::from_millis(5)],
        );
        service.delay(Call::Stop, 1, &[stop_latency]);

        let (report, stopped) = tokio::join!(controller.start_all(), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            controller.start_one(&CameraId::from(1)).await.unwrap();
            controller.stop_one(&CameraId::from(1)).await
        });

        assert!(report.is_complete());
        assert_eq!(stopped.unwrap(), StopOutcome::Stopped);
        assert_eq!(service.calls(Call::Start).len(), 3);
        assert!(streaming(&controller, 2));
        controller.store().check_invariants().unwrap();
        controller.store().camera(&CameraId::from(1)).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn stop_settling_after_start_all_leaves_camera_idle() {
        let camera = race_start_all_with_stop_one(Duration::from_millis(200)).await;

        assert!(!camera.is_streaming);
        assert!(camera.active_model.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn start_all_settling_after_stop_leaves_camera_streaming() {
        let camera = race_start_all_with_stop_one(Duration::from_millis(30)).await;

        assert!(camera.is_streaming);
        assert_eq!(camera.active_model, Some(DetectionModel::ObjectDetection));
        // started, stopped, then started again by the late response
        assert_eq!(camera.stream_epoch, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_start_all_does_not_block_other_cameras() {
        let (service, controller) = setup(&[1, 2]).await;
        controller.start_one(&CameraId::from(2)).await.unwrap();
        service.delay(Call::Start, 1, &[Duration::from_secs(10)]);

        let began = tokio::time::Instant::now();
        let batch = tokio::spawn({
            let controller = controller.clone();
            async move { controller.start_all().await }
        });
        tokio::task::yield_now().await;

        let outcome = controller.stop_one(&CameraId::from(2)).await.unwrap();

        assert_eq!(outcome, StopOutcome::Stopped);
        assert!(!streaming(&controller, 2));
        assert!(!streaming(&controller, 1));
        assert!(!batch.is_finished());
        assert!(began.elapsed() < Duration::from_secs(10));

        let report = batch.await.unwrap();
        assert_eq!(report.succeeded, vec![CameraId::from(1)]);
        assert!(streaming(&controller, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_controller_drops_late_responses() {
        let (service, controller) = setup(&[1]).await;
        let cancel = CancellationToken::new();
        let controller = controller.with_cancel(cancel.clone());
        service.delay(Call::Start, 1, &[Duration::from_millis(300)]);

        let id = CameraId::from(1);
        let (started, ()) = tokio::join!(controller.start_one(&id), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            cancel.cancel();
        });

        assert!(matches!(started, Err(CoreError::SessionClosed)));
        let camera = controller.store().camera(&CameraId::from(1)).unwrap();
        assert!(!camera.is_streaming);
        assert!(camera.last_error.is_none());
    }

    #[tokio::test]
    async fn stats_pass_through() {
        let (_, controller) = setup(&[1]).await;
        let stats = controller.detection_stats().await.unwrap();
        assert_eq!(stats.total_detections, 42);
    }
}
