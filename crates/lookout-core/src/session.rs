// ── Live session facade ──
//
// Owns everything one live view needs: the store, the service handle,
// the controller and the poller, plus the root cancellation token that
// tears them all down. Cheaply cloneable via `Arc<SessionInner>`.

use std::sync::Arc;

use lookout_api::{DetectionClient, RealtimeStats, TransportConfig};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::SessionConfig;
use crate::controller::{BatchReport, StartOutcome, StopOutcome, StreamController};
use crate::directory::{CameraDirectory, DirectoryReport};
use crate::error::CoreError;
use crate::model::{Camera, CameraId, DetectionModel, FrameLedger};
use crate::poller::{FramePoller, PollSettings, PollerState};
use crate::service::DetectionService;
use crate::store::StreamStore;
use crate::stream::{CameraSnapshot, CameraStream};

struct SessionInner<S: DetectionService> {
    config: SessionConfig,
    service: Arc<S>,
    store: Arc<StreamStore>,
    controller: StreamController<S>,
    poller: FramePoller<S>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
    warnings: Mutex<Vec<String>>,
}

/// A running live view over one detection service.
pub struct LiveSession<S: DetectionService = DetectionClient> {
    inner: Arc<SessionInner<S>>,
}

impl<S: DetectionService> Clone for LiveSession<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl LiveSession<DetectionClient> {
    /// Build a session talking HTTP to `config.base_url`.
    pub fn connect(config: SessionConfig) -> Result<Self, CoreError> {
        let client = build_client(&config)?;
        Ok(Self::new(config, client))
    }
}

/// Build the HTTP client described by `config`.
///
/// One-shot callers (a single start or stop from a script) use this with
/// [`StreamController`] directly and skip the poller entirely.
pub fn build_client(config: &SessionConfig) -> Result<DetectionClient, CoreError> {
    let transport = TransportConfig {
        tls: config.tls.clone(),
        ..TransportConfig::default()
    }
    .with_timeout(config.timeout);
    Ok(DetectionClient::new(config.base_url.clone(), &transport)?)
}

impl<S: DetectionService> LiveSession<S> {
    pub fn new(config: SessionConfig, service: S) -> Self {
        let service = Arc::new(service);
        let store = Arc::new(StreamStore::new(config.default_model));
        let cancel = CancellationToken::new();
        let controller =
            StreamController::new(Arc::clone(&service), Arc::clone(&store)).with_cancel(cancel.child_token());
        let poller = FramePoller::new(
            Arc::clone(&service),
            Arc::clone(&store),
            PollSettings {
                interval: config.poll_interval,
                failure_log_every: config.failure_log_every,
            },
            cancel.child_token(),
        );

        Self {
            inner: Arc::new(SessionInner {
                config,
                service,
                store,
                controller,
                poller,
                cancel,
                task_handles: Mutex::new(Vec::new()),
                warnings: Mutex::new(Vec::new()),
            }),
        }
    }

    // ── Lifecycle ───────────────────────────────────────────────────

    /// Load the camera directory and start the poller supervisor.
    ///
    /// A directory failure does not fail the session: the store stays
    /// empty, a warning is recorded, and `None` is returned.
    pub async fn start(&self) -> Option<DirectoryReport> {
        let report = match self.load_directory().await {
            Ok(report) => Some(report),
            Err(e) => {
                warn!(error = %e, "starting with no cameras");
                self.inner.warnings.lock().await.push(e.to_string());
                None
            }
        };

        let mut handles = self.inner.task_handles.lock().await;
        if handles.is_empty() && !self.inner.cancel.is_cancelled() {
            handles.push(self.inner.poller.spawn_supervisor());
        }
        drop(handles);
        self.inner.poller.reconcile();

        info!(
            url = %self.inner.config.base_url,
            cameras = self.inner.store.len(),
            "live session started"
        );
        report
    }

    /// Re-read the camera directory. Known cameras keep their state.
    pub async fn refresh(&self) -> Result<DirectoryReport, CoreError> {
        let report = self.load_directory().await?;
        self.inner.poller.reconcile();
        Ok(report)
    }

    /// Cancel every background task and poll loop and release all frames.
    /// In-flight requests are abandoned, not awaited.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        self.inner.poller.shutdown();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            handle.abort();
        }
        info!("live session shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    // ── Operator intents ────────────────────────────────────────────

    pub async fn start_all(&self) -> BatchReport {
        let report = self.inner.controller.start_all().await;
        self.inner.poller.reconcile();
        report
    }

    pub async fn stop_all(&self) -> BatchReport {
        let report = self.inner.controller.stop_all().await;
        self.inner.poller.reconcile();
        report
    }

    pub async fn start_one(&self, id: &CameraId) -> Result<StartOutcome, CoreError> {
        let outcome = self.inner.controller.start_one(id).await;
        self.inner.poller.reconcile();
        outcome
    }

    pub async fn stop_one(&self, id: &CameraId) -> Result<StopOutcome, CoreError> {
        let outcome = self.inner.controller.stop_one(id).await;
        self.inner.poller.reconcile();
        outcome
    }

    pub fn select_model(&self, model: DetectionModel) {
        self.inner.controller.select_model(model);
    }

    pub async fn detection_stats(&self) -> Result<RealtimeStats, CoreError> {
        self.inner.controller.detection_stats().await
    }

    // ── Reads ───────────────────────────────────────────────────────

    pub fn cameras(&self) -> CameraSnapshot {
        self.inner.store.snapshot()
    }

    pub fn camera(&self, id: &CameraId) -> Option<Arc<Camera>> {
        self.inner.store.camera(id)
    }

    pub fn subscribe(&self) -> CameraStream {
        self.inner.store.subscribe()
    }

    pub fn is_any_streaming(&self) -> bool {
        self.inner.store.is_any_streaming()
    }

    pub fn selected_model(&self) -> DetectionModel {
        self.inner.store.selected_model()
    }

    pub fn poller_state(&self, id: &CameraId) -> PollerState {
        self.inner.poller.state(id)
    }

    pub fn frame_ledger(&self) -> &FrameLedger {
        self.inner.store.frame_ledger()
    }

    pub fn store(&self) -> &Arc<StreamStore> {
        &self.inner.store
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Non-fatal problems met so far (e.g., directory unavailable).
    pub async fn warnings(&self) -> Vec<String> {
        self.inner.warnings.lock().await.clone()
    }

    // ── Private helpers ─────────────────────────────────────────────

    async fn load_directory(&self) -> Result<DirectoryReport, CoreError> {
        CameraDirectory::load(
            self.inner.service.as_ref(),
            &self.inner.store,
            self.inner.config.probe_on_start,
        )
        .await
    }
}
