// ── Detection service boundary ──
//
// The five RPCs the engine depends on, as a trait so sessions can run
// against the HTTP client or an in-process double.

use std::future::Future;

use bytes::Bytes;
use lookout_api::{CameraRecord, DetectionClient, RealtimeStats};

use crate::model::{CameraId, DetectionModel};

/// Remote detection service as seen by the orchestration engine.
///
/// Implementations never retry: every failure is returned as a value and
/// the caller decides what it means for its own state.
pub trait DetectionService: Send + Sync + 'static {
    fn list_cameras(&self) -> impl Future<Output = Result<Vec<CameraRecord>, lookout_api::Error>> + Send;

    fn fetch_frame(&self, camera: &CameraId) -> impl Future<Output = Result<Bytes, lookout_api::Error>> + Send;

    fn start_stream(
        &self,
        camera: &CameraId,
        model: DetectionModel,
    ) -> impl Future<Output = Result<(), lookout_api::Error>> + Send;

    fn stop_stream(&self, camera: &CameraId) -> impl Future<Output = Result<(), lookout_api::Error>> + Send;

    fn realtime_stats(&self) -> impl Future<Output = Result<RealtimeStats, lookout_api::Error>> + Send;
}

impl DetectionService for DetectionClient {
    async fn list_cameras(&self) -> Result<Vec<CameraRecord>, lookout_api::Error> {
        DetectionClient::list_cameras(self).await
    }

    async fn fetch_frame(&self, camera: &CameraId) -> Result<Bytes, lookout_api::Error> {
        DetectionClient::fetch_frame(self, camera.as_str()).await
    }

    async fn start_stream(&self, camera: &CameraId, model: DetectionModel) -> Result<(), lookout_api::Error> {
        DetectionClient::start_stream(self, camera.as_str(), model.into())
            .await
            .map(drop)
    }

    async fn stop_stream(&self, camera: &CameraId) -> Result<(), lookout_api::Error> {
        DetectionClient::stop_stream(self, camera.as_str()).await.map(drop)
    }

    async fn realtime_stats(&self) -> Result<RealtimeStats, lookout_api::Error> {
        DetectionClient::realtime_stats(self).await
    }
}
