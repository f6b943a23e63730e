// Detection service HTTP client
//
// Wraps `reqwest::Client` with URL construction and status handling for
// the five endpoints the live view consumes. No retries happen here:
// every failure comes back as an `Error` value and the caller decides
// what a failed request means for its own state.

use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;
use crate::types::{CameraRecord, ModelType, RealtimeStats, StartStreamRequest};

/// Longest body excerpt carried inside an error.
const BODY_PREVIEW_LEN: usize = 200;

/// Raw HTTP client for the detection service.
///
/// Cheap to clone: the inner `reqwest::Client` is reference counted, so
/// every per-camera poll task can own a handle.
#[derive(Debug, Clone)]
pub struct DetectionClient {
    http: reqwest::Client,
    base_url: Url,
}

impl DetectionClient {
    /// Create a new client from a `TransportConfig`.
    ///
    /// `base_url` is the service root, e.g. `http://localhost:8000`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self { http, base_url })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// The service base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// List every camera the service knows about.
    ///
    /// `GET /api/cameras`
    pub async fn list_cameras(&self) -> Result<Vec<CameraRecord>, Error> {
        let url = self.endpoint(&["api", "cameras"])?;
        self.get_json(url).await
    }

    /// Aggregate detection counters for the last hour.
    ///
    /// `GET /api/detection-stats/real-time`
    pub async fn realtime_stats(&self) -> Result<RealtimeStats, Error> {
        let url = self.endpoint(&["api", "detection-stats", "real-time"])?;
        self.get_json(url).await
    }

    /// Fetch the most recently rendered frame for a camera.
    ///
    /// `GET /process_frame/{camera_id}` -- any non-200 answer is a failure,
    /// including the 404 the service sends before the first frame exists.
    pub async fn fetch_frame(&self, camera_id: &str) -> Result<Bytes, Error> {
        let url = self.endpoint(&["process_frame", camera_id])?;
        trace!("GET {}", url);

        let resp = self.http.get(url).send().await.map_err(Error::Transport)?;
        let resp = check_status(resp).await?;
        let bytes = resp.bytes().await.map_err(Error::Transport)?;
        if bytes.is_empty() {
            return Err(Error::EmptyFrame);
        }
        Ok(bytes)
    }

    /// Ask the service to start a detection pipeline for a camera.
    ///
    /// `POST /start_camera_stream/{camera_id}` with `{"model_type": ...}`
    pub async fn start_stream(
        &self,
        camera_id: &str,
        model: ModelType,
    ) -> Result<serde_json::Value, Error> {
        let url = self.endpoint(&["start_camera_stream", camera_id])?;
        debug!(camera = camera_id, model = model.as_str(), "starting stream");
        self.post_json(url, Some(&StartStreamRequest { model_type: model }))
            .await
    }

    /// Ask the service to stop a camera's detection pipeline.
    ///
    /// `POST /stop_camera_stream/{camera_id}`
    pub async fn stop_stream(&self, camera_id: &str) -> Result<serde_json::Value, Error> {
        let url = self.endpoint(&["stop_camera_stream", camera_id])?;
        debug!(camera = camera_id, "stopping stream");
        self.post_json::<()>(url, None).await
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Append path segments to the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    // ── Request helpers ──────────────────────────────────────────────

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {}", url);

        let resp = self.http.get(url).send().await.map_err(Error::Transport)?;
        let resp = check_status(resp).await?;
        let body = resp.text().await.map_err(Error::Transport)?;

        serde_json::from_str(&body).map_err(|e| {
            let preview = preview(&body);
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body,
            }
        })
    }

    /// POST and return the acknowledgement body. Start/stop answers are
    /// informational, so a body that isn't JSON is reported as `Null`
    /// rather than failing a request the service already accepted.
    async fn post_json<B: Serialize + Sync>(
        &self,
        url: Url,
        body: Option<&B>,
    ) -> Result<serde_json::Value, Error> {
        debug!("POST {}", url);

        let mut builder = self.http.post(url);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let resp = builder.send().await.map_err(Error::Transport)?;
        let resp = check_status(resp).await?;
        let text = resp.text().await.map_err(Error::Transport)?;
        Ok(serde_json::from_str(&text).unwrap_or(serde_json::Value::Null))
    }
}

/// Turn any non-success status into `Error::Status`, keeping a short body excerpt.
async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, Error> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(Error::Status {
        status: status.as_u16(),
        body: preview(&body).to_owned(),
    })
}

fn preview(body: &str) -> &str {
    if body.len() <= BODY_PREVIEW_LEN {
        return body;
    }
    let mut end = BODY_PREVIEW_LEN;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}
