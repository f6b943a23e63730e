// ── Runtime session configuration ──
//
// Describes *where* the detection service lives and how aggressively to
// poll it. Never touches disk: the CLI (via `lookout-config`) builds a
// `SessionConfig` and hands it in.

use std::time::Duration;

use lookout_api::TlsMode;
use url::Url;

use crate::model::DetectionModel;

/// Default service root used by the reference deployment.
pub const DEFAULT_SERVICE_URL: &str = "http://localhost:8000";

/// Default frame cadence per camera.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Configuration for one live session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Detection service root (e.g., `http://localhost:8000`).
    pub base_url: Url,
    /// Certificate verification for `https` deployments.
    pub tls: TlsMode,
    /// Per-request timeout applied by the transport.
    pub timeout: Duration,
    /// Frame fetch cadence, independent per camera.
    pub poll_interval: Duration,
    /// Probe every camera with a frame fetch at start to learn which
    /// streams are already running.
    pub probe_on_start: bool,
    /// Model selected when the session starts.
    pub default_model: DetectionModel,
    /// Emit a warning every N consecutive frame failures (0 = first only).
    pub failure_log_every: u32,
}

impl SessionConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            ..Self::default()
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_SERVICE_URL).unwrap_or_else(|_| unreachable!()),
            tls: TlsMode::System,
            timeout: Duration::from_secs(10),
            poll_interval: DEFAULT_POLL_INTERVAL,
            probe_on_start: true,
            default_model: DetectionModel::default(),
            failure_log_every: 50,
        }
    }
}
