// ── Camera domain types ──

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

use super::detection::DetectionModel;
use super::frame::FrameHandle;

// ── CameraId ────────────────────────────────────────────────────────

/// Opaque, stable camera identifier assigned by the detection service.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CameraId(String);

impl CameraId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CameraId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl FromStr for CameraId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().to_owned()))
    }
}

impl From<&str> for CameraId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for CameraId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<u64> for CameraId {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

// ── StreamKind ──────────────────────────────────────────────────────

/// Source category of a camera. Only `Live` cameras are orchestrated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Live,
    Other(String),
}

impl StreamKind {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("live") {
            Self::Live
        } else {
            Self::Other(trimmed.to_ascii_lowercase())
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, Self::Live)
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Live => f.write_str("live"),
            Self::Other(kind) => f.write_str(kind),
        }
    }
}

// ── Faults ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StreamAction {
    Start,
    Stop,
}

/// The most recent start/stop failure for one camera, kept so an
/// operator can see which camera needs a retry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraFault {
    pub action: StreamAction,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl CameraFault {
    pub fn new(action: StreamAction, message: impl Into<String>) -> Self {
        Self {
            action,
            message: message.into(),
            at: Utc::now(),
        }
    }
}

// ── Camera ──────────────────────────────────────────────────────────

/// One camera and its client-side stream state.
///
/// Identity fields come from the camera directory. Runtime fields are
/// written only through the stream store: `is_streaming` and
/// `active_model` by the stream controller, `frame` by the frame poller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Camera {
    pub id: CameraId,
    pub source_name: String,
    pub stream_kind: StreamKind,
    #[serde(default)]
    pub location: Option<String>,

    pub is_streaming: bool,
    /// Model the running stream was started with.
    #[serde(default)]
    pub active_model: Option<DetectionModel>,
    #[serde(skip)]
    pub frame: Option<FrameHandle>,
    #[serde(default)]
    pub last_error: Option<CameraFault>,
    #[serde(default)]
    pub consecutive_frame_failures: u32,
    #[serde(default)]
    pub frames_received: u64,
    #[serde(default)]
    pub last_frame_at: Option<DateTime<Utc>>,

    /// Bumped every time the camera enters the streaming state, so late
    /// writes from a superseded poll loop can be told apart.
    #[serde(skip)]
    pub(crate) stream_epoch: u64,
}

impl Camera {
    pub fn new(id: CameraId, source_name: impl Into<String>, stream_kind: StreamKind) -> Self {
        Self {
            id,
            source_name: source_name.into(),
            stream_kind,
            location: None,
            is_streaming: false,
            active_model: None,
            frame: None,
            last_error: None,
            consecutive_frame_failures: 0,
            frames_received: 0,
            last_frame_at: None,
            stream_epoch: 0,
        }
    }

    /// Human-facing label, falling back to the id when the name is blank.
    pub fn display_name(&self) -> String {
        if self.source_name.trim().is_empty() {
            format!("Camera {}", self.id)
        } else {
            self.source_name.clone()
        }
    }

    pub fn stream_epoch(&self) -> u64 {
        self.stream_epoch
    }

    /// Copy directory-owned identity fields from `other`, keeping runtime state.
    pub(crate) fn merge_identity(&mut self, other: &Self) {
        self.source_name.clone_from(&other.source_name);
        self.stream_kind = other.stream_kind.clone();
        self.location.clone_from(&other.location);
    }
}
