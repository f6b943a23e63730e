// ── Core error types ──
//
// Domain errors for the orchestration engine. Consumers never see raw
// HTTP status codes here: the `From<lookout_api::Error>` impl translates
// transport failures, and the controller/poller attach camera context.

use thiserror::Error;

use crate::model::{CameraId, StreamAction};

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Directory ────────────────────────────────────────────────────
    /// The camera listing failed. The store is left as it was.
    #[error("Camera directory unavailable: {reason}")]
    Directory { reason: String },

    #[error("Camera not found: {identifier}")]
    CameraNotFound { identifier: String },

    // ── Per-camera operations ────────────────────────────────────────
    /// A start or stop request failed for one camera.
    #[error("Failed to {action} stream for camera {camera}: {reason}")]
    Command {
        camera: CameraId,
        action: StreamAction,
        reason: String,
        /// Whether retrying the same request may succeed.
        transient: bool,
    },

    /// One poll tick failed. Retried on the next tick.
    #[error("Frame fetch failed for camera {camera}: {reason}")]
    FrameFetch { camera: CameraId, reason: String },

    /// The session was torn down while the request was in flight. The
    /// response, if any, was dropped without touching the store.
    #[error("Live session is shut down")]
    SessionClosed,

    // ── Service ──────────────────────────────────────────────────────
    #[error("Cannot reach detection service at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Detection service request timed out")]
    Timeout,

    #[error("Detection service error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal ─────────────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Wrap a service failure as a per-camera command error.
    pub fn command(camera: &CameraId, action: StreamAction, err: &lookout_api::Error) -> Self {
        Self::Command {
            camera: camera.clone(),
            action,
            reason: err.to_string(),
            transient: err.is_transient(),
        }
    }

    /// The camera this error is scoped to, if any.
    pub fn camera(&self) -> Option<&CameraId> {
        match self {
            Self::Command { camera, .. } | Self::FrameFetch { camera, .. } => Some(camera),
            _ => None,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<lookout_api::Error> for CoreError {
    fn from(err: lookout_api::Error) -> Self {
        match err {
            lookout_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            lookout_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            lookout_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            lookout_api::Error::Status { status, body } => CoreError::Api {
                message: if body.is_empty() {
                    format!("HTTP {status}")
                } else {
                    format!("HTTP {status}: {body}")
                },
                status: Some(status),
            },
            lookout_api::Error::EmptyFrame => CoreError::Api {
                message: "empty frame".into(),
                status: None,
            },
            lookout_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}

/// A broken store invariant. These indicate a bug in the engine, not a
/// runtime condition to recover from.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    /// A camera that is not streaming still holds a frame.
    #[error("camera {camera} is idle but still holds frame #{frame_seq}")]
    IdleCameraHoldsFrame { camera: CameraId, frame_seq: u64 },

    /// A camera that is not streaming still reports a running model.
    #[error("camera {camera} is idle but reports an active model")]
    IdleCameraHasModel { camera: CameraId },
}
