//! Live stream orchestration for camera object-detection services.
//!
//! This crate sits between `lookout-api` and the operator-facing surfaces
//! (the `lookout` CLI, or any embedding UI):
//!
//! - **[`LiveSession`]**: Facade owning one live view: loads the camera
//!   directory, runs the poller supervisor, and exposes the operator
//!   intents (`start_all`, `stop_one`, `select_model`, ...). Teardown via
//!   [`shutdown()`](LiveSession::shutdown) cancels every loop without
//!   awaiting in-flight requests.
//!
//! - **[`StreamStore`]**: Per-camera runtime state in a `DashMap`, fanned
//!   out through `tokio::sync::watch` snapshots. Enforces the coupling
//!   between `is_streaming` and the held frame.
//!
//! - **[`StreamController`]**: Concurrent start/stop fan-out with
//!   per-camera failure isolation.
//!
//! - **[`FramePoller`]**: One cancellable polling task per streaming
//!   camera, rotating reference-counted frames.
//!
//! - **[`DetectionService`]**: The RPC boundary, implemented for
//!   [`lookout_api::DetectionClient`].

pub mod config;
pub mod controller;
pub mod convert;
pub mod directory;
pub mod error;
pub mod model;
pub mod poller;
pub mod service;
pub mod session;
pub mod store;
pub mod stream;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod test_support;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::SessionConfig;
pub use controller::{BatchReport, StartOutcome, StopOutcome, StreamController};
pub use directory::{CameraDirectory, DirectoryReport};
pub use error::{CoreError, InvariantViolation};
pub use poller::{FramePoller, PollSettings, PollerState};
pub use service::DetectionService;
pub use session::{LiveSession, build_client};
pub use store::{StreamStore, StreamingSet};
pub use stream::{CameraSnapshot, CameraStream};

pub use model::{
    Camera, CameraFault, CameraId, DetectionModel, FrameHandle, FrameLedger, StreamAction,
    StreamKind,
};

// Wire types surfaced through the public API.
pub use lookout_api::{
    DetectionClient, DetectionRatePoint, RealtimeStats, RecentDetection, TlsMode,
};
