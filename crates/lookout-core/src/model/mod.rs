// ── Domain model ──
//
// Canonical types shared by the store, the controller and the poller.
// Wire shapes live in `lookout_api::types`; `convert` bridges the two.

pub mod camera;
pub mod detection;
pub mod frame;

pub use camera::{Camera, CameraFault, CameraId, StreamAction, StreamKind};
pub use detection::DetectionModel;
pub use frame::{FrameHandle, FrameLedger};
