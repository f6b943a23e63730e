// lookout-api: Async Rust client for the camera object-detection service

pub mod client;
pub mod error;
pub mod transport;
pub mod types;

pub use client::DetectionClient;
pub use error::Error;
pub use transport::{TlsMode, TransportConfig};
pub use types::{
    CameraRef, CameraRecord, DetectionRatePoint, ModelType, RealtimeStats, RecentDetection,
    StartStreamRequest,
};
