// Detection service wire types
//
// Models for the JSON the detection service speaks. Fields use
// `#[serde(default)]` liberally: the service omits keys freely and older
// deployments return a smaller payload for the same endpoint.

use std::fmt;

use serde::{Deserialize, Serialize};

// ── Cameras ──────────────────────────────────────────────────────────

/// Camera identifier as it appears on the wire.
///
/// The service stores integer primary keys, but nothing in the contract
/// promises that, so string identifiers are accepted too.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CameraRef {
    Number(u64),
    Text(String),
}

impl fmt::Display for CameraRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

/// One entry of `GET /api/cameras`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraRecord {
    pub id: CameraRef,
    #[serde(default)]
    pub source_name: Option<String>,
    /// `"live"` for capture devices, `"video"` for uploaded files. The
    /// service treats a missing value as live.
    #[serde(default)]
    pub stream_type: Option<String>,
    /// Capture source (device index or RTSP URL). Informational only.
    #[serde(default)]
    pub stream: Option<serde_json::Value>,
    #[serde(default)]
    pub location: Option<String>,
}

impl CameraRecord {
    /// The stream kind with the service's default applied.
    pub fn stream_type_or_default(&self) -> &str {
        self.stream_type
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or("live")
    }
}

// ── Streams ──────────────────────────────────────────────────────────

/// Detection pipeline variant as named by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelType {
    #[serde(rename = "objectDetection")]
    ObjectDetection,
    #[serde(rename = "segmentation")]
    Segmentation,
    #[serde(rename = "pose")]
    Pose,
}

impl ModelType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ObjectDetection => "objectDetection",
            Self::Segmentation => "segmentation",
            Self::Pose => "pose",
        }
    }
}

/// Body of `POST /start_camera_stream/{id}`.
#[derive(Debug, Clone, Serialize)]
pub struct StartStreamRequest {
    pub model_type: ModelType,
}

// ── Statistics ───────────────────────────────────────────────────────

/// `GET /api/detection-stats/real-time`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeStats {
    #[serde(default)]
    pub total_detections: u64,
    #[serde(default)]
    pub active_cameras: u32,
    /// Per-minute detection counts for the last hour, newest first.
    #[serde(default)]
    pub detection_rate: Vec<DetectionRatePoint>,
    #[serde(default)]
    pub latest_detections: Vec<RecentDetection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionRatePoint {
    pub time: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentDetection {
    #[serde(default)]
    pub id: Option<CameraRef>,
    #[serde(default)]
    pub model_type: Option<String>,
    #[serde(default)]
    pub class_name: Option<String>,
    #[serde(default)]
    pub camera_name: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn camera_record_accepts_numeric_and_string_ids() {
        let numeric: CameraRecord =
            serde_json::from_value(json!({"id": 3, "source_name": "Dock"})).unwrap();
        let text: CameraRecord = serde_json::from_value(json!({"id": "cam-a"})).unwrap();
        assert_eq!(numeric.id.to_string(), "3");
        assert_eq!(text.id.to_string(), "cam-a");
    }

    #[test]
    fn missing_stream_type_defaults_to_live() {
        let record: CameraRecord =
            serde_json::from_value(json!({"id": 1, "stream_type": null})).unwrap();
        assert_eq!(record.stream_type_or_default(), "live");
    }

    #[test]
    fn model_type_uses_service_names() {
        let body = serde_json::to_value(StartStreamRequest {
            model_type: ModelType::ObjectDetection,
        })
        .unwrap();
        assert_eq!(body, json!({"model_type": "objectDetection"}));
        assert_eq!(ModelType::Pose.as_str(), "pose");
    }

    #[test]
    fn realtime_stats_tolerates_partial_payloads() {
        let stats: RealtimeStats = serde_json::from_value(json!({"activeCameras": 2})).unwrap();
        assert_eq!(stats.active_cameras, 2);
        assert_eq!(stats.total_detections, 0);
        assert!(stats.detection_rate.is_empty());
    }
}
