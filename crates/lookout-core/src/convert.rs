// ── Wire-to-domain conversions ──
//
// Bridges `lookout_api` wire types and the canonical domain model.

use lookout_api::{CameraRecord, ModelType};

use crate::model::{Camera, CameraId, DetectionModel, StreamKind};

impl From<CameraRecord> for Camera {
    fn from(record: CameraRecord) -> Self {
        let stream_kind = StreamKind::parse(record.stream_type_or_default());
        let mut camera = Camera::new(
            CameraId::from(record.id.to_string()),
            record.source_name.unwrap_or_default(),
            stream_kind,
        );
        camera.location = record.location.filter(|l| !l.trim().is_empty());
        camera
    }
}

impl From<DetectionModel> for ModelType {
    fn from(model: DetectionModel) -> Self {
        match model {
            DetectionModel::ObjectDetection => Self::ObjectDetection,
            DetectionModel::Segmentation => Self::Segmentation,
            DetectionModel::Pose => Self::Pose,
        }
    }
}

impl From<ModelType> for DetectionModel {
    fn from(model: ModelType) -> Self {
        match model {
            ModelType::ObjectDetection => Self::ObjectDetection,
            ModelType::Segmentation => Self::Segmentation,
            ModelType::Pose => Self::Pose,
        }
    }
}
