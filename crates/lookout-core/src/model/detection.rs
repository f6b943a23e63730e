// ── Detection model selection ──

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Detection pipeline variant applied when a stream starts.
///
/// Parsing is case-insensitive and accepts both the service's camelCase
/// names and kebab-case CLI spellings.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "camelCase")]
#[strum(ascii_case_insensitive)]
pub enum DetectionModel {
    #[default]
    #[strum(
        to_string = "objectDetection",
        serialize = "object-detection",
        serialize = "detection"
    )]
    ObjectDetection,
    #[strum(to_string = "segmentation")]
    Segmentation,
    #[strum(to_string = "pose")]
    Pose,
}

impl DetectionModel {
    /// Short label for display next to a running stream.
    pub fn title(self) -> &'static str {
        match self {
            Self::ObjectDetection => "Detection",
            Self::Segmentation => "Segmentation",
            Self::Pose => "Pose",
        }
    }
}
