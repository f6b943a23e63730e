//! Shared helpers for command handlers.

use std::sync::Arc;

use chrono::NaiveDateTime;
use lookout_core::{
    CameraDirectory, CameraId, DetectionClient, DetectionModel, DirectoryReport, SessionConfig,
    StreamController, StreamStore,
};

use crate::error::CliError;

/// A controller over a freshly loaded camera directory, with no pollers.
///
/// One-shot commands use this instead of a `LiveSession`: they issue a
/// handful of requests and exit, so there is nothing to poll.
pub async fn oneshot(
    config: &SessionConfig,
    probe: bool,
) -> Result<(StreamController<DetectionClient>, DirectoryReport), CliError> {
    let client = lookout_core::build_client(config)?;
    let store = Arc::new(StreamStore::new(config.default_model));
    let report = CameraDirectory::load(&client, &store, probe).await?;
    Ok((StreamController::new(Arc::new(client), store), report))
}

/// Parse a `--model` flag.
pub fn parse_model(raw: &str) -> Result<DetectionModel, CliError> {
    Ok(lookout_config::parse_model(raw)?)
}

pub fn not_found(id: &CameraId) -> CliError {
    CliError::NotFound {
        resource_type: "camera".into(),
        identifier: id.to_string(),
        list_command: "cameras list".into(),
    }
}

/// Shorten a service timestamp to wall-clock time for tables.
///
/// The service emits naive ISO-8601 timestamps. Anything unparseable is
/// shown as received.
pub fn short_time(raw: &str) -> String {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").map_or_else(
        |_| raw.to_owned(),
        |ts| ts.format("%H:%M:%S").to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_time_trims_service_timestamps() {
        assert_eq!(short_time("2024-05-01T13:04:05.123456"), "13:04:05");
        assert_eq!(short_time("2024-05-01T13:04:05"), "13:04:05");
        assert_eq!(short_time("yesterday"), "yesterday");
    }

    #[test]
    fn model_flag_rejects_unknown_names() {
        assert_eq!(parse_model("pose").ok(), Some(DetectionModel::Pose));
        assert!(matches!(
            parse_model("classification"),
            Err(CliError::Config(_))
        ));
    }
}
