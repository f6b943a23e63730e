//! Real-time detection statistics.

use lookout_core::{CoreError, RealtimeStats, RecentDetection, SessionConfig};
use tabled::{Table, Tabled, settings::Style};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct DetectionRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Camera")]
    camera: String,
    #[tabled(rename = "Model")]
    model: String,
    #[tabled(rename = "Class")]
    class: String,
}

impl From<&RecentDetection> for DetectionRow {
    fn from(d: &RecentDetection) -> Self {
        Self {
            time: d.timestamp.as_deref().map(util::short_time).unwrap_or_default(),
            camera: d.camera_name.clone().unwrap_or_default(),
            model: d.model_type.clone().unwrap_or_default(),
            class: d.class_name.clone().unwrap_or_default(),
        }
    }
}

fn detail(stats: &RealtimeStats) -> String {
    // Rate points arrive newest first.
    let last_minute = stats
        .detection_rate
        .first()
        .map_or_else(|| "-".into(), |p| format!("{} ({})", p.count, util::short_time(&p.time)));
    let last_hour: u64 = stats.detection_rate.iter().map(|p| p.count).sum();

    let mut out = [
        format!("Total detections: {}", stats.total_detections),
        format!("Active cameras:   {}", stats.active_cameras),
        format!("Last minute:      {last_minute}"),
        format!("Last hour:        {last_hour}"),
    ]
    .join("\n");

    if !stats.latest_detections.is_empty() {
        let rows: Vec<DetectionRow> = stats.latest_detections.iter().map(Into::into).collect();
        out.push_str("\n\n");
        out.push_str(&Table::new(rows).with(Style::rounded()).to_string());
    }
    out
}

pub async fn handle(config: &SessionConfig, global: &GlobalOpts) -> Result<(), CliError> {
    let client = lookout_core::build_client(config)?;
    let stats = client.realtime_stats().await.map_err(CoreError::from)?;

    let out = output::render_single(&global.output, &stats, detail, |s| {
        s.total_detections.to_string()
    });
    output::print_output(&out, global.quiet);
    Ok(())
}
