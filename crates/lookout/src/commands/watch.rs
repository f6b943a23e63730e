//! `lookout watch`: run a live session in the foreground.
//!
//! Starts the frame pollers, reports per-camera status on an interval and
//! optionally mirrors each camera's latest frame to disk. Exits on Ctrl-C
//! or after `--duration`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use lookout_core::{Camera, CameraId, DetectionModel, LiveSession, SessionConfig};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output;

use super::util;

/// One line of watch output.
#[derive(Debug, Serialize)]
struct CameraStatus {
    id: CameraId,
    name: String,
    streaming: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<DetectionModel>,
    frames_received: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_frame_at: Option<DateTime<Utc>>,
    frame_failures: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl From<&Arc<Camera>> for CameraStatus {
    fn from(c: &Arc<Camera>) -> Self {
        Self {
            id: c.id.clone(),
            name: c.display_name(),
            streaming: c.is_streaming,
            model: c.active_model,
            frames_received: c.frames_received,
            last_frame_at: c.last_frame_at,
            frame_failures: c.consecutive_frame_failures,
            error: c.last_error.as_ref().map(|f| format!("{} failed: {}", f.action, f.message)),
        }
    }
}

fn status_line(s: &CameraStatus, color: bool) -> String {
    let mut line = format!(
        "{:<6} {:<20} {:<9} {:<12} frames={}",
        s.id,
        s.name,
        output::stream_state(s.streaming, color),
        s.model.map_or("-", DetectionModel::title),
        s.frames_received,
    );
    if s.frame_failures > 0 {
        line.push_str(&format!(" failures={}", s.frame_failures));
    }
    if let Some(ref e) = s.error {
        line.push(' ');
        line.push_str(&output::failure(e, color));
    }
    line
}

fn render_tick(statuses: &[CameraStatus], format: &OutputFormat, color: bool) -> String {
    match format {
        OutputFormat::Table => {
            let stamp = Utc::now().format("%H:%M:%S");
            if statuses.is_empty() {
                return format!("[{stamp}] no cameras");
            }
            statuses
                .iter()
                .map(|s| format!("[{stamp}] {}", status_line(s, color)))
                .collect::<Vec<_>>()
                .join("\n")
        }
        // One document per tick so the stream stays line-parseable.
        OutputFormat::Json | OutputFormat::JsonCompact => output::render_json_compact(statuses),
        OutputFormat::Yaml => format!("---\n{}", output::render_yaml(statuses)),
        OutputFormat::Plain => statuses
            .iter()
            .map(|s| format!("{}\t{}\t{}", s.id, s.streaming, s.frames_received))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

/// File name for a camera's snapshot. Path separators in ids are replaced.
fn snapshot_path(dir: &Path, id: &CameraId) -> PathBuf {
    let safe: String = id
        .as_str()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    dir.join(format!("{safe}.jpg"))
}

/// Write every frame not yet on disk. `written` tracks the last frame
/// sequence number saved per camera.
async fn write_snapshots(
    dir: &Path,
    cameras: &[Arc<Camera>],
    written: &mut HashMap<CameraId, u64>,
) -> Result<usize, CliError> {
    let mut count = 0;
    for camera in cameras {
        let Some(ref frame) = camera.frame else {
            continue;
        };
        if written.get(&camera.id) == Some(&frame.seq()) {
            continue;
        }
        tokio::fs::write(snapshot_path(dir, &camera.id), frame.bytes()).await?;
        written.insert(camera.id.clone(), frame.seq());
        count += 1;
    }
    Ok(count)
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    config: &SessionConfig,
    args: WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let color = output::should_color(&global.color);
    let model = args.model.as_deref().map(util::parse_model).transpose()?;
    if args.interval.is_zero() {
        return Err(CliError::Validation {
            field: "interval".into(),
            reason: "must be greater than zero".into(),
        });
    }
    if let Some(ref dir) = args.snapshot_dir {
        tokio::fs::create_dir_all(dir).await?;
    }

    let session = LiveSession::connect(config.clone())?;
    if session.start().await.is_none() && !global.quiet {
        for warning in session.warnings().await {
            eprintln!("warning: {warning}");
        }
    }
    if let Some(model) = model {
        session.select_model(model);
    }

    let mut started = Vec::new();
    if args.start_all {
        let batch = session.start_all().await;
        for (id, err) in &batch.failed {
            eprintln!("{}", output::failure(&format!("camera {id}: {err}"), color));
        }
        info!(
            started = batch.succeeded.len(),
            failed = batch.failed.len(),
            skipped = batch.skipped,
            "start all finished"
        );
        started = batch.succeeded;
    }

    let result = run_loop(&session, &args, global, color).await;

    if args.stop_on_exit {
        for id in &started {
            if let Err(e) = session.stop_one(id).await {
                warn!(camera = %id, error = %e, "stop on exit failed");
            }
        }
    }
    session.shutdown().await;
    result
}

/// One reporting round. A directory that was unavailable at start-up is
/// retried first, so cameras appear once the service answers.
async fn tick(
    session: &LiveSession,
    args: &WatchArgs,
    global: &GlobalOpts,
    color: bool,
    written: &mut HashMap<CameraId, u64>,
) -> Result<(), CliError> {
    if session.cameras().is_empty() {
        if let Err(e) = session.refresh().await {
            debug!(error = %e, "camera directory still unavailable");
        }
    }
    let snap = session.cameras();
    if !global.quiet {
        let statuses: Vec<CameraStatus> = snap.iter().map(Into::into).collect();
        output::print_output(&render_tick(&statuses, &global.output, color), false);
    }
    if let Some(ref dir) = args.snapshot_dir {
        let n = write_snapshots(dir, &snap, written).await?;
        debug!(written = n, "snapshots updated");
    }
    Ok(())
}

async fn run_loop(
    session: &LiveSession,
    args: &WatchArgs,
    global: &GlobalOpts,
    color: bool,
) -> Result<(), CliError> {
    let deadline = async {
        match args.duration {
            Some(d) => tokio::time::sleep(d).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut ticker = tokio::time::interval(args.interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut written = HashMap::new();

    loop {
        // The tick itself may wait on the network, so it races the exit
        // conditions too.
        let work = async {
            ticker.tick().await;
            tick(session, args, global, color, &mut written).await
        };
        tokio::select! {
            biased;
            res = &mut ctrl_c => {
                if let Err(e) = res {
                    warn!(error = %e, "failed to listen for Ctrl-C");
                }
                info!("interrupted");
                break;
            }
            () = &mut deadline => break,
            res = work => res?,
        }
    }
    Ok(())
}
