//! Stream start/stop command handlers.

use lookout_core::{
    BatchReport, CameraId, CoreError, DetectionClient, SessionConfig, StartOutcome, StopOutcome,
    StreamAction, StreamController,
};
use serde::Serialize;
use tabled::Tabled;

use crate::cli::{GlobalOpts, StreamTargets, StreamsArgs, StreamsCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Result rows ─────────────────────────────────────────────────────

/// Per-camera outcome of one start or stop request.
#[derive(Debug, Serialize)]
struct StreamResult {
    camera: CameraId,
    action: StreamAction,
    outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl StreamResult {
    fn ok(camera: CameraId, action: StreamAction, outcome: &'static str) -> Self {
        Self {
            camera,
            action,
            outcome,
            error: None,
        }
    }

    fn failed(camera: CameraId, action: StreamAction, err: &CoreError) -> Self {
        Self {
            camera,
            action,
            outcome: "failed",
            error: Some(err.to_string()),
        }
    }
}

#[derive(Tabled)]
struct StreamRow {
    #[tabled(rename = "Camera")]
    camera: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Result")]
    outcome: String,
}

impl StreamRow {
    fn new(r: &StreamResult, color: bool) -> Self {
        Self {
            camera: r.camera.to_string(),
            action: r.action.to_string(),
            outcome: match r.error {
                Some(ref e) => output::failure(e, color),
                None => r.outcome.to_owned(),
            },
        }
    }
}

fn from_batch(report: BatchReport, action: StreamAction, done: &'static str) -> Vec<StreamResult> {
    let mut results: Vec<StreamResult> = report
        .succeeded
        .into_iter()
        .map(|id| StreamResult::ok(id, action, done))
        .collect();
    results.extend(
        report
            .failed
            .iter()
            .map(|(id, err)| StreamResult::failed(id.clone(), action, err)),
    );
    results
}

// ── Operations ──────────────────────────────────────────────────────

async fn start(
    controller: &StreamController<DetectionClient>,
    targets: &StreamTargets,
) -> Vec<StreamResult> {
    if targets.all {
        let report = controller.start_all().await;
        return from_batch(report, StreamAction::Start, "started");
    }

    let mut results = Vec::with_capacity(targets.ids.len());
    for raw in &targets.ids {
        let id = CameraId::new(raw.trim());
        let result = match controller.start_one(&id).await {
            Ok(StartOutcome::Started) => StreamResult::ok(id, StreamAction::Start, "started"),
            Ok(StartOutcome::AlreadyStreaming) => {
                StreamResult::ok(id, StreamAction::Start, "already streaming")
            }
            Err(e) => StreamResult::failed(id, StreamAction::Start, &e),
        };
        results.push(result);
    }
    results
}

async fn stop(
    controller: &StreamController<DetectionClient>,
    targets: &StreamTargets,
) -> Vec<StreamResult> {
    if targets.all {
        let report = controller.stop_all().await;
        return from_batch(report, StreamAction::Stop, "stopped");
    }

    let mut results = Vec::with_capacity(targets.ids.len());
    for raw in &targets.ids {
        let id = CameraId::new(raw.trim());
        let result = match controller.stop_one(&id).await {
            Ok(StopOutcome::Stopped) => StreamResult::ok(id, StreamAction::Stop, "stopped"),
            Ok(StopOutcome::AlreadyIdle) => StreamResult::ok(id, StreamAction::Stop, "already idle"),
            Err(e) => StreamResult::failed(id, StreamAction::Stop, &e),
        };
        results.push(result);
    }
    results
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    config: &SessionConfig,
    args: StreamsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let color = output::should_color(&global.color);

    let results = match args.command {
        StreamsCommand::Start(targets) => {
            let model = targets.model.as_deref().map(util::parse_model).transpose()?;
            let (controller, _) = util::oneshot(config, config.probe_on_start).await?;
            if let Some(model) = model {
                controller.select_model(model);
            }
            start(&controller, &targets).await
        }
        // Stopping needs the probe: an unprobed camera looks idle and
        // would be skipped without a request.
        StreamsCommand::Stop(targets) => {
            let (controller, _) = util::oneshot(config, true).await?;
            stop(&controller, &targets).await
        }
    };

    let out = output::render_list(
        &global.output,
        &results,
        |r| StreamRow::new(r, color),
        |r| format!("{}\t{}", r.camera, r.outcome),
    );
    output::print_output(&out, global.quiet);

    let failed = results.iter().filter(|r| r.error.is_some()).count();
    if failed > 0 {
        return Err(CliError::PartialFailure {
            failed,
            attempted: results.len(),
        });
    }
    Ok(())
}
