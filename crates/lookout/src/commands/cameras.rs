//! Camera command handlers.

use std::sync::Arc;

use lookout_core::{Camera, CameraId, SessionConfig};
use tabled::Tabled;

use crate::cli::{CamerasArgs, CamerasCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct CameraRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Location")]
    location: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Model")]
    model: String,
}

impl CameraRow {
    fn new(c: &Arc<Camera>, color: bool) -> Self {
        Self {
            id: c.id.to_string(),
            name: c.display_name(),
            location: c.location.clone().unwrap_or_default(),
            state: output::stream_state(c.is_streaming, color),
            model: c.active_model.map(|m| m.title().to_owned()).unwrap_or_default(),
        }
    }
}

fn detail(c: &Arc<Camera>, color: bool) -> String {
    let mut lines = vec![
        format!("ID:       {}", c.id),
        format!("Name:     {}", c.display_name()),
        format!("Location: {}", c.location.as_deref().unwrap_or("-")),
        format!("Kind:     {}", c.stream_kind),
        format!("State:    {}", output::stream_state(c.is_streaming, color)),
    ];
    if let Some(model) = c.active_model {
        lines.push(format!("Model:    {model}"));
    }
    if let Some(ref frame) = c.frame {
        lines.push(format!(
            "Frame:    {} bytes at {}",
            frame.len(),
            frame.fetched_at().format("%H:%M:%S")
        ));
    }
    if let Some(ref fault) = c.last_error {
        lines.push(format!(
            "Error:    {} failed: {}",
            fault.action,
            output::failure(&fault.message, color)
        ));
    }
    lines.join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    config: &SessionConfig,
    args: CamerasArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let color = output::should_color(&global.color);

    match args.command {
        CamerasCommand::List { probe } => {
            let (controller, _) = util::oneshot(config, probe).await?;
            let snap = controller.store().snapshot();
            let out = output::render_list(
                &global.output,
                snap.as_slice(),
                |c| CameraRow::new(c, color),
                |c| c.id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        CamerasCommand::Get { id } => {
            let id = CameraId::new(id.trim());
            let (controller, _) = util::oneshot(config, true).await?;
            let camera = controller
                .store()
                .camera(&id)
                .ok_or_else(|| util::not_found(&id))?;
            let out = output::render_single(
                &global.output,
                &camera,
                |c| detail(c, color),
                |c| c.id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
