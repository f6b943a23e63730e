//! Command dispatch: bridges CLI args -> core operations -> output formatting.

pub mod cameras;
pub mod config_cmd;
pub mod stats;
pub mod streams;
pub mod util;
pub mod watch;

use lookout_core::SessionConfig;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a service-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    config: &SessionConfig,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Cameras(args) => cameras::handle(config, args, global).await,
        Command::Streams(args) => streams::handle(config, args, global).await,
        Command::Stats => stats::handle(config, global).await,
        Command::Watch(args) => watch::handle(config, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}
