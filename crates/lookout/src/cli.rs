//! Clap derive structures for the `lookout` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// lookout -- live view and stream control for camera detection services
#[derive(Debug, Parser)]
#[command(
    name = "lookout",
    version,
    about = "Control camera detection streams from the command line",
    long_about = "Discover cameras on an object-detection service, start and stop\n\
        per-camera inference streams, and watch rendered frames as they arrive.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Service profile to use
    #[arg(long, short = 'p', env = "LOOKOUT_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Detection service URL (overrides profile)
    #[arg(long, short = 'u', env = "LOOKOUT_URL", global = true)]
    pub url: Option<String>,

    /// Config file path (overrides the platform default)
    #[arg(long, env = "LOOKOUT_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "LOOKOUT_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "LOOKOUT_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "LOOKOUT_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List and inspect cameras
    #[command(alias = "cam", alias = "c")]
    Cameras(CamerasArgs),

    /// Start and stop detection streams
    #[command(alias = "s")]
    Streams(StreamsArgs),

    /// Show real-time detection statistics
    Stats,

    /// Run a live session and report frames as they arrive
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Cameras ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CamerasArgs {
    #[command(subcommand)]
    pub command: CamerasCommand,
}

#[derive(Debug, Subcommand)]
pub enum CamerasCommand {
    /// List live cameras
    #[command(alias = "ls")]
    List {
        /// Probe each camera for a running stream (one frame request each)
        #[arg(long)]
        probe: bool,
    },

    /// Show one camera, probing its stream state
    Get {
        /// Camera ID
        id: String,
    },
}

// ── Streams ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct StreamsArgs {
    #[command(subcommand)]
    pub command: StreamsCommand,
}

#[derive(Debug, Subcommand)]
pub enum StreamsCommand {
    /// Start detection on cameras
    Start(StreamTargets),

    /// Stop detection on cameras
    Stop(StreamTargets),
}

#[derive(Debug, Args)]
#[command(group(
    clap::ArgGroup::new("targets").required(true).args(["ids", "all"])
))]
pub struct StreamTargets {
    /// Camera IDs
    pub ids: Vec<String>,

    /// Target every eligible camera
    #[arg(long, short = 'a')]
    pub all: bool,

    /// Detection model for started streams (objectDetection, segmentation, pose)
    #[arg(long, short = 'm')]
    pub model: Option<String>,
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Start every idle camera before watching
    #[arg(long)]
    pub start_all: bool,

    /// Detection model for streams started by this session
    #[arg(long, short = 'm')]
    pub model: Option<String>,

    /// Stop after this long (e.g. "30s", "5m"); runs until Ctrl-C if unset
    #[arg(long, short = 'd', value_parser = humantime::parse_duration)]
    pub duration: Option<Duration>,

    /// Status report interval
    #[arg(long, short = 'i', default_value = "1s", value_parser = humantime::parse_duration)]
    pub interval: Duration,

    /// Write each camera's latest frame to DIR/<id>.jpg
    #[arg(long)]
    pub snapshot_dir: Option<PathBuf>,

    /// Stop every stream this session started before exiting
    #[arg(long)]
    pub stop_on_exit: bool,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create or update the --profile profile (default "default") from --url
    Init {
        /// Default model for started streams
        #[arg(long, short = 'm')]
        model: Option<String>,

        /// Skip probing cameras at session start
        #[arg(long)]
        no_probe: bool,
    },

    /// Display current configuration
    Show,

    /// Print the config file path
    Path,

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::{CommandFactory, Parser};

    use super::*;

    #[test]
    fn command_tree_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn stream_targets_require_ids_or_all() {
        assert!(Cli::try_parse_from(["lookout", "streams", "start"]).is_err());
        let cli = Cli::try_parse_from(["lookout", "streams", "start", "--all", "-m", "pose"]).unwrap();
        let Command::Streams(StreamsArgs {
            command: StreamsCommand::Start(targets),
        }) = cli.command
        else {
            panic!("expected streams start");
        };
        assert!(targets.all);
        assert_eq!(targets.model.as_deref(), Some("pose"));
    }

    #[test]
    fn watch_parses_human_durations() {
        let cli = Cli::try_parse_from(["lookout", "watch", "--duration", "90s", "-i", "250ms"]).unwrap();
        let Command::Watch(args) = cli.command else {
            panic!("expected watch");
        };
        assert_eq!(args.duration, Some(Duration::from_secs(90)));
        assert_eq!(args.interval, Duration::from_millis(250));
    }
}
