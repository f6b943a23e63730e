//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and a stable process exit code.

use miette::Diagnostic;
use thiserror::Error;

use lookout_config::ConfigError;
use lookout_core::{CoreError, SessionConfig};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach detection service at {url}")]
    #[diagnostic(
        code(lookout::connection_failed),
        help(
            "Check that the detection service is running and accessible.\n\
             Point the CLI elsewhere with --url or LOOKOUT_URL."
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Camera directory unavailable at {url}")]
    #[diagnostic(
        code(lookout::directory_unavailable),
        help("The service did not return a camera list: {reason}")
    )]
    DirectoryUnavailable { url: String, reason: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(lookout::not_found),
        help("Run: lookout {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── Streams ──────────────────────────────────────────────────────
    #[error("{failed} of {attempted} stream requests failed")]
    #[diagnostic(
        code(lookout::partial_failure),
        help("The remaining cameras were handled. Retry the failed ones by id.")
    )]
    PartialFailure { failed: usize, attempted: usize },

    // ── API ──────────────────────────────────────────────────────────
    #[error("API error ({code}): {message}")]
    #[diagnostic(code(lookout::api_error))]
    ApiError { code: String, message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(lookout::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(lookout::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: lookout config init --url <URL> --profile {name}"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error(transparent)]
    #[diagnostic(code(lookout::config))]
    Config(ConfigError),

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(lookout::timeout),
        help("Increase timeout with --timeout or check service responsiveness.")
    )]
    Timeout { seconds: u64 },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::DirectoryUnavailable { .. } => {
                exit_code::CONNECTION
            }
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. }
            | Self::ProfileNotFound { .. }
            | Self::Config(ConfigError::Validation { .. } | ConfigError::UnknownProfile { .. }) => {
                exit_code::USAGE
            }
            _ => exit_code::GENERAL,
        }
    }

    /// Fill in the service URL and timeout that core errors leave blank.
    pub fn in_context(self, config: &SessionConfig) -> Self {
        match self {
            Self::DirectoryUnavailable { reason, .. } => Self::DirectoryUnavailable {
                url: config.base_url.to_string(),
                reason,
            },
            Self::ConnectionFailed { url, source } if url.is_empty() => Self::ConnectionFailed {
                url: config.base_url.to_string(),
                source,
            },
            Self::Timeout { .. } => Self::Timeout {
                seconds: config.timeout.as_secs(),
            },
            other => other,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed {
                url,
                source: reason.into(),
            },

            CoreError::Directory { reason } => CliError::DirectoryUnavailable {
                url: String::new(),
                reason,
            },

            CoreError::Timeout => CliError::Timeout { seconds: 0 },

            CoreError::CameraNotFound { identifier } => CliError::NotFound {
                resource_type: "camera".into(),
                identifier,
                list_command: "cameras list".into(),
            },

            CoreError::Command {
                camera,
                action,
                reason,
                ..
            } => CliError::ApiError {
                code: format!("{action}_failed"),
                message: format!("camera {camera}: {reason}"),
            },

            CoreError::FrameFetch { camera, reason } => CliError::ApiError {
                code: "frame_failed".into(),
                message: format!("camera {camera}: {reason}"),
            },

            CoreError::SessionClosed => CliError::ApiError {
                code: "session_closed".into(),
                message: "live session is shut down".into(),
            },

            CoreError::Api { message, status } => CliError::ApiError {
                code: status.map_or_else(|| "unknown".into(), |s| s.to_string()),
                message,
            },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::Internal(message) => CliError::ApiError {
                code: "internal".into(),
                message,
            },
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Io(e) => CliError::Io(e),
            other => CliError::Config(other),
        }
    }
}
