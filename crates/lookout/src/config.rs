//! CLI configuration: thin wrapper around `lookout_config` shared types.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--url, --config, --timeout, --insecure).

use std::path::PathBuf;
use std::time::Duration;

use lookout_core::{SessionConfig, TlsMode};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use lookout_config::{Config, Profile, load_config_from, save_config_to};

/// Config file in effect: `--config` / `LOOKOUT_CONFIG`, else the platform path.
pub fn config_path(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(lookout_config::config_path)
}

pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(load_config_from(&config_path(global))?)
}

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .unwrap_or_else(|| config.active_profile_name().to_owned())
}

/// Build the `SessionConfig` for this invocation.
///
/// Precedence: flags and environment, then the active profile, then
/// built-in defaults. With no profile at all the CLI still works against
/// `--url` or the default local service.
pub fn resolve_session_config(global: &GlobalOpts) -> Result<SessionConfig, CliError> {
    let cfg = load(global)?;
    let profile_name = active_profile_name(global, &cfg);

    let profile = match cfg.profiles.get(&profile_name) {
        Some(profile) => profile.clone(),
        None if global.profile.is_some() => {
            let mut available: Vec<_> = cfg.profiles.keys().cloned().collect();
            available.sort();
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: if available.is_empty() {
                    "(none)".into()
                } else {
                    available.join(", ")
                },
            });
        }
        None => Profile {
            url: lookout_core::config::DEFAULT_SERVICE_URL.into(),
            ..Profile::default()
        },
    };

    resolve_profile(&profile, &cfg, global)
}

/// Translate a `Profile` + global flags into a `SessionConfig`.
fn resolve_profile(
    profile: &Profile,
    cfg: &Config,
    global: &GlobalOpts,
) -> Result<SessionConfig, CliError> {
    let mut profile = profile.clone();
    if let Some(ref url) = global.url {
        if url.parse::<url::Url>().is_err() {
            return Err(CliError::Validation {
                field: "url".into(),
                reason: format!("invalid URL: {url}"),
            });
        }
        profile.url.clone_from(url);
    }

    let mut session = lookout_config::profile_to_session_config(&profile, &cfg.defaults)?;

    if global.insecure {
        session.tls = TlsMode::DangerAcceptInvalid;
    }
    if let Some(secs) = global.timeout {
        session.timeout = Duration::from_secs(secs);
    }
    Ok(session)
}
