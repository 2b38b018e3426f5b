//! CLI configuration: thin wrapper around `merakly_config`.
//!
//! Re-exports the shared types and layers `GlobalOpts` flag overrides
//! (--backend, --api-key, --timeout, --max-in-flight) on top of the
//! active profile.

use std::time::Duration;

use secrecy::SecretString;

use merakly_core::SessionConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use merakly_config::{
    Config, Profile, config_path, load_config_or_default, save_config, store_api_key,
};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .unwrap_or_else(|| config.active_profile_name().to_owned())
}

/// Comma-separated profile names, for diagnostics.
pub fn available_profiles(config: &Config) -> String {
    if config.profiles.is_empty() {
        "(none)".into()
    } else {
        config.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}

/// Build the `SessionConfig` for a session-bound command.
///
/// Precedence is flag (or its env var) > profile > `[defaults]`. An
/// explicitly requested profile must exist; otherwise a missing profile
/// falls back to built-in defaults so flags alone are enough.
pub fn resolve_session_config(
    config: &Config,
    global: &GlobalOpts,
) -> Result<(String, SessionConfig), CliError> {
    let profile_name = active_profile_name(global, config);

    let mut profile = match config.profiles.get(&profile_name) {
        Some(profile) => profile.clone(),
        None if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: available_profiles(config),
            });
        }
        None => Profile::default(),
    };

    if let Some(ref backend) = global.backend {
        profile.backend.clone_from(backend);
    }

    let mut session = merakly_config::base_session_config(&profile, &config.defaults)?;
    if let Some(secs) = global.timeout {
        session = session.with_timeout(Duration::from_secs(secs));
    }
    if let Some(max) = global.max_in_flight {
        session = session.with_max_in_flight(max);
    }

    // CLI flag first, then the profile's chain (env var, keyring, plaintext)
    let key = match global.api_key {
        Some(ref key) => Some(SecretString::from(key.clone())),
        None => merakly_config::resolve_api_key(&profile, &profile_name).ok(),
    };
    if let Some(key) = key {
        session = session.with_api_key(key);
    }

    Ok((profile_name, session))
}
