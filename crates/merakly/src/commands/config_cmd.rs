//! Config subcommand handlers.

use dialoguer::{Input, Select};
use secrecy::SecretString;
use serde::Serialize;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

use super::util::prompt_err;

const REDACTED: &str = "********";

// ── Helpers ─────────────────────────────────────────────────────────

fn read_api_key(prompt: &str) -> Result<SecretString, CliError> {
    let key = rpassword::prompt_password(prompt).map_err(prompt_err)?;
    if key.trim().is_empty() {
        return Err(CliError::Validation {
            field: "api_key".into(),
            reason: "API key cannot be empty".into(),
        });
    }
    Ok(SecretString::from(key))
}

fn parse_number<T: std::str::FromStr>(field: &str, value: &str) -> Result<T, CliError> {
    value.parse().map_err(|_| CliError::Validation {
        field: field.into(),
        reason: format!("expected a number, got '{value}'"),
    })
}

/// Resolved config as shown by `config show`, with secrets masked.
#[derive(Serialize)]
struct ConfigView {
    path: String,
    active_profile: String,
    #[serde(flatten)]
    config: Config,
}

fn redacted(mut cfg: Config) -> Config {
    for profile in cfg.profiles.values_mut() {
        if profile.api_key.is_some() {
            profile.api_key = Some(REDACTED.into());
        }
    }
    cfg
}

fn describe(view: &ConfigView) -> String {
    let d = &view.config.defaults;
    let mut out = output::detail_lines([
        ("Config path", view.path.clone()),
        ("Active profile", view.active_profile.clone()),
        ("Output", d.output.clone()),
        ("Color", d.color.clone()),
        ("Timeout", format!("{}s", d.timeout)),
        ("Max in flight", d.max_in_flight.to_string()),
    ]);

    for (name, p) in &view.config.profiles {
        out.push_str(&format!("\n\n[{name}]\n"));
        let mut lines = vec![("backend", p.backend.clone())];
        if let Some(ref key) = p.api_key {
            lines.push(("api_key", key.clone()));
        }
        if let Some(ref env) = p.api_key_env {
            lines.push(("api_key_env", env.clone()));
        }
        if let Some(t) = p.timeout {
            lines.push(("timeout", format!("{t}s")));
        }
        if let Some(m) = p.max_in_flight {
            lines.push(("max_in_flight", m.to_string()));
        }
        out.push_str(&output::detail_lines(lines));
    }
    out
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => init(),

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = config::load_config_or_default();
            let view = ConfigView {
                path: config::config_path().display().to_string(),
                active_profile: config::active_profile_name(global, &cfg),
                config: redacted(cfg),
            };
            let out = output::render_single(&global.output, &view, describe, |v| {
                v.active_profile.clone()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Set <key> <value> ───────────────────────────────────────
        ConfigCommand::Set { key, value } => {
            let mut cfg = config::load_config_or_default();
            let profile_name = config::active_profile_name(global, &cfg);
            let profile = cfg.profiles.entry(profile_name.clone()).or_default();

            match key.as_str() {
                "backend" => {
                    merakly_config::parse_backend(&value)?;
                    profile.backend = value;
                }
                "api_key" | "api-key" => profile.api_key = Some(value),
                "api_key_env" | "api-key-env" => profile.api_key_env = Some(value),
                "timeout" => profile.timeout = Some(parse_number("timeout", &value)?),
                "max_in_flight" | "max-in-flight" => {
                    let max: usize = parse_number("max_in_flight", &value)?;
                    if !(1..=merakly_core::MAX_IN_FLIGHT_LIMIT).contains(&max) {
                        return Err(CliError::Validation {
                            field: "max_in_flight".into(),
                            reason: format!(
                                "must be between 1 and {}",
                                merakly_core::MAX_IN_FLIGHT_LIMIT
                            ),
                        });
                    }
                    profile.max_in_flight = Some(max);
                }
                other => {
                    return Err(CliError::Validation {
                        field: other.into(),
                        reason: format!(
                            "unknown config key '{other}'. Valid keys: backend, api_key, \
                             api_key_env, timeout, max_in_flight"
                        ),
                    });
                }
            }

            config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!("✓ Set {key} on profile '{profile_name}'");
            }
            Ok(())
        }

        // ── Profiles ────────────────────────────────────────────────
        ConfigCommand::Profiles => {
            let cfg = config::load_config_or_default();
            let active = cfg.active_profile_name();
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: merakly config init");
            } else {
                for name in cfg.profiles.keys() {
                    let marker = if name == active { " *" } else { "" };
                    println!("{name}{marker}");
                }
            }
            Ok(())
        }

        // ── Use <name> ─────────────────────────────────────────────
        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config_or_default();
            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound {
                    available: config::available_profiles(&cfg),
                    name,
                });
            }

            cfg.default_profile = Some(name.clone());
            config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!("✓ Default profile set to '{name}'");
            }
            Ok(())
        }

        // ── SetKey ──────────────────────────────────────────────────
        ConfigCommand::SetKey { profile } => {
            let cfg = config::load_config_or_default();
            let profile_name = profile.unwrap_or_else(|| config::active_profile_name(global, &cfg));
            if !cfg.profiles.contains_key(&profile_name) {
                return Err(CliError::ProfileNotFound {
                    available: config::available_profiles(&cfg),
                    name: profile_name,
                });
            }

            let key = read_api_key("API key: ")?;
            config::store_api_key(&profile_name, &key)?;
            if !global.quiet {
                eprintln!("✓ API key stored in system keyring for profile '{profile_name}'");
            }
            Ok(())
        }
    }
}

// ── Init: interactive wizard ────────────────────────────────────────

fn init() -> Result<(), CliError> {
    let config_path = config::config_path();
    eprintln!("merakly configuration wizard");
    eprintln!("   Config path: {}\n", config_path.display());

    let profile_name: String = Input::new()
        .with_prompt("Profile name")
        .default("default".into())
        .interact_text()
        .map_err(prompt_err)?;

    let backend: String = Input::new()
        .with_prompt("Backend URL")
        .default(Profile::default().backend)
        .interact_text()
        .map_err(prompt_err)?;
    merakly_config::parse_backend(&backend)?;

    let store_choices = &[
        "Store in system keyring (recommended)",
        "Read from an environment variable",
        "Save to config file (plaintext)",
    ];
    let store_selection = Select::new()
        .with_prompt("Where should the API key come from?")
        .items(store_choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    let mut profile = Profile {
        backend,
        ..Profile::default()
    };
    match store_selection {
        0 => {
            let key = read_api_key("API key: ")?;
            config::store_api_key(&profile_name, &key)?;
            eprintln!("   ✓ API key stored in system keyring");
        }
        1 => {
            let env_name: String = Input::new()
                .with_prompt("Environment variable")
                .default("MERAKI_DASHBOARD_API_KEY".into())
                .interact_text()
                .map_err(prompt_err)?;
            profile.api_key_env = Some(env_name);
        }
        _ => {
            let key = rpassword::prompt_password("API key: ").map_err(prompt_err)?;
            if key.trim().is_empty() {
                return Err(CliError::Validation {
                    field: "api_key".into(),
                    reason: "API key cannot be empty".into(),
                });
            }
            profile.api_key = Some(key);
        }
    }

    let mut cfg = config::load_config_or_default();
    cfg.profiles.insert(profile_name.clone(), profile);
    cfg.default_profile = Some(profile_name.clone());
    config::save_config(&cfg)?;

    eprintln!("\n✓ Configuration written to {}", config_path.display());
    eprintln!("  Active profile: {profile_name}");
    eprintln!("\n  Test it: merakly orgs");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn show_masks_plaintext_keys() {
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "lab".into(),
            Profile {
                api_key: Some("0123456789abcdef".into()),
                ..Profile::default()
            },
        );
        cfg.profiles.insert("env".into(), Profile::default());

        let masked = redacted(cfg);
        assert_eq!(masked.profiles["lab"].api_key.as_deref(), Some(REDACTED));
        assert!(masked.profiles["env"].api_key.is_none());
    }

    #[test]
    fn number_values_are_validated() {
        assert_eq!(parse_number::<u64>("timeout", "15").ok(), Some(15));
        assert!(matches!(
            parse_number::<u64>("timeout", "soon"),
            Err(CliError::Validation { .. })
        ));
    }
}
