//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use merakly_config::ConfigError;
use merakly_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the backend at {url}: {reason}")]
    #[diagnostic(
        code(merakly::connection_failed),
        help(
            "Check that the backend proxy is running and accessible.\n\
             URL: {url}\n\
             Override with: merakly --backend <URL> ..."
        )
    )]
    ConnectionFailed { url: String, reason: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("API key rejected: {reason}")]
    #[diagnostic(
        code(merakly::auth_failed),
        help(
            "Verify the key under Organization > Settings > Dashboard API access.\n\
             Store a new one with: merakly config set-key"
        )
    )]
    AuthFailed { reason: String },

    #[error("No API key configured for profile '{profile}'")]
    #[diagnostic(
        code(merakly::no_credentials),
        help(
            "Configure one with: merakly config init\n\
             Or set the MERAKLY_API_KEY environment variable."
        )
    )]
    NoCredentials { profile: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(merakly::not_found),
        help("Run: merakly {list_command} to see what is available")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("Failed to fetch {resource}: {message}")]
    #[diagnostic(code(merakly::fetch_failed))]
    FetchFailed { resource: String, message: String },

    #[error("Cannot {operation} while {state}")]
    #[diagnostic(code(merakly::invalid_state))]
    InvalidState { operation: String, state: String },

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("Timed out fetching {resource}")]
    #[diagnostic(
        code(merakly::timeout),
        help("Increase the timeout with --timeout or check backend responsiveness.")
    )]
    Timeout { resource: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(merakly::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(merakly::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: merakly config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error(transparent)]
    #[diagnostic(code(merakly::config))]
    Config(Box<figment::Error>),

    #[error("Could not write configuration: {message}")]
    #[diagnostic(code(merakly::config_file))]
    ConfigFile { message: String },

    #[error("Keyring error: {message}")]
    #[diagnostic(
        code(merakly::keyring),
        help("Store the key in the config file instead, or point api_key_env at a variable.")
    )]
    Keyring { message: String },

    // ── IO ───────────────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } | Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::CredentialRejected { reason } => CliError::AuthFailed { reason },

            CoreError::FetchFailed {
                resource,
                timed_out: true,
                ..
            } => CliError::Timeout {
                resource: resource.to_string(),
            },

            CoreError::FetchFailed {
                resource,
                message,
                timed_out: false,
                ..
            } => CliError::FetchFailed {
                resource: resource.to_string(),
                message,
            },

            CoreError::TransportUnavailable { url, reason } => {
                CliError::ConnectionFailed { url, reason }
            }

            CoreError::OrganizationNotFound { identifier } => CliError::NotFound {
                resource_type: "organization".into(),
                identifier,
                list_command: "orgs".into(),
            },

            CoreError::NetworkNotFound { identifier } => CliError::NotFound {
                resource_type: "network".into(),
                identifier,
                list_command: "networks <ORG_ID>".into(),
            },

            CoreError::InvalidState { operation, state } => CliError::InvalidState {
                operation: operation.into(),
                state,
            },

            CoreError::Config { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::ProfileNotFound { name } => CliError::ProfileNotFound {
                name,
                available: "(unknown)".into(),
            },
            ConfigError::Serialization(e) => CliError::ConfigFile {
                message: e.to_string(),
            },
            ConfigError::Figment(e) => CliError::Config(e),
            ConfigError::Keyring(e) => CliError::Keyring {
                message: e.to_string(),
            },
            ConfigError::Io(e) => CliError::Io(e),
        }
    }
}
