//! Clap derive structures for the `merakly` CLI.
//!
//! Defines the command tree, global flags, and shared value enums.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// merakly -- browse Meraki network events from the command line
#[derive(Debug, Parser)]
#[command(
    name = "merakly",
    version,
    about = "Browse Meraki dashboard organizations, networks, and events",
    long_about = "Submit an API key to the local merakly backend proxy, pick an\n\
        organization and some of its networks, and search or sort the\n\
        combined event table.",
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
    /// Configuration profile to use
    #[arg(long, short = 'p', env = "MERAKLY_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Backend proxy URL (overrides profile)
    #[arg(long, short = 'b', env = "MERAKLY_BACKEND", global = true)]
    pub backend: Option<String>,

    /// Meraki dashboard API key
    #[arg(long, env = "MERAKLY_API_KEY", global = true, hide_env = true)]
    pub api_key: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "MERAKLY_OUTPUT",
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

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "MERAKLY_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Maximum concurrent event requests, 1-16 (overrides profile)
    #[arg(long, env = "MERAKLY_MAX_IN_FLIGHT", global = true)]
    pub max_in_flight: Option<usize>,
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
    /// Plain text, one identifier per line (scripting)
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
    /// List organizations visible to the API key
    #[command(alias = "organizations")]
    Orgs,

    /// List the networks of an organization
    #[command(alias = "net")]
    Networks(NetworksArgs),

    /// Load, search, and sort events of selected networks
    #[command(alias = "ev")]
    Events(EventsArgs),

    /// Show client details for one or more networks
    Details(DetailsArgs),

    /// List the event table columns (valid --sort keys)
    Columns,

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  NETWORKS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct NetworksArgs {
    /// Organization ID
    pub org: String,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  EVENTS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct EventsArgs {
    /// Organization ID
    pub org: String,

    /// Network ID to include (repeatable; order is kept)
    #[arg(long = "network", short = 'n', value_name = "ID")]
    pub networks: Vec<String>,

    /// Include every network of the organization
    #[arg(long, short = 'a', conflicts_with = "networks")]
    pub all_networks: bool,

    /// Case-insensitive text that any field must contain
    #[arg(long, short = 's', value_name = "QUERY")]
    pub search: Option<String>,

    /// Field to sort by (see `merakly columns`)
    #[arg(long, value_name = "FIELD")]
    pub sort: Option<String>,

    /// Sort descending instead of ascending
    #[arg(long, requires = "sort")]
    pub desc: bool,

    /// Show the full record of one row (NETWORK_ID#INDEX)
    #[arg(long, value_name = "ROW_ID")]
    pub show: Option<String>,

    /// Show at most this many rows
    #[arg(long, short = 'l')]
    pub limit: Option<usize>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  DETAILS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct DetailsArgs {
    /// Network IDs
    #[arg(required = true, num_args = 1..)]
    pub networks: Vec<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current resolved configuration
    Show,

    /// Set a value on the active profile
    Set {
        /// Profile key: backend, api_key, api_key_env, timeout, max_in_flight
        key: String,

        /// Value to set
        value: String,
    },

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store an API key in the system keyring
    SetKey {
        /// Profile name
        #[arg(long)]
        profile: Option<String>,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
