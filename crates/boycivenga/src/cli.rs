//! Clap derive structures for the `boycivenga` CLI.
//!
//! Defines the command tree, global flags, and shared value enums.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// boycivenga -- reconcile UniFi networks against inventory data
#[derive(Debug, Parser)]
#[command(
    name = "boycivenga",
    version,
    about = "Reconcile UniFi networks against an inventory source of truth",
    long_about = "Builds the desired network set from an exported VLAN/prefix inventory,\n\
        diffs it against the last recorded apply and the live controller, and\n\
        creates or updates networks to match.",
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
    /// Controller profile to use
    #[arg(long, short = 'p', env = "BOYCIVENGA_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Controller URL (overrides profile)
    #[arg(long, short = 'c', global = true)]
    pub controller: Option<String>,

    /// Site the networks belong to
    #[arg(long, short = 's', env = "UNIFI_SITE", global = true)]
    pub site: Option<String>,

    /// Controller username (overrides profile)
    #[arg(long, short = 'u', global = true)]
    pub username: Option<String>,

    /// Accept self-signed TLS certificates (refused under CI)
    #[arg(long, short = 'k', global = true)]
    pub insecure: bool,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Directory holding recorded state files
    #[arg(long, global = true)]
    pub state_dir: Option<PathBuf>,

    /// When to use color output
    #[arg(long, global = true)]
    pub color: Option<ColorMode>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable report
    #[default]
    Table,
    /// Pretty-printed JSON
    Json,
    /// YAML
    Yaml,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    #[default]
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create or update controller networks to match the inventory
    Apply(ApplyArgs),

    /// Show what apply would change, without changing anything
    Plan(PlanArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct ApplyArgs {
    /// Desired-state input document (JSON)
    #[arg(long, short = 'i')]
    pub input: PathBuf,

    /// Recorded state file (default: <state-dir>/<site>-networks.json)
    #[arg(long)]
    pub state_file: Option<PathBuf>,

    /// List what would be applied without contacting the controller
    #[arg(long)]
    pub dry_run: bool,

    /// Stop at the first network that fails
    #[arg(long)]
    pub fail_fast: bool,

    /// Delete ephemeral `test-` networks absent from the inventory
    #[arg(long)]
    pub prune: bool,
}

#[derive(Debug, Args)]
pub struct PlanArgs {
    /// Desired-state input document (JSON)
    #[arg(long, short = 'i')]
    pub input: PathBuf,

    /// Recorded state file (default: <state-dir>/<site>-networks.json)
    #[arg(long)]
    pub state_file: Option<PathBuf>,

    /// Do not report out-of-band controller edits as pending changes
    #[arg(long)]
    pub ignore_drift: bool,

    /// Report format
    #[arg(long, short = 'o', value_enum, default_value_t)]
    pub output: OutputFormat,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
