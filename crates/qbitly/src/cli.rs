//! Clap derive structures for the `qbitly` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use qbitly_core::TorrentFilter;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// qbitly -- command-line client for qBittorrent
#[derive(Debug, Parser)]
#[command(
    name = "qbitly",
    version,
    about = "Manage qBittorrent from the command line",
    long_about = "A command-line client for the qBittorrent WebUI API (v2).\n\n\
        One-shot commands list and control torrents; watch commands follow\n\
        the daemon's incremental sync endpoints until interrupted.",
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
    /// Config profile to use
    #[arg(long, short = 'p', env = "QBITLY_PROFILE", global = true)]
    pub profile: Option<String>,

    /// WebUI URL (overrides profile)
    #[arg(long, short = 'u', env = "QBITLY_URL", global = true)]
    pub url: Option<String>,

    /// WebUI username
    #[arg(long, env = "QBITLY_USERNAME", global = true)]
    pub username: Option<String>,

    /// WebUI password
    #[arg(long, env = "QBITLY_PASSWORD", global = true, hide_env_values = true)]
    pub password: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "QBITLY_OUTPUT",
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
    #[arg(long, short = 'k', env = "QBITLY_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds
    #[arg(long, env = "QBITLY_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
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
    /// Log in and report whether the credentials were accepted
    Login,

    /// Show the daemon and Web API versions
    Version,

    /// List, add and control torrents
    #[command(alias = "t")]
    Torrents(TorrentsArgs),

    /// Follow global state (transfer speeds, torrent counts) until Ctrl-C
    Watch,

    /// Follow a single torrent until it disappears or Ctrl-C
    WatchTorrent {
        /// Info hash
        hash: String,

        /// Keep waiting while the torrent is absent
        #[arg(long)]
        wait: bool,
    },

    /// Follow the peers of a torrent until Ctrl-C
    Peers {
        /// Info hash
        hash: String,
    },

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  TORRENTS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct TorrentsArgs {
    #[command(subcommand)]
    pub command: TorrentsCommand,
}

#[derive(Debug, Subcommand)]
pub enum TorrentsCommand {
    /// List torrents
    #[command(alias = "ls")]
    List(TorrentListArgs),

    /// Add torrents from magnet links, URLs or .torrent files
    Add(TorrentAddArgs),

    /// Remove torrents
    #[command(alias = "rm")]
    Delete {
        /// Info hashes
        #[arg(required = true)]
        hashes: Vec<String>,

        /// Also delete downloaded data
        #[arg(long)]
        delete_files: bool,
    },

    /// Pause (stop) torrents
    Pause(HashesArgs),

    /// Resume (start) torrents
    Resume(HashesArgs),

    /// Force a recheck of torrent data
    Recheck(HashesArgs),

    /// Show torrent details (paths, pieces, transfer totals)
    Show {
        /// Info hash
        hash: String,
    },

    /// List the files of a torrent
    Files {
        /// Info hash
        hash: String,
    },
}

#[derive(Debug, Args)]
pub struct TorrentListArgs {
    /// State filter
    #[arg(long, short = 'f', value_parser = parse_filter)]
    pub filter: Option<TorrentFilter>,

    /// Only torrents in this category ("" for uncategorized)
    #[arg(long)]
    pub category: Option<String>,

    /// Only torrents with this tag
    #[arg(long)]
    pub tag: Option<String>,

    /// Sort by a torrent field (e.g. name, added_on, ratio)
    #[arg(long)]
    pub sort: Option<String>,

    /// Reverse the sort order
    #[arg(long)]
    pub reverse: bool,

    /// Max results
    #[arg(long, short = 'l')]
    pub limit: Option<u32>,
}

#[derive(Debug, Args)]
pub struct TorrentAddArgs {
    /// Magnet links, URLs or paths to .torrent files
    #[arg(required = true)]
    pub sources: Vec<String>,

    /// Download directory
    #[arg(long)]
    pub save_path: Option<String>,

    #[arg(long)]
    pub category: Option<String>,

    /// Tags (repeatable)
    #[arg(long = "tag")]
    pub tags: Vec<String>,

    /// Add without starting
    #[arg(long)]
    pub paused: bool,

    /// Skip hash checking
    #[arg(long)]
    pub skip_checking: bool,

    /// Download pieces in order
    #[arg(long)]
    pub sequential: bool,
}

#[derive(Debug, Args)]
pub struct HashesArgs {
    /// Info hashes
    #[arg(required_unless_present = "all")]
    pub hashes: Vec<String>,

    /// Apply to every torrent
    #[arg(long, conflicts_with = "hashes")]
    pub all: bool,
}

fn parse_filter(raw: &str) -> Result<TorrentFilter, String> {
    raw.parse()
        .map_err(|_| format!("unknown filter '{raw}' (try: all, downloading, completed, paused, active)"))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG & COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file location
    Path,

    /// Show the current configuration (passwords masked)
    Show,

    /// Store a profile's password in the system keyring
    SetPassword {
        /// Password to store
        #[arg(long, env = "QBITLY_NEW_PASSWORD", hide_env_values = true)]
        new_password: String,
    },
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,

    /// Write to a file instead of stdout
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_tree_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_filter_names() {
        assert_eq!(parse_filter("stalled_uploading"), Ok(TorrentFilter::StalledUploading));
        assert!(parse_filter("sideways").is_err());
    }

    #[test]
    fn hashes_or_all_is_required() {
        assert!(Cli::try_parse_from(["qbitly", "torrents", "pause"]).is_err());
        assert!(Cli::try_parse_from(["qbitly", "torrents", "pause", "--all"]).is_ok());
        assert!(Cli::try_parse_from(["qbitly", "torrents", "pause", "abc", "--all"]).is_err());
    }
}
