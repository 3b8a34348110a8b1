//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use qbitly_config::ConfigError;
use qbitly_core::{ApiError, CoreError};

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const REJECTED: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to qBittorrent at {url}")]
    #[diagnostic(
        code(qbitly::connection_failed),
        help(
            "Check that the WebUI is enabled and reachable.\n\
             Reason: {reason}"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out")]
    #[diagnostic(
        code(qbitly::timeout),
        help("Increase the timeout with --timeout or check the daemon's responsiveness.")
    )]
    Timeout,

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed (HTTP {status}): {message}")]
    #[diagnostic(
        code(qbitly::auth_failed),
        help(
            "Verify the WebUI username and password.\n\
             Store a password with: qbitly config set-password --profile <name>"
        )
    )]
    AuthFailed { status: u16, message: String },

    #[error("No password configured for profile '{profile}'")]
    #[diagnostic(
        code(qbitly::no_credentials),
        help("Pass --password, set QBITLY_PASSWORD, or run: qbitly config set-password")
    )]
    NoCredentials { profile: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource} '{identifier}' not found")]
    #[diagnostic(code(qbitly::not_found), help("Run: qbitly torrents list"))]
    NotFound {
        resource: String,
        identifier: String,
    },

    // ── API ──────────────────────────────────────────────────────────
    #[error("API error (HTTP {status}): {message}")]
    #[diagnostic(code(qbitly::api_error))]
    Api { status: u16, message: String },

    #[error("qBittorrent rejected the request: {message}")]
    #[diagnostic(
        code(qbitly::rejected),
        help("The daemon answered 'Fails.'; check the input (e.g. a malformed magnet link).")
    )]
    Rejected { message: String },

    #[error("Unexpected response: {message}")]
    #[diagnostic(code(qbitly::unexpected_response))]
    UnexpectedResponse { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(qbitly::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(qbitly::profile_not_found),
        help("Add it under [profiles.{name}] in {path}")
    )]
    ProfileNotFound { name: String, path: String },

    #[error("No qBittorrent URL configured")]
    #[diagnostic(
        code(qbitly::no_config),
        help(
            "Pass --url, set QBITLY_URL, or create a profile.\n\
             Expected config at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(qbitly::config))]
    Config(ConfigError),

    // ── IO ───────────────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Rejected { .. } => exit_code::REJECTED,
            Self::Timeout => exit_code::TIMEOUT,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            // 200 here is a failed login (`Fails.`).
            CoreError::Api { status, message } if matches!(status, 200 | 401 | 403) => {
                CliError::AuthFailed { status, message }
            }
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed { url, reason },
            CoreError::Timeout => CliError::Timeout,
            CoreError::Api { status, message } => CliError::Api { status, message },
            CoreError::Rejected { message } => CliError::Rejected { message },
            CoreError::Deserialization { message } | CoreError::Internal(message) => {
                CliError::UnexpectedResponse { message }
            }
            CoreError::Config { message } => CliError::Validation {
                field: "connection".into(),
                reason: message,
            },
        }
    }
}

impl From<ApiError> for CliError {
    fn from(err: ApiError) -> Self {
        CoreError::from(err).into()
    }
}

// ── ConfigError → CliError mapping ──────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::UnknownProfile { name } => CliError::ProfileNotFound {
                name,
                path: qbitly_config::config_path().display().to_string(),
            },
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            other => CliError::Config(other),
        }
    }
}
