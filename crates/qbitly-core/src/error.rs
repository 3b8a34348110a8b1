// ── Core error types ──
//
// User-facing errors from qbitly-core. The `From<qbitly_api::Error>` impl
// folds transport-layer failures into a small set of variants. `CoreError`
// is `Clone` so a single sync failure can be handed to every subscriber of
// the stream it terminated.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to qBittorrent at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Request to qBittorrent timed out")]
    Timeout,

    // ── Protocol errors ──────────────────────────────────────────────
    /// Non-success status, including auth challenges re-login could not
    /// clear (e.g. `403` / `Forbidden`) and failed explicit logins
    /// (`200` / `Fails.`).
    #[error("qBittorrent API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Request rejected by qBittorrent: {message}")]
    Rejected { message: String },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Unexpected response from qBittorrent: {message}")]
    Deserialization { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// HTTP status of a protocol error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns `true` if the daemon refused the session.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self.status(), Some(401 | 403)) || matches!(self, Self::Api { status: 200, .. })
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<qbitly_api::Error> for CoreError {
    fn from(err: qbitly_api::Error) -> Self {
        match err {
            qbitly_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map(ToString::to_string)
                            .unwrap_or_else(|| "<unknown>".into()),
                        reason: err.to_string(),
                    }
                }
            }
            qbitly_api::Error::ConnectionClosed { url, message } => CoreError::ConnectionFailed {
                url,
                reason: message,
            },
            qbitly_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("invalid URL: {e}"),
            },
            qbitly_api::Error::Tls(message) => CoreError::Config { message },
            qbitly_api::Error::Api { status, message } => CoreError::Api { status, message },
            qbitly_api::Error::Rejected { message } => CoreError::Rejected { message },
            qbitly_api::Error::Deserialization { message, .. } => {
                CoreError::Deserialization { message }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_keeps_status_and_body() {
        let err: CoreError = qbitly_api::Error::Api {
            status: 403,
            message: "Forbidden".into(),
        }
        .into();

        assert_eq!(err.status(), Some(403));
        assert!(err.is_auth_failure());
        assert_eq!(err.to_string(), "qBittorrent API error (HTTP 403): Forbidden");
    }

    #[test]
    fn closed_connection_becomes_connection_failed() {
        let err: CoreError = qbitly_api::Error::ConnectionClosed {
            url: "http://localhost:8080/api/v2/sync/maindata".into(),
            message: "connection closed before message completed".into(),
        }
        .into();

        assert!(matches!(err, CoreError::ConnectionFailed { .. }));
    }

    #[test]
    fn decode_error_drops_body() {
        let err: CoreError = qbitly_api::Error::Deserialization {
            message: "expected value".into(),
            body: "<html>".into(),
        }
        .into();

        assert!(matches!(err, CoreError::Deserialization { ref message } if message == "expected value"));
    }
}
