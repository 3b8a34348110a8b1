use thiserror::Error;

/// Top-level error type for the `qbitly-api` crate.
///
/// Covers every failure mode of a Web API call: transport, the daemon's
/// early-closed connections, non-success HTTP statuses, rejected commands,
/// and body decoding. `qbitly-core` maps these into `CoreError`.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server accepted the request but closed the connection before
    /// sending any part of a response. Retried once by the middleware chain.
    #[error("Connection to {url} closed before any data was received: {message}")]
    ConnectionClosed { url: String, message: String },

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Protocol ────────────────────────────────────────────────────
    /// Non-success response from the Web API, or a successful login call
    /// whose body was not the success marker. Carries the status and the
    /// response body as the message (e.g. `403` / `Forbidden`).
    #[error("qBittorrent API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The daemon answered `Fails.` to a command (e.g. adding a torrent).
    #[error("Request rejected by qBittorrent: {message}")]
    Rejected { message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// The HTTP status carried by a protocol error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns `true` if the daemon refused the session (401 / 403).
    pub fn is_auth_failure(&self) -> bool {
        matches!(self.status(), Some(401 | 403))
    }

    /// Returns `true` if this is a transient error worth retrying later.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::ConnectionClosed { .. } => true,
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_exposes_status() {
        let err = Error::Api {
            status: 403,
            message: "Forbidden".into(),
        };
        assert_eq!(err.status(), Some(403));
        assert!(err.is_auth_failure());
        assert!(!err.is_not_found());
        assert_eq!(err.to_string(), "qBittorrent API error (HTTP 403): Forbidden");
    }

    #[test]
    fn connection_closed_is_transient() {
        let err = Error::ConnectionClosed {
            url: "http://localhost:8080/api/v2/app/version".into(),
            message: "connection closed before message completed".into(),
        };
        assert!(err.is_transient());
        assert_eq!(err.status(), None);
    }
}
