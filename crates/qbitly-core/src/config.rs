// ── Runtime connection configuration ──
//
// These types describe *how* to connect to a qBittorrent instance. They
// carry credentials and connection tuning but never touch disk; the CLI
// builds a `ControllerConfig` and hands it in.

use std::time::Duration;

use qbitly_api::LoginHandler;
use secrecy::SecretString;
use url::Url;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (self-signed WebUI certificates).
    DangerAcceptInvalid,
}

/// Configuration for connecting to a single qBittorrent instance.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// WebUI root (e.g., `http://localhost:8080`).
    pub url: Url,
    pub username: String,
    pub password: SecretString,
    /// Custom login call; the standard form login is used when `None`.
    pub login: Option<LoginHandler>,
    pub tls: TlsVerification,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Delay between two sync polls of an active stream.
    pub sync_interval: Duration,
}

impl ControllerConfig {
    /// Config for `url` with the stock `admin` account and default timings.
    pub fn new(url: Url) -> Self {
        Self {
            url,
            username: "admin".into(),
            password: SecretString::from(String::new()),
            login: None,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            sync_interval: Duration::from_secs(5),
        }
    }
}
