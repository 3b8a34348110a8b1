// Web API HTTP client
//
// Wraps the middleware chain with qBittorrent URL construction, status
// checking, and body decoding. Endpoint groups (app, torrents, sync) are
// implemented as inherent methods in separate files so this module stays
// focused on request mechanics.

use std::sync::Arc;

use reqwest::multipart::Form;
use reqwest::{RequestBuilder, Response};
use secrecy::SecretString;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tracing::debug;
use url::Url;

use crate::auth::{AuthCoordinator, Credentials, LoginHandler, Session};
use crate::error::Error;
use crate::middleware::{AuthRetry, Chain, DisconnectRetry, Middleware};
use crate::transport::{Transport, TransportConfig};

/// Body qBittorrent returns when it refuses a command.
pub(crate) const REJECTED_BODY: &str = "Fails.";

/// Empty query string for endpoints without parameters.
pub(crate) const NO_QUERY: &[(&str, &str)] = &[];

/// Join `path` onto the WebUI root, tolerating a trailing slash on the base.
pub(crate) fn endpoint_url(base: &Url, path: &str) -> Result<Url, Error> {
    let base = base.as_str().trim_end_matches('/');
    Ok(Url::parse(&format!("{base}/{path}"))?)
}

/// Everything needed to talk to one qBittorrent instance.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// WebUI root, e.g. `http://localhost:8080`.
    pub base_url: Url,
    pub username: String,
    pub password: SecretString,
    /// Replaces the standard form login when set.
    pub login: Option<LoginHandler>,
    pub transport: TransportConfig,
}

impl ClientConfig {
    pub fn new(base_url: Url, username: impl Into<String>, password: SecretString) -> Self {
        Self {
            base_url,
            username: username.into(),
            password,
            login: None,
            transport: TransportConfig::default(),
        }
    }
}

struct ClientInner {
    base_url: Url,
    chain: Chain,
    coordinator: Arc<AuthCoordinator>,
}

/// Async client for the qBittorrent Web API (v2).
///
/// Every call runs through `[AuthRetry, DisconnectRetry] -> transport`, so
/// an expired session is healed with a single shared login and a connection
/// dropped before any response is retried once. Cheap to clone.
#[derive(Clone)]
pub struct QbitClient {
    inner: Arc<ClientInner>,
}

impl std::fmt::Debug for QbitClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QbitClient")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl QbitClient {
    /// Create a client whose transport is a cookie-enabled `reqwest::Client`.
    pub fn new(config: ClientConfig) -> Result<Self, Error> {
        let http = Self::http_client(&config.transport)?;
        let transport: Arc<dyn Transport> = Arc::new(http.clone());
        Ok(Self::assemble(config, http, transport))
    }

    /// Create a client that sends through a custom [`Transport`].
    ///
    /// Requests are still built with a `reqwest::Client` derived from
    /// `config.transport`.
    pub fn with_transport(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, Error> {
        let http = Self::http_client(&config.transport)?;
        Ok(Self::assemble(config, http, transport))
    }

    fn http_client(transport: &TransportConfig) -> Result<reqwest::Client, Error> {
        // The session lives in the SID cookie; without a jar nothing sticks.
        let transport = if transport.cookie_jar.is_some() {
            transport.clone()
        } else {
            transport.clone().with_cookie_jar()
        };
        transport.build_client()
    }

    fn assemble(config: ClientConfig, http: reqwest::Client, transport: Arc<dyn Transport>) -> Self {
        let credentials = Credentials::new(config.base_url.clone(), config.username, config.password);
        let coordinator = Arc::new(AuthCoordinator::new(
            credentials,
            config.login.unwrap_or_default(),
        ));
        let middlewares: Vec<Arc<dyn Middleware>> = vec![
            Arc::new(AuthRetry::new(Arc::clone(&coordinator))),
            Arc::new(DisconnectRetry),
        ];

        Self {
            inner: Arc::new(ClientInner {
                base_url: config.base_url,
                chain: Chain::new(http, middlewares, transport),
                coordinator,
            }),
        }
    }

    /// The WebUI root this client talks to.
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// The underlying request builder client.
    pub fn http(&self) -> &reqwest::Client {
        self.inner.chain.http()
    }

    // ── Session ──────────────────────────────────────────────────────

    /// Log in explicitly.
    ///
    /// Fails with [`Error::Api`] carrying the login response's status and
    /// body when the outcome is not valid (e.g. `200` / `Fails.`).
    pub async fn login(&self) -> Result<(), Error> {
        let outcome = self
            .inner
            .coordinator
            .authenticate(self.inner.chain.start())
            .await?;
        if outcome.is_valid() {
            debug!("login successful");
            Ok(())
        } else {
            Err(outcome.as_ref().clone().into_error())
        }
    }

    /// End the session on the server.
    pub async fn logout(&self) -> Result<(), Error> {
        let url = self.api_url("auth/logout")?;
        self.send(self.http().post(url)).await?;
        debug!("logout complete");
        Ok(())
    }

    /// Observe the session state (generation counter + latest outcome).
    pub fn session(&self) -> watch::Receiver<Session> {
        self.inner.coordinator.store().subscribe()
    }

    /// Whether the last recorded outcome is a valid login.
    pub fn is_authenticated(&self) -> bool {
        self.inner.coordinator.store().current().is_valid()
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// `{base}/api/v2/{path}`
    pub(crate) fn api_url(&self, path: &str) -> Result<Url, Error> {
        endpoint_url(&self.inner.base_url, &format!("api/v2/{path}"))
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Build and send a request through the chain, turning any non-success
    /// status into [`Error::Api`].
    pub(crate) async fn send(&self, builder: RequestBuilder) -> Result<Response, Error> {
        let request = builder.build()?;
        debug!("{} {}", request.method(), request.url());

        let resp = self.inner.chain.execute(request).await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        let message = match body.trim() {
            "" => status.canonical_reason().unwrap_or_default().to_owned(),
            trimmed => trimmed.to_owned(),
        };
        Err(Error::Api {
            status: status.as_u16(),
            message,
        })
    }

    /// GET returning the body as text.
    pub(crate) async fn get_text(
        &self,
        path: &str,
        query: &(impl Serialize + ?Sized),
    ) -> Result<String, Error> {
        let url = self.api_url(path)?;
        let resp = self.send(self.http().get(url).query(query)).await?;
        resp.text().await.map_err(Error::Transport)
    }

    /// GET decoding a JSON body.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &(impl Serialize + ?Sized),
    ) -> Result<T, Error> {
        let body = self.get_text(path, query).await?;
        decode(&body)
    }

    /// POST an urlencoded form; `Fails.` becomes [`Error::Rejected`].
    pub(crate) async fn post_form(
        &self,
        path: &str,
        form: &(impl Serialize + ?Sized),
    ) -> Result<String, Error> {
        let url = self.api_url(path)?;
        let resp = self.send(self.http().post(url).form(form)).await?;
        let body = resp.text().await.map_err(Error::Transport)?;
        check_rejected(body)
    }

    /// POST a multipart form; `Fails.` becomes [`Error::Rejected`].
    ///
    /// Multipart bodies are streamed, so neither middleware can replay them.
    pub(crate) async fn post_multipart(&self, path: &str, form: Form) -> Result<String, Error> {
        let url = self.api_url(path)?;
        let resp = self.send(self.http().post(url).multipart(form)).await?;
        let body = resp.text().await.map_err(Error::Transport)?;
        check_rejected(body)
    }
}

fn check_rejected(body: String) -> Result<String, Error> {
    if body.trim().eq_ignore_ascii_case(REJECTED_BODY) {
        Err(Error::Rejected { message: body })
    } else {
        Ok(body)
    }
}

/// Decode a JSON body, keeping a preview of the payload in the error.
pub(crate) fn decode<T: DeserializeOwned>(body: &str) -> Result<T, Error> {
    serde_json::from_str(body).map_err(|e| {
        let preview: String = body.chars().take(200).collect();
        Error::Deserialization {
            message: format!("{e} (body preview: {preview:?})"),
            body: body.to_owned(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_url_handles_trailing_slash() {
        let with = Url::parse("http://localhost:8080/").expect("valid URL");
        let without = Url::parse("http://localhost:8080").expect("valid URL");
        for base in [with, without] {
            assert_eq!(
                endpoint_url(&base, "api/v2/app/version")
                    .expect("valid URL")
                    .as_str(),
                "http://localhost:8080/api/v2/app/version"
            );
        }
    }

    #[test]
    fn rejected_body_is_an_error() {
        assert!(matches!(
            check_rejected("Fails.".into()),
            Err(Error::Rejected { .. })
        ));
        assert_eq!(check_rejected("Ok.".into()).expect("accepted"), "Ok.");
    }

    #[test]
    fn decode_error_keeps_body() {
        let err = decode::<Vec<u32>>("not json").expect_err("must fail");
        match err {
            Error::Deserialization { message, body } => {
                assert!(message.contains("body preview"));
                assert_eq!(body, "not json");
            }
            other => panic!("expected Deserialization, got: {other:?}"),
        }
    }
}
