// Session authentication
//
// The Web API authenticates with an `SID` cookie handed out by
// `POST /api/v2/auth/login`. A login succeeded only if the call returned a
// success status *and* the body `Ok.`; the daemon answers `200 Fails.` for
// bad credentials. The `AuthCoordinator` makes sure at most one login is in
// flight no matter how many requests are denied at the same time.

use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use reqwest::header::REFERER;
use reqwest::{Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::{Mutex, watch};
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::middleware::Next;

/// Body the daemon returns for a successful login.
pub const LOGIN_SUCCESS_BODY: &str = "Ok.";

/// Path of the login endpoint relative to the WebUI root.
pub const LOGIN_PATH: &str = "api/v2/auth/login";

// ── Credentials ──────────────────────────────────────────────────────

/// Immutable login material for one daemon.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub base_url: Url,
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(base_url: Url, username: impl Into<String>, password: SecretString) -> Self {
        Self {
            base_url,
            username: username.into(),
            password,
        }
    }

    /// Absolute URL of the login endpoint.
    pub fn login_url(&self) -> Result<Url, Error> {
        crate::client::endpoint_url(&self.base_url, LOGIN_PATH)
    }
}

// ── Auth outcome ─────────────────────────────────────────────────────

/// The HTTP outcome of a login attempt (or of a denied request).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthOutcome {
    pub status: StatusCode,
    pub body: String,
}

impl AuthOutcome {
    /// Read status and body out of a login response.
    pub async fn from_response(response: Response) -> Result<Self, Error> {
        let status = response.status();
        let body = response.text().await.map_err(Error::Transport)?;
        Ok(Self { status, body })
    }

    /// Record of a 401/403 whose body stays with the caller.
    pub fn denied(status: StatusCode) -> Self {
        Self {
            status,
            body: String::new(),
        }
    }

    /// `true` iff the status is a success and the body is `Ok.`
    /// (case-insensitive).
    pub fn is_valid(&self) -> bool {
        self.status.is_success() && self.body.trim().eq_ignore_ascii_case(LOGIN_SUCCESS_BODY)
    }

    /// Convert an invalid outcome into the protocol error surfaced to callers.
    pub fn into_error(self) -> Error {
        Error::Api {
            status: self.status.as_u16(),
            message: self.body,
        }
    }
}

// ── Session store ────────────────────────────────────────────────────

/// Latest authentication state.
///
/// `generation` increases on every recorded outcome, so a caller can tell
/// whether anything happened since it sent its request.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub generation: u64,
    pub outcome: Option<Arc<AuthOutcome>>,
}

impl Session {
    pub fn is_valid(&self) -> bool {
        self.outcome.as_ref().is_some_and(|o| o.is_valid())
    }
}

/// Single-slot, observable holder of the last [`AuthOutcome`].
///
/// Last write wins; readers never wait on writers.
#[derive(Debug)]
pub struct SessionStore {
    tx: watch::Sender<Session>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Session::default());
        Self { tx }
    }

    /// Snapshot of the current session.
    pub fn current(&self) -> Session {
        self.tx.borrow().clone()
    }

    /// Current generation counter.
    pub fn generation(&self) -> u64 {
        self.tx.borrow().generation
    }

    /// Observe session changes.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.tx.subscribe()
    }

    /// Store a fresh outcome unconditionally.
    pub fn store(&self, outcome: AuthOutcome) -> Arc<AuthOutcome> {
        let outcome = Arc::new(outcome);
        self.tx.send_modify(|session| {
            session.generation += 1;
            session.outcome = Some(Arc::clone(&outcome));
        });
        outcome
    }

    /// Store a denial, unless the session moved on since `seen`.
    ///
    /// A slow 403 for a request sent before a newer login must not clobber
    /// that login's outcome.
    pub fn record_denial(&self, outcome: AuthOutcome, seen: u64) -> bool {
        self.tx.send_if_modified(|session| {
            if session.generation != seen {
                return false;
            }
            session.generation += 1;
            session.outcome = Some(Arc::new(outcome));
            true
        })
    }
}

// ── Login handler ────────────────────────────────────────────────────

type LoginFuture = BoxFuture<'static, Result<Response, Error>>;

/// Performs the login call.
///
/// Receives the continuation the request should be sent through and the
/// configured credentials. The default is [`LoginHandler::form`].
#[derive(Clone)]
pub struct LoginHandler(Arc<dyn Fn(Next, Credentials) -> LoginFuture + Send + Sync>);

impl fmt::Debug for LoginHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LoginHandler(..)")
    }
}

impl Default for LoginHandler {
    fn default() -> Self {
        Self::form()
    }
}

impl LoginHandler {
    /// Wrap a custom login function.
    pub fn new<F>(login: F) -> Self
    where
        F: Fn(Next, Credentials) -> LoginFuture + Send + Sync + 'static,
    {
        Self(Arc::new(login))
    }

    /// Standard WebUI login: urlencoded `username` / `password` with a
    /// `Referer` header (required when CSRF protection is on).
    pub fn form() -> Self {
        Self::new(|next: Next, credentials: Credentials| {
            Box::pin(async move {
                let url = credentials.login_url()?;
                debug!(%url, "logging in");
                let request = next
                    .http()
                    .post(url)
                    .header(REFERER, credentials.base_url.as_str())
                    .form(&[
                        ("username", credentials.username.as_str()),
                        ("password", credentials.password.expose_secret()),
                    ])
                    .build()?;
                next.run(request).await
            })
        })
    }

    fn call(&self, next: Next, credentials: Credentials) -> LoginFuture {
        (self.0)(next, credentials)
    }
}

// ── Coordinator ──────────────────────────────────────────────────────

/// Serializes logins and shares their outcome with every waiter.
#[derive(Debug)]
pub struct AuthCoordinator {
    lock: Mutex<()>,
    store: SessionStore,
    credentials: Credentials,
    login: LoginHandler,
}

impl AuthCoordinator {
    pub fn new(credentials: Credentials, login: LoginHandler) -> Self {
        Self {
            lock: Mutex::new(()),
            store: SessionStore::new(),
            credentials,
            login,
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Make sure a valid session exists.
    ///
    /// `seen` is the session generation observed when the denied request was
    /// sent. If a valid login was recorded after that point the call returns
    /// `true` without logging in again; otherwise exactly one login runs while
    /// the lock is held.
    pub async fn ensure_authenticated(&self, next: Next, seen: u64) -> Result<bool, Error> {
        let _guard = self.lock.lock().await;

        let session = self.store.current();
        if session.generation > seen && session.is_valid() {
            debug!("session refreshed while waiting, skipping login");
            return Ok(true);
        }

        let outcome = self.login_locked(next).await?;
        Ok(outcome.is_valid())
    }

    /// Log in unconditionally and return the recorded outcome.
    pub async fn authenticate(&self, next: Next) -> Result<Arc<AuthOutcome>, Error> {
        let _guard = self.lock.lock().await;
        self.login_locked(next).await
    }

    async fn login_locked(&self, next: Next) -> Result<Arc<AuthOutcome>, Error> {
        let response = self.login.call(next, self.credentials.clone()).await?;
        let outcome = AuthOutcome::from_response(response).await?;
        debug!(status = %outcome.status, valid = outcome.is_valid(), "login finished");

        let outcome = self.store.store(outcome);
        tokio::task::yield_now().await;
        Ok(outcome)
    }
}
