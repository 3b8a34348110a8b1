// Re-authentication on 401/403.
//
// A denied request records the denial, waits for the coordinator to
// produce a valid session (logging in at most once across all concurrent
// callers), then replays the original request exactly once.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use reqwest::{Request, Response, StatusCode};
use tracing::{debug, warn};

use super::{Middleware, Next};
use crate::auth::{AuthCoordinator, AuthOutcome};
use crate::error::Error;

/// Middleware that heals expired sessions.
#[derive(Debug, Clone)]
pub struct AuthRetry {
    coordinator: Arc<AuthCoordinator>,
}

impl AuthRetry {
    pub fn new(coordinator: Arc<AuthCoordinator>) -> Self {
        Self { coordinator }
    }
}

/// The login call itself is never intercepted.
fn is_login(request: &Request) -> bool {
    request
        .url()
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .is_some_and(|last| last == "login")
}

fn is_denied(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
}

impl Middleware for AuthRetry {
    fn handle(&self, request: Request, next: Next) -> BoxFuture<'_, Result<Response, Error>> {
        Box::pin(async move {
            if is_login(&request) {
                return next.run(request).await;
            }

            let seen = self.coordinator.store().generation();
            let replay = request.try_clone();
            let response = next.clone().run(request).await?;

            let status = response.status();
            if !is_denied(status) {
                return Ok(response);
            }
            let Some(replay) = replay else {
                return Ok(response);
            };

            debug!(url = %response.url(), %status, "request denied, re-authenticating");
            self.coordinator
                .store()
                .record_denial(AuthOutcome::denied(status), seen);

            if self.coordinator.ensure_authenticated(next.clone(), seen).await? {
                next.run(replay).await
            } else {
                warn!(%status, "re-authentication failed");
                Ok(response)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(url: &str) -> Request {
        reqwest::Client::new()
            .get(url)
            .build()
            .expect("request builds")
    }

    #[test]
    fn login_path_is_recognized() {
        assert!(is_login(&request("http://localhost:8080/api/v2/auth/login")));
        assert!(!is_login(&request("http://localhost:8080/api/v2/auth/logout")));
        assert!(!is_login(&request(
            "http://localhost:8080/api/v2/sync/maindata?rid=0"
        )));
    }

    #[test]
    fn only_401_and_403_trigger_reauth() {
        assert!(is_denied(StatusCode::UNAUTHORIZED));
        assert!(is_denied(StatusCode::FORBIDDEN));
        assert!(!is_denied(StatusCode::NOT_FOUND));
        assert!(!is_denied(StatusCode::OK));
    }
}
