//! Ordered request middleware.
//!
//! Every outbound call runs through a [`Chain`]: a fixed list of
//! [`Middleware`] values followed by a [`Transport`]. Each middleware
//! receives the request and a [`Next`] continuation for the remainder of
//! the chain, so it can inspect the outcome, rebuild the request, and send
//! it again.
//!
//! The default chain used by [`QbitClient`](crate::QbitClient) is
//! `[AuthRetry, DisconnectRetry] -> reqwest::Client`.

mod auth_retry;
mod retry;

use std::sync::Arc;

use futures_util::future::BoxFuture;
use reqwest::{Request, Response};

use crate::error::Error;
use crate::transport::Transport;

pub use auth_retry::AuthRetry;
pub use retry::DisconnectRetry;

/// A single step wrapped around the rest of the chain.
pub trait Middleware: Send + Sync + 'static {
    fn handle(&self, request: Request, next: Next) -> BoxFuture<'_, Result<Response, Error>>;
}

struct ChainInner {
    http: reqwest::Client,
    middlewares: Vec<Arc<dyn Middleware>>,
    transport: Arc<dyn Transport>,
}

/// An immutable, cheaply cloneable middleware pipeline.
#[derive(Clone)]
pub struct Chain {
    inner: Arc<ChainInner>,
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chain")
            .field("middlewares", &self.inner.middlewares.len())
            .finish_non_exhaustive()
    }
}

impl Chain {
    /// Build a chain. `http` is used by middlewares that need to construct
    /// requests of their own (e.g. the login call); `transport` performs the
    /// actual send.
    pub fn new(
        http: reqwest::Client,
        middlewares: Vec<Arc<dyn Middleware>>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            inner: Arc::new(ChainInner {
                http,
                middlewares,
                transport,
            }),
        }
    }

    /// Continuation positioned at the first middleware.
    pub fn start(&self) -> Next {
        Next {
            chain: Arc::clone(&self.inner),
            index: 0,
        }
    }

    /// Run a request through the whole chain.
    pub async fn execute(&self, request: Request) -> Result<Response, Error> {
        self.start().run(request).await
    }

    /// The client used to build requests.
    pub fn http(&self) -> &reqwest::Client {
        &self.inner.http
    }
}

/// The remainder of a chain, from some middleware onward.
///
/// Owned and cloneable so a middleware can send more than once
/// (replays, login calls).
#[derive(Clone)]
pub struct Next {
    chain: Arc<ChainInner>,
    index: usize,
}

impl Next {
    /// Hand the request to the next middleware, or to the transport when
    /// none remain.
    pub fn run(self, request: Request) -> BoxFuture<'static, Result<Response, Error>> {
        Box::pin(async move {
            if let Some(middleware) = self.chain.middlewares.get(self.index) {
                let middleware = Arc::clone(middleware);
                let next = Self {
                    chain: Arc::clone(&self.chain),
                    index: self.index + 1,
                };
                middleware.handle(request, next).await
            } else {
                self.chain.transport.execute(request).await
            }
        })
    }

    /// The client used to build requests sent through this continuation.
    pub fn http(&self) -> &reqwest::Client {
        &self.chain.http
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Middleware for Recorder {
        fn handle(&self, request: Request, next: Next) -> BoxFuture<'_, Result<Response, Error>> {
            Box::pin(async move {
                self.log.lock().expect("log lock").push(self.name);
                next.run(request).await
            })
        }
    }

    struct Refuse;

    impl Transport for Refuse {
        fn execute(&self, _request: Request) -> BoxFuture<'_, Result<Response, Error>> {
            Box::pin(async {
                Err(Error::Api {
                    status: 503,
                    message: "unavailable".into(),
                })
            })
        }
    }

    #[tokio::test]
    async fn middlewares_run_in_declared_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = Chain::new(
            reqwest::Client::new(),
            vec![
                Arc::new(Recorder {
                    name: "outer",
                    log: Arc::clone(&log),
                }),
                Arc::new(Recorder {
                    name: "inner",
                    log: Arc::clone(&log),
                }),
            ],
            Arc::new(Refuse),
        );

        let request = chain
            .http()
            .get("http://localhost:8080/api/v2/app/version")
            .build()
            .expect("request builds");
        let result = chain.execute(request).await;

        assert!(matches!(result, Err(Error::Api { status: 503, .. })));
        assert_eq!(*log.lock().expect("log lock"), vec!["outer", "inner"]);
    }
}
