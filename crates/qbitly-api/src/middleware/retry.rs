// Transient-disconnect retry.
//
// qBittorrent occasionally accepts a request and then closes the
// connection before writing any response. Such a request is sent exactly
// once more; every other outcome passes through untouched.

use futures_util::future::BoxFuture;
use reqwest::{Request, Response};
use tracing::debug;

use super::{Middleware, Next};
use crate::error::Error;

/// Re-sends a request once when the transport reports
/// [`Error::ConnectionClosed`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DisconnectRetry;

impl Middleware for DisconnectRetry {
    fn handle(&self, request: Request, next: Next) -> BoxFuture<'_, Result<Response, Error>> {
        Box::pin(async move {
            // Streaming bodies cannot be rebuilt; such requests get one attempt.
            let replay = request.try_clone();

            match next.clone().run(request).await {
                Err(Error::ConnectionClosed { url, message }) => match replay {
                    Some(replay) => {
                        debug!(%url, %message, "connection closed before response, retrying once");
                        next.run(replay).await
                    }
                    None => Err(Error::ConnectionClosed { url, message }),
                },
                other => other,
            }
        })
    }
}
