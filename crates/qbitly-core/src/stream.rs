// ── Live sync streams ──
//
// Consumer-facing `Stream` types over the polling hubs. A stream attaches
// to its hub on first poll and detaches when dropped, so creating one and
// never polling it costs nothing.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_stream::stream;
use futures_core::Stream;

use crate::error::CoreError;
use crate::sync::hub::{FeedState, Subscription};

/// A live stream of snapshots.
///
/// Yields `Ok` for each new snapshot, at most one `Err` (after which the
/// stream ends), and ends without an item when a projection decides there
/// is nothing to observe.
pub struct SyncStream<T> {
    inner: Pin<Box<dyn Stream<Item = Result<Arc<T>, CoreError>> + Send>>,
}

impl<T> SyncStream<T> {
    pub(crate) fn new(inner: impl Stream<Item = Result<Arc<T>, CoreError>> + Send + 'static) -> Self {
        Self {
            inner: Box::pin(inner),
        }
    }
}

impl<T> std::fmt::Debug for SyncStream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncStream").finish_non_exhaustive()
    }
}

impl<T> Stream for SyncStream<T> {
    type Item = Result<Arc<T>, CoreError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

/// Stream every state an activation publishes, attaching lazily.
pub(crate) fn from_hub<T, A>(attach: A) -> SyncStream<T>
where
    T: Send + Sync + 'static,
    A: FnOnce() -> Subscription<T> + Send + 'static,
{
    SyncStream::new(stream! {
        let mut sub = attach();
        loop {
            let state = sub.rx.borrow_and_update().clone();
            match state {
                FeedState::Pending => {}
                FeedState::Ready(snapshot) => yield Ok(snapshot),
                FeedState::Failed(err) => {
                    yield Err(err);
                    break;
                }
            }
            if sub.rx.changed().await.is_err() {
                // The sync task exited without publishing a failure.
                yield Err(CoreError::Internal("sync task stopped unexpectedly".into()));
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures_util::StreamExt;
    use futures_util::future::BoxFuture;
    use qbitly_api::QbitClient;
    use secrecy::SecretString;
    use url::Url;

    use super::*;
    use crate::sync::hub::{PollHub, SyncFeed};

    /// A feed whose task dies on its first poll without publishing.
    struct Crashing(&'static str);

    impl SyncFeed for Crashing {
        type Item = ();

        fn poll<'a>(&'a mut self, _client: &'a QbitClient) -> BoxFuture<'a, Result<Arc<()>, CoreError>> {
            Box::pin(async move {
                assert!(self.0.is_empty(), "{}", self.0);
                Ok(Arc::new(()))
            })
        }
    }

    #[tokio::test]
    async fn dead_sync_task_ends_stream_with_error() {
        let client = QbitClient::new(qbitly_api::ClientConfig::new(
            Url::parse("http://127.0.0.1:9").expect("valid URL"),
            "admin",
            SecretString::from(String::new()),
        ))
        .expect("client builds");
        let hub = Arc::new(PollHub::new("crash", client, Duration::from_millis(5), || {
            Crashing("feed crashed")
        }));

        let mut stream = from_hub(move || hub.attach());
        let item = tokio::time::timeout(Duration::from_secs(5), stream.next())
            .await
            .expect("stream settles");

        assert!(
            matches!(item, Some(Err(CoreError::Internal(_)))),
            "expected an internal error, got: {item:?}"
        );
        assert!(stream.next().await.is_none());
    }
}
