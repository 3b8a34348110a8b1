// ── Reference-counted polling hub ──
//
// One hub per logical stream. The first subscriber starts a polling task
// with a fresh feed (so the cursor restarts at 0); the last one to leave
// cancels it. Subscribers share the task through a `watch` channel.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::future::BoxFuture;
use qbitly_api::QbitClient;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::error::CoreError;

/// A stateful source of snapshots, polled once per tick.
pub(crate) trait SyncFeed: Send + 'static {
    type Item: Send + Sync + 'static;

    /// Issue one sync request and fold it into the feed's state.
    fn poll<'a>(
        &'a mut self,
        client: &'a QbitClient,
    ) -> BoxFuture<'a, Result<Arc<Self::Item>, CoreError>>;
}

/// What subscribers of an activation observe.
#[derive(Debug)]
pub(crate) enum FeedState<T> {
    /// No response yet.
    Pending,
    Ready(Arc<T>),
    /// Terminal until the hub is re-activated.
    Failed(CoreError),
}

impl<T> Clone for FeedState<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Pending => Self::Pending,
            Self::Ready(snapshot) => Self::Ready(Arc::clone(snapshot)),
            Self::Failed(err) => Self::Failed(err.clone()),
        }
    }
}

struct Activation<T> {
    cancel: CancellationToken,
    rx: watch::Receiver<FeedState<T>>,
}

struct HubState<T> {
    subscribers: usize,
    activation: Option<Activation<T>>,
}

pub(crate) struct PollHub<F: SyncFeed> {
    label: String,
    client: QbitClient,
    period: Duration,
    make_feed: Box<dyn Fn() -> F + Send + Sync>,
    state: Mutex<HubState<F::Item>>,
}

impl<F: SyncFeed> fmt::Debug for PollHub<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollHub")
            .field("label", &self.label)
            .field("subscribers", &self.subscriber_count())
            .finish_non_exhaustive()
    }
}

impl<F: SyncFeed> PollHub<F> {
    pub(crate) fn new(
        label: impl Into<String>,
        client: QbitClient,
        period: Duration,
        make_feed: impl Fn() -> F + Send + Sync + 'static,
    ) -> Self {
        Self {
            label: label.into(),
            client,
            period,
            make_feed: Box::new(make_feed),
            state: Mutex::new(HubState {
                subscribers: 0,
                activation: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HubState<F::Item>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a subscriber, starting the polling task on 0 -> 1.
    pub(crate) fn attach(self: &Arc<Self>) -> Subscription<F::Item> {
        let mut state = self.lock();
        state.subscribers += 1;

        let rx = if let Some(activation) = &state.activation {
            activation.rx.clone()
        } else {
            let cancel = CancellationToken::new();
            let (tx, rx) = watch::channel(FeedState::Pending);
            debug!(hub = %self.label, "activating sync");
            tokio::spawn(poll_loop(
                (self.make_feed)(),
                self.client.clone(),
                self.period,
                tx,
                cancel.clone(),
                self.label.clone(),
            ));
            state.activation = Some(Activation {
                cancel,
                rx: rx.clone(),
            });
            rx
        };

        Subscription {
            rx,
            _guard: DetachGuard(Arc::clone(self) as Arc<dyn Detach>),
        }
    }

    /// Whether a polling task is live (active and not failed).
    pub(crate) fn is_syncing(&self) -> bool {
        self.lock()
            .activation
            .as_ref()
            .is_some_and(|a| !a.cancel.is_cancelled())
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        self.lock().subscribers
    }
}

trait Detach: Send + Sync {
    fn detach(&self);
}

impl<F: SyncFeed> Detach for PollHub<F> {
    /// Unregister a subscriber, tearing the task down on 1 -> 0.
    fn detach(&self) {
        let mut state = self.lock();
        state.subscribers = state.subscribers.saturating_sub(1);
        if state.subscribers == 0 {
            if let Some(activation) = state.activation.take() {
                debug!(hub = %self.label, "last subscriber gone, stopping sync");
                activation.cancel.cancel();
            }
        }
    }
}

struct DetachGuard(Arc<dyn Detach>);

impl Drop for DetachGuard {
    fn drop(&mut self) {
        self.0.detach();
    }
}

/// One subscriber's handle on an activation. Dropping it detaches.
pub(crate) struct Subscription<T> {
    pub(crate) rx: watch::Receiver<FeedState<T>>,
    _guard: DetachGuard,
}

async fn poll_loop<F: SyncFeed>(
    mut feed: F,
    client: QbitClient,
    period: Duration,
    tx: watch::Sender<FeedState<F::Item>>,
    cancel: CancellationToken,
    label: String,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        trace!(hub = %label, "sync tick");
        let result = feed.poll(&client).await;

        // Deactivated while the request was in flight.
        if cancel.is_cancelled() {
            trace!(hub = %label, "discarding result of cancelled sync");
            break;
        }

        match result {
            Ok(snapshot) => {
                tx.send_replace(FeedState::Ready(snapshot));
            }
            Err(err) => {
                warn!(hub = %label, error = %err, "sync failed, stopping stream");
                cancel.cancel();
                tx.send_replace(FeedState::Failed(err));
                break;
            }
        }
    }
    debug!(hub = %label, "sync stopped");
}
