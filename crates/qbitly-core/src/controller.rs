// ── Controller abstraction ──
//
// Entry point for consumers: owns the API client and the sync hubs. One
// main-data hub is shared by every main-data and per-torrent stream; peer
// hubs are created per torrent hash on demand and pruned once idle.

use std::sync::Arc;

use async_stream::stream;
use dashmap::DashMap;
use futures_util::StreamExt;
use qbitly_api::models::Torrent;
use qbitly_api::transport::{TlsMode, TransportConfig};
use qbitly_api::{ClientConfig, QbitClient};
use tracing::debug;

use crate::config::{ControllerConfig, TlsVerification};
use crate::error::CoreError;
use crate::stream::{self, SyncStream};
use crate::sync::hub::PollHub;
use crate::sync::{MainData, MainDataFeed, PeersFeed, TorrentPeers};

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<ControllerInner>`.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    config: ControllerConfig,
    client: QbitClient,
    main_data: Arc<PollHub<MainDataFeed>>,
    peers: DashMap<String, Arc<PollHub<PeersFeed>>>,
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("url", &self.inner.config.url.as_str())
            .field("syncing", &self.is_syncing())
            .finish_non_exhaustive()
    }
}

impl Controller {
    /// Build a controller. No request is sent until the first call or the
    /// first polled stream.
    pub fn new(config: ControllerConfig) -> Result<Self, CoreError> {
        if config.sync_interval.is_zero() {
            return Err(CoreError::Config {
                message: "sync interval must be greater than zero".into(),
            });
        }

        let client = QbitClient::new(ClientConfig {
            base_url: config.url.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
            login: config.login.clone(),
            transport: build_transport(&config),
        })?;

        let main_data = Arc::new(PollHub::new(
            "maindata",
            client.clone(),
            config.sync_interval,
            MainDataFeed::default,
        ));

        Ok(Self {
            inner: Arc::new(ControllerInner {
                config,
                client,
                main_data,
                peers: DashMap::new(),
            }),
        })
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.inner.config
    }

    /// The underlying API client for one-shot calls.
    pub fn api(&self) -> &QbitClient {
        &self.inner.client
    }

    /// Log in explicitly. Automatic re-login happens on any denied request,
    /// so this is only needed to validate credentials up front.
    pub async fn login(&self) -> Result<(), CoreError> {
        Ok(self.inner.client.login().await?)
    }

    pub async fn logout(&self) -> Result<(), CoreError> {
        Ok(self.inner.client.logout().await?)
    }

    // ── Live streams ─────────────────────────────────────────────────

    /// Live global state. The first snapshot of an activation is always a
    /// full update.
    pub fn observe_main_data(&self) -> SyncStream<MainData> {
        let hub = Arc::clone(&self.inner.main_data);
        stream::from_hub(move || hub.attach())
    }

    /// Live view of one torrent.
    ///
    /// Emits whenever the torrent changes. When it is absent from a
    /// snapshot the stream completes, unless `wait_if_missing` is set, in
    /// which case it keeps waiting for the torrent to (re)appear.
    pub fn observe_torrent(&self, hash: &str, wait_if_missing: bool) -> SyncStream<Torrent> {
        let hash = hash.to_owned();
        let mut snapshots = self.observe_main_data();

        SyncStream::new(stream! {
            let mut last: Option<Arc<Torrent>> = None;
            while let Some(item) = snapshots.next().await {
                let data = match item {
                    Ok(data) => data,
                    Err(err) => {
                        yield Err(err);
                        break;
                    }
                };
                match data.torrents.get(&hash) {
                    Some(torrent) => {
                        let changed = last
                            .as_ref()
                            .is_none_or(|prev| !Arc::ptr_eq(prev, torrent) && **prev != **torrent);
                        if changed {
                            last = Some(Arc::clone(torrent));
                            yield Ok(Arc::clone(torrent));
                        }
                    }
                    None if wait_if_missing => last = None,
                    None => {
                        debug!(%hash, "torrent not present, completing stream");
                        break;
                    }
                }
            }
        })
    }

    /// Live peer list of one torrent. Subscribers of the same hash share
    /// one polling task.
    ///
    /// Emits the first snapshot, then only when the peer set or the
    /// `show_flags` setting changes.
    pub fn observe_torrent_peers(&self, hash: &str) -> SyncStream<TorrentPeers> {
        let hash = hash.to_owned();
        let inner = Arc::clone(&self.inner);
        let mut snapshots = stream::from_hub(move || inner.attach_peers(&hash));

        SyncStream::new(stream! {
            let mut last: Option<Arc<TorrentPeers>> = None;
            while let Some(item) = snapshots.next().await {
                let peers = match item {
                    Ok(peers) => peers,
                    Err(err) => {
                        yield Err(err);
                        break;
                    }
                };
                let changed = last.as_ref().is_none_or(|prev| {
                    prev.show_flags != peers.show_flags || prev.peers != peers.peers
                });
                if changed {
                    last = Some(Arc::clone(&peers));
                    yield Ok(peers);
                }
            }
        })
    }

    // ── Diagnostics ──────────────────────────────────────────────────

    /// Whether the main-data polling task is running.
    pub fn is_syncing(&self) -> bool {
        self.inner.main_data.is_syncing()
    }

    /// Whether peers of `hash` are being polled.
    pub fn is_syncing_peers(&self, hash: &str) -> bool {
        self.inner
            .peers
            .get(hash)
            .is_some_and(|hub| hub.is_syncing())
    }

    /// Live subscribers of the main-data hub (per-torrent streams included).
    pub fn main_data_subscribers(&self) -> usize {
        self.inner.main_data.subscriber_count()
    }
}

impl ControllerInner {
    fn attach_peers(&self, hash: &str) -> crate::sync::hub::Subscription<TorrentPeers> {
        self.peers.retain(|_, hub| hub.subscriber_count() > 0);

        // Attach while the entry is held so a concurrent prune cannot drop
        // the hub between lookup and attach.
        let hub = self.peers.entry(hash.to_owned()).or_insert_with(|| {
            let feed_hash = hash.to_owned();
            Arc::new(PollHub::new(
                format!("peers:{hash}"),
                self.client.clone(),
                self.config.sync_interval,
                move || PeersFeed::new(feed_hash.clone()),
            ))
        });
        hub.attach()
    }
}

// ── Helpers ──────────────────────────────────────────────────────

/// Build a [`TransportConfig`] from the controller configuration.
fn build_transport(config: &ControllerConfig) -> TransportConfig {
    TransportConfig {
        tls: tls_to_transport(&config.tls),
        timeout: config.timeout,
        cookie_jar: None, // QbitClient::new adds one automatically
    }
}

fn tls_to_transport(tls: &TlsVerification) -> TlsMode {
    match tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    }
}
