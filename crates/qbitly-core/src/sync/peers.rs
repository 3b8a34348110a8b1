// ── Per-torrent peer synchronization ──

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use qbitly_api::QbitClient;
use qbitly_api::models::{Peer, TorrentPeersPatch};

use super::hub::SyncFeed;
use super::{Entry, merge_entry, typed};
use crate::error::CoreError;

/// Peers of one torrent as of the last applied `rid`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TorrentPeers {
    pub hash: String,
    pub rid: i64,
    pub full_update: bool,
    /// Whether the daemon resolves peer countries (`show_flags`).
    pub show_flags: bool,
    /// Keyed by `ip:port`.
    pub peers: HashMap<String, Arc<Peer>>,
}

#[derive(Debug)]
pub(crate) struct PeersFeed {
    hash: String,
    rid: i64,
    show_flags: bool,
    peers: HashMap<String, Entry<Peer>>,
}

impl PeersFeed {
    pub(crate) fn new(hash: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            rid: 0,
            show_flags: false,
            peers: HashMap::new(),
        }
    }

    pub(crate) fn apply(&mut self, patch: TorrentPeersPatch) -> Result<TorrentPeers, CoreError> {
        if patch.full_update {
            self.peers.clear();
        }
        for key in &patch.peers_removed {
            self.peers.remove(key);
        }
        for (key, fields) in patch.peers {
            merge_entry(&mut self.peers, key, fields, None)?;
        }
        if let Some(show_flags) = patch.show_flags {
            self.show_flags = show_flags;
        }
        self.rid = patch.rid;

        Ok(TorrentPeers {
            hash: self.hash.clone(),
            rid: self.rid,
            full_update: patch.full_update,
            show_flags: self.show_flags,
            peers: typed(&self.peers),
        })
    }
}

impl SyncFeed for PeersFeed {
    type Item = TorrentPeers;

    fn poll<'a>(
        &'a mut self,
        client: &'a QbitClient,
    ) -> BoxFuture<'a, Result<Arc<TorrentPeers>, CoreError>> {
        Box::pin(async move {
            let patch = client.sync_torrent_peers(&self.hash, self.rid).await?;
            Ok(Arc::new(self.apply(patch)?))
        })
    }
}
