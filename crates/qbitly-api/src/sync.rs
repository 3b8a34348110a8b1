// Incremental sync endpoints
//
// Both endpoints take the last `rid` the caller has seen and return either
// a full snapshot (`full_update`) or only what changed since then. Merging
// is left to the caller; see `qbitly-core`'s sync engine.

use tracing::trace;

use crate::client::QbitClient;
use crate::error::Error;
use crate::models::{MainDataPatch, TorrentPeersPatch};

impl QbitClient {
    /// `GET /api/v2/sync/maindata?rid={rid}`
    pub async fn sync_main_data(&self, rid: i64) -> Result<MainDataPatch, Error> {
        trace!(rid, "syncing main data");
        self.get_json("sync/maindata", &[("rid", rid)]).await
    }

    /// `GET /api/v2/sync/torrentPeers?hash={hash}&rid={rid}`
    pub async fn sync_torrent_peers(
        &self,
        hash: &str,
        rid: i64,
    ) -> Result<TorrentPeersPatch, Error> {
        trace!(hash, rid, "syncing torrent peers");
        let rid = rid.to_string();
        self.get_json("sync/torrentPeers", &[("hash", hash), ("rid", rid.as_str())])
            .await
    }
}
