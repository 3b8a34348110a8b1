// ── Main data synchronization ──
//
// Folds `sync/maindata` responses into a cumulative snapshot. A full
// update replaces everything; a partial one removes entities first and
// then merges the changed fields of each remaining entity. Typed values
// are cached per entity and re-decoded only when a patch touches them.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use futures_util::future::BoxFuture;
use qbitly_api::QbitClient;
use qbitly_api::models::{Category, MainDataPatch, ServerState, Torrent};

use super::hub::SyncFeed;
use super::{Entry, decode, merge_entry, typed};
use crate::error::CoreError;

/// Global state as of the last applied `rid`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MainData {
    pub rid: i64,
    /// Set when this snapshot came from a full resync.
    pub full_update: bool,
    /// Keyed by info hash.
    pub torrents: HashMap<String, Arc<Torrent>>,
    /// Keyed by category name.
    pub categories: HashMap<String, Arc<Category>>,
    pub tags: BTreeSet<String>,
    pub server_state: Arc<ServerState>,
}

/// Incremental state behind [`MainData`]. One per activation.
#[derive(Debug, Default)]
pub(crate) struct MainDataFeed {
    rid: i64,
    torrents: HashMap<String, Entry<Torrent>>,
    categories: HashMap<String, Entry<Category>>,
    tags: BTreeSet<String>,
    server_state: Entry<ServerState>,
}

impl MainDataFeed {
    /// Fold a patch in and return the resulting snapshot.
    pub(crate) fn apply(&mut self, patch: MainDataPatch) -> Result<MainData, CoreError> {
        if patch.full_update {
            self.torrents.clear();
            self.categories.clear();
            self.tags.clear();
            self.server_state = Entry::default();
        }

        for hash in &patch.torrents_removed {
            self.torrents.remove(hash);
        }
        for name in &patch.categories_removed {
            self.categories.remove(name);
        }
        for tag in &patch.tags_removed {
            self.tags.remove(tag);
        }

        for (hash, fields) in patch.torrents {
            merge_entry(&mut self.torrents, hash, fields, Some("hash"))?;
        }
        for (name, fields) in patch.categories {
            merge_entry(&mut self.categories, name, fields, Some("name"))?;
        }
        self.tags.extend(patch.tags);
        if let Some(fields) = patch.server_state {
            self.server_state.raw.extend(fields);
            self.server_state.typed = Arc::new(decode(&self.server_state.raw)?);
        }

        self.rid = patch.rid;
        Ok(self.snapshot(patch.full_update))
    }

    fn snapshot(&self, full_update: bool) -> MainData {
        MainData {
            rid: self.rid,
            full_update,
            torrents: typed(&self.torrents),
            categories: typed(&self.categories),
            tags: self.tags.clone(),
            server_state: Arc::clone(&self.server_state.typed),
        }
    }
}

impl SyncFeed for MainDataFeed {
    type Item = MainData;

    fn poll<'a>(
        &'a mut self,
        client: &'a QbitClient,
    ) -> BoxFuture<'a, Result<Arc<MainData>, CoreError>> {
        Box::pin(async move {
            let patch = client.sync_main_data(self.rid).await?;
            Ok(Arc::new(self.apply(patch)?))
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn patch(value: serde_json::Value) -> MainDataPatch {
        serde_json::from_value(value).expect("valid patch")
    }

    #[test]
    fn full_update_builds_snapshot() {
        let mut feed = MainDataFeed::default();

        let data = feed
            .apply(patch(json!({
                "rid": 1,
                "full_update": true,
                "torrents": {
                    "abc": { "name": "debian.iso", "progress": 0.5, "state": "downloading" }
                },
                "categories": { "linux": { "name": "linux", "savePath": "/data/linux" } },
                "tags": ["iso"],
                "server_state": { "dl_info_speed": 1024, "connection_status": "connected" }
            })))
            .expect("applies");

        assert_eq!(data.rid, 1);
        assert!(data.full_update);
        assert_eq!(feed.rid, 1);
        let torrent = &data.torrents["abc"];
        assert_eq!(torrent.hash, "abc");
        assert_eq!(torrent.name, "debian.iso");
        assert_eq!(data.categories["linux"].save_path, "/data/linux");
        assert!(data.tags.contains("iso"));
        assert_eq!(data.server_state.dl_info_speed, 1024);
    }

    #[test]
    fn partial_update_merges_fields() {
        let mut feed = MainDataFeed::default();
        feed.apply(patch(json!({
            "rid": 1,
            "full_update": true,
            "torrents": { "abc": { "name": "debian.iso", "progress": 0.5, "dlspeed": 100 } }
        })))
        .expect("applies");

        let data = feed
            .apply(patch(json!({
                "rid": 2,
                "torrents": { "abc": { "progress": 0.75 } }
            })))
            .expect("applies");

        let torrent = &data.torrents["abc"];
        assert!(!data.full_update);
        assert_eq!(torrent.name, "debian.iso");
        assert_eq!(torrent.dlspeed, 100);
        assert!((torrent.progress - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn untouched_entities_keep_their_arc() {
        let mut feed = MainDataFeed::default();
        let first = feed
            .apply(patch(json!({
                "rid": 1,
                "full_update": true,
                "torrents": { "a": { "name": "a" }, "b": { "name": "b" } }
            })))
            .expect("applies");

        let second = feed
            .apply(patch(json!({ "rid": 2, "torrents": { "b": { "dlspeed": 5 } } })))
            .expect("applies");

        assert!(Arc::ptr_eq(&first.torrents["a"], &second.torrents["a"]));
        assert!(!Arc::ptr_eq(&first.torrents["b"], &second.torrents["b"]));
    }

    #[test]
    fn removals_apply_before_additions() {
        let mut feed = MainDataFeed::default();
        feed.apply(patch(json!({
            "rid": 1,
            "full_update": true,
            "torrents": { "abc": { "name": "old", "dlspeed": 9 } },
            "tags": ["a", "b"]
        })))
        .expect("applies");

        // Same hash removed and re-added in one patch: the re-add wins and
        // starts from scratch.
        let data = feed
            .apply(patch(json!({
                "rid": 2,
                "torrents_removed": ["abc"],
                "torrents": { "abc": { "name": "new" } },
                "tags_removed": ["a"]
            })))
            .expect("applies");

        let torrent = &data.torrents["abc"];
        assert_eq!(torrent.name, "new");
        assert_eq!(torrent.dlspeed, 0);
        assert_eq!(data.tags.iter().collect::<Vec<_>>(), vec!["b"]);
    }

    #[test]
    fn full_update_discards_previous_state() {
        let mut feed = MainDataFeed::default();
        feed.apply(patch(json!({
            "rid": 1,
            "full_update": true,
            "torrents": { "a": { "name": "a" } }
        })))
        .expect("applies");

        let data = feed
            .apply(patch(json!({
                "rid": 5,
                "full_update": true,
                "torrents": { "b": { "name": "b" } }
            })))
            .expect("applies");

        assert_eq!(data.torrents.len(), 1);
        assert!(data.torrents.contains_key("b"));
    }

    #[test]
    fn malformed_entity_is_decode_error() {
        let mut feed = MainDataFeed::default();
        let result = feed.apply(patch(json!({
            "rid": 1,
            "full_update": true,
            "torrents": { "a": { "name": 42 } }
        })));

        assert!(matches!(result, Err(CoreError::Deserialization { .. })));
    }
}
