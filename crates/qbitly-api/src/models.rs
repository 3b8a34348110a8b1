// Web API response types
//
// Models for the qBittorrent Web API (v2). Field presence differs across
// daemon versions and sync patches only carry changed fields, so most
// structs are `#[serde(default)]` as a whole.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// An untyped JSON object, the unit of incremental sync patches.
pub type JsonObject = serde_json::Map<String, serde_json::Value>;

// ── Torrent ──────────────────────────────────────────────────────────

/// Torrent as returned by `torrents/info` and carried in main data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Torrent {
    pub hash: String,
    pub name: String,
    pub state: TorrentState,
    /// Selected size in bytes.
    pub size: i64,
    pub total_size: i64,
    /// 0.0 ..= 1.0
    pub progress: f64,
    pub dlspeed: i64,
    pub upspeed: i64,
    pub downloaded: i64,
    pub uploaded: i64,
    pub amount_left: i64,
    pub ratio: f64,
    /// Seconds; 8640000 means infinity.
    pub eta: i64,
    pub category: String,
    /// Comma-separated.
    pub tags: String,
    pub save_path: String,
    pub content_path: String,
    pub added_on: i64,
    pub completion_on: i64,
    pub last_activity: i64,
    pub num_seeds: i64,
    pub num_leechs: i64,
    pub num_complete: i64,
    pub num_incomplete: i64,
    pub dl_limit: i64,
    pub up_limit: i64,
    pub priority: i64,
    pub seq_dl: bool,
    pub f_l_piece_prio: bool,
    pub force_start: bool,
    pub super_seeding: bool,
    pub auto_tmm: bool,
    pub availability: f64,
    pub tracker: String,
    pub magnet_uri: String,
}

impl Torrent {
    /// Tags as a list.
    pub fn tag_list(&self) -> Vec<&str> {
        self.tags
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.progress >= 1.0
    }
}

/// Torrent state as reported by the daemon.
///
/// qBittorrent 5 renamed `paused*` to `stopped*`; both spellings are kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString)]
pub enum TorrentState {
    #[strum(serialize = "error")]
    Error,
    #[strum(serialize = "missingFiles")]
    MissingFiles,
    #[strum(serialize = "uploading")]
    Uploading,
    #[strum(serialize = "pausedUP")]
    PausedUp,
    #[strum(serialize = "stoppedUP")]
    StoppedUp,
    #[strum(serialize = "queuedUP")]
    QueuedUp,
    #[strum(serialize = "stalledUP")]
    StalledUp,
    #[strum(serialize = "checkingUP")]
    CheckingUp,
    #[strum(serialize = "forcedUP")]
    ForcedUp,
    #[strum(serialize = "allocating")]
    Allocating,
    #[strum(serialize = "downloading")]
    Downloading,
    #[strum(serialize = "metaDL")]
    MetaDl,
    #[strum(serialize = "forcedMetaDL")]
    ForcedMetaDl,
    #[strum(serialize = "pausedDL")]
    PausedDl,
    #[strum(serialize = "stoppedDL")]
    StoppedDl,
    #[strum(serialize = "queuedDL")]
    QueuedDl,
    #[strum(serialize = "stalledDL")]
    StalledDl,
    #[strum(serialize = "checkingDL")]
    CheckingDl,
    #[strum(serialize = "forcedDL")]
    ForcedDl,
    #[strum(serialize = "checkingResumeData")]
    CheckingResumeData,
    #[strum(serialize = "moving")]
    Moving,
    #[default]
    #[strum(serialize = "unknown")]
    Unknown,
}

impl Serialize for TorrentState {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TorrentState {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(raw.parse().unwrap_or_default())
    }
}

impl TorrentState {
    pub fn is_paused(self) -> bool {
        matches!(
            self,
            Self::PausedUp | Self::PausedDl | Self::StoppedUp | Self::StoppedDl
        )
    }

    pub fn is_error(self) -> bool {
        matches!(self, Self::Error | Self::MissingFiles)
    }
}

/// Server-side filter for `torrents/info`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum TorrentFilter {
    #[default]
    All,
    Downloading,
    Completed,
    Paused,
    Active,
    Inactive,
    Resumed,
    Stalled,
    StalledUploading,
    StalledDownloading,
}

impl Serialize for TorrentFilter {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Generic properties from `torrents/properties`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TorrentProperties {
    pub save_path: String,
    pub comment: String,
    pub created_by: String,
    pub creation_date: i64,
    pub addition_date: i64,
    pub completion_date: i64,
    pub last_seen: i64,
    pub piece_size: i64,
    pub pieces_have: i64,
    pub pieces_num: i64,
    pub total_size: i64,
    pub total_downloaded: i64,
    pub total_uploaded: i64,
    pub total_wasted: i64,
    pub dl_speed: i64,
    pub dl_speed_avg: i64,
    pub up_speed: i64,
    pub up_speed_avg: i64,
    pub dl_limit: i64,
    pub up_limit: i64,
    pub share_ratio: f64,
    pub time_elapsed: i64,
    pub seeding_time: i64,
    pub eta: i64,
    pub nb_connections: i64,
    pub peers: i64,
    pub peers_total: i64,
    pub seeds: i64,
    pub seeds_total: i64,
    pub reannounce: i64,
}

/// One file inside a torrent, from `torrents/files`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TorrentFile {
    pub index: i64,
    pub name: String,
    pub size: i64,
    pub progress: f64,
    /// 0 = skip, 1 = normal, 6 = high, 7 = maximal.
    pub priority: i64,
    pub is_seed: bool,
    pub piece_range: Vec<i64>,
    pub availability: f64,
}

// ── Categories & server ──────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Category {
    pub name: String,
    #[serde(rename = "savePath")]
    pub save_path: String,
}

/// Global transfer state carried in main data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerState {
    pub connection_status: String,
    pub dl_info_speed: i64,
    pub dl_info_data: i64,
    pub up_info_speed: i64,
    pub up_info_data: i64,
    pub dl_rate_limit: i64,
    pub up_rate_limit: i64,
    pub alltime_dl: i64,
    pub alltime_ul: i64,
    pub dht_nodes: i64,
    pub free_space_on_disk: i64,
    pub queueing: bool,
    pub use_alt_speed_limits: bool,
    pub refresh_interval: i64,
}

/// Library versions from `app/buildInfo`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildInfo {
    pub qt: String,
    pub libtorrent: String,
    pub boost: String,
    pub openssl: String,
    pub zlib: String,
    pub bitness: i64,
}

// ── Peer ─────────────────────────────────────────────────────────────

/// A connected peer, keyed `ip:port` in the peers sync endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Peer {
    pub ip: String,
    pub port: u16,
    pub client: String,
    pub connection: String,
    pub country: String,
    pub country_code: String,
    pub flags: String,
    pub flags_desc: String,
    pub progress: f64,
    pub relevance: f64,
    pub dl_speed: i64,
    pub up_speed: i64,
    pub downloaded: i64,
    pub uploaded: i64,
    pub files: String,
}

// ── Sync patches ─────────────────────────────────────────────────────

/// Raw response of `sync/maindata`.
///
/// With `full_update` set, the maps hold complete entities; otherwise they
/// hold only the fields that changed since the requested `rid`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MainDataPatch {
    pub rid: i64,
    pub full_update: bool,
    pub torrents: HashMap<String, JsonObject>,
    pub torrents_removed: Vec<String>,
    pub categories: HashMap<String, JsonObject>,
    pub categories_removed: Vec<String>,
    pub tags: Vec<String>,
    pub tags_removed: Vec<String>,
    pub server_state: Option<JsonObject>,
}

/// Raw response of `sync/torrentPeers`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TorrentPeersPatch {
    pub rid: i64,
    pub full_update: bool,
    pub show_flags: Option<bool>,
    pub peers: HashMap<String, JsonObject>,
    pub peers_removed: Vec<String>,
}
