// qbitly-core: Sync engine and controller facade between qbitly-api and consumers (CLI).

pub mod config;
pub mod controller;
pub mod error;
pub mod stream;
mod sync;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{ControllerConfig, TlsVerification};
pub use controller::Controller;
pub use error::CoreError;
pub use stream::SyncStream;
pub use sync::{MainData, TorrentPeers};

// Re-export API model types at the crate root for ergonomics.
pub use qbitly_api::models::{
    Category, Peer, ServerState, Torrent, TorrentFile, TorrentFilter, TorrentProperties,
    TorrentState,
};
pub use qbitly_api::{AddTorrent, Error as ApiError, LoginHandler, TorrentQuery, TorrentUpload};
