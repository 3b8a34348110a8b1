// qbitly-api: Async Rust client for the qBittorrent Web API (v2)

pub mod auth;
pub mod client;
pub mod error;
pub mod middleware;
pub mod models;
pub mod transport;

mod app;
mod sync;
mod torrents;

pub use auth::{AuthCoordinator, AuthOutcome, Credentials, LoginHandler, Session, SessionStore};
pub use client::{ClientConfig, QbitClient};
pub use error::Error;
pub use torrents::{AddTorrent, TorrentQuery, TorrentUpload};
pub use transport::{TlsMode, Transport, TransportConfig};
