#![allow(clippy::unwrap_used)]
// Integration tests for the sync engine using wiremock.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::StreamExt;
use serde_json::json;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use qbitly_core::{Controller, ControllerConfig, CoreError};

const WAIT: Duration = Duration::from_secs(5);

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, Controller) {
    let server = MockServer::start().await;
    let config = ControllerConfig {
        sync_interval: Duration::from_millis(20),
        ..ControllerConfig::new(Url::parse(&server.uri()).unwrap())
    };
    let controller = Controller::new(config).unwrap();
    (server, controller)
}

async fn mount_main_data(server: &MockServer, rid: i64, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/api/v2/sync/maindata"))
        .and(query_param("rid", rid.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn main_data_requests(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == "/api/v2/sync/maindata")
        .count()
}

async fn next<S: futures_util::Stream + Unpin>(stream: &mut S) -> Option<S::Item> {
    tokio::time::timeout(WAIT, stream.next()).await.unwrap()
}

// ── Main data ───────────────────────────────────────────────────────

#[test]
fn test_zero_sync_interval_is_rejected() {
    let config = ControllerConfig {
        sync_interval: Duration::ZERO,
        ..ControllerConfig::new(Url::parse("http://127.0.0.1:8080").unwrap())
    };

    let err = Controller::new(config).unwrap_err();

    assert!(
        matches!(err, CoreError::Config { ref message } if message.contains("sync interval")),
        "unexpected error: {err:?}"
    );
}

#[tokio::test]
async fn test_first_snapshot_is_full_update() {
    let (server, controller) = setup().await;
    mount_main_data(
        &server,
        0,
        json!({
            "rid": 1,
            "full_update": true,
            "torrents": { "abc": { "name": "debian.iso" } },
            "server_state": { "connection_status": "connected" }
        }),
    )
    .await;
    mount_main_data(&server, 1, json!({ "rid": 1 })).await;

    let mut stream = controller.observe_main_data();
    let data = next(&mut stream).await.unwrap().unwrap();

    assert_eq!(data.rid, 1);
    assert!(data.full_update);
    assert_eq!(data.torrents["abc"].name, "debian.iso");
    assert_eq!(data.server_state.connection_status, "connected");
}

#[tokio::test]
async fn test_second_subscriber_shares_activation() {
    let (server, controller) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/sync/maindata"))
        .and(query_param("rid", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rid": 1,
            "full_update": true
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_main_data(&server, 1, json!({ "rid": 1 })).await;

    let mut first = controller.observe_main_data();
    next(&mut first).await.unwrap().unwrap();

    let mut second = controller.observe_main_data();
    let data = next(&mut second).await.unwrap().unwrap();
    assert_eq!(data.rid, 1);
    assert_eq!(controller.main_data_subscribers(), 2);

    drop(first);
    drop(second);
    server.verify().await;
}

#[tokio::test]
async fn test_is_syncing_follows_subscribers() {
    let (server, controller) = setup().await;
    mount_main_data(&server, 0, json!({ "rid": 1, "full_update": true })).await;
    mount_main_data(&server, 1, json!({ "rid": 1 })).await;

    assert!(!controller.is_syncing());

    let mut stream = controller.observe_main_data();
    // Streams attach lazily.
    assert!(!controller.is_syncing());

    next(&mut stream).await.unwrap().unwrap();
    assert!(controller.is_syncing());

    drop(stream);
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(!controller.is_syncing());

    // At most the request in flight at drop time may still land.
    let settled = main_data_requests(&server).await;
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(main_data_requests(&server).await <= settled + 1);
}

#[tokio::test]
async fn test_reactivation_restarts_from_rid_zero() {
    let (server, controller) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/sync/maindata"))
        .and(query_param("rid", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rid": 1,
            "full_update": true
        })))
        .expect(2)
        .mount(&server)
        .await;
    mount_main_data(&server, 1, json!({ "rid": 1 })).await;

    let mut stream = controller.observe_main_data();
    next(&mut stream).await.unwrap().unwrap();
    drop(stream);

    let mut stream = controller.observe_main_data();
    let data = next(&mut stream).await.unwrap().unwrap();
    assert!(data.full_update);

    drop(stream);
    server.verify().await;
}

/// First rid=0 request answers late with a stale snapshot; later ones
/// answer immediately with a fresh one.
struct SlowFirstFullUpdate {
    calls: AtomicUsize,
}

impl Respond for SlowFirstFullUpdate {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            ResponseTemplate::new(200)
                .set_body_json(json!({
                    "rid": 7,
                    "full_update": true,
                    "torrents": { "stale": { "name": "old.iso" } }
                }))
                .set_delay(Duration::from_millis(300))
        } else {
            ResponseTemplate::new(200).set_body_json(json!({
                "rid": 1,
                "full_update": true,
                "torrents": { "fresh": { "name": "new.iso" } }
            }))
        }
    }
}

#[tokio::test]
async fn test_in_flight_fetch_is_discarded_on_deactivation() {
    let (server, controller) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/sync/maindata"))
        .and(query_param("rid", "0"))
        .respond_with(SlowFirstFullUpdate {
            calls: AtomicUsize::new(0),
        })
        .mount(&server)
        .await;
    mount_main_data(&server, 1, json!({ "rid": 1 })).await;

    // Leave while the first fetch is still in flight.
    let mut stream = controller.observe_main_data();
    let pending = tokio::time::timeout(Duration::from_millis(100), stream.next()).await;
    assert!(pending.is_err(), "slow fetch should still be in flight");
    drop(stream);
    assert!(!controller.is_syncing());

    let mut stream = controller.observe_main_data();
    let data = next(&mut stream).await.unwrap().unwrap();
    assert_eq!(data.rid, 1);
    assert!(data.torrents.contains_key("fresh"));

    // Let the stale response land, then check it never surfaced.
    let deadline = tokio::time::Instant::now() + Duration::from_millis(400);
    while let Ok(item) = tokio::time::timeout_at(deadline, stream.next()).await {
        let data = item.unwrap().unwrap();
        assert!(!data.torrents.contains_key("stale"));
        assert_eq!(data.rid, 1);
    }

    let requests = server.received_requests().await.unwrap_or_default();
    let rids: Vec<String> = requests
        .iter()
        .filter(|r| r.url.path() == "/api/v2/sync/maindata")
        .filter_map(|r| {
            r.url
                .query_pairs()
                .find(|(k, _)| k == "rid")
                .map(|(_, v)| v.into_owned())
        })
        .collect();
    assert_eq!(&rids[..2], ["0", "0"]);
    assert!(!rids.iter().any(|rid| rid == "7"));
}

// ── Per-torrent projection ──────────────────────────────────────────

#[tokio::test]
async fn test_missing_torrent_completes_without_waiting() {
    let (server, controller) = setup().await;
    mount_main_data(&server, 0, json!({ "rid": 1, "full_update": true })).await;
    mount_main_data(&server, 1, json!({ "rid": 1 })).await;

    let mut stream = controller.observe_torrent("abc", false);

    assert!(next(&mut stream).await.is_none());
}

#[tokio::test]
async fn test_waiting_torrent_stream_emits_once_added() {
    let (server, controller) = setup().await;
    mount_main_data(&server, 0, json!({ "rid": 1, "full_update": true })).await;
    mount_main_data(
        &server,
        1,
        json!({ "rid": 2, "torrents": { "abc": { "name": "debian.iso" } } }),
    )
    .await;
    mount_main_data(&server, 2, json!({ "rid": 2 })).await;

    let mut stream = controller.observe_torrent("abc", true);
    let torrent = next(&mut stream).await.unwrap().unwrap();

    assert_eq!(torrent.hash, "abc");
    assert_eq!(torrent.name, "debian.iso");
}

#[tokio::test]
async fn test_unchanged_torrent_is_not_reemitted() {
    let (server, controller) = setup().await;
    mount_main_data(
        &server,
        0,
        json!({
            "rid": 1,
            "full_update": true,
            "torrents": { "abc": { "name": "debian.iso", "progress": 0.5 } }
        }),
    )
    .await;
    mount_main_data(
        &server,
        1,
        json!({ "rid": 2, "torrents": { "other": { "name": "arch.iso" } } }),
    )
    .await;
    mount_main_data(
        &server,
        2,
        json!({ "rid": 3, "torrents": { "abc": { "progress": 1.0 } } }),
    )
    .await;
    mount_main_data(&server, 3, json!({ "rid": 3 })).await;

    let mut stream = controller.observe_torrent("abc", false);
    let first = next(&mut stream).await.unwrap().unwrap();
    let second = next(&mut stream).await.unwrap().unwrap();

    assert!((first.progress - 0.5).abs() < f64::EPSILON);
    assert!(second.is_complete());
}

async fn mount_removed_then_readded(server: &MockServer) {
    mount_main_data(
        server,
        0,
        json!({
            "rid": 1,
            "full_update": true,
            "torrents": { "abc": { "name": "debian.iso" } }
        }),
    )
    .await;
    mount_main_data(server, 1, json!({ "rid": 2, "torrents_removed": ["abc"] })).await;
    mount_main_data(
        server,
        2,
        json!({ "rid": 3, "torrents": { "abc": { "name": "debian-12.iso" } } }),
    )
    .await;
    mount_main_data(server, 3, json!({ "rid": 3 })).await;
}

#[tokio::test]
async fn test_removed_torrent_completes_without_waiting() {
    let (server, controller) = setup().await;
    mount_removed_then_readded(&server).await;

    let mut stream = controller.observe_torrent("abc", false);
    let torrent = next(&mut stream).await.unwrap().unwrap();

    assert_eq!(torrent.name, "debian.iso");
    assert!(next(&mut stream).await.is_none());
}

#[tokio::test]
async fn test_waiting_stream_outlives_removal() {
    let (server, controller) = setup().await;
    mount_removed_then_readded(&server).await;

    let mut stream = controller.observe_torrent("abc", true);
    let first = next(&mut stream).await.unwrap().unwrap();
    // Removal does not end the stream; the torrent is picked up again.
    let second = next(&mut stream).await.unwrap().unwrap();

    assert_eq!(first.name, "debian.iso");
    assert_eq!(second.name, "debian-12.iso");
}

// ── Peers ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_torrent_peers_stream() {
    let (server, controller) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/sync/torrentPeers"))
        .and(query_param("hash", "abc"))
        .and(query_param("rid", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rid": 1,
            "full_update": true,
            "peers": {
                "10.0.0.1:6881": { "ip": "10.0.0.1", "port": 6881, "client": "qBittorrent" }
            }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v2/sync/torrentPeers"))
        .and(query_param("rid", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "rid": 1 })))
        .mount(&server)
        .await;

    let mut stream = controller.observe_torrent_peers("abc");
    let peers = next(&mut stream).await.unwrap().unwrap();

    assert_eq!(peers.rid, 1);
    assert_eq!(peers.peers["10.0.0.1:6881"].client, "qBittorrent");
    assert!(controller.is_syncing_peers("abc"));
    assert!(!controller.is_syncing());

    drop(stream);
    assert!(!controller.is_syncing_peers("abc"));
}

async fn mount_peers(server: &MockServer, rid: i64, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/api/v2/sync/torrentPeers"))
        .and(query_param("hash", "abc"))
        .and(query_param("rid", rid.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_unchanged_peers_are_not_reemitted() {
    let (server, controller) = setup().await;
    mount_peers(
        &server,
        0,
        json!({
            "rid": 1,
            "full_update": true,
            "peers": { "10.0.0.1:6881": { "ip": "10.0.0.1", "port": 6881, "dl_speed": 10 } }
        }),
    )
    .await;
    mount_peers(
        &server,
        1,
        json!({ "rid": 2, "peers": { "10.0.0.1:6881": { "dl_speed": 20 } } }),
    )
    .await;
    mount_peers(&server, 2, json!({ "rid": 2 })).await;

    let mut stream = controller.observe_torrent_peers("abc");
    let first = next(&mut stream).await.unwrap().unwrap();
    let second = next(&mut stream).await.unwrap().unwrap();
    assert_eq!(first.peers["10.0.0.1:6881"].dl_speed, 10);
    assert_eq!(second.peers["10.0.0.1:6881"].dl_speed, 20);

    // Several idle polls later, nothing new was emitted.
    let idle = tokio::time::timeout(Duration::from_millis(300), stream.next()).await;
    assert!(idle.is_err(), "unchanged peers re-emitted: {idle:?}");
    assert!(controller.is_syncing_peers("abc"));
}

// ── Authentication failures ─────────────────────────────────────────

async fn mount_bad_credentials(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/v2/sync/maindata"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Forbidden"))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v2/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Fails."))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_explicit_login_with_bad_credentials() {
    let (server, controller) = setup().await;
    mount_bad_credentials(&server).await;

    let err = controller.login().await.unwrap_err();

    assert!(
        matches!(err, CoreError::Api { status: 200, ref message } if message == "Fails."),
        "unexpected error: {err:?}"
    );
}

#[tokio::test]
async fn test_stream_fails_when_login_fails() {
    let (server, controller) = setup().await;
    mount_bad_credentials(&server).await;

    let mut stream = controller.observe_main_data();
    let err = next(&mut stream).await.unwrap().unwrap_err();

    assert_eq!(err.status(), Some(403));
    assert!(
        matches!(err, CoreError::Api { ref message, .. } if message == "Forbidden"),
        "unexpected error: {err:?}"
    );
    assert!(next(&mut stream).await.is_none());
    assert!(!controller.is_syncing());
}

#[tokio::test]
async fn test_failed_stream_fails_late_subscribers_too() {
    let (server, controller) = setup().await;
    mount_bad_credentials(&server).await;

    let mut first = controller.observe_main_data();
    next(&mut first).await.unwrap().unwrap_err();

    // Still attached: the failed activation is reused.
    let mut late = controller.observe_torrent("abc", true);
    let err = next(&mut late).await.unwrap().unwrap_err();
    assert_eq!(err.status(), Some(403));
}
