//! Live peer table for one torrent.

use tabled::Tabled;

use qbitly_core::{Controller, Peer, TorrentPeers};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::watch::{emit, follow};

#[derive(Tabled)]
struct PeerRow {
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Client")]
    client: String,
    #[tabled(rename = "Country")]
    country: String,
    #[tabled(rename = "Flags")]
    flags: String,
    #[tabled(rename = "Progress")]
    progress: String,
    #[tabled(rename = "Down")]
    down: String,
    #[tabled(rename = "Up")]
    up: String,
}

impl PeerRow {
    fn new(address: &str, p: &Peer) -> Self {
        Self {
            address: address.to_owned(),
            client: p.client.clone(),
            country: p.country_code.to_uppercase(),
            flags: p.flags.clone(),
            progress: output::percent(p.progress),
            down: output::rate(p.dl_speed),
            up: output::rate(p.up_speed),
        }
    }
}

/// Peers ordered by address, for stable output between snapshots.
fn sorted(peers: &TorrentPeers) -> Vec<(&str, &Peer)> {
    let mut rows: Vec<_> = peers
        .peers
        .iter()
        .map(|(addr, peer)| (addr.as_str(), peer.as_ref()))
        .collect();
    rows.sort_unstable_by_key(|(addr, _)| *addr);
    rows
}

fn table(peers: &TorrentPeers) -> String {
    let rows: Vec<PeerRow> = sorted(peers)
        .into_iter()
        .map(|(addr, peer)| PeerRow::new(addr, peer))
        .collect();
    format!(
        "{} peers (rid {})\n{}",
        rows.len(),
        peers.rid,
        tabled::Table::new(rows).with(tabled::settings::Style::rounded())
    )
}

pub async fn handle(controller: &Controller, hash: &str, global: &GlobalOpts) -> Result<(), CliError> {
    follow(controller.observe_torrent_peers(hash), |peers| match global.output {
        OutputFormat::Table => {
            output::print_output(&table(peers), global.quiet);
            Ok(())
        }
        OutputFormat::Plain => {
            let addrs: Vec<&str> = sorted(peers).into_iter().map(|(addr, _)| addr).collect();
            output::print_output(&addrs.join("\n"), global.quiet);
            Ok(())
        }
        OutputFormat::Json | OutputFormat::JsonCompact => {
            emit(global, &peers.peers, |_| String::new())
        }
    })
    .await
}
