//! Live views over the sync streams.
//!
//! Each snapshot is printed as it arrives: a status line in table mode, one
//! JSON document per line in the JSON modes. Runs until the stream ends,
//! fails, or Ctrl-C.

use futures_util::StreamExt;
use serde::Serialize;
use tracing::debug;

use qbitly_core::{Controller, MainData, SyncStream, Torrent};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::torrents::short_hash;

/// Drain `stream` through `print` until it ends, fails, or Ctrl-C.
pub(crate) async fn follow<T>(
    mut stream: SyncStream<T>,
    mut print: impl FnMut(&T) -> Result<(), CliError>,
) -> Result<(), CliError> {
    loop {
        tokio::select! {
            item = stream.next() => match item {
                Some(Ok(snapshot)) => print(snapshot.as_ref())?,
                Some(Err(err)) => return Err(err.into()),
                None => {
                    debug!("stream completed");
                    return Ok(());
                }
            },
            _ = tokio::signal::ctrl_c() => {
                debug!("interrupted");
                return Ok(());
            }
        }
    }
}

/// Print one snapshot in JSON-lines form, or `line` in table/plain mode.
pub(crate) fn emit<T: Serialize + ?Sized>(
    global: &GlobalOpts,
    data: &T,
    line: impl Fn(&T) -> String,
) -> Result<(), CliError> {
    // Pretty JSON would span lines; a stream wants one document per line.
    let format = match global.output {
        OutputFormat::Json => OutputFormat::JsonCompact,
        other => other,
    };
    let out = output::render_single(format, data, &line, &line)?;
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── Main data ───────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct Summary<'a> {
    rid: i64,
    full_update: bool,
    connection_status: &'a str,
    torrents: usize,
    downloading: usize,
    seeding: usize,
    paused: usize,
    errored: usize,
    dl_speed: i64,
    up_speed: i64,
}

impl<'a> Summary<'a> {
    fn new(data: &'a MainData) -> Self {
        let mut summary = Self {
            rid: data.rid,
            full_update: data.full_update,
            connection_status: &data.server_state.connection_status,
            torrents: data.torrents.len(),
            downloading: 0,
            seeding: 0,
            paused: 0,
            errored: 0,
            dl_speed: data.server_state.dl_info_speed,
            up_speed: data.server_state.up_info_speed,
        };
        for torrent in data.torrents.values() {
            if torrent.state.is_error() {
                summary.errored += 1;
            } else if torrent.state.is_paused() {
                summary.paused += 1;
            } else if torrent.is_complete() {
                summary.seeding += 1;
            } else {
                summary.downloading += 1;
            }
        }
        summary
    }

    fn line(&self) -> String {
        format!(
            "[{}] {} torrents ({} downloading, {} seeding, {} paused, {} errored)  down {}  up {}",
            self.connection_status,
            self.torrents,
            self.downloading,
            self.seeding,
            self.paused,
            self.errored,
            output::rate(self.dl_speed),
            output::rate(self.up_speed),
        )
    }
}

pub async fn main_data(controller: &Controller, global: &GlobalOpts) -> Result<(), CliError> {
    follow(controller.observe_main_data(), |data| {
        emit(global, &Summary::new(data), Summary::line)
    })
    .await
}

// ── Single torrent ──────────────────────────────────────────────────

fn torrent_line(t: &Torrent, color: bool) -> String {
    format!(
        "{} {}  {}  {}  down {}  up {}  ratio {:.2}",
        short_hash(&t.hash),
        t.name,
        output::state_label(t.state, color),
        output::percent(t.progress),
        output::rate(t.dlspeed),
        output::rate(t.upspeed),
        t.ratio,
    )
}

pub async fn torrent(
    controller: &Controller,
    hash: &str,
    wait: bool,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let color = output::should_color(global.color);
    let mut seen = false;
    follow(controller.observe_torrent(hash, wait), |t| {
        seen = true;
        emit(global, t, |t| torrent_line(t, color))
    })
    .await?;

    if seen {
        Ok(())
    } else {
        Err(CliError::NotFound {
            resource: "torrent".into(),
            identifier: hash.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use qbitly_core::{ServerState, TorrentState};

    use super::*;

    fn torrent(hash: &str, state: TorrentState, progress: f64) -> Arc<Torrent> {
        Arc::new(Torrent {
            hash: hash.into(),
            state,
            progress,
            ..Torrent::default()
        })
    }

    #[test]
    fn summary_buckets_torrents_by_state() {
        let mut data = MainData {
            rid: 4,
            server_state: Arc::new(ServerState {
                connection_status: "connected".into(),
                dl_info_speed: 1024,
                ..ServerState::default()
            }),
            ..MainData::default()
        };
        for t in [
            torrent("a", TorrentState::Downloading, 0.2),
            torrent("b", TorrentState::Uploading, 1.0),
            torrent("c", TorrentState::PausedDl, 0.4),
            torrent("d", TorrentState::MissingFiles, 0.9),
        ] {
            data.torrents.insert(t.hash.clone(), t);
        }

        let summary = Summary::new(&data);
        assert_eq!(summary.torrents, 4);
        assert_eq!(summary.downloading, 1);
        assert_eq!(summary.seeding, 1);
        assert_eq!(summary.paused, 1);
        assert_eq!(summary.errored, 1);
        assert!(summary.line().starts_with("[connected] 4 torrents"));
    }

    #[test]
    fn torrent_line_uses_short_hash() {
        let t = torrent("0123456789abcdef", TorrentState::Uploading, 1.0);
        assert!(torrent_line(&t, false).starts_with("01234567 "));
    }
}
