//! Torrent command handlers.

use std::path::Path;

use tabled::Tabled;
use tracing::debug;

use qbitly_core::{
    AddTorrent, ApiError, Controller, Torrent, TorrentFile, TorrentProperties, TorrentQuery,
    TorrentUpload,
};

use crate::cli::{
    GlobalOpts, HashesArgs, TorrentAddArgs, TorrentListArgs, TorrentsArgs, TorrentsCommand,
};
use crate::error::CliError;
use crate::output;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct TorrentRow {
    #[tabled(rename = "Hash")]
    hash: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Progress")]
    progress: String,
    #[tabled(rename = "Down")]
    down: String,
    #[tabled(rename = "Up")]
    up: String,
    #[tabled(rename = "Ratio")]
    ratio: String,
}

impl TorrentRow {
    fn new(t: &Torrent, color: bool) -> Self {
        Self {
            hash: short_hash(&t.hash).to_owned(),
            name: t.name.clone(),
            state: output::state_label(t.state, color),
            size: output::bytes(t.size),
            progress: output::percent(t.progress),
            down: output::rate(t.dlspeed),
            up: output::rate(t.upspeed),
            ratio: format!("{:.2}", t.ratio),
        }
    }
}

#[derive(Tabled)]
struct FileRow {
    #[tabled(rename = "#")]
    index: i64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Progress")]
    progress: String,
    #[tabled(rename = "Priority")]
    priority: String,
}

impl From<&TorrentFile> for FileRow {
    fn from(f: &TorrentFile) -> Self {
        Self {
            index: f.index,
            name: f.name.clone(),
            size: output::bytes(f.size),
            progress: output::percent(f.progress),
            priority: priority_label(f.priority).into(),
        }
    }
}

/// Abbreviated info hash for tables.
pub(crate) fn short_hash(hash: &str) -> &str {
    hash.get(..8).unwrap_or(hash)
}

fn priority_label(priority: i64) -> &'static str {
    match priority {
        0 => "skip",
        1 => "normal",
        6 => "high",
        7 => "maximal",
        _ => "mixed",
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    controller: &Controller,
    args: TorrentsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let api = controller.api();
    match args.command {
        TorrentsCommand::List(list) => {
            let torrents = api.torrents(&list_query(list)).await?;
            let color = output::should_color(global.color);
            let out = output::render_list(
                global.output,
                &torrents,
                |t| TorrentRow::new(t, color),
                |t| t.hash.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        TorrentsCommand::Add(add) => {
            let count = add.sources.len();
            api.add_torrent(build_add(add).await?).await?;
            output::print_status(&format!("Added {count} torrent source(s)"), global.quiet);
            Ok(())
        }

        TorrentsCommand::Delete {
            hashes,
            delete_files,
        } => {
            api.delete_torrents(&hashes, delete_files).await?;
            output::print_status("Torrents deleted", global.quiet);
            Ok(())
        }

        TorrentsCommand::Pause(target) => {
            api.pause_torrents(target_hashes(&target)).await?;
            output::print_status("Torrents paused", global.quiet);
            Ok(())
        }

        TorrentsCommand::Resume(target) => {
            api.resume_torrents(target_hashes(&target)).await?;
            output::print_status("Torrents resumed", global.quiet);
            Ok(())
        }

        TorrentsCommand::Recheck(target) => {
            api.recheck_torrents(target_hashes(&target)).await?;
            output::print_status("Recheck started", global.quiet);
            Ok(())
        }

        TorrentsCommand::Show { hash } => {
            let props = api
                .torrent_properties(&hash)
                .await
                .map_err(|e| not_found_as_torrent(e, &hash))?;
            let out = output::render_single(
                global.output,
                &props,
                |p| properties_detail(&hash, p),
                |p| p.save_path.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        TorrentsCommand::Files { hash } => {
            let files = api
                .torrent_files(&hash)
                .await
                .map_err(|e| not_found_as_torrent(e, &hash))?;
            let out = output::render_list(
                global.output,
                &files,
                |f| FileRow::from(f),
                |f| f.name.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}

/// The daemon answers 404 for unknown hashes.
fn not_found_as_torrent(err: ApiError, hash: &str) -> CliError {
    if err.is_not_found() {
        CliError::NotFound {
            resource: "torrent".into(),
            identifier: hash.into(),
        }
    } else {
        err.into()
    }
}

fn properties_detail(hash: &str, p: &TorrentProperties) -> String {
    [
        format!("Hash:         {hash}"),
        format!("Save path:    {}", p.save_path),
        format!("Size:         {}", output::bytes(p.total_size)),
        format!(
            "Pieces:       {}/{} x {}",
            p.pieces_have,
            p.pieces_num,
            output::bytes(p.piece_size)
        ),
        format!("Downloaded:   {}", output::bytes(p.total_downloaded)),
        format!("Uploaded:     {}", output::bytes(p.total_uploaded)),
        format!("Ratio:        {:.2}", p.share_ratio),
        format!("Seeds:        {} ({} total)", p.seeds, p.seeds_total),
        format!("Peers:        {} ({} total)", p.peers, p.peers_total),
        format!("Comment:      {}", p.comment),
    ]
    .join("\n")
}

fn list_query(list: TorrentListArgs) -> TorrentQuery {
    TorrentQuery {
        filter: list.filter,
        category: list.category,
        tag: list.tag,
        sort: list.sort,
        reverse: list.reverse,
        limit: list.limit,
        ..TorrentQuery::default()
    }
}

/// Empty means every torrent (`--all`).
fn target_hashes(target: &HashesArgs) -> &[String] {
    if target.all { &[] } else { &target.hashes[..] }
}

/// Split sources into URLs (magnet, http) and local `.torrent` files.
async fn build_add(add: TorrentAddArgs) -> Result<AddTorrent, CliError> {
    let mut request = AddTorrent {
        save_path: add.save_path,
        category: add.category,
        tags: add.tags,
        paused: add.paused,
        skip_checking: add.skip_checking,
        sequential_download: add.sequential,
        ..AddTorrent::default()
    };

    for source in add.sources {
        if is_url(&source) {
            request.urls.push(source);
            continue;
        }
        let path = Path::new(&source);
        debug!(path = %path.display(), "reading torrent file");
        let data = tokio::fs::read(path).await.map_err(|e| CliError::Validation {
            field: "source".into(),
            reason: format!("cannot read {source}: {e}"),
        })?;
        let file_name = path
            .file_name()
            .map_or_else(|| source.clone(), |n| n.to_string_lossy().into_owned());
        request.files.push(TorrentUpload { file_name, data });
    }
    Ok(request)
}

fn is_url(source: &str) -> bool {
    ["magnet:", "http://", "https://", "bc://bt/"]
        .iter()
        .any(|scheme| source.starts_with(scheme))
}
