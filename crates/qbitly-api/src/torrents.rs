// Torrent endpoints
//
// Listing, adding, removing, and controlling torrents. Commands that act
// on several torrents take a list of hashes joined with `|`; an empty list
// means `all`.

use reqwest::multipart::{Form, Part};
use serde::Serialize;
use tracing::debug;

use crate::client::QbitClient;
use crate::error::Error;
use crate::models::{Torrent, TorrentFile, TorrentFilter, TorrentProperties};

/// Query parameters for `torrents/info`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TorrentQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<TorrentFilter>,
    /// Empty string selects uncategorized torrents.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// Any `Torrent` field name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub reverse: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hashes: Option<String>,
}

impl TorrentQuery {
    pub fn with_filter(mut self, filter: TorrentFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_hashes<S: AsRef<str>>(mut self, hashes: &[S]) -> Self {
        self.hashes = Some(join_hashes(hashes));
        self
    }
}

/// A `.torrent` file to upload.
#[derive(Debug, Clone)]
pub struct TorrentUpload {
    pub file_name: String,
    pub data: Vec<u8>,
}

/// Parameters for `torrents/add`.
///
/// Magnet links and HTTP URLs go in `urls`; raw metainfo goes in `files`.
#[derive(Debug, Clone, Default)]
pub struct AddTorrent {
    pub urls: Vec<String>,
    pub files: Vec<TorrentUpload>,
    pub save_path: Option<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub paused: bool,
    pub skip_checking: bool,
    pub sequential_download: bool,
    pub first_last_piece_prio: bool,
    /// Bytes per second.
    pub up_limit: Option<u64>,
    /// Bytes per second.
    pub dl_limit: Option<u64>,
}

impl AddTorrent {
    pub fn urls<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            urls: urls.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Text fields shared by the urlencoded and multipart encodings.
    fn fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = Vec::new();
        if !self.urls.is_empty() {
            fields.push(("urls", self.urls.join("\n")));
        }
        if let Some(ref path) = self.save_path {
            fields.push(("savepath", path.clone()));
        }
        if let Some(ref category) = self.category {
            fields.push(("category", category.clone()));
        }
        if !self.tags.is_empty() {
            fields.push(("tags", self.tags.join(",")));
        }
        // v5 renamed `paused` to `stopped`; send both.
        if self.paused {
            fields.push(("paused", "true".into()));
            fields.push(("stopped", "true".into()));
        }
        if self.skip_checking {
            fields.push(("skip_checking", "true".into()));
        }
        if self.sequential_download {
            fields.push(("sequentialDownload", "true".into()));
        }
        if self.first_last_piece_prio {
            fields.push(("firstLastPiecePrio", "true".into()));
        }
        if let Some(limit) = self.up_limit {
            fields.push(("upLimit", limit.to_string()));
        }
        if let Some(limit) = self.dl_limit {
            fields.push(("dlLimit", limit.to_string()));
        }
        fields
    }
}

fn join_hashes<S: AsRef<str>>(hashes: &[S]) -> String {
    if hashes.is_empty() {
        return "all".into();
    }
    hashes
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join("|")
}

impl QbitClient {
    /// List torrents.
    ///
    /// `GET /api/v2/torrents/info`
    pub async fn torrents(&self, query: &TorrentQuery) -> Result<Vec<Torrent>, Error> {
        debug!(?query.filter, "listing torrents");
        self.get_json("torrents/info", query).await
    }

    /// Add torrents by URL/magnet and/or by uploading `.torrent` files.
    ///
    /// `POST /api/v2/torrents/add`. The daemon answers `Fails.` when nothing
    /// could be added, surfaced as [`Error::Rejected`].
    pub async fn add_torrent(&self, add: AddTorrent) -> Result<(), Error> {
        debug!(urls = add.urls.len(), files = add.files.len(), "adding torrents");
        let fields = add.fields();

        if add.files.is_empty() {
            self.post_form("torrents/add", &fields).await?;
            return Ok(());
        }

        let mut form = Form::new();
        for (name, value) in fields {
            form = form.text(name, value);
        }
        for upload in add.files {
            let part = Part::bytes(upload.data)
                .file_name(upload.file_name)
                .mime_str("application/x-bittorrent")?;
            form = form.part("torrents", part);
        }
        self.post_multipart("torrents/add", form).await?;
        Ok(())
    }

    /// Remove torrents, optionally deleting their data.
    ///
    /// `POST /api/v2/torrents/delete`
    pub async fn delete_torrents<S: AsRef<str>>(
        &self,
        hashes: &[S],
        delete_files: bool,
    ) -> Result<(), Error> {
        let hashes = join_hashes(hashes);
        debug!(%hashes, delete_files, "deleting torrents");
        let delete_files = delete_files.to_string();
        self.post_form(
            "torrents/delete",
            &[("hashes", hashes.as_str()), ("deleteFiles", delete_files.as_str())],
        )
        .await?;
        Ok(())
    }

    /// `POST /api/v2/torrents/pause`, falling back to `stop` on v5 daemons.
    pub async fn pause_torrents<S: AsRef<str>>(&self, hashes: &[S]) -> Result<(), Error> {
        self.torrent_command(&["pause", "stop"], hashes).await
    }

    /// `POST /api/v2/torrents/resume`, falling back to `start` on v5 daemons.
    pub async fn resume_torrents<S: AsRef<str>>(&self, hashes: &[S]) -> Result<(), Error> {
        self.torrent_command(&["resume", "start"], hashes).await
    }

    /// `POST /api/v2/torrents/recheck`
    pub async fn recheck_torrents<S: AsRef<str>>(&self, hashes: &[S]) -> Result<(), Error> {
        self.torrent_command(&["recheck"], hashes).await
    }

    /// `GET /api/v2/torrents/properties?hash={hash}`
    pub async fn torrent_properties(&self, hash: &str) -> Result<TorrentProperties, Error> {
        self.get_json("torrents/properties", &[("hash", hash)]).await
    }

    /// `GET /api/v2/torrents/files?hash={hash}`
    pub async fn torrent_files(&self, hash: &str) -> Result<Vec<TorrentFile>, Error> {
        self.get_json("torrents/files", &[("hash", hash)]).await
    }

    /// Post `hashes` to the first endpoint the daemon knows; a 404 moves on
    /// to the next name.
    async fn torrent_command<S: AsRef<str>>(
        &self,
        endpoints: &[&str],
        hashes: &[S],
    ) -> Result<(), Error> {
        let hashes = join_hashes(hashes);
        let mut last = None;
        for endpoint in endpoints {
            debug!(endpoint, %hashes, "torrent command");
            match self
                .post_form(&format!("torrents/{endpoint}"), &[("hashes", hashes.as_str())])
                .await
            {
                Ok(_) => return Ok(()),
                Err(e) if e.is_not_found() => last = Some(e),
                Err(e) => return Err(e),
            }
        }
        Err(last.unwrap_or(Error::Api {
            status: 404,
            message: "Not Found".into(),
        }))
    }
}
