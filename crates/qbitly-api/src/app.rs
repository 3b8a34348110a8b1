// Application endpoints
//
// Daemon and Web API version information plus a few global settings.

use tracing::debug;

use crate::client::{NO_QUERY, QbitClient};
use crate::error::Error;
use crate::models::BuildInfo;

impl QbitClient {
    /// qBittorrent version, e.g. `v4.6.2`.
    ///
    /// `GET /api/v2/app/version`
    pub async fn app_version(&self) -> Result<String, Error> {
        debug!("fetching application version");
        let body = self.get_text("app/version", NO_QUERY).await?;
        Ok(body.trim().to_owned())
    }

    /// Web API version, e.g. `2.9.3`.
    ///
    /// `GET /api/v2/app/webapiVersion`
    pub async fn api_version(&self) -> Result<String, Error> {
        let body = self.get_text("app/webapiVersion", NO_QUERY).await?;
        Ok(body.trim().to_owned())
    }

    /// `GET /api/v2/app/buildInfo`
    pub async fn build_info(&self) -> Result<BuildInfo, Error> {
        self.get_json("app/buildInfo", NO_QUERY).await
    }

    /// Default save path for new torrents.
    ///
    /// `GET /api/v2/app/defaultSavePath`
    pub async fn default_save_path(&self) -> Result<String, Error> {
        let body = self.get_text("app/defaultSavePath", NO_QUERY).await?;
        Ok(body.trim().to_owned())
    }
}
