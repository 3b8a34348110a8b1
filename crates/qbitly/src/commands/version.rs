//! Daemon and Web API versions.

use serde::Serialize;

use qbitly_core::Controller;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct Versions {
    app: String,
    api: String,
    libtorrent: String,
}

pub async fn handle(controller: &Controller, global: &GlobalOpts) -> Result<(), CliError> {
    let api = controller.api();
    let (app, web_api, build) =
        tokio::try_join!(api.app_version(), api.api_version(), api.build_info())?;

    let versions = Versions {
        app,
        api: web_api,
        libtorrent: build.libtorrent,
    };
    let out = output::render_single(
        global.output,
        &versions,
        |v| {
            format!(
                "qBittorrent  {}\nWeb API      {}\nlibtorrent   {}",
                v.app, v.api, v.libtorrent
            )
        },
        |v| v.app.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
