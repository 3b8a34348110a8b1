//! Explicit login.

use qbitly_core::Controller;
use tracing::info;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

pub async fn handle(controller: &Controller, global: &GlobalOpts) -> Result<(), CliError> {
    controller.login().await?;
    let config = controller.config();
    info!(url = %config.url, user = %config.username, "session established");
    output::print_status(
        &format!("Logged in to {} as {}", config.url, config.username),
        global.quiet,
    );
    Ok(())
}
