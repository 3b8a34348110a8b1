//! Command dispatch: bridges CLI args -> controller calls -> output formatting.

pub mod config_cmd;
pub mod login;
pub mod peers;
pub mod torrents;
pub mod version;
pub mod watch;

use qbitly_core::Controller;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a daemon-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    controller: &Controller,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Login => login::handle(controller, global).await,
        Command::Version => version::handle(controller, global).await,
        Command::Torrents(args) => torrents::handle(controller, args, global).await,
        Command::Watch => watch::main_data(controller, global).await,
        Command::WatchTorrent { hash, wait } => {
            watch::torrent(controller, &hash, wait, global).await
        }
        Command::Peers { hash } => peers::handle(controller, &hash, global).await,
        Command::Config(_) | Command::Completions(_) => Err(CliError::Validation {
            field: "command".into(),
            reason: "handled without a daemon connection".into(),
        }),
    }
}
