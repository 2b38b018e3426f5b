//! Command dispatch: bridges CLI args -> session operations -> output.

pub mod columns;
pub mod config_cmd;
pub mod details;
pub mod events;
pub mod networks;
pub mod orgs;
pub mod util;

use merakly_core::Session;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a session-bound command to its handler.
pub async fn dispatch(cmd: Command, session: &Session, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Orgs => orgs::handle(session, global).await,
        Command::Networks(args) => networks::handle(session, args, global).await,
        Command::Events(args) => events::handle(session, args, global).await,
        Command::Details(args) => details::handle(session, args, global).await,
        // Handled before a session exists
        Command::Columns | Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
