//! Shared helpers for command handlers.

use std::future::Future;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use merakly_core::Session;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;

/// Await `fut` behind a stderr spinner.
///
/// The spinner only shows for interactive table output; structured
/// formats and `--quiet` stay silent.
pub async fn with_spinner<T, F>(global: &GlobalOpts, message: &str, fut: F) -> T
where
    F: Future<Output = T>,
{
    let show = !global.quiet && matches!(global.output, OutputFormat::Table);
    let spinner = if show {
        ProgressBar::new_spinner()
    } else {
        ProgressBar::hidden()
    };
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_owned());
    spinner.enable_steady_tick(Duration::from_millis(80));

    let out = fut.await;
    spinner.finish_and_clear();
    out
}

/// Submit the configured API key, loading the organization list.
pub async fn sign_in(session: &Session, global: &GlobalOpts) -> Result<(), CliError> {
    with_spinner(global, "Submitting API key…", session.authenticate()).await?;
    Ok(())
}

/// Sign in and choose `org`, loading its networks.
pub async fn open_organization(
    session: &Session,
    org: &str,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    sign_in(session, global).await?;
    with_spinner(global, "Loading networks…", session.choose_organization(org)).await?;
    Ok(())
}

/// Map a dialoguer / interactive I/O failure into CliError.
pub fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}
