use crate::cli::actions::{replay::Args, Action};
use anyhow::{Context, Result};
use std::path::PathBuf;

/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let script = matches
        .get_one::<String>("script")
        .map(PathBuf::from)
        .context("missing required argument: --script")?;

    let origin = matches
        .get_one::<String>("origin")
        .cloned()
        .context("missing required argument: --origin")?;

    let locale = matches
        .get_one::<String>("locale")
        .filter(|locale| !locale.trim().is_empty())
        .cloned();

    Ok(Action::Replay(Args {
        script,
        origin,
        locale,
        auto_login: matches.get_flag("auto-login"),
        auto_logout: matches.get_flag("auto-logout"),
    }))
}
