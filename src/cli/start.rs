use crate::cli::{actions::Action, commands, dispatch::handler, telemetry};
use anyhow::Result;
use tracing::Level;

fn verbosity_level(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::ERROR,
        1 => Level::WARN,
        2 => Level::INFO,
        3 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Start the CLI
/// # Errors
/// Returns an error if logging cannot be initialized or arguments are invalid
pub fn start() -> Result<Action> {
    let matches = commands::new().get_matches();

    let verbosity = matches.get_one::<u8>("verbosity").map_or(0, |&v| v);

    telemetry::init(Some(verbosity_level(verbosity)), matches.get_flag("log-json"))?;

    let action = handler(&matches)?;

    Ok(action)
}
