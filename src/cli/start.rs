use crate::cli::{actions::Action, commands, dispatch::handler, telemetry};
use anyhow::Result;

/// Parse arguments, install the tracing subscriber and resolve the action.
///
/// # Errors
/// Returns an error if telemetry cannot be initialized or arguments are invalid
pub fn start() -> Result<Action> {
    let matches = commands::new().get_matches();

    telemetry::init(Some(verbosity_level(
        matches.get_one::<u8>("verbosity").copied().unwrap_or(0),
    )))?;

    let action = handler(&matches)?;

    Ok(action)
}

fn verbosity_level(count: u8) -> tracing::Level {
    match count {
        0 => tracing::Level::ERROR,
        1 => tracing::Level::WARN,
        2 => tracing::Level::INFO,
        3 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    }
}
