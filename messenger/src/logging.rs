//! Tracing setup for applications and tests embedding a Messenger

use eyre::{Result, eyre};
use tracing::Level;

/// Parse a log level name, defaulting to INFO for unknown names
pub fn parse_level(level: Option<&str>) -> Level {
    match level.map(str::to_uppercase).as_deref() {
        Some("TRACE") => Level::TRACE,
        Some("DEBUG") => Level::DEBUG,
        Some("WARN") | Some("WARNING") => Level::WARN,
        Some("ERROR") => Level::ERROR,
        Some("INFO") | None => Level::INFO,
        Some(other) => {
            eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", other);
            Level::INFO
        }
    }
}

/// Install a global tracing subscriber
///
/// `RUST_LOG` directives are honored on top of `level`. Fails if a global subscriber
/// is already installed, so tests typically ignore the result.
pub fn setup_logging(level: Option<&str>) -> Result<()> {
    let level = parse_level(level);

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with_test_writer()
        .try_init()
        .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;

    tracing::info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level(Some("debug")), Level::DEBUG);
        assert_eq!(parse_level(Some("Warning")), Level::WARN);
        assert_eq!(parse_level(Some("TRACE")), Level::TRACE);
        assert_eq!(parse_level(None), Level::INFO);
        assert_eq!(parse_level(Some("loud")), Level::INFO);
    }

    #[test]
    fn test_setup_logging_twice_fails() {
        let _ = setup_logging(Some("debug"));
        assert!(setup_logging(Some("debug")).is_err());
    }
}
