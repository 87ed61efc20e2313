use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ── Directory bootstrap ────────────────────────────────────────────────────────

/// Ensure the standard `~/.shift-report/` directory hierarchy exists.
///
/// Creates the following directories if absent (including any missing parents):
/// - `~/.shift-report/`
/// - `~/.shift-report/logs/`
pub fn ensure_directories() -> anyhow::Result<()> {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    let report_dir = home.join(".shift-report");
    std::fs::create_dir_all(&report_dir)?;
    std::fs::create_dir_all(report_dir.join("logs"))?;
    Ok(())
}

// ── Logging bootstrap ──────────────────────────────────────────────────────────

/// Initialise the global `tracing` subscriber.
///
/// `log_level` is mapped to a [`tracing_subscriber::EnvFilter`] directive.
/// Falls back to `"info"` if the level string is not recognised.
pub fn setup_logging(log_level: &str) -> anyhow::Result<()> {
    let normalised = match log_level.to_uppercase().as_str() {
        "DEBUG" => "debug",
        "INFO" => "info",
        "WARNING" => "warn",
        "ERROR" => "error",
        other => return setup_with_filter(&other.to_lowercase()),
    };
    setup_with_filter(normalised)
}

fn setup_with_filter(directive: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt::layer().with_target(false).with_thread_ids(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(subscriber)
        .init();

    Ok(())
}

// ── Data-path discovery ────────────────────────────────────────────────────────

/// Attempt to locate the event data directory on the local system.
///
/// Checks the following paths in order and returns the first that exists:
/// 1. `./events/`
/// 2. `~/.shift-report/events/`
///
/// Returns `None` when neither path exists.
pub fn discover_data_path() -> Option<PathBuf> {
    let mut candidates = vec![PathBuf::from("events")];
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(".shift-report").join("events"));
    }
    candidates.into_iter().find(|p| p.exists())
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_ensure_directories() {
        let tmp = TempDir::new().expect("tempdir");

        // Override HOME so that dirs::home_dir() resolves to our temp dir.
        let original_home = std::env::var_os("HOME");
        std::env::set_var("HOME", tmp.path());

        let result = ensure_directories();

        match original_home {
            Some(v) => std::env::set_var("HOME", v),
            None => std::env::remove_var("HOME"),
        }

        result.expect("ensure_directories should succeed");

        let report_dir = tmp.path().join(".shift-report");
        assert!(report_dir.is_dir(), ".shift-report dir must exist");
        assert!(report_dir.join("logs").is_dir(), "logs subdir must exist");
    }

    #[test]
    fn test_discover_data_path_finds_home_events() {
        let tmp = TempDir::new().expect("tempdir");
        let events = tmp.path().join(".shift-report").join("events");
        std::fs::create_dir_all(&events).expect("create events dir");

        let original_home = std::env::var_os("HOME");
        std::env::set_var("HOME", tmp.path());

        let path = discover_data_path();

        match original_home {
            Some(v) => std::env::set_var("HOME", v),
            None => std::env::remove_var("HOME"),
        }

        // Either the CWD has an ./events directory (unlikely in tests) or
        // the home candidate we just created is found.
        assert!(path.is_some());
    }
}
