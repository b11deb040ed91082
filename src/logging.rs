//! Process-wide tracing subscriber for the CLI and embedding hosts.

use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{FdwError, Result};

/// Installs a `fmt` subscriber filtered by `level` (any `EnvFilter` directive,
/// e.g. `info` or `dynafdw::provider=debug`). Fails if a global subscriber
/// is already set.
pub fn init_logging(level: &str) -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_new(level)
                .map_err(|e| FdwError::Logging(format!("invalid log level: {e}")))?,
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(true)
        .try_init()
        .map_err(|_| FdwError::Logging("logging already initialized".into()))
}
