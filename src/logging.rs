use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{Result, SiriusError};

/// Installs the process-wide tracing subscriber.
///
/// `level` is an `EnvFilter` directive (e.g. `"info"`, `"sirius=debug,tokio=warn"`) and is
/// overridden by `RUST_LOG` when that variable is set, matching `EnvFilter`'s normal precedence.
pub fn init_logging(level: &str) -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_new(level)
                .map_err(|e| SiriusError::InvalidArgument(format!("invalid log level: {e}")))?,
        )
        .with_target(true)
        .with_thread_ids(true)
        .try_init()
        .map_err(|_| SiriusError::InvalidArgument("logging already initialized".into()))
}
