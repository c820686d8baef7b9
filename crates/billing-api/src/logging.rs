//! # Logging
//!
//! Builds the service's tracing subscriber without installing it globally.
//! The [`Logging`] value is handed to the server, which runs each of its
//! tasks under the contained dispatcher; dropping the server drops the
//! subscriber with it.

use crate::state::AppConfig;
use tracing::{Dispatch, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer, Registry};

/// Explicitly constructed logging context
#[derive(Clone)]
pub struct Logging {
    dispatch: Dispatch,
}

impl Logging {
    /// JSON lines on stdout, or human readable output on stderr when `console`
    /// is set. `RUST_LOG` directives override the default level.
    pub fn new(level: Level, console: bool) -> Self {
        let output: Box<dyn Layer<Registry> + Send + Sync> = if console {
            fmt::layer().with_writer(std::io::stderr).boxed()
        } else {
            fmt::layer().json().with_writer(std::io::stdout).boxed()
        };

        let subscriber = tracing_subscriber::registry().with(output).with(
            EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        );

        Self {
            dispatch: Dispatch::new(subscriber),
        }
    }

    /// Logging configured from the service config
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.log_level, config.console_log)
    }

    /// Discard everything
    pub fn disabled() -> Self {
        Self {
            dispatch: Dispatch::none(),
        }
    }

    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// Run `f` with this context as the default subscriber
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }
}

impl std::fmt::Debug for Logging {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logging").finish_non_exhaustive()
    }
}
