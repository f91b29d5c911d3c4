//! Tracing setup for pools and the `fairturn` binary.
//!
//! One global subscriber per process, assembled from a console layer and an
//! optional plain-text file layer. `RUST_LOG` directives are applied on top
//! of the configured level, e.g. `RUST_LOG=fairturn::gate=debug`.
//!
//! ```rust
//! use fairturn::logging::{self, LogConfig, LogFormat};
//!
//! logging::init(LogConfig {
//!     format: LogFormat::Json,
//!     ..LogConfig::default()
//! });
//! ```
//!
//! Worker threads do not inherit a thread-local default, so the pool hands
//! each one the dispatcher returned by [`dispatch_for_thread`].

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::{Mutex, Once};

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer, Registry};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

static INSTALL: Once = Once::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines, colored when stdout is a terminal.
    Pretty,
    /// One flattened JSON object per event.
    Json,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: Level,
    pub format: LogFormat,
    /// Attach `file:line` to every event.
    pub source_location: bool,
    /// Attach the worker thread name and id.
    pub thread_names: bool,
    pub timestamps: bool,
    /// Extra comma-separated directives, same syntax as `RUST_LOG`.
    pub directives: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::Pretty,
            source_location: false,
            thread_names: true,
            timestamps: true,
            directives: None,
        }
    }
}

impl LogConfig {
    /// Debug for the crate and per-turn trace from the gate.
    pub fn development() -> Self {
        Self {
            level: Level::DEBUG,
            source_location: true,
            directives: Some("fairturn=debug,fairturn::gate=trace".to_string()),
            ..Self::default()
        }
    }

    pub fn production() -> Self {
        Self {
            format: LogFormat::Json,
            ..Self::default()
        }
    }

    /// Warnings and errors only, without timestamps or thread noise.
    pub fn test() -> Self {
        Self {
            level: Level::WARN,
            source_location: true,
            thread_names: false,
            timestamps: false,
            ..Self::default()
        }
    }

    fn filter(&self) -> EnvFilter {
        let mut filter = EnvFilter::from_default_env().add_directive(self.level.into());
        for raw in self.directives.iter().flat_map(|d| d.split(',')) {
            match raw.trim().parse() {
                Ok(directive) => filter = filter.add_directive(directive),
                Err(err) => eprintln!("fairturn: ignoring log directive {raw:?}: {err}"),
            }
        }
        filter
    }

    fn console_layer(&self) -> BoxedLayer {
        match self.format {
            LogFormat::Json => fmt::layer()
                .json()
                .flatten_event(true)
                .with_thread_names(self.thread_names)
                .boxed(),
            LogFormat::Pretty => {
                let layer = fmt::layer()
                    .with_ansi(atty::is(atty::Stream::Stdout))
                    .with_file(self.source_location)
                    .with_line_number(self.source_location)
                    .with_thread_names(self.thread_names)
                    .with_thread_ids(self.thread_names);
                if self.timestamps {
                    layer.boxed()
                } else {
                    layer.without_time().boxed()
                }
            }
        }
    }
}

fn install(filter: EnvFilter, layers: Vec<BoxedLayer>) {
    INSTALL.call_once(|| {
        let subscriber = tracing_subscriber::registry().with(layers).with(filter);
        if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
            eprintln!("fairturn: a tracing subscriber is already installed: {err}");
        }
    });
}

/// Install the global subscriber. Later calls in the same process are
/// ignored.
pub fn init(config: LogConfig) {
    install(config.filter(), vec![config.console_layer()]);
}

/// Open `path` for appending, creating it when missing.
pub fn file_writer(path: impl AsRef<Path>) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Like [`init`], and also append uncolored events to `path`.
///
/// Fails up front when the file cannot be opened.
pub fn init_with_file(config: LogConfig, path: impl AsRef<Path>) -> io::Result<()> {
    let file = file_writer(path)?;
    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_thread_names(true)
        .with_writer(Mutex::new(file))
        .boxed();
    install(config.filter(), vec![config.console_layer(), file_layer]);
    Ok(())
}

pub fn init_default() {
    init(LogConfig::default());
}

pub fn init_development() {
    init(LogConfig::development());
}

pub fn init_production() {
    init(LogConfig::production());
}

pub fn init_test() {
    init(LogConfig::test());
}

/// Dispatcher to install on a freshly spawned worker thread.
pub fn dispatch_for_thread() -> tracing::Dispatch {
    tracing::dispatcher::get_default(tracing::Dispatch::clone)
}

/// Span covering one worker thread, keyed by actor id.
///
/// ```rust
/// let span = fairturn::worker_span!("7d0c3a");
/// let _entered = span.enter();
/// ```
#[macro_export]
macro_rules! worker_span {
    ($id:expr) => {
        tracing::info_span!("worker", actor_id = %$id)
    };
    ($id:expr, $($extra:tt)*) => {
        tracing::info_span!("worker", actor_id = %$id, $($extra)*)
    };
}

/// Worker came up, completed, retired.
#[macro_export]
macro_rules! log_lifecycle {
    ($id:expr, $event:literal) => {
        tracing::info!(actor_id = %$id, event = $event)
    };
    ($id:expr, $event:literal, $($extra:tt)*) => {
        tracing::info!(actor_id = %$id, event = $event, $($extra)*)
    };
}

/// Turn granted or released. Fires on every transition, hence debug.
#[macro_export]
macro_rules! log_turn {
    ($id:expr, $event:literal) => {
        tracing::debug!(actor_id = %$id, turn_event = $event)
    };
    ($id:expr, $event:literal, $($extra:tt)*) => {
        tracing::debug!(actor_id = %$id, turn_event = $event, $($extra)*)
    };
}

/// Controller phase changes: start, stop, drain.
#[macro_export]
macro_rules! log_pool {
    ($phase:literal, $status:literal) => {
        tracing::info!(phase = $phase, status = $status)
    };
    ($phase:literal, $status:literal, $($extra:tt)*) => {
        tracing::info!(phase = $phase, status = $status, $($extra)*)
    };
}

/// Error event with the error rendered through `Display`.
#[macro_export]
macro_rules! log_error {
    ($err:expr) => {
        tracing::error!(error = %$err)
    };
    ($err:expr, $($extra:tt)*) => {
        tracing::error!(error = %$err, $($extra)*)
    };
}
