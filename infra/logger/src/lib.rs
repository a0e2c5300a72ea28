//! # Logger
//!
//! Installs the process-wide `tracing` subscriber for Quill binaries: a compact console
//! layer, an optional rolling file layer (plain text or JSON) and an `EnvFilter` whose
//! default directive comes from the builder while `RUST_LOG` can still override it.
//!
//! ```rust
//! # use quill_logger::{Logger, LevelFilter};
//! let _logger = Logger::builder()
//!     .name("quill-server")
//!     .level(LevelFilter::DEBUG)
//!     .init()
//!     .unwrap();
//! ```

mod error;

pub use crate::error::{LoggerError, LoggerErrorExt};
pub use tracing::level_filters::LevelFilter;
pub use tracing_appender::rolling::Rotation;

use std::fs;
use std::marker::PhantomData;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::fmt::layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const DEFAULT_MAX_FILES: usize = 10;
const LOG_FILE_SUFFIX: &str = "log";

#[derive(Debug)]
struct LoggerConfig {
    console: bool,
    dir: Option<PathBuf>,
    level: LevelFilter,
    rotation: Rotation,
    max_files: usize,
    json: bool,
    directives: Option<String>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            console: true,
            dir: None,
            level: LevelFilter::INFO,
            rotation: Rotation::DAILY,
            max_files: DEFAULT_MAX_FILES,
            json: false,
            directives: None,
        }
    }
}

/// Builder state: no name given yet.
#[derive(Debug)]
pub struct Unnamed;
/// Builder state: name given, `init` available.
#[derive(Debug)]
pub struct Named(String);

/// Configures and installs the global subscriber. `init` is only callable once a name is set.
#[derive(Debug)]
pub struct LoggerBuilder<N = Unnamed> {
    config: LoggerConfig,
    name: N,
}

impl LoggerBuilder<Unnamed> {
    /// Names the application; also used as the log file prefix (`<name>.<date>.log`).
    pub fn name(self, name: impl Into<String>) -> LoggerBuilder<Named> {
        LoggerBuilder { config: self.config, name: Named(name.into()) }
    }
}

impl<N> LoggerBuilder<N> {
    #[must_use]
    pub const fn level(mut self, level: LevelFilter) -> Self {
        self.config.level = level;
        self
    }

    /// Shorthand used by the server: `DEBUG` in debug mode, `INFO` otherwise.
    #[must_use]
    pub const fn debug(self, debug: bool) -> Self {
        self.level(if debug { LevelFilter::DEBUG } else { LevelFilter::INFO })
    }

    /// Extra filter directives (e.g. `quill_blog=trace,hyper=warn`).
    #[must_use]
    pub fn directives(mut self, directives: impl Into<String>) -> Self {
        self.config.directives = Some(directives.into());
        self
    }

    #[must_use]
    pub const fn console(mut self, enabled: bool) -> Self {
        self.config.console = enabled;
        self
    }

    /// Writes rolling log files into `dir`.
    #[must_use]
    pub fn directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.dir = Some(dir.into());
        self
    }

    #[must_use]
    pub const fn rotation(mut self, rotation: Rotation) -> Self {
        self.config.rotation = rotation;
        self
    }

    #[must_use]
    pub const fn max_files(mut self, max: usize) -> Self {
        self.config.max_files = max;
        self
    }

    /// JSON lines in the file layer; the console stays human readable.
    #[must_use]
    pub const fn json(mut self, enabled: bool) -> Self {
        self.config.json = enabled;
        self
    }
}

impl LoggerBuilder<Named> {
    /// Runs `f` under a console-only subscriber with this builder's filter, without installing
    /// anything globally. Use it for work that must log before [`init`](Self::init) can run,
    /// such as loading the settings that configure the logger.
    ///
    /// # Errors
    /// [`LoggerError::InvalidConfiguration`] for invalid directives.
    pub fn scope<T>(&self, f: impl FnOnce() -> T) -> Result<T, LoggerError> {
        let subscriber = tracing_subscriber::registry()
            .with(env_filter(&self.config)?)
            .with(layer().compact().with_ansi(true));
        Ok(tracing::subscriber::with_default(subscriber, f))
    }

    /// Installs the global subscriber.
    ///
    /// Keep the returned [`Logger`] alive for the lifetime of the process: it owns the file
    /// writer's background worker.
    ///
    /// # Errors
    /// * [`LoggerError::InvalidConfiguration`] for an empty name, `max_files == 0`, invalid
    ///   directives or when no layer is enabled.
    /// * [`LoggerError::Appender`] if the log directory cannot be used.
    /// * [`LoggerError::Subscriber`] if a global subscriber is already installed.
    pub fn init(self) -> Result<Logger, LoggerError> {
        let Self { config, name: Named(name) } = self;
        validate(&config, &name)?;

        let filter = env_filter(&config)?;
        let mut layers = Vec::new();

        if config.console {
            layers.push(layer().compact().with_ansi(true).boxed());
        }

        let guard = match &config.dir {
            Some(dir) => {
                fs::create_dir_all(dir).map_err(|e| LoggerError::Internal {
                    message: e.to_string().into(),
                    context: Some(format!("Creating log directory {}", dir.display()).into()),
                })?;

                let appender = RollingFileAppender::builder()
                    .rotation(config.rotation.clone())
                    .filename_prefix(&name)
                    .filename_suffix(LOG_FILE_SUFFIX)
                    .max_log_files(config.max_files)
                    .build(dir)
                    .context("Building rolling file appender")?;

                let (writer, guard) = tracing_appender::non_blocking(appender);
                let file = layer().with_writer(writer).with_ansi(false);
                layers.push(if config.json { file.json().boxed() } else { file.boxed() });
                Some(guard)
            }
            None => None,
        };

        if layers.is_empty() {
            return Err(LoggerError::InvalidConfiguration {
                message: "No logging layers enabled; enable the console or a log directory"
                    .into(),
                context: None,
            });
        }

        tracing_subscriber::registry().with(filter).with(layers).try_init()?;

        Ok(Logger { guard })
    }
}

/// Handle to the installed subscriber; dropping it flushes and stops the file writer.
#[must_use = "dropping the logger stops the background file writer"]
#[derive(Debug)]
pub struct Logger {
    guard: Option<WorkerGuard>,
}

impl Logger {
    pub fn builder() -> LoggerBuilder<Unnamed> {
        LoggerBuilder { config: LoggerConfig::default(), name: Unnamed }
    }

    /// `true` when a file layer (and its worker) is active.
    #[must_use]
    pub const fn has_file_output(&self) -> bool {
        self.guard.is_some()
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        if self.guard.is_some() {
            tracing::info!("Logging system shutting down, flushing buffers");
        }
    }
}

fn validate(config: &LoggerConfig, name: &str) -> Result<(), LoggerError> {
    if name.trim().is_empty() {
        return Err(LoggerError::InvalidConfiguration {
            message: "Logger name cannot be empty".into(),
            context: None,
        });
    }
    if config.max_files == 0 {
        return Err(LoggerError::InvalidConfiguration {
            message: "max_files must be greater than zero".into(),
            context: None,
        });
    }
    Ok(())
}

fn env_filter(config: &LoggerConfig) -> Result<EnvFilter, LoggerError> {
    let builder = EnvFilter::builder().with_default_directive(config.level.into());
    match &config.directives {
        None => Ok(builder.from_env_lossy()),
        Some(directives) => {
            builder.parse(directives).map_err(|e| LoggerError::InvalidConfiguration {
                message: format!("Invalid filter directives '{directives}': {e}").into(),
                context: None,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn builder_defaults() {
        let builder = Logger::builder().name("quill-test");
        assert!(builder.config.console);
        assert_eq!(builder.config.level, LevelFilter::INFO);
        assert!(builder.config.dir.is_none());
        assert!(!builder.config.json);
    }

    #[test]
    fn debug_flag_selects_level() {
        assert_eq!(Logger::builder().debug(true).config.level, LevelFilter::DEBUG);
        assert_eq!(Logger::builder().debug(false).config.level, LevelFilter::INFO);
    }

    #[test]
    fn rejects_blank_name_and_zero_files() {
        let err = Logger::builder().name("  ").init().unwrap_err();
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));

        let err = Logger::builder().name("quill-test").max_files(0).init().unwrap_err();
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));
    }

    #[test]
    fn scope_sees_events_before_init() {
        let builder = Logger::builder().name("quill-test").level(LevelFilter::WARN);
        let enabled = builder
            .scope(|| (tracing::enabled!(tracing::Level::WARN), tracing::enabled!(tracing::Level::DEBUG)))
            .expect("scoped subscriber");
        assert_eq!(enabled, (true, false));

        let err = Logger::builder().name("quill-test").directives("quill=[").scope(|| ()).unwrap_err();
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));
    }

    #[test]
    fn rejects_invalid_directives() {
        let err = Logger::builder().name("quill-test").directives("quill=[").init().unwrap_err();
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));
    }

    #[test]
    #[serial]
    fn writes_rolling_json_file() {
        let tmp = tempdir().expect("temp dir");
        let dir = tmp.path().join("logs");

        let logger = Logger::builder()
            .name("quill-test")
            .console(false)
            .directory(&dir)
            .json(true)
            .init()
            .expect("logger init");
        assert!(logger.has_file_output());

        tracing::info!(post = "hello", "post published");
        std::thread::sleep(Duration::from_millis(20));
        drop(logger);

        let has_log = fs::read_dir(&dir)
            .expect("log dir")
            .flatten()
            .any(|entry| entry.path().extension().and_then(|e| e.to_str()) == Some("log"));
        assert!(has_log, "a .log file should exist in {}", dir.display());
    }
}
