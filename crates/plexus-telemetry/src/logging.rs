//! Subscriber construction for Plexus hosts.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::error::{TelemetryError, TelemetryResult};

type FmtLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// How often the log file rolls over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileRotation {
    /// One file per day.
    #[default]
    Daily,
    /// One file per hour.
    Hourly,
    /// One file per minute.
    Minutely,
    /// A single file.
    Never,
}

impl From<FileRotation> for Rotation {
    fn from(rotation: FileRotation) -> Self {
        match rotation {
            FileRotation::Daily => Self::DAILY,
            FileRotation::Hourly => Self::HOURLY,
            FileRotation::Minutely => Self::MINUTELY,
            FileRotation::Never => Self::NEVER,
        }
    }
}

/// Line format of emitted records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line, human oriented.
    Pretty,
    /// One line per record.
    #[default]
    Compact,
    /// Newline-delimited JSON objects.
    Json,
    /// The stock `tracing-subscriber` formatter.
    Full,
}

impl FromStr for LogFormat {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let format = match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Self::Pretty,
            "compact" => Self::Compact,
            "json" => Self::Json,
            "full" => Self::Full,
            other => {
                return Err(TelemetryError::ConfigError(format!(
                    "log format must be pretty, compact, json or full, got '{other}'"
                )));
            },
        };
        Ok(format)
    }
}

/// Where records are written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    /// Standard output.
    Stdout,
    /// Standard error.
    #[default]
    Stderr,
    /// Rolling files inside the given directory.
    File(PathBuf),
}

/// Naming and retention for [`LogTarget::File`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLogConfig {
    /// File name stem; files are named `{prefix}.{date}.log`.
    pub prefix: String,
    /// Roll-over schedule.
    pub rotation: FileRotation,
    /// Oldest files beyond this count are pruned. Zero keeps everything.
    pub max_files: usize,
}

impl Default for FileLogConfig {
    fn default() -> Self {
        Self {
            prefix: "plexus".to_owned(),
            rotation: FileRotation::Daily,
            max_files: 0,
        }
    }
}

/// Everything [`setup_logging`] needs to build the global subscriber.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Base filter, e.g. `"info"` or `"warn,plexus_manager=debug"`.
    pub level: String,
    /// Record format.
    pub format: LogFormat,
    /// Output destination.
    pub target: LogTarget,
    /// File settings, read only for [`LogTarget::File`].
    pub file: FileLogConfig,
    /// Prefix records with a timestamp.
    pub timestamps: bool,
    /// Color output. Ignored for JSON.
    pub ansi: bool,
    /// Record the emitting thread's id and name.
    pub threads: bool,
    /// Record source file and line.
    pub source_location: bool,
    /// Extra filter directives layered over `level`.
    pub directives: Vec<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: LogFormat::default(),
            target: LogTarget::default(),
            file: FileLogConfig::default(),
            timestamps: true,
            ansi: true,
            threads: false,
            source_location: false,
            directives: Vec::new(),
        }
    }
}

impl LogConfig {
    /// Defaults with the given base filter.
    #[must_use]
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            ..Self::default()
        }
    }

    /// Build a log config from the `[logging]` section of a Plexus config.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::ConfigError`] if the format is unknown.
    #[cfg(feature = "config")]
    pub fn from_section(section: &plexus_config::LoggingSection) -> TelemetryResult<Self> {
        let mut config = Self::new(section.level.as_str()).with_format(section.format.parse()?);
        config.directives.clone_from(&section.directives);
        Ok(config)
    }

    /// Set the record format.
    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the output destination.
    #[must_use]
    pub fn with_target(mut self, target: LogTarget) -> Self {
        self.target = target;
        self
    }

    /// Write to rolling files under `directory`. Turns color off.
    #[must_use]
    pub fn with_file_logging(
        self,
        directory: impl Into<PathBuf>,
        prefix: impl Into<String>,
        rotation: FileRotation,
    ) -> Self {
        let mut config = self.with_target(LogTarget::File(directory.into())).with_ansi(false);
        config.file.prefix = prefix.into();
        config.file.rotation = rotation;
        config
    }

    /// Prune rotated files beyond `max_files`.
    #[must_use]
    pub fn with_max_files(mut self, max_files: usize) -> Self {
        self.file.max_files = max_files;
        self
    }

    /// Append a filter directive such as `plexus_events=trace`.
    #[must_use]
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    /// Toggle timestamps.
    #[must_use]
    pub fn with_timestamps(mut self, enabled: bool) -> Self {
        self.timestamps = enabled;
        self
    }

    /// Toggle color output.
    #[must_use]
    pub fn with_ansi(mut self, enabled: bool) -> Self {
        self.ansi = enabled;
        self
    }

    /// Toggle thread ids and names.
    #[must_use]
    pub fn with_threads(mut self, enabled: bool) -> Self {
        self.threads = enabled;
        self
    }

    /// Toggle file and line info.
    #[must_use]
    pub fn with_source_location(mut self, enabled: bool) -> Self {
        self.source_location = enabled;
        self
    }

    fn filter(&self) -> TelemetryResult<EnvFilter> {
        let base = EnvFilter::try_new(&self.level).map_err(|e| {
            TelemetryError::ConfigError(format!("invalid log level '{}': {e}", self.level))
        })?;
        self.directives.iter().try_fold(base, |filter, directive| {
            let parsed = directive.parse::<Directive>().map_err(|e| {
                TelemetryError::ConfigError(format!("invalid directive '{directive}': {e}"))
            })?;
            Ok(filter.add_directive(parsed))
        })
    }

    fn writer(&self) -> TelemetryResult<BoxMakeWriter> {
        let dir = match &self.target {
            LogTarget::Stdout => return Ok(BoxMakeWriter::new(std::io::stdout)),
            LogTarget::Stderr => return Ok(BoxMakeWriter::new(std::io::stderr)),
            LogTarget::File(dir) => dir,
        };

        std::fs::create_dir_all(dir)?;
        let mut appender = RollingFileAppender::builder()
            .rotation(self.file.rotation.into())
            .filename_prefix(self.file.prefix.as_str())
            .filename_suffix("log");
        if self.file.max_files > 0 {
            appender = appender.max_log_files(self.file.max_files);
        }
        let appender = appender
            .build(dir)
            .map_err(|e| TelemetryError::InitError(format!("log file appender: {e}")))?;
        Ok(BoxMakeWriter::new(appender))
    }

    fn layer(&self, writer: BoxMakeWriter) -> FmtLayer {
        let layer = fmt::layer()
            .with_writer(writer)
            .with_ansi(self.ansi && self.format != LogFormat::Json)
            .with_thread_ids(self.threads)
            .with_thread_names(self.threads)
            .with_file(self.source_location)
            .with_line_number(self.source_location);

        // Each formatter/timer pair is its own type, hence one arm per pair.
        match self.format {
            LogFormat::Json if self.timestamps => layer.json().boxed(),
            LogFormat::Json => layer.json().without_time().boxed(),
            LogFormat::Pretty if self.timestamps => layer.pretty().boxed(),
            LogFormat::Pretty => layer.pretty().without_time().boxed(),
            LogFormat::Compact if self.timestamps => layer.compact().boxed(),
            LogFormat::Compact => layer.compact().without_time().boxed(),
            LogFormat::Full if self.timestamps => layer.boxed(),
            LogFormat::Full => layer.without_time().boxed(),
        }
    }
}

/// Install the global subscriber described by `config`.
///
/// # Errors
///
/// Returns an error if the filter is invalid, the log directory cannot be
/// created, or a global subscriber is already installed.
pub fn setup_logging(config: &LogConfig) -> TelemetryResult<()> {
    let filter = config.filter()?;
    let layer = config.layer(config.writer()?);

    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .try_init()
        .map_err(|e| TelemetryError::InitError(e.to_string()))
}

/// [`setup_logging`] with [`LogConfig::default`]: `info`, compact, stderr.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn setup_default_logging() -> TelemetryResult<()> {
    setup_logging(&LogConfig::default())
}
