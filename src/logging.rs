//! Logging
//!
//! `tracing` subscriber setup for the `cairn` binary. Level, format and
//! destination come from the layered configuration, then from `CAIRN_LOG*`
//! environment variables, which win.

use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Log line encoding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(ApiError::ConfigError(format!(
                "Invalid log format: {} (must be 'json' or 'text')",
                other
            ))),
        }
    }
}

/// Where log lines go
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogOutput {
    #[serde(rename = "stdout")]
    Stdout,
    #[default]
    #[serde(rename = "stderr")]
    Stderr,
    #[serde(rename = "file")]
    File,
    #[serde(rename = "file+stderr")]
    FileAndStderr,
    #[serde(rename = "both")]
    Both,
}

impl LogOutput {
    fn writes_file(self) -> bool {
        matches!(self, LogOutput::File | LogOutput::FileAndStderr)
    }
}

impl FromStr for LogOutput {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stdout" => Ok(LogOutput::Stdout),
            "stderr" => Ok(LogOutput::Stderr),
            "file" => Ok(LogOutput::File),
            "file+stderr" => Ok(LogOutput::FileAndStderr),
            "both" => Ok(LogOutput::Both),
            other => Err(ApiError::ConfigError(format!(
                "Invalid log output: {} (must be 'stdout', 'stderr', 'file', 'file+stderr', or 'both')",
                other
            ))),
        }
    }
}

/// `[logging]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// trace, debug, info, warn, error or off
    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub output: LogOutput,

    /// Log file when output includes a file; defaults to the platform state dir
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// ANSI colors for terminal output
    #[serde(default = "default_true")]
    pub color: bool,

    /// Per-target levels, e.g. `cairn::vfs = "trace"`
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_level(),
            format: LogFormat::default(),
            output: LogOutput::default(),
            file: None,
            color: true,
            modules: HashMap::new(),
        }
    }
}

impl LoggingConfig {
    /// Apply `CAIRN_LOG_FORMAT`, `CAIRN_LOG_OUTPUT` and `CAIRN_LOG_FILE`
    pub fn with_env_overrides(mut self) -> Result<Self, ApiError> {
        if let Some(format) = env_value("CAIRN_LOG_FORMAT") {
            self.format = format.parse()?;
        }
        if let Some(output) = env_value("CAIRN_LOG_OUTPUT") {
            self.output = output.parse()?;
        }
        if let Some(file) = env_value("CAIRN_LOG_FILE") {
            self.file = Some(PathBuf::from(file));
        }
        Ok(self)
    }

    /// `-v` raises the level to debug, `-vv` and more to trace
    pub fn apply_verbosity(&mut self, verbose: u8) {
        self.level = level_for_verbosity(verbose, &self.level);
    }

    fn log_file(&self) -> Result<PathBuf, ApiError> {
        match &self.file {
            Some(path) if !path.as_os_str().is_empty() => Ok(path.clone()),
            _ => default_log_file(),
        }
    }

    fn env_filter(&self) -> Result<EnvFilter, ApiError> {
        if let Ok(filter) = EnvFilter::try_from_env("CAIRN_LOG") {
            return Ok(filter);
        }
        if self.level == "off" {
            return Ok(EnvFilter::new("off"));
        }

        let mut filter = EnvFilter::new(&self.level);
        let env_modules = env_value("CAIRN_LOG_MODULES").unwrap_or_default();
        let from_env = env_modules
            .split(',')
            .filter_map(|spec| spec.split_once('='))
            .map(|(target, level)| (target.trim(), level.trim()));
        let from_config = self
            .modules
            .iter()
            .map(|(target, level)| (target.as_str(), level.as_str()));
        for (target, level) in from_config.chain(from_env) {
            let directive = format!("{}={}", target, level)
                .parse()
                .map_err(|e| ApiError::ConfigError(format!("Invalid log directive: {}", e)))?;
            filter = filter.add_directive(directive);
        }
        Ok(filter)
    }

    fn writer(&self) -> Result<BoxMakeWriter, ApiError> {
        let writer = match self.output {
            LogOutput::Stdout => BoxMakeWriter::new(std::io::stdout),
            LogOutput::Stderr => BoxMakeWriter::new(std::io::stderr),
            LogOutput::Both => BoxMakeWriter::new(std::io::stdout.and(std::io::stderr)),
            LogOutput::File => BoxMakeWriter::new(Mutex::new(open_log_file(&self.log_file()?)?)),
            LogOutput::FileAndStderr => BoxMakeWriter::new(
                Mutex::new(open_log_file(&self.log_file()?)?).and(std::io::stderr),
            ),
        };
        Ok(writer)
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Map a `-v` count onto a level, keeping `configured` when no flag is given
pub fn level_for_verbosity(verbose: u8, configured: &str) -> String {
    match verbose {
        0 => configured.to_string(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

/// `<state dir>/cairn.log`, or the local data dir on platforms without one
pub fn default_log_file() -> Result<PathBuf, ApiError> {
    let dirs = directories::ProjectDirs::from("", "cairn", "cairn").ok_or_else(|| {
        ApiError::ConfigError("Could not determine platform state directory for log file".into())
    })?;
    let dir = dirs.state_dir().unwrap_or_else(|| dirs.data_local_dir());
    Ok(dir.join("cairn.log"))
}

fn open_log_file(path: &Path) -> Result<std::fs::File, ApiError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| ApiError::ConfigError(format!("Failed to create log directory: {}", e)))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| ApiError::ConfigError(format!("Failed to open log file {:?}: {}", path, e)))
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<(), ApiError> {
    let installed = if !config.enabled {
        Registry::default()
            .with(EnvFilter::new("off"))
            .with(fmt::layer().with_writer(std::io::sink))
            .try_init()
    } else {
        let config = config.clone().with_env_overrides()?;
        let registry = Registry::default().with(config.env_filter()?);
        let layer = fmt::layer()
            .with_target(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_writer(config.writer()?);
        match config.format {
            LogFormat::Json => registry.with(layer.json()).try_init(),
            LogFormat::Text => registry
                .with(layer.with_ansi(config.color && !config.output.writes_file()))
                .try_init(),
        }
    };
    installed.map_err(|e| ApiError::ConfigError(format!("Failed to install logger: {}", e)))
}
