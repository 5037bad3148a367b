use super::properties::{
    self, BUFFER_DISK_LOC, BUFFER_MAX_BYTES, BUFFER_OVERLAP_MILLIS, BUFFER_PARTITIONS,
    BUFFER_TIME_MILLIS, MEMORY_MAX_BYTES, MEMORY_OVERLAP_MILLIS, MEMORY_PARTITIONS,
    MEMORY_TIME_MILLIS,
};
use super::{ConfigError, LogFormat, LogLevel};
use crate::buffer::BufferConfig;
use crate::domain::TimeUnit;
use clap::Parser;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug, Clone, PartialEq)]
#[command(author, version, about = "Rotating partitioned telemetry buffer", long_about = None)]
pub struct Config {
    /// Configuration file (TOML, dotted keys or nested tables)
    #[arg(long, env = "CONFIG_FILE")]
    pub config_file: Option<PathBuf>,

    /// Number of disk partitions
    #[arg(long, env = "BUFFER_PARTITIONS")]
    pub buffer_partitions: Option<usize>,

    /// Disk rotation interval in milliseconds (-1 disables rotation)
    #[arg(long, env = "BUFFER_TIME_MILLIS", allow_hyphen_values = true)]
    pub buffer_time_millis: Option<i64>,

    /// Retention grace period after rotation in milliseconds
    #[arg(long, env = "BUFFER_PARTITION_OVERLAP_MILLIS")]
    pub buffer_overlap_millis: Option<u64>,

    /// Directory holding the disk partitions
    #[arg(long, env = "BUFFER_DISK_LOC")]
    pub buffer_disk_loc: Option<PathBuf>,

    /// Per-partition disk quota in bytes
    #[arg(long, env = "BUFFER_PARTITION_MAX_BYTES")]
    pub buffer_max_bytes: Option<u64>,

    /// Number of memory partitions
    #[arg(long, env = "MEMORY_BUFFER_PARTITION")]
    pub memory_partitions: Option<usize>,

    /// Memory rotation interval in milliseconds (-1 disables rotation)
    #[arg(long, env = "MEMORY_BUFFER_TIME_MILLIS", allow_hyphen_values = true)]
    pub memory_time_millis: Option<i64>,

    /// Memory ring overlap in milliseconds (defaults to the disk overlap)
    #[arg(long, env = "MEMORY_BUFFER_PARTITION_OVERLAP_MILLIS")]
    pub memory_overlap_millis: Option<u64>,

    /// Per-partition memory bound in bytes
    #[arg(long, env = "MEMORY_BUFFER_PARTITION_MAX_BYTES")]
    pub memory_max_bytes: Option<u64>,

    /// Run without the disk ring
    #[arg(long, env = "MEMORY_ONLY")]
    pub memory_only: bool,

    /// Unit of integer timestamps that carry no explicit unit
    #[arg(long, env = "DEFAULT_TIME_UNIT", default_value = "ms")]
    pub default_unit: TimeUnit,

    /// Print buffered feeds as JSON on shutdown
    #[arg(long, env = "DUMP_ON_EXIT")]
    pub dump: bool,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", default_value = "json")]
    pub log_format: LogFormat,
}

/// Buffer configuration after all sources were merged.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub buffer: BufferConfig,
    /// Keys from the configuration file that were not recognised.
    pub ignored_keys: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_file: None,
            buffer_partitions: None,
            buffer_time_millis: None,
            buffer_overlap_millis: None,
            buffer_disk_loc: None,
            buffer_max_bytes: None,
            memory_partitions: None,
            memory_time_millis: None,
            memory_overlap_millis: None,
            memory_max_bytes: None,
            memory_only: false,
            default_unit: TimeUnit::Milliseconds,
            dump: false,
            log_level: LogLevel::Info,
            log_format: LogFormat::Json,
        }
    }
}

impl Config {
    pub fn from_args<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Config::try_parse_from(args).map_err(|e| ConfigError::InvalidConfig(e.to_string()))
    }

    /// Merges defaults, the configuration file and explicit flags/env (highest
    /// precedence) into a validated buffer configuration.
    pub fn resolve(&self) -> Result<ResolvedConfig, ConfigError> {
        let mut buffer = BufferConfig::default();
        let ignored_keys = match &self.config_file {
            Some(path) => load_file(&mut buffer, path)?,
            None => Vec::new(),
        };

        properties::apply_properties(&mut buffer, self.overrides())?;

        self.validate(&buffer)?;
        Ok(ResolvedConfig {
            buffer,
            ignored_keys,
        })
    }

    fn overrides(&self) -> Vec<(&'static str, String)> {
        let mut overrides = Vec::new();
        let mut push = |key: &'static str, value: Option<String>| {
            if let Some(value) = value {
                overrides.push((key, value));
            }
        };
        push(BUFFER_PARTITIONS, self.buffer_partitions.map(|v| v.to_string()));
        push(BUFFER_TIME_MILLIS, self.buffer_time_millis.map(|v| v.to_string()));
        push(BUFFER_OVERLAP_MILLIS, self.buffer_overlap_millis.map(|v| v.to_string()));
        push(
            BUFFER_DISK_LOC,
            self.buffer_disk_loc.as_ref().map(|p| p.display().to_string()),
        );
        push(BUFFER_MAX_BYTES, self.buffer_max_bytes.map(|v| v.to_string()));
        push(MEMORY_PARTITIONS, self.memory_partitions.map(|v| v.to_string()));
        push(MEMORY_TIME_MILLIS, self.memory_time_millis.map(|v| v.to_string()));
        push(MEMORY_OVERLAP_MILLIS, self.memory_overlap_millis.map(|v| v.to_string()));
        push(MEMORY_MAX_BYTES, self.memory_max_bytes.map(|v| v.to_string()));
        overrides
    }
}

fn load_file(buffer: &mut BufferConfig, path: &Path) -> Result<Vec<String>, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let document: toml::Value = toml::from_str(&content)?;
    properties::apply_properties(buffer, properties::flatten_toml(&document))
}
