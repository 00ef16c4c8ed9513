//! The bot's configuration file.

use ircbot_engine::{ReconnectConfig, ServerConfig};
use serde::Deserialize;
use thiserror::Error;
use tracing_core::LevelFilter;

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

/// Errors that could happen when loading a config
#[derive(Debug, Error)]
pub enum ConfigError
{
    #[error("I/O error on {1}: {0}")]
    IoError(std::io::Error, PathBuf),
    #[error("Parse error in {1}: {0}")]
    ParseError(json5::Error, PathBuf),
}

/// Everything read from the configuration file
#[derive(Debug, Deserialize)]
pub struct BotConfig
{
    pub server: ServerConfig,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
    #[serde(default)]
    pub log: LoggingConfig,
    /// Settings for the bot logic, passed through uninterpreted
    #[serde(default)]
    pub bot: serde_json::Value,
}

impl BotConfig
{
    /// Load configuration from a file
    pub fn load_file(filename: impl AsRef<Path>) -> Result<Self, ConfigError>
    {
        let filename = filename.as_ref();
        let text = fs::read_to_string(filename)
            .map_err(|e| ConfigError::IoError(e, filename.to_owned()))?;

        Self::parse(&text).map_err(|e| ConfigError::ParseError(e, filename.to_owned()))
    }

    pub fn parse(text: &str) -> Result<Self, json5::Error>
    {
        json5::from_str(text)
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BuiltinLogTarget
{
    Stdout,
    Stderr,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum LogTarget
{
    File { filename: PathBuf },
    Builtin(BuiltinLogTarget),
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel
{
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Off,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LogEntry
{
    pub target: LogTarget,
    #[serde(default)]
    pub modules: Vec<String>,
    pub level: Option<LogLevel>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct LoggingConfig
{
    /// Directory for file targets, relative to the working directory
    pub dir: PathBuf,
    pub default_level: Option<LogLevel>,
    pub module_levels: HashMap<String, LogLevel>,
    pub targets: Vec<LogEntry>,
}

impl Default for LoggingConfig
{
    fn default() -> Self
    {
        Self {
            dir: PathBuf::from("log"),
            default_level: Some(LogLevel::Info),
            module_levels: HashMap::new(),
            targets: vec![LogEntry {
                target: LogTarget::Builtin(BuiltinLogTarget::Stdout),
                modules: Vec::new(),
                level: None,
            }],
        }
    }
}

impl LoggingConfig
{
    /// Whether any target writes into [`dir`](Self::dir)
    pub fn uses_dir(&self) -> bool
    {
        self.targets
            .iter()
            .any(|entry| matches!(entry.target, LogTarget::File { .. }))
    }
}

impl From<LogLevel> for LevelFilter
{
    fn from(arg: LogLevel) -> LevelFilter
    {
        match arg
        {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Off => LevelFilter::OFF,
        }
    }
}
