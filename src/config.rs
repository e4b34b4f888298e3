use std::path::Path;
use std::time::Duration;
use anyhow::{anyhow, Context, Result};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use scrivener_sync::DEFAULT_PORT;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub(crate) enum LogLevel {
	Error,
	Warn,
	Info,
	Debug,
	Trace,
}

impl From<LogLevel> for LevelFilter {
	fn from(level: LogLevel) -> LevelFilter {
		match level {
			LogLevel::Error => LevelFilter::Error,
			LogLevel::Warn => LevelFilter::Warn,
			LogLevel::Info => LevelFilter::Info,
			LogLevel::Debug => LevelFilter::Debug,
			LogLevel::Trace => LevelFilter::Trace,
		}
	}
}

/// The settings from the config file. Everything given on the command line takes precedence.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub(crate) struct Config {
	pub(crate) port: u16,
	pub(crate) password: String,
	pub(crate) autosave_secs: u64,
	pub(crate) log_level: LogLevel,
	pub(crate) login_timeout_secs: u64,
}

impl Default for Config {
	fn default() -> Config {
		Config {
			port: DEFAULT_PORT,
			password: String::new(),
			autosave_secs: 60,
			log_level: LogLevel::Info,
			login_timeout_secs: 10,
		}
	}
}

impl Config {
	pub(crate) fn read(path: &Path) -> Result<Config> {
		let data = std::fs::read_to_string(path)
			.with_context(|| anyhow!("failed to read config file {path:?}"))?;
		Config::parse(&data)
			.with_context(|| anyhow!("failed to parse config file {path:?}"))
	}

	pub(crate) fn parse(data: &str) -> Result<Config> {
		Ok(serde_json::from_str(data)?)
	}

	/// Reads the config file if there is one, defaults otherwise.
	pub(crate) fn read_optional(path: Option<&Path>) -> Result<Config> {
		path.map_or_else(|| Ok(Config::default()), Config::read)
	}

	/// `None` turns autosaving off.
	pub(crate) fn autosave_interval(&self) -> Option<Duration> {
		(self.autosave_secs != 0).then(|| Duration::from_secs(self.autosave_secs))
	}
}

#[cfg(test)]
mod testing {
	use std::time::Duration;
	use anyhow::Result;
	use pretty_assertions::assert_eq;
	use crate::config::{Config, LogLevel};

	#[test]
	fn missing_values_are_defaults() -> Result<()> {
		let config = Config::parse(r#"{ "port": 1234, "log_level": "debug" }"#)?;
		assert_eq!(config, Config { port: 1234, log_level: LogLevel::Debug, ..Config::default() });
		assert_eq!(config.autosave_interval(), Some(Duration::from_secs(60)));

		assert_eq!(Config::parse("{}")?, Config::default());
		Ok(())
	}

	#[test]
	fn autosave_can_be_turned_off() -> Result<()> {
		let config = Config::parse(r#"{ "autosave_secs": 0 }"#)?;
		assert_eq!(config.autosave_interval(), None);
		Ok(())
	}

	#[test]
	fn unknown_log_levels() {
		assert!(Config::parse(r#"{ "log_level": "loud" }"#).is_err());
	}
}
