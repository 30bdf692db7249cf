//! Shell configuration loaded from TOML.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::native::HostContext;

/// Suffix appended to platform directories for the shell's private data.
pub const PRIVATE_DATA_DIRECTORY_SUFFIX: &str = "sky_shell";

const DAY_SECS: u64 = 24 * 60 * 60;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error reading a configuration file.
	#[error("I/O error reading {path}: {error}")]
	Io {
		/// Path to the file that failed to read.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// Error parsing TOML syntax or shape.
	#[error("TOML parse error: {0}")]
	Toml(#[from] toml::de::Error),
}

/// Top-level shell configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShellConfig {
	/// Directory that receives extracted resources.
	pub data_dir: PathBuf,
	/// Directory for disposable caches.
	pub cache_dir: PathBuf,
	/// Directory resources are extracted from.
	pub asset_dir: PathBuf,
	/// Resource names extracted after the built-in ones.
	pub resources: Vec<String>,
	/// Periodic update check settings.
	pub update: UpdateConfig,
}

impl Default for ShellConfig {
	fn default() -> Self {
		Self {
			data_dir: platform_dir(dirs::data_local_dir()),
			cache_dir: platform_dir(dirs::cache_dir()),
			asset_dir: PathBuf::from("assets"),
			resources: Vec::new(),
			update: UpdateConfig::default(),
		}
	}
}

fn platform_dir(base: Option<PathBuf>) -> PathBuf {
	base.unwrap_or_else(std::env::temp_dir).join(PRIVATE_DATA_DIRECTORY_SUFFIX)
}

impl ShellConfig {
	/// Loads configuration from a TOML file.
	pub fn load(path: &Path) -> Result<Self, ConfigError> {
		let text = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		Self::from_toml_str(&text)
	}

	/// Parses configuration from TOML text. Missing keys take their defaults.
	pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
		Ok(toml::from_str(text)?)
	}

	/// Returns the host context handed to the native runtime.
	pub fn host_context(&self) -> HostContext {
		HostContext {
			data_dir: self.data_dir.clone(),
			cache_dir: self.cache_dir.clone(),
		}
	}
}

/// Periodic update check settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UpdateConfig {
	/// Whether update checks are scheduled at all. Defaults to the
	/// `update-check` build feature.
	pub enabled: bool,
	/// Reschedule even when an alarm already exists.
	pub testing: bool,
	/// Approximate seconds between checks.
	pub interval_secs: u64,
}

impl Default for UpdateConfig {
	fn default() -> Self {
		Self {
			enabled: cfg!(feature = "update-check"),
			testing: false,
			interval_secs: DAY_SECS,
		}
	}
}

impl UpdateConfig {
	/// Interval between checks, never shorter than one second.
	pub fn interval(&self) -> Duration {
		Duration::from_secs(self.interval_secs.max(1))
	}

	/// Whether [`crate::UpdateScheduler::init`] will register an alarm.
	pub fn is_active(&self) -> bool {
		self.enabled || self.testing
	}
}
