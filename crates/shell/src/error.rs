//! Aggregate error for shell startup.

use thiserror::Error;

use crate::barrier::InitError;
use crate::config::ConfigError;
use crate::registry::RegistryError;
use crate::resources::ResourceError;

/// Errors surfaced while starting or driving the shell.
#[derive(Debug, Error)]
pub enum ShellError {
	#[error(transparent)]
	Config(#[from] ConfigError),

	#[error(transparent)]
	Resources(#[from] ResourceError),

	/// Fatal; the process must not continue with a half-started runtime.
	#[error(transparent)]
	Init(#[from] InitError),

	#[error(transparent)]
	Registry(#[from] RegistryError),
}

/// Result type for shell operations.
pub type Result<T> = std::result::Result<T, ShellError>;
