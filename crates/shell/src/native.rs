//! Contracts for the native engine runtime.
//!
//! The shell never inspects what the engine does with a notification; every
//! call here is fire-and-forget except bootstrap and the update check, whose
//! results drive the init barrier and the update scheduler.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

/// Error reported by the native runtime.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct NativeError(pub String);

impl NativeError {
	pub fn new(message: impl Into<String>) -> Self {
		Self(message.into())
	}
}

/// Application-level context handed to the native runtime at bootstrap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostContext {
	/// Directory holding extracted resources.
	pub data_dir: PathBuf,
	/// Directory for disposable caches.
	pub cache_dir: PathBuf,
}

/// Input events delivered to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum InputEvent {
	/// Host back navigation, synthesized by the lifecycle bridge.
	Back,
	/// Host input forwarded without interpretation.
	Raw(Vec<u8>),
}

/// A live engine instance created by bootstrap.
pub trait Engine: Send + Sync {
	fn on_input_event(&self, event: InputEvent);

	fn on_activity_paused(&self);

	fn on_activity_resumed(&self);

	fn on_activity_post_resumed(&self);

	fn on_activity_destroyed(&self);

	fn run_from_snapshot(&self, path: &Path);

	fn run_from_bundle(&self, path: &Path);

	fn run_from_network(&self, url: &str);
}

/// Shared handle to the process engine.
pub type EngineHandle = Arc<dyn Engine>;

/// Handle for one in-flight native update check.
///
/// Releasing consumes the handle, so it can happen at most once.
pub trait UpdateTask: Send {
	fn release(self: Box<Self>);
}

/// The native runtime: bootstrap, run loop, and update checks.
pub trait NativeRuntime: Send + Sync {
	/// Starts the runtime with an already vetted argument vector and returns
	/// the engine instance it created.
	fn bootstrap(&self, context: &HostContext, argv: &[String]) -> Result<EngineHandle, NativeError>;

	/// Creates the default run loop used by the IPC layer.
	fn start_run_loop(&self) -> Result<(), NativeError>;

	/// Begins an update check. Completion arrives later through the updater
	/// service binding.
	fn check_for_updates(&self) -> Result<Box<dyn UpdateTask>, NativeError>;
}
