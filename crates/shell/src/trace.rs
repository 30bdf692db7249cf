//! Scoped trace collection tied to an activity's lifetime.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

/// Failure reported by a trace controller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("trace controller: {0}")]
pub struct TraceError(pub String);

/// Starts and stops trace collection for one activity.
pub trait TraceController: Send + Sync {
	fn start(&self) -> Result<(), TraceError>;

	fn stop(&self) -> Result<(), TraceError>;
}

/// Active trace session. Stops the controller exactly once, either through
/// [`Self::release`] or on drop.
pub struct TraceGuard {
	controller: Arc<dyn TraceController>,
	active: bool,
}

impl TraceGuard {
	pub fn acquire(controller: Arc<dyn TraceController>) -> Result<Self, TraceError> {
		controller.start()?;
		debug!("trace session started");
		Ok(Self { controller, active: true })
	}

	/// Stops the session and reports the outcome.
	pub fn release(mut self) -> Result<(), TraceError> {
		self.active = false;
		debug!("trace session stopped");
		self.controller.stop()
	}
}

impl Drop for TraceGuard {
	fn drop(&mut self) {
		if self.active
			&& let Err(error) = self.controller.stop()
		{
			warn!(%error, "failed to stop trace session");
		}
	}
}
