//! One-time native initialization.
//!
//! [`InitBarrier::ensure_initialized`] may be called from any number of entry
//! points and threads. The first caller waits for resources, bootstraps the
//! native runtime and starts its run loop; everyone else blocks until that
//! finished and then shares its outcome. Failure is terminal: a broken
//! bootstrap is never retried.

use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use thiserror::Error;
use tracing::{error, info};

use crate::native::{EngineHandle, HostContext, NativeError, NativeRuntime};
use crate::resources::{ResourceError, ResourceReadiness};

/// Native flags the shell may pass to bootstrap.
///
/// Launch requests come from untrusted callers, so bootstrap only ever sees
/// argv rendered from this closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeFlag {
	/// Report type errors in application code.
	EnableCheckedMode,
}

impl NativeFlag {
	pub const fn as_arg(self) -> &'static str {
		match self {
			Self::EnableCheckedMode => "--enable-checked-mode",
		}
	}
}

/// Renders flags into a bootstrap argument vector, dropping repeats.
pub fn render_argv(flags: &[NativeFlag]) -> Vec<String> {
	let mut argv: Vec<String> = Vec::with_capacity(flags.len());
	for flag in flags {
		let arg = flag.as_arg();
		if !argv.iter().any(|a| a == arg) {
			argv.push(arg.to_string());
		}
	}
	argv
}

/// Fatal initialization failure.
#[derive(Debug, Clone, Error)]
pub enum InitError {
	#[error("resources unavailable: {0}")]
	Resources(#[from] ResourceError),

	#[error("unable to load the engine: {0}")]
	Bootstrap(NativeError),

	#[error("failed to start the run loop: {0}")]
	RunLoop(NativeError),

	#[error("initialization panicked")]
	Panicked,
}

/// Observable barrier state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitStatus {
	NotStarted,
	InProgress,
	Done,
	Failed,
}

enum InitState {
	NotStarted,
	InProgress,
	Done(EngineHandle),
	Failed(InitError),
}

impl InitState {
	fn status(&self) -> InitStatus {
		match self {
			Self::NotStarted => InitStatus::NotStarted,
			Self::InProgress => InitStatus::InProgress,
			Self::Done(_) => InitStatus::Done,
			Self::Failed(_) => InitStatus::Failed,
		}
	}
}

/// Guards the one-time bootstrap sequence.
pub struct InitBarrier {
	context: HostContext,
	readiness: Arc<dyn ResourceReadiness>,
	runtime: Arc<dyn NativeRuntime>,
	state: Mutex<InitState>,
	settled: Condvar,
}

impl std::fmt::Debug for InitBarrier {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("InitBarrier")
			.field("context", &self.context)
			.field("status", &self.status())
			.finish_non_exhaustive()
	}
}

impl InitBarrier {
	pub fn new(context: HostContext, readiness: Arc<dyn ResourceReadiness>, runtime: Arc<dyn NativeRuntime>) -> Self {
		Self {
			context,
			readiness,
			runtime,
			state: Mutex::new(InitState::NotStarted),
			settled: Condvar::new(),
		}
	}

	/// Initializes the native runtime once and returns the engine it created.
	///
	/// Blocks on resource readiness when it is the first caller and on the
	/// first caller otherwise; never call it from a thread that must stay
	/// responsive.
	pub fn ensure_initialized(&self, flags: &[NativeFlag]) -> Result<EngineHandle, InitError> {
		{
			let mut state = self.state.lock();
			loop {
				match &*state {
					InitState::Done(engine) => return Ok(Arc::clone(engine)),
					InitState::Failed(err) => return Err(err.clone()),
					InitState::InProgress => {}
					InitState::NotStarted => break,
				}
				self.settled.wait(&mut state);
			}
			*state = InitState::InProgress;
		}

		let guard = SettleGuard { barrier: self, armed: true };
		let outcome = self.run(flags);
		guard.settle(outcome)
	}

	/// Returns the engine if initialization completed.
	pub fn engine(&self) -> Option<EngineHandle> {
		match &*self.state.lock() {
			InitState::Done(engine) => Some(Arc::clone(engine)),
			_ => None,
		}
	}

	pub fn status(&self) -> InitStatus {
		self.state.lock().status()
	}

	/// Returns the terminal failure, if any.
	pub fn failure(&self) -> Option<InitError> {
		match &*self.state.lock() {
			InitState::Failed(err) => Some(err.clone()),
			_ => None,
		}
	}

	pub fn context(&self) -> &HostContext {
		&self.context
	}

	fn run(&self, flags: &[NativeFlag]) -> Result<EngineHandle, InitError> {
		info!("waiting for resources");
		self.readiness.wait_for_completion()?;

		let argv = render_argv(flags);
		info!(?argv, "bootstrapping native runtime");
		let engine = self.runtime.bootstrap(&self.context, &argv).map_err(InitError::Bootstrap)?;

		self.runtime.start_run_loop().map_err(InitError::RunLoop)?;
		info!("run loop started");
		Ok(engine)
	}

	fn publish(&self, state: InitState) {
		*self.state.lock() = state;
		self.settled.notify_all();
	}
}

/// Moves the barrier out of `InProgress` even if bootstrap unwinds.
struct SettleGuard<'a> {
	barrier: &'a InitBarrier,
	armed: bool,
}

impl SettleGuard<'_> {
	fn settle(mut self, outcome: Result<EngineHandle, InitError>) -> Result<EngineHandle, InitError> {
		self.armed = false;
		match &outcome {
			Ok(engine) => {
				info!("native initialization complete");
				self.barrier.publish(InitState::Done(Arc::clone(engine)));
			}
			Err(err) => {
				error!(error = %err, "native initialization failed");
				self.barrier.publish(InitState::Failed(err.clone()));
			}
		}
		outcome
	}
}

impl Drop for SettleGuard<'_> {
	fn drop(&mut self) {
		if self.armed {
			error!("native initialization panicked");
			self.barrier.publish(InitState::Failed(InitError::Panicked));
		}
	}
}
