//! Native runtime that logs instead of running an engine.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use parking_lot::Mutex;
use sky_shell::{Engine, EngineHandle, HostContext, InputEvent, NativeError, NativeRuntime, TraceController, TraceError, UpdateTask};
use tracing::info;

#[derive(Debug, Default)]
pub struct LoggingRuntime {
	tasks: AtomicU64,
}

impl NativeRuntime for LoggingRuntime {
	fn bootstrap(&self, context: &HostContext, argv: &[String]) -> Result<EngineHandle, NativeError> {
		info!(?argv, data_dir = %context.data_dir.display(), "native.bootstrap");
		Ok(Arc::new(LoggingEngine))
	}

	fn start_run_loop(&self) -> Result<(), NativeError> {
		info!("native.run_loop");
		Ok(())
	}

	fn check_for_updates(&self) -> Result<Box<dyn UpdateTask>, NativeError> {
		let id = self.tasks.fetch_add(1, Ordering::Relaxed) + 1;
		info!(task = id, "native.check_for_updates");
		Ok(Box::new(LoggingTask(id)))
	}
}

struct LoggingTask(u64);

impl UpdateTask for LoggingTask {
	fn release(self: Box<Self>) {
		info!(task = self.0, "native.update_task.release");
	}
}

struct LoggingEngine;

impl Engine for LoggingEngine {
	fn on_input_event(&self, event: InputEvent) {
		info!(?event, "engine.input");
	}

	fn on_activity_paused(&self) {
		info!("engine.paused");
	}

	fn on_activity_resumed(&self) {
		info!("engine.resumed");
	}

	fn on_activity_post_resumed(&self) {
		info!("engine.post_resumed");
	}

	fn on_activity_destroyed(&self) {
		info!("engine.destroyed");
	}

	fn run_from_snapshot(&self, path: &Path) {
		info!(path = %path.display(), "engine.run_from_snapshot");
	}

	fn run_from_bundle(&self, path: &Path) {
		info!(path = %path.display(), "engine.run_from_bundle");
	}

	fn run_from_network(&self, url: &str) {
		info!(url, "engine.run_from_network");
	}
}

/// Reports how long each activity was traced.
#[derive(Debug, Default)]
pub struct SpanTraceController {
	started: Mutex<Option<Instant>>,
}

impl TraceController for SpanTraceController {
	fn start(&self) -> Result<(), TraceError> {
		let mut started = self.started.lock();
		if started.is_some() {
			return Err(TraceError("trace already running".to_string()));
		}
		*started = Some(Instant::now());
		info!("trace.start");
		Ok(())
	}

	fn stop(&self) -> Result<(), TraceError> {
		let started = self.started.lock().take().ok_or_else(|| TraceError("trace not running".to_string()))?;
		info!(elapsed_ms = started.elapsed().as_millis() as u64, "trace.stop");
		Ok(())
	}
}
