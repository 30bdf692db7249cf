//! Recording fakes for the native runtime and resource readiness.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::native::{Engine, EngineHandle, HostContext, InputEvent, NativeError, NativeRuntime, UpdateTask};
use crate::resources::{ResourceError, ResourceReadiness};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
	Bootstrap(Vec<String>),
	RunLoop,
	CheckForUpdates(u64),
	Release(u64),
	Input(InputEvent),
	Paused,
	Resumed,
	PostResumed,
	Destroyed,
	Snapshot(PathBuf),
	Bundle(PathBuf),
	Network(String),
}

#[derive(Debug, Default)]
pub struct Journal {
	calls: Mutex<Vec<Call>>,
}

impl Journal {
	pub fn push(&self, call: Call) {
		self.calls.lock().push(call);
	}

	pub fn calls(&self) -> Vec<Call> {
		self.calls.lock().clone()
	}

	pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
		self.calls.lock().iter().filter(|c| pred(c)).count()
	}
}

pub struct RecordingEngine {
	journal: Arc<Journal>,
}

impl Engine for RecordingEngine {
	fn on_input_event(&self, event: InputEvent) {
		self.journal.push(Call::Input(event));
	}

	fn on_activity_paused(&self) {
		self.journal.push(Call::Paused);
	}

	fn on_activity_resumed(&self) {
		self.journal.push(Call::Resumed);
	}

	fn on_activity_post_resumed(&self) {
		self.journal.push(Call::PostResumed);
	}

	fn on_activity_destroyed(&self) {
		self.journal.push(Call::Destroyed);
	}

	fn run_from_snapshot(&self, path: &Path) {
		self.journal.push(Call::Snapshot(path.to_path_buf()));
	}

	fn run_from_bundle(&self, path: &Path) {
		self.journal.push(Call::Bundle(path.to_path_buf()));
	}

	fn run_from_network(&self, url: &str) {
		self.journal.push(Call::Network(url.to_string()));
	}
}

struct RecordingTask {
	id: u64,
	journal: Arc<Journal>,
}

impl UpdateTask for RecordingTask {
	fn release(self: Box<Self>) {
		self.journal.push(Call::Release(self.id));
	}
}

#[derive(Default)]
pub struct RecordingRuntime {
	pub journal: Arc<Journal>,
	pub fail_bootstrap: AtomicBool,
	pub panic_bootstrap: AtomicBool,
	pub bootstrap_delay: Mutex<Duration>,
	next_task: AtomicU64,
}

impl RecordingRuntime {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	pub fn bootstraps(&self) -> usize {
		self.journal.count(|c| matches!(c, Call::Bootstrap(_)))
	}
}

impl NativeRuntime for RecordingRuntime {
	fn bootstrap(&self, _context: &HostContext, argv: &[String]) -> Result<EngineHandle, NativeError> {
		let delay = *self.bootstrap_delay.lock();
		if !delay.is_zero() {
			std::thread::sleep(delay);
		}
		self.journal.push(Call::Bootstrap(argv.to_vec()));
		if self.panic_bootstrap.load(Ordering::SeqCst) {
			panic!("bootstrap exploded");
		}
		if self.fail_bootstrap.load(Ordering::SeqCst) {
			return Err(NativeError::new("libsky_shell.so missing"));
		}
		Ok(Arc::new(RecordingEngine {
			journal: Arc::clone(&self.journal),
		}))
	}

	fn start_run_loop(&self) -> Result<(), NativeError> {
		self.journal.push(Call::RunLoop);
		Ok(())
	}

	fn check_for_updates(&self) -> Result<Box<dyn UpdateTask>, NativeError> {
		let id = self.next_task.fetch_add(1, Ordering::SeqCst) + 1;
		self.journal.push(Call::CheckForUpdates(id));
		Ok(Box::new(RecordingTask {
			id,
			journal: Arc::clone(&self.journal),
		}))
	}
}

/// Readiness that is always complete.
pub struct Ready;

impl ResourceReadiness for Ready {
	fn wait_for_completion(&self) -> Result<(), ResourceError> {
		Ok(())
	}
}

/// Readiness that blocks until opened and counts how often it was awaited.
#[derive(Default)]
pub struct Gate {
	open: Mutex<Option<Result<(), ResourceError>>>,
	opened: Condvar,
	pub waits: AtomicUsize,
}

impl Gate {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	pub fn open(&self, outcome: Result<(), ResourceError>) {
		*self.open.lock() = Some(outcome);
		self.opened.notify_all();
	}
}

impl ResourceReadiness for Gate {
	fn wait_for_completion(&self) -> Result<(), ResourceError> {
		self.waits.fetch_add(1, Ordering::SeqCst);
		let mut open = self.open.lock();
		loop {
			if let Some(outcome) = open.as_ref() {
				return outcome.clone();
			}
			self.opened.wait(&mut open);
		}
	}
}

pub fn context(dir: &Path) -> HostContext {
	HostContext {
		data_dir: dir.to_path_buf(),
		cache_dir: dir.join("cache"),
	}
}
