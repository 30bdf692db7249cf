//! Native runtime double that journals every engine call.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use sky_shell::{Engine, EngineHandle, HostContext, InputEvent, NativeError, NativeRuntime, ShellConfig, UpdateConfig, UpdateTask};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
	Bootstrap(Vec<String>),
	RunLoop,
	Check(u64),
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

#[derive(Default)]
pub struct Journal(Mutex<Vec<Call>>);

impl Journal {
	fn push(&self, call: Call) {
		self.0.lock().push(call);
	}

	pub fn calls(&self) -> Vec<Call> {
		self.0.lock().clone()
	}

	pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
		self.0.lock().iter().filter(|c| pred(c)).count()
	}

	/// Calls made on the engine itself.
	pub fn engine_calls(&self) -> Vec<Call> {
		self.calls()
			.into_iter()
			.filter(|c| !matches!(c, Call::Bootstrap(_) | Call::RunLoop | Call::Check(_) | Call::Release(_)))
			.collect()
	}
}

struct JournalEngine(Arc<Journal>);

impl Engine for JournalEngine {
	fn on_input_event(&self, event: InputEvent) {
		self.0.push(Call::Input(event));
	}

	fn on_activity_paused(&self) {
		self.0.push(Call::Paused);
	}

	fn on_activity_resumed(&self) {
		self.0.push(Call::Resumed);
	}

	fn on_activity_post_resumed(&self) {
		self.0.push(Call::PostResumed);
	}

	fn on_activity_destroyed(&self) {
		self.0.push(Call::Destroyed);
	}

	fn run_from_snapshot(&self, path: &Path) {
		self.0.push(Call::Snapshot(path.to_path_buf()));
	}

	fn run_from_bundle(&self, path: &Path) {
		self.0.push(Call::Bundle(path.to_path_buf()));
	}

	fn run_from_network(&self, url: &str) {
		self.0.push(Call::Network(url.to_string()));
	}
}

struct JournalTask(u64, Arc<Journal>);

impl UpdateTask for JournalTask {
	fn release(self: Box<Self>) {
		self.1.push(Call::Release(self.0));
	}
}

#[derive(Default)]
pub struct JournalRuntime {
	pub journal: Arc<Journal>,
	tasks: AtomicU64,
}

impl NativeRuntime for JournalRuntime {
	fn bootstrap(&self, _context: &HostContext, argv: &[String]) -> Result<EngineHandle, NativeError> {
		self.journal.push(Call::Bootstrap(argv.to_vec()));
		Ok(Arc::new(JournalEngine(Arc::clone(&self.journal))))
	}

	fn start_run_loop(&self) -> Result<(), NativeError> {
		self.journal.push(Call::RunLoop);
		Ok(())
	}

	fn check_for_updates(&self) -> Result<Box<dyn UpdateTask>, NativeError> {
		let id = self.tasks.fetch_add(1, Ordering::SeqCst) + 1;
		self.journal.push(Call::Check(id));
		Ok(Box::new(JournalTask(id, Arc::clone(&self.journal))))
	}
}

/// Asset and data directories for one test shell.
pub struct Dirs {
	pub assets: tempfile::TempDir,
	pub data: tempfile::TempDir,
}

impl Dirs {
	pub fn new() -> Self {
		Self {
			assets: tempfile::tempdir().unwrap(),
			data: tempfile::tempdir().unwrap(),
		}
	}

	pub fn ship(&self, name: &str, contents: &str) {
		std::fs::write(self.assets.path().join(name), contents).unwrap();
	}

	pub fn config(&self) -> ShellConfig {
		ShellConfig {
			data_dir: self.data.path().join("sky_shell"),
			cache_dir: self.data.path().join("cache"),
			asset_dir: self.assets.path().to_path_buf(),
			resources: Vec::new(),
			update: UpdateConfig {
				enabled: false,
				testing: false,
				interval_secs: 24 * 60 * 60,
			},
		}
	}
}
