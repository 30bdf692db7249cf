//! Resource extraction into the data directory.
//!
//! Extraction runs on a dedicated thread started by [`ResourceExtractor::start`].
//! The returned [`Extraction`] is the readiness handle the init barrier
//! blocks on before bootstrap.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use sky_shell_worker::{TaskClass, spawn_named_thread};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Precompiled engine snapshot.
pub const SNAPSHOT: &str = "snapshot_blob.bin";
/// Application bundle.
pub const APP_BUNDLE: &str = "app.flx";
/// Application manifest.
pub const MANIFEST: &str = "flutter.yaml";
/// ICU data table.
pub const ICU_DATA: &str = "icudtl.dat";

/// Resources every shell extracts, in extraction order.
pub const BUILTIN_RESOURCES: [&str; 4] = [ICU_DATA, SNAPSHOT, APP_BUNDLE, MANIFEST];

/// Prefix of in-flight extraction files. Anything left with this prefix was
/// interrupted and is removed by the cleaner.
const PARTIAL_PREFIX: &str = ".sky-extract";

/// Errors produced while preparing resources.
#[derive(Debug, Clone, Error)]
pub enum ResourceError {
	#[error("I/O error extracting {path}: {error}")]
	Io { path: PathBuf, error: Arc<io::Error> },

	#[error("failed to start extraction thread: {0}")]
	Spawn(Arc<io::Error>),

	#[error("resource extraction panicked")]
	Panicked,
}

impl ResourceError {
	fn io(path: &Path, error: io::Error) -> Self {
		Self::Io {
			path: path.to_path_buf(),
			error: Arc::new(error),
		}
	}
}

/// Blocking "wait until resources are in place" collaborator.
pub trait ResourceReadiness: Send + Sync {
	/// Blocks the calling thread until preparation finished.
	fn wait_for_completion(&self) -> Result<(), ResourceError>;
}

/// Ordered, duplicate-free list of resource names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceSet {
	names: Vec<String>,
}

impl ResourceSet {
	/// Creates an empty set.
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a set holding [`BUILTIN_RESOURCES`].
	pub fn builtin() -> Self {
		let mut set = Self::new();
		set.add_resources(BUILTIN_RESOURCES);
		set
	}

	/// Appends resource names, keeping first-seen order.
	///
	/// Names must be bare file names; anything that could escape the data
	/// directory is ignored.
	pub fn add_resources<I, S>(&mut self, names: I)
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		for name in names {
			let name = name.into();
			if !is_plain_file_name(&name) {
				warn!(resource = %name, "ignoring resource name that is not a plain file name");
				continue;
			}
			if !self.contains(&name) {
				self.names.push(name);
			}
		}
	}

	pub fn contains(&self, name: &str) -> bool {
		self.names.iter().any(|n| n == name)
	}

	pub fn names(&self) -> &[String] {
		&self.names
	}

	pub fn len(&self) -> usize {
		self.names.len()
	}

	pub fn is_empty(&self) -> bool {
		self.names.is_empty()
	}
}

fn is_plain_file_name(name: &str) -> bool {
	let path = Path::new(name);
	!name.is_empty() && path.file_name().is_some_and(|f| f == path.as_os_str()) && name != "." && name != ".."
}

/// Outcome of one extraction pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractReport {
	/// Copied into the data directory.
	pub extracted: Vec<String>,
	/// Already present and current.
	pub up_to_date: Vec<String>,
	/// Not shipped in the asset directory.
	pub missing: Vec<String>,
	/// Partial files removed by the cleaner.
	pub cleaned: usize,
}

/// Copies a [`ResourceSet`] from an asset directory into the data directory.
#[derive(Debug, Clone)]
pub struct ResourceExtractor {
	asset_dir: PathBuf,
	data_dir: PathBuf,
	resources: ResourceSet,
}

impl ResourceExtractor {
	pub fn new(asset_dir: impl Into<PathBuf>, data_dir: impl Into<PathBuf>) -> Self {
		Self {
			asset_dir: asset_dir.into(),
			data_dir: data_dir.into(),
			resources: ResourceSet::new(),
		}
	}

	/// Adds resources to extract. Only possible before [`Self::start`].
	pub fn add_resources<I, S>(&mut self, names: I)
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.resources.add_resources(names);
	}

	pub fn resources_mut(&mut self) -> &mut ResourceSet {
		&mut self.resources
	}

	pub fn resources(&self) -> &ResourceSet {
		&self.resources
	}

	/// Starts extraction on a dedicated thread and consumes the resource set.
	pub fn start(self) -> Result<Extraction, ResourceError> {
		let extraction = Extraction::pending();
		let completion = extraction.clone();
		info!(
			resources = self.resources.len(),
			assets = %self.asset_dir.display(),
			data = %self.data_dir.display(),
			"starting resource extraction"
		);
		spawn_named_thread(TaskClass::IoBlocking, "sky-resource-extractor", move || {
			let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| self.run())).unwrap_or(Err(ResourceError::Panicked));
			match &outcome {
				Ok(report) => info!(
					extracted = report.extracted.len(),
					up_to_date = report.up_to_date.len(),
					missing = report.missing.len(),
					"resource extraction complete"
				),
				Err(error) => warn!(%error, "resource extraction failed"),
			}
			completion.complete(outcome);
		})
		.map_err(|e| ResourceError::Spawn(Arc::new(e)))?;
		Ok(extraction)
	}

	/// Runs the cleaner and then extracts every resource on the calling thread.
	pub fn run(&self) -> Result<ExtractReport, ResourceError> {
		fs::create_dir_all(&self.data_dir).map_err(|e| ResourceError::io(&self.data_dir, e))?;

		let mut report = ExtractReport {
			cleaned: clean_partial_files(&self.data_dir),
			..ExtractReport::default()
		};

		for name in self.resources.names() {
			let source = self.asset_dir.join(name);
			let target = self.data_dir.join(name);
			let source_meta = match fs::metadata(&source) {
				Ok(meta) if meta.is_file() => meta,
				Ok(_) | Err(_) => {
					debug!(resource = %name, "asset not shipped; skipping");
					report.missing.push(name.clone());
					continue;
				}
			};
			if is_up_to_date(&source_meta, &target) {
				debug!(resource = %name, "resource up to date");
				report.up_to_date.push(name.clone());
				continue;
			}
			self.copy_atomically(&source, &target)?;
			debug!(resource = %name, "resource extracted");
			report.extracted.push(name.clone());
		}

		Ok(report)
	}

	fn copy_atomically(&self, source: &Path, target: &Path) -> Result<(), ResourceError> {
		let mut input = File::open(source).map_err(|e| ResourceError::io(source, e))?;
		let mut partial = tempfile::Builder::new()
			.prefix(PARTIAL_PREFIX)
			.tempfile_in(&self.data_dir)
			.map_err(|e| ResourceError::io(&self.data_dir, e))?;
		io::copy(&mut input, partial.as_file_mut()).map_err(|e| ResourceError::io(source, e))?;
		partial.persist(target).map_err(|e| ResourceError::io(target, e.error))?;
		Ok(())
	}
}

fn is_up_to_date(source: &fs::Metadata, target: &Path) -> bool {
	let Ok(existing) = fs::metadata(target) else {
		return false;
	};
	if !existing.is_file() || existing.len() != source.len() {
		return false;
	}
	match (existing.modified(), source.modified()) {
		(Ok(existing), Ok(source)) => existing >= source,
		_ => false,
	}
}

/// Removes partial files left by an interrupted extraction. Best effort.
fn clean_partial_files(data_dir: &Path) -> usize {
	let entries = match fs::read_dir(data_dir) {
		Ok(entries) => entries,
		Err(error) => {
			warn!(%error, dir = %data_dir.display(), "cannot scan data directory for partial files");
			return 0;
		}
	};

	let mut cleaned = 0;
	for entry in entries.flatten() {
		if !entry.file_name().to_string_lossy().starts_with(PARTIAL_PREFIX) {
			continue;
		}
		match fs::remove_file(entry.path()) {
			Ok(()) => cleaned += 1,
			Err(error) => warn!(%error, path = %entry.path().display(), "failed to remove partial resource"),
		}
	}
	if cleaned > 0 {
		info!(cleaned, "removed partial resources");
	}
	cleaned
}

/// Readiness handle for a running extraction.
#[derive(Debug, Clone)]
pub struct Extraction {
	inner: Arc<ExtractionState>,
}

#[derive(Debug, Default)]
struct ExtractionState {
	outcome: Mutex<Option<Result<ExtractReport, ResourceError>>>,
	done: Condvar,
}

impl Extraction {
	fn pending() -> Self {
		Self {
			inner: Arc::new(ExtractionState::default()),
		}
	}

	fn complete(&self, outcome: Result<ExtractReport, ResourceError>) {
		*self.inner.outcome.lock() = Some(outcome);
		self.inner.done.notify_all();
	}

	/// Returns true once extraction finished, successfully or not.
	pub fn is_complete(&self) -> bool {
		self.inner.outcome.lock().is_some()
	}

	/// Blocks until extraction finished and returns its report.
	pub fn wait(&self) -> Result<ExtractReport, ResourceError> {
		let mut outcome = self.inner.outcome.lock();
		loop {
			if let Some(result) = outcome.as_ref() {
				return result.clone();
			}
			self.inner.done.wait(&mut outcome);
		}
	}
}

impl ResourceReadiness for Extraction {
	fn wait_for_completion(&self) -> Result<(), ResourceError> {
		self.wait().map(|_| ())
	}
}
