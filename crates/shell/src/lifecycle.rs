//! Forwards host lifecycle transitions to the engine.
//!
//! The bridge is driven by the host's single dispatcher, so it takes `&mut
//! self` and forwards events in delivery order. Nothing reaches the engine
//! before `Created` has initialized it, and nothing after `Destroyed`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::barrier::{InitBarrier, InitError};
use crate::launch::{Intent, IntentAction};
use crate::native::{EngineHandle, InputEvent};
use crate::resources::{APP_BUNDLE, SNAPSHOT};
use crate::trace::{TraceController, TraceGuard};

/// Host lifecycle transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
	Created,
	Paused,
	Resumed,
	PostResumed,
	Destroyed,
	BackPressed,
}

impl LifecycleEvent {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Created => "created",
			Self::Paused => "paused",
			Self::Resumed => "resumed",
			Self::PostResumed => "post_resumed",
			Self::Destroyed => "destroyed",
			Self::BackPressed => "back_pressed",
		}
	}
}

/// What the bridge did with one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
	/// Delivered to the engine.
	Forwarded,
	/// Not deliverable in the current state; ignored.
	Dropped,
	/// The host should run its default behavior (back navigation).
	DefaultHost,
}

/// The program the engine was started with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Launch {
	Network(String),
	Snapshot(PathBuf),
	Bundle(PathBuf),
}

/// Translates one activity's lifecycle into engine notifications.
pub struct LifecycleBridge {
	barrier: Arc<InitBarrier>,
	data_dir: PathBuf,
	intent: Intent,
	engine: Option<EngineHandle>,
	last: Option<LifecycleEvent>,
	trace_controller: Option<Arc<dyn TraceController>>,
	trace: Option<TraceGuard>,
}

impl std::fmt::Debug for LifecycleBridge {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("LifecycleBridge")
			.field("intent", &self.intent)
			.field("last", &self.last)
			.field("has_engine", &self.engine.is_some())
			.finish_non_exhaustive()
	}
}

impl LifecycleBridge {
	pub fn new(barrier: Arc<InitBarrier>, intent: Intent) -> Self {
		let data_dir = barrier.context().data_dir.clone();
		Self {
			barrier,
			data_dir,
			intent,
			engine: None,
			last: None,
			trace_controller: None,
			trace: None,
		}
	}

	#[must_use]
	pub fn with_trace_controller(mut self, controller: Arc<dyn TraceController>) -> Self {
		self.trace_controller = Some(controller);
		self
	}

	/// Handles one lifecycle event.
	///
	/// Only `Created` can fail, and its failure is fatal for the process.
	pub fn handle(&mut self, event: LifecycleEvent) -> Result<Dispatch, InitError> {
		let dispatch = match event {
			LifecycleEvent::Created => return self.on_create(),
			LifecycleEvent::BackPressed => self.on_back_pressed(),
			LifecycleEvent::Paused => self.forward(event, |engine| engine.on_activity_paused()),
			LifecycleEvent::Resumed => self.forward(event, |engine| engine.on_activity_resumed()),
			LifecycleEvent::PostResumed => {
				if self.last != Some(LifecycleEvent::Resumed) {
					warn!(last = ?self.last.map(LifecycleEvent::as_str), "post-resume without a preceding resume");
					return Ok(Dispatch::Dropped);
				}
				self.forward(event, |engine| engine.on_activity_post_resumed())
			}
			LifecycleEvent::Destroyed => {
				let dispatch = self.forward(event, |engine| engine.on_activity_destroyed());
				self.release_trace();
				dispatch
			}
		};
		Ok(dispatch)
	}

	fn on_create(&mut self) -> Result<Dispatch, InitError> {
		if self.last.is_some() {
			warn!(last = ?self.last.map(LifecycleEvent::as_str), "duplicate create");
			return Ok(Dispatch::Dropped);
		}
		self.last = Some(LifecycleEvent::Created);

		let engine = self.barrier.ensure_initialized(&self.intent.native_flags())?;
		self.engine = Some(engine);

		if let Some(controller) = &self.trace_controller {
			match TraceGuard::acquire(Arc::clone(controller)) {
				Ok(guard) => self.trace = Some(guard),
				Err(error) => warn!(%error, "trace controller unavailable"),
			}
		}

		match self.on_sky_ready() {
			Some(launch) => info!(?launch, "engine started"),
			None => info!("nothing to run"),
		}
		Ok(Dispatch::Forwarded)
	}

	fn on_back_pressed(&self) -> Dispatch {
		match self.live_engine() {
			Some(engine) => {
				engine.on_input_event(InputEvent::Back);
				Dispatch::Forwarded
			}
			None => Dispatch::DefaultHost,
		}
	}

	fn forward(&mut self, event: LifecycleEvent, notify: impl FnOnce(&EngineHandle)) -> Dispatch {
		let Some(engine) = self.live_engine().cloned() else {
			debug!(event = event.as_str(), "dropping lifecycle event without an engine");
			return Dispatch::Dropped;
		};
		notify(&engine);
		self.last = Some(event);
		Dispatch::Forwarded
	}

	fn live_engine(&self) -> Option<&EngineHandle> {
		match self.last {
			None | Some(LifecycleEvent::Destroyed) => None,
			_ => self.engine.as_ref(),
		}
	}

	fn release_trace(&mut self) {
		if let Some(guard) = self.trace.take()
			&& let Err(error) = guard.release()
		{
			warn!(%error, "failed to stop trace session");
		}
	}

	/// Starts the engine's program: the launch intent, else the snapshot,
	/// else the bundle in the data directory.
	pub fn on_sky_ready(&self) -> Option<Launch> {
		if let Some(launch) = self.load_intent(&self.intent) {
			return Some(launch);
		}
		let engine = self.live_engine()?;

		let snapshot = self.data_dir.join(SNAPSHOT);
		if snapshot.is_file() {
			engine.run_from_snapshot(&snapshot);
			return Some(Launch::Snapshot(snapshot));
		}

		let bundle = self.data_dir.join(APP_BUNDLE);
		if bundle.is_file() {
			engine.run_from_bundle(&bundle);
			return Some(Launch::Bundle(bundle));
		}
		None
	}

	/// Handles an intent delivered to the running activity.
	pub fn on_new_intent(&mut self, intent: Intent) -> Option<Launch> {
		let launch = self.load_intent(&intent);
		self.intent = intent;
		launch
	}

	/// Runs an intent's VIEW or RUN action. Returns `None` when the intent
	/// carries neither or no engine is live.
	pub fn load_intent(&self, intent: &Intent) -> Option<Launch> {
		let data = intent.data.as_deref();
		match (&intent.action, data) {
			(Some(IntentAction::View), Some(url)) => self.load_url(url),
			(Some(IntentAction::Run), Some(bundle)) => {
				let engine = self.live_engine()?;
				let path = PathBuf::from(bundle);
				engine.run_from_bundle(&path);
				Some(Launch::Bundle(path))
			}
			(Some(IntentAction::View | IntentAction::Run), None) => {
				warn!(action = ?intent.action, "intent without data");
				None
			}
			_ => None,
		}
	}

	pub fn load_url(&self, url: &str) -> Option<Launch> {
		let engine = self.live_engine()?;
		engine.run_from_network(url);
		Some(Launch::Network(url.to_string()))
	}

	/// Runs a bundle stored in the data directory under `name`.
	pub fn load_bundle_by_name(&self, name: &str) -> Option<Launch> {
		let engine = self.live_engine()?;
		let bundle = self.data_dir.join(name);
		if !is_within(&self.data_dir, &bundle) || !bundle.is_file() {
			return None;
		}
		engine.run_from_bundle(&bundle);
		Some(Launch::Bundle(bundle))
	}

	/// Forwards raw host input to a live engine.
	pub fn on_input_event(&self, event: InputEvent) -> Dispatch {
		match self.live_engine() {
			Some(engine) => {
				engine.on_input_event(event);
				Dispatch::Forwarded
			}
			None => Dispatch::Dropped,
		}
	}

	pub fn last_event(&self) -> Option<LifecycleEvent> {
		self.last
	}

	pub fn engine(&self) -> Option<&EngineHandle> {
		self.live_engine()
	}
}

fn is_within(dir: &Path, path: &Path) -> bool {
	path.parent() == Some(dir)
}
