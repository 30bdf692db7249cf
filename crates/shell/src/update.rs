//! Periodic update checks.
//!
//! [`UpdateScheduler::init`] registers one inexact repeating alarm. Each
//! firing registers a new current check, initializes the runtime if needed
//! and starts a native check. The check deregisters itself when the updater
//! service reports completion, which releases its native task handle.

use std::sync::Arc;

use parking_lot::Mutex;
use sky_shell_worker::{AlarmManager, GenerationClock, TaskClass, spawn_blocking};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::barrier::{InitBarrier, InitError};
use crate::config::UpdateConfig;
use crate::native::{NativeError, NativeRuntime, UpdateTask};

/// Alarm name for the update trigger.
pub const UPDATE_ALARM: &str = "sky-shell.update-check";

#[derive(Debug, Clone, Error)]
pub enum UpdateError {
	#[error("runtime unavailable for update check: {0}")]
	Init(#[from] InitError),

	#[error("native update check failed: {0}")]
	Native(NativeError),
}

/// The check currently owned by the scheduler. Dropping it releases the
/// native task handle.
struct CurrentCheck {
	generation: u64,
	task: Option<Box<dyn UpdateTask>>,
}

impl Drop for CurrentCheck {
	fn drop(&mut self) {
		if let Some(task) = self.task.take() {
			task.release();
		}
	}
}

struct SchedulerInner {
	config: UpdateConfig,
	alarms: AlarmManager,
	barrier: Arc<InitBarrier>,
	runtime: Arc<dyn NativeRuntime>,
	clock: GenerationClock,
	schedule: Mutex<()>,
	current: Mutex<Option<CurrentCheck>>,
}

/// Owns the update alarm and the current update check.
#[derive(Clone)]
pub struct UpdateScheduler {
	inner: Arc<SchedulerInner>,
}

impl std::fmt::Debug for UpdateScheduler {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("UpdateScheduler")
			.field("config", &self.inner.config)
			.field("scheduled", &self.is_scheduled())
			.field("current", &self.current_generation())
			.finish()
	}
}

impl UpdateScheduler {
	pub fn new(config: UpdateConfig, alarms: AlarmManager, barrier: Arc<InitBarrier>, runtime: Arc<dyn NativeRuntime>) -> Self {
		Self {
			inner: Arc::new(SchedulerInner {
				config,
				alarms,
				barrier,
				runtime,
				clock: GenerationClock::new(),
				schedule: Mutex::new(()),
				current: Mutex::new(None),
			}),
		}
	}

	/// Registers the periodic trigger if update checks are enabled.
	///
	/// Returns whether an alarm was registered by this call. An existing
	/// registration is left alone unless testing mode is on.
	pub fn init(&self) -> bool {
		let config = &self.inner.config;
		if !config.is_active() {
			debug!("update checks disabled");
			return false;
		}

		let _schedule = self.inner.schedule.lock();
		let data_dir = self.inner.barrier.context().data_dir.display().to_string();
		if self.inner.alarms.exists(UPDATE_ALARM) && !config.testing {
			info!(data_dir = %data_dir, "update alarm exists");
			return false;
		}

		let scheduler = self.clone();
		self.inner.alarms.set_repeating(UPDATE_ALARM, config.interval(), move || scheduler.fire());
		info!(data_dir = %data_dir, interval_secs = config.interval().as_secs(), "update scheduled");
		true
	}

	pub fn is_scheduled(&self) -> bool {
		self.inner.alarms.exists(UPDATE_ALARM)
	}

	/// Runs one check off the alarm task; initialization may block.
	fn fire(&self) {
		let scheduler = self.clone();
		spawn_blocking(TaskClass::IoBlocking, move || {
			if let Err(error) = scheduler.run_check() {
				warn!(%error, "update check failed");
			}
		});
	}

	/// Starts a check and returns its generation, or `None` while another
	/// check is still current. Blocks until the runtime is initialized.
	pub fn run_check(&self) -> Result<Option<u64>, UpdateError> {
		let generation = {
			let mut current = self.inner.current.lock();
			if let Some(check) = current.as_ref() {
				debug!(generation = check.generation, "update check already running");
				return Ok(None);
			}
			let generation = self.inner.clock.next();
			*current = Some(CurrentCheck { generation, task: None });
			generation
		};

		let started = self
			.inner
			.barrier
			.ensure_initialized(&[])
			.map_err(UpdateError::from)
			.and_then(|_| self.inner.runtime.check_for_updates().map_err(UpdateError::Native));

		match started {
			Ok(task) => {
				let mut current = self.inner.current.lock();
				match current.as_mut() {
					Some(check) if check.generation == generation => check.task = Some(task),
					// Completed before the handle was stored.
					_ => task.release(),
				}
				info!(generation, "update check started");
				Ok(Some(generation))
			}
			Err(error) => {
				self.retire(generation);
				Err(error)
			}
		}
	}

	/// Completion signal from the updater service. Retires whichever check is
	/// current and returns its generation.
	pub fn notify_update_check_complete(&self) -> Option<u64> {
		let finished = self.inner.current.lock().take();
		match finished {
			Some(check) => {
				let generation = check.generation;
				drop(check);
				info!(generation, "update check complete");
				Some(generation)
			}
			None => {
				debug!("update completion without a running check");
				None
			}
		}
	}

	/// Deregisters `generation` if it is still the current check.
	fn retire(&self, generation: u64) -> bool {
		let mut current = self.inner.current.lock();
		if current.as_ref().is_some_and(|c| c.generation == generation) {
			*current = None;
			true
		} else {
			false
		}
	}

	pub fn current_generation(&self) -> Option<u64> {
		self.inner.current.lock().as_ref().map(|c| c.generation)
	}
}
