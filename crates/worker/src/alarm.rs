use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::{TaskClass, spawn};

/// Shortest period an alarm repeats at. Shorter intervals are raised to it.
pub const MIN_ALARM_INTERVAL: Duration = Duration::from_millis(1);

/// Snapshot for one registered alarm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmRecord {
	pub name: String,
	pub interval: Duration,
	pub fired: u64,
}

struct AlarmEntry {
	interval: Duration,
	fired: Arc<AtomicU64>,
	cancel: CancellationToken,
}

impl AlarmEntry {
	fn record(&self, name: &str) -> AlarmRecord {
		AlarmRecord {
			name: name.to_string(),
			interval: self.interval,
			fired: self.fired.load(Ordering::Acquire),
		}
	}
}

/// Keyed, inexact repeating alarms.
///
/// An alarm fires once immediately and then roughly once per interval until
/// cancelled. Late ticks are delayed rather than bunched. Registering a name
/// that already exists replaces the previous alarm; callers that want
/// "schedule once" semantics check [`Self::exists`] first.
#[derive(Clone, Default)]
pub struct AlarmManager {
	inner: Arc<Mutex<HashMap<String, AlarmEntry>>>,
}

impl std::fmt::Debug for AlarmManager {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("AlarmManager").field("alarms", &self.snapshots()).finish()
	}
}

impl AlarmManager {
	/// Creates an empty alarm manager.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns true when an alarm is pending under `name`.
	pub fn exists(&self, name: &str) -> bool {
		self.inner.lock().contains_key(name)
	}

	/// Registers a repeating alarm, replacing any alarm with the same name.
	///
	/// `callback` runs on the worker runtime and must not block. Intervals
	/// below [`MIN_ALARM_INTERVAL`] are raised to it.
	pub fn set_repeating<F>(&self, name: impl Into<String>, interval: Duration, callback: F)
	where
		F: Fn() + Send + Sync + 'static,
	{
		let name = name.into();
		let interval = interval.max(MIN_ALARM_INTERVAL);
		let cancel = CancellationToken::new();
		let fired = Arc::new(AtomicU64::new(0));
		let entry = AlarmEntry {
			interval,
			fired: Arc::clone(&fired),
			cancel: cancel.clone(),
		};

		if let Some(previous) = self.inner.lock().insert(name.clone(), entry) {
			previous.cancel.cancel();
			tracing::debug!(alarm = %name, "alarm.replaced");
		}

		let label = name.clone();
		spawn(TaskClass::Background, async move {
			let mut ticker = tokio::time::interval(interval);
			ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
			loop {
				tokio::select! {
					_ = cancel.cancelled() => break,
					_ = ticker.tick() => {
						let count = fired.fetch_add(1, Ordering::AcqRel).wrapping_add(1);
						tracing::debug!(alarm = %label, fired = count, "alarm.fire");
						callback();
					}
				}
			}
			tracing::trace!(alarm = %label, "alarm.stopped");
		});
	}

	/// Cancels the alarm registered under `name`. Returns whether one existed.
	pub fn cancel(&self, name: &str) -> bool {
		match self.inner.lock().remove(name) {
			Some(entry) => {
				entry.cancel.cancel();
				true
			}
			None => false,
		}
	}

	/// Returns snapshots sorted by name.
	pub fn snapshots(&self) -> Vec<AlarmRecord> {
		let guard = self.inner.lock();
		let mut records: Vec<_> = guard.iter().map(|(name, entry)| entry.record(name)).collect();
		records.sort_by(|a, b| a.name.cmp(&b.name));
		records
	}
}
