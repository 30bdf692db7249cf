//! Services every shell registers before collaborators add their own.

use std::path::{Path, PathBuf};

use crate::native::HostContext;
use crate::registry::{ConnectionContext, RegistryError, ServiceInstance, ServiceRegistry};
use crate::update::UpdateScheduler;

/// Service name of [`PathService`].
pub const PATH_SERVICE: &str = "activity::PathService";
/// Service name of [`UpdateService`].
pub const UPDATE_SERVICE: &str = "updater::UpdateService";

/// Reports the shell's well-known directories to one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathService {
	context: HostContext,
	connection: ConnectionContext,
}

impl PathService {
	pub fn app_data_dir(&self) -> &Path {
		&self.context.data_dir
	}

	pub fn cache_dir(&self) -> &Path {
		&self.context.cache_dir
	}

	/// Directory for files the application wants to keep.
	pub fn files_dir(&self) -> PathBuf {
		self.context.data_dir.join("files")
	}

	pub fn connection(&self) -> &ConnectionContext {
		&self.connection
	}
}

/// Updater binding: the native side reports check completion through it.
#[derive(Debug, Clone)]
pub struct UpdateService {
	scheduler: UpdateScheduler,
}

impl UpdateService {
	/// Retires the scheduler's current check.
	pub fn notify_update_check_complete(&self) {
		self.scheduler.notify_update_check_complete();
	}
}

/// Registers [`PathService`] and [`UpdateService`].
pub fn register_builtin_services(registry: &ServiceRegistry, context: &HostContext, updates: &UpdateScheduler) -> Result<(), RegistryError> {
	let context = context.clone();
	registry.register(PATH_SERVICE, move |connection| {
		Box::new(PathService {
			context: context.clone(),
			connection,
		}) as ServiceInstance
	})?;

	let scheduler = updates.clone();
	registry.register(UPDATE_SERVICE, move |_connection| {
		Box::new(UpdateService {
			scheduler: scheduler.clone(),
		}) as ServiceInstance
	})?;
	Ok(())
}
