//! Application object wiring resources, the init barrier, the service
//! registry and the update scheduler together.

use std::sync::Arc;

use sky_shell_worker::AlarmManager;
use tracing::info;

use crate::barrier::{InitBarrier, InitError, NativeFlag};
use crate::config::ShellConfig;
use crate::error::Result;
use crate::launch::Intent;
use crate::lifecycle::LifecycleBridge;
use crate::native::{EngineHandle, HostContext, NativeRuntime};
use crate::registry::{ConnectionContext, RegistryError, ServiceInstance, ServiceRegistry};
use crate::resources::{Extraction, ResourceExtractor, ResourceSet};
use crate::services::register_builtin_services;
use crate::trace::TraceController;
use crate::update::UpdateScheduler;

type ResourceHook = Box<dyn FnOnce(&mut ResourceSet) + Send>;
type ServiceHook = Box<dyn FnOnce(&ServiceRegistry, &HostContext) -> std::result::Result<(), RegistryError> + Send>;

/// Collects configuration hooks before the shell starts.
pub struct ShellBuilder {
	config: ShellConfig,
	runtime: Arc<dyn NativeRuntime>,
	alarms: AlarmManager,
	trace_controller: Option<Arc<dyn TraceController>>,
	resource_hooks: Vec<ResourceHook>,
	service_hooks: Vec<ServiceHook>,
}

impl ShellBuilder {
	/// Adds resources to extract after the built-in ones.
	#[must_use]
	pub fn resources(mut self, hook: impl FnOnce(&mut ResourceSet) + Send + 'static) -> Self {
		self.resource_hooks.push(Box::new(hook));
		self
	}

	/// Registers additional services before the registry is sealed.
	#[must_use]
	pub fn services(mut self, hook: impl FnOnce(&ServiceRegistry, &HostContext) -> std::result::Result<(), RegistryError> + Send + 'static) -> Self {
		self.service_hooks.push(Box::new(hook));
		self
	}

	/// Uses an existing alarm manager for the update trigger.
	#[must_use]
	pub fn alarms(mut self, alarms: AlarmManager) -> Self {
		self.alarms = alarms;
		self
	}

	#[must_use]
	pub fn trace_controller(mut self, controller: Arc<dyn TraceController>) -> Self {
		self.trace_controller = Some(controller);
		self
	}

	/// Starts resource extraction, schedules update checks and populates the
	/// registry. The native runtime is not bootstrapped here.
	pub fn start(self) -> Result<Shell> {
		let context = self.config.host_context();

		let mut extractor = ResourceExtractor::new(&self.config.asset_dir, &self.config.data_dir);
		*extractor.resources_mut() = ResourceSet::builtin();
		extractor.add_resources(self.config.resources.iter().cloned());
		for hook in self.resource_hooks {
			hook(extractor.resources_mut());
		}
		let extraction = extractor.start()?;

		let barrier = Arc::new(InitBarrier::new(context.clone(), Arc::new(extraction.clone()), Arc::clone(&self.runtime)));

		let updates = UpdateScheduler::new(self.config.update.clone(), self.alarms, Arc::clone(&barrier), Arc::clone(&self.runtime));
		updates.init();

		let registry = Arc::new(ServiceRegistry::new());
		register_builtin_services(&registry, &context, &updates)?;
		for hook in self.service_hooks {
			hook(registry.as_ref(), &context)?;
		}
		registry.seal();

		info!(services = registry.len(), data_dir = %context.data_dir.display(), "shell started");
		Ok(Shell {
			config: self.config,
			extraction,
			barrier,
			registry,
			updates,
			trace_controller: self.trace_controller,
		})
	}
}

/// One per process.
pub struct Shell {
	config: ShellConfig,
	extraction: Extraction,
	barrier: Arc<InitBarrier>,
	registry: Arc<ServiceRegistry>,
	updates: UpdateScheduler,
	trace_controller: Option<Arc<dyn TraceController>>,
}

impl std::fmt::Debug for Shell {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Shell")
			.field("config", &self.config)
			.field("barrier", &self.barrier)
			.field("registry", &self.registry)
			.field("updates", &self.updates)
			.finish_non_exhaustive()
	}
}

impl Shell {
	pub fn builder(config: ShellConfig, runtime: Arc<dyn NativeRuntime>) -> ShellBuilder {
		ShellBuilder {
			config,
			runtime,
			alarms: AlarmManager::new(),
			trace_controller: None,
			resource_hooks: Vec::new(),
			service_hooks: Vec::new(),
		}
	}

	/// See [`InitBarrier::ensure_initialized`].
	pub fn ensure_initialized(&self, flags: &[NativeFlag]) -> std::result::Result<EngineHandle, InitError> {
		self.barrier.ensure_initialized(flags)
	}

	/// Creates the lifecycle bridge for one activity.
	pub fn bridge(&self, intent: Intent) -> LifecycleBridge {
		let bridge = LifecycleBridge::new(Arc::clone(&self.barrier), intent);
		match &self.trace_controller {
			Some(controller) => bridge.with_trace_controller(Arc::clone(controller)),
			None => bridge,
		}
	}

	/// Binds a fresh service implementation to an incoming connection.
	pub fn connect(&self, name: &str, connection: ConnectionContext) -> std::result::Result<Option<ServiceInstance>, RegistryError> {
		self.registry.connect(name, connection)
	}

	pub fn config(&self) -> &ShellConfig {
		&self.config
	}

	pub fn barrier(&self) -> &Arc<InitBarrier> {
		&self.barrier
	}

	pub fn registry(&self) -> &Arc<ServiceRegistry> {
		&self.registry
	}

	pub fn updates(&self) -> &UpdateScheduler {
		&self.updates
	}

	pub fn extraction(&self) -> &Extraction {
		&self.extraction
	}
}
