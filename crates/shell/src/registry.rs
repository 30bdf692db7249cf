//! Name-keyed service registry.
//!
//! Factories are registered during the population phase, then the registry
//! is sealed and starts serving connections. Each connection gets a fresh
//! instance from its factory.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use thiserror::Error;
use tracing::{debug, error, info};

/// An implementation bound to one connection.
pub type ServiceInstance = Box<dyn Any + Send>;

/// Produces a fresh implementation for each incoming connection.
pub type ServiceFactory = Arc<dyn Fn(ConnectionContext) -> ServiceInstance + Send + Sync>;

/// Opaque handle to the transport a connection arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipeHandle(u64);

impl PipeHandle {
	/// Allocates a process-unique handle.
	pub fn allocate() -> Self {
		static NEXT: AtomicU64 = AtomicU64::new(1);
		Self(NEXT.fetch_add(1, Ordering::Relaxed))
	}

	pub const fn from_raw(raw: u64) -> Self {
		Self(raw)
	}

	pub const fn raw(self) -> u64 {
		self.0
	}
}

/// Per-request information passed to a factory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionContext {
	/// Identity of the requesting side.
	pub requester: String,
	/// Transport the implementation is bound to.
	pub pipe: PipeHandle,
}

impl ConnectionContext {
	pub fn new(requester: impl Into<String>, pipe: PipeHandle) -> Self {
		Self {
			requester: requester.into(),
			pipe,
		}
	}
}

/// Registry usage errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
	/// Two producers for one capability.
	#[error("service already registered: {0}")]
	Duplicate(String),

	#[error("registry is sealed; cannot register {0}")]
	Sealed(String),

	#[error("registry is still being populated")]
	NotSealed,
}

#[derive(Default)]
struct RegistryInner {
	factories: HashMap<String, ServiceFactory>,
	sealed: bool,
}

/// Mapping from service name to factory.
///
/// Thread-safe; lookups run concurrently once sealed.
#[derive(Default)]
pub struct ServiceRegistry {
	inner: RwLock<RegistryInner>,
}

impl std::fmt::Debug for ServiceRegistry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ServiceRegistry")
			.field("services", &self.names())
			.field("sealed", &self.is_sealed())
			.finish()
	}
}

impl ServiceRegistry {
	/// Creates an empty registry in its population phase.
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a factory closure under `name`.
	pub fn register<F>(&self, name: impl Into<String>, factory: F) -> Result<(), RegistryError>
	where
		F: Fn(ConnectionContext) -> ServiceInstance + Send + Sync + 'static,
	{
		self.register_factory(name, Arc::new(factory))
	}

	/// Registers a shared factory under `name`. Existing entries are never
	/// replaced.
	pub fn register_factory(&self, name: impl Into<String>, factory: ServiceFactory) -> Result<(), RegistryError> {
		let name = name.into();
		let mut inner = self.inner.write();
		if inner.sealed {
			error!(service = %name, "registration after the registry started serving");
			return Err(RegistryError::Sealed(name));
		}
		if inner.factories.contains_key(&name) {
			error!(service = %name, "duplicate service registration");
			return Err(RegistryError::Duplicate(name));
		}
		debug!(service = %name, "service registered");
		inner.factories.insert(name, factory);
		Ok(())
	}

	/// Ends the population phase. Idempotent.
	pub fn seal(&self) {
		let mut inner = self.inner.write();
		if !inner.sealed {
			inner.sealed = true;
			info!(services = inner.factories.len(), "service registry sealed");
		}
	}

	pub fn is_sealed(&self) -> bool {
		self.inner.read().sealed
	}

	/// Looks up the factory for `name`. Unknown names yield `Ok(None)`.
	pub fn resolve(&self, name: &str) -> Result<Option<ServiceFactory>, RegistryError> {
		let inner = self.inner.read();
		if !inner.sealed {
			return Err(RegistryError::NotSealed);
		}
		Ok(inner.factories.get(name).cloned())
	}

	/// Binds a fresh implementation of `name` to one connection.
	///
	/// The factory runs without the registry lock held.
	pub fn connect(&self, name: &str, connection: ConnectionContext) -> Result<Option<ServiceInstance>, RegistryError> {
		let Some(factory) = self.resolve(name)? else {
			debug!(service = %name, requester = %connection.requester, "unknown service requested");
			return Ok(None);
		};
		debug!(service = %name, pipe = connection.pipe.raw(), "binding service");
		Ok(Some(factory(connection)))
	}

	/// Registered names, sorted.
	pub fn names(&self) -> Vec<String> {
		let mut names: Vec<_> = self.inner.read().factories.keys().cloned().collect();
		names.sort();
		names
	}

	pub fn len(&self) -> usize {
		self.inner.read().factories.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}
