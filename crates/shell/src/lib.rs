//! Startup orchestration for shells embedding the Sky engine.
//!
//! A host process creates one [`Shell`], which
//! - extracts the [`ResourceSet`] into the data directory on a worker thread,
//! - guards native bootstrap behind the [`InitBarrier`],
//! - serves named capabilities through the [`ServiceRegistry`],
//! - schedules periodic update checks with the [`UpdateScheduler`].
//!
//! Each activity drives a [`LifecycleBridge`] that forwards host lifecycle
//! events to the engine once the barrier has produced it.
//!
//! ## Cargo features
//!
//! - `update-check`: schedule update checks unless configuration disables
//!   them. *Disabled by default.*

mod app;
pub mod barrier;
pub mod config;
mod error;
pub mod launch;
pub mod lifecycle;
pub mod native;
pub mod registry;
pub mod resources;
pub mod services;
pub mod trace;
pub mod update;

#[cfg(test)]
mod testing;

pub use app::{Shell, ShellBuilder};
pub use barrier::{InitBarrier, InitError, InitStatus, NativeFlag};
pub use config::{ConfigError, ShellConfig, UpdateConfig};
pub use error::{Result, ShellError};
pub use launch::{Intent, IntentAction};
pub use lifecycle::{Dispatch, Launch, LifecycleBridge, LifecycleEvent};
pub use native::{Engine, EngineHandle, HostContext, InputEvent, NativeError, NativeRuntime, UpdateTask};
pub use registry::{ConnectionContext, PipeHandle, RegistryError, ServiceFactory, ServiceInstance, ServiceRegistry};
pub use resources::{ResourceError, ResourceExtractor, ResourceReadiness, ResourceSet};
pub use trace::{TraceController, TraceError, TraceGuard};
pub use update::{UpdateError, UpdateScheduler};
