//! Worker runtime primitives shared by the Sky shell.
//!
//! Every task the shell starts goes through this crate so that work is
//! classified ([`TaskClass`]) and attached to a runtime even when the
//! embedder never created one.
//! - [`spawn`], [`spawn_blocking`], [`spawn_named_thread`]: classified task entry points.
//! - [`GenerationClock`]: monotonic identifiers for short-lived task instances.
//! - [`AlarmManager`]: keyed, inexact periodic alarms.

mod alarm;
mod class;
mod spawn;
mod token;

pub use alarm::{AlarmManager, AlarmRecord, MIN_ALARM_INTERVAL};
pub use class::TaskClass;
pub use spawn::{spawn, spawn_blocking, spawn_named_thread};
pub use token::GenerationClock;
