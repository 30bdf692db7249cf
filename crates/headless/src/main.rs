//! Headless Sky shell host.
//!
//! Runs the shell startup sequence against a native runtime that only logs:
//! - resource extraction into the data directory
//! - native initialization through the init barrier
//! - one activity lifecycle, ending on Ctrl-C

mod runtime;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use sky_shell::launch::EXTRA_ENABLE_CHECKED_MODE;
use sky_shell::{Intent, IntentAction, LifecycleEvent, Shell, ShellConfig};
use sky_shell_worker::{TaskClass, spawn_blocking};
use tracing::info;

use crate::runtime::{LoggingRuntime, SpanTraceController};

/// Headless host command line arguments.
#[derive(Parser, Debug)]
#[command(name = "sky-shell-headless")]
#[command(about = "Drive the Sky shell startup sequence without a device")]
struct Args {
	/// TOML configuration file
	#[arg(short, long, value_name = "PATH")]
	config: Option<PathBuf>,

	/// Directory that receives extracted resources
	#[arg(long, value_name = "DIR")]
	data_dir: Option<PathBuf>,

	/// Directory resources are extracted from
	#[arg(long, value_name = "DIR")]
	assets: Option<PathBuf>,

	/// Launch intent action (VIEW or RUN)
	#[arg(long)]
	action: Option<String>,

	/// Launch intent data: a URL for VIEW, a bundle path for RUN
	#[arg(long)]
	data: Option<String>,

	/// Report type errors in application code
	#[arg(long)]
	enable_checked_mode: bool,

	/// Verbose logging
	#[arg(short, long)]
	verbose: bool,
}

impl Args {
	fn shell_config(&self) -> anyhow::Result<ShellConfig> {
		let mut config = match &self.config {
			Some(path) => ShellConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
			None => ShellConfig::default(),
		};
		if let Some(dir) = &self.data_dir {
			config.data_dir = dir.clone();
		}
		if let Some(dir) = &self.assets {
			config.asset_dir = dir.clone();
		}
		Ok(config)
	}

	fn intent(&self) -> Intent {
		let mut intent = Intent {
			action: self.action.as_deref().and_then(|a| a.parse::<IntentAction>().ok()),
			data: self.data.clone(),
			..Intent::default()
		};
		if self.enable_checked_mode {
			intent = intent.with_extra(EXTRA_ENABLE_CHECKED_MODE, "true");
		}
		intent
	}
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	let subscriber = tracing_subscriber::fmt()
		.with_max_level(if args.verbose {
			tracing::Level::DEBUG
		} else {
			tracing::Level::INFO
		})
		.finish();
	tracing::subscriber::set_global_default(subscriber)?;

	let config = args.shell_config()?;
	let intent = args.intent();
	info!(data_dir = %config.data_dir.display(), "starting headless shell");

	let shell = Shell::builder(config, Arc::new(LoggingRuntime::default()))
		.trace_controller(Arc::new(SpanTraceController::default()))
		.start()?;

	// Created waits for resource extraction.
	let (shell, mut bridge) = spawn_blocking(TaskClass::Interactive, move || {
		let mut bridge = shell.bridge(intent);
		bridge.handle(LifecycleEvent::Created).map(|_| (shell, bridge))
	})
	.await?
	.context("native initialization failed")?;

	bridge.handle(LifecycleEvent::Resumed)?;
	bridge.handle(LifecycleEvent::PostResumed)?;
	info!(services = ?shell.registry().names(), "shell running; press Ctrl-C to stop");

	tokio::signal::ctrl_c().await?;

	bridge.handle(LifecycleEvent::Paused)?;
	bridge.handle(LifecycleEvent::Destroyed)?;
	info!("headless shell stopped");
	Ok(())
}
