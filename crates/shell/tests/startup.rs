mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use common::{Call, Dirs, JournalRuntime};
use pretty_assertions::assert_eq;
use sky_shell::services::{PATH_SERVICE, PathService, UPDATE_SERVICE, UpdateService};
use sky_shell::update::UPDATE_ALARM;
use sky_shell::{ConnectionContext, Dispatch, InitStatus, Intent, LifecycleEvent, PipeHandle, RegistryError, ServiceInstance, Shell, ShellError};
use sky_shell_worker::AlarmManager;

fn start(dirs: &Dirs) -> (Shell, Arc<JournalRuntime>) {
	let runtime = Arc::new(JournalRuntime::default());
	let shell = Shell::builder(dirs.config(), runtime.clone()).start().unwrap();
	(shell, runtime)
}

#[test]
fn bundle_only_data_dir_runs_the_bundle() {
	let dirs = Dirs::new();
	dirs.ship("app.flx", "bundle");
	let (shell, runtime) = start(&dirs);

	let mut bridge = shell.bridge(Intent::new());
	assert_eq!(bridge.handle(LifecycleEvent::Created).unwrap(), Dispatch::Forwarded);

	let bundle = shell.config().data_dir.join("app.flx");
	assert_eq!(runtime.journal.engine_calls(), vec![Call::Bundle(bundle)]);
	assert_eq!(runtime.journal.count(|c| matches!(c, Call::Snapshot(_) | Call::Network(_))), 0);
}

#[test]
fn view_intent_loads_url_and_skips_local_files() {
	let dirs = Dirs::new();
	dirs.ship("app.flx", "bundle");
	dirs.ship("snapshot_blob.bin", "snapshot");
	let (shell, runtime) = start(&dirs);

	let intent = Intent {
		action: Some("VIEW".parse().unwrap()),
		data: Some("http://example/app".to_string()),
		..Intent::default()
	};
	shell.bridge(intent).handle(LifecycleEvent::Created).unwrap();

	assert_eq!(runtime.journal.engine_calls(), vec![Call::Network("http://example/app".to_string())]);
}

#[test]
fn full_activity_lifecycle() {
	let dirs = Dirs::new();
	dirs.ship("snapshot_blob.bin", "snapshot");
	let (shell, runtime) = start(&dirs);

	let mut bridge = shell.bridge(Intent::new());
	assert_eq!(bridge.handle(LifecycleEvent::BackPressed).unwrap(), Dispatch::DefaultHost);
	for event in [
		LifecycleEvent::Created,
		LifecycleEvent::Resumed,
		LifecycleEvent::PostResumed,
		LifecycleEvent::BackPressed,
		LifecycleEvent::Paused,
		LifecycleEvent::Destroyed,
	] {
		bridge.handle(event).unwrap();
	}

	assert_eq!(
		runtime.journal.calls(),
		vec![
			Call::Bootstrap(Vec::new()),
			Call::RunLoop,
			Call::Snapshot(shell.config().data_dir.join("snapshot_blob.bin")),
			Call::Resumed,
			Call::PostResumed,
			Call::Input(sky_shell::InputEvent::Back),
			Call::Paused,
			Call::Destroyed,
		]
	);
}

#[test]
fn activity_and_update_check_share_one_bootstrap() {
	let dirs = Dirs::new();
	let (shell, runtime) = start(&dirs);
	let shell = Arc::new(shell);

	let activity = {
		let shell = Arc::clone(&shell);
		thread::spawn(move || shell.bridge(Intent::new()).handle(LifecycleEvent::Created).map(|_| ()))
	};
	let update = {
		let shell = Arc::clone(&shell);
		thread::spawn(move || shell.updates().run_check().map(|_| ()))
	};
	activity.join().unwrap().unwrap();
	update.join().unwrap().unwrap();

	assert_eq!(runtime.journal.count(|c| matches!(c, Call::Bootstrap(_))), 1);
	assert_eq!(shell.barrier().status(), InitStatus::Done);
}

#[test]
fn updater_service_completes_the_current_check() {
	let dirs = Dirs::new();
	let (shell, runtime) = start(&dirs);

	assert_eq!(shell.updates().run_check().unwrap(), Some(1));

	let binding = shell.connect(UPDATE_SERVICE, ConnectionContext::new("native", PipeHandle::allocate())).unwrap().unwrap();
	binding.downcast_ref::<UpdateService>().unwrap().notify_update_check_complete();

	assert_eq!(shell.updates().current_generation(), None);
	assert_eq!(runtime.journal.count(|c| *c == Call::Release(1)), 1);
}

#[test]
fn path_service_reports_shell_directories() {
	let dirs = Dirs::new();
	let (shell, _) = start(&dirs);

	let pipe = PipeHandle::allocate();
	let service = shell.connect(PATH_SERVICE, ConnectionContext::new("app", pipe)).unwrap().unwrap();
	let paths = service.downcast_ref::<PathService>().unwrap();

	assert_eq!(paths.app_data_dir(), shell.config().data_dir.as_path());
	assert_eq!(paths.cache_dir(), shell.config().cache_dir.as_path());
	assert_eq!(paths.connection().pipe, pipe);
	assert!(shell.connect("keyboard::KeyboardService", ConnectionContext::new("app", PipeHandle::allocate())).unwrap().is_none());
}

#[test]
fn hooks_extend_resources_and_services() {
	let dirs = Dirs::new();
	dirs.ship("fonts.bin", "fonts");
	let runtime = Arc::new(JournalRuntime::default());

	let shell = Shell::builder(dirs.config(), runtime)
		.resources(|set| set.add_resources(["fonts.bin"]))
		.services(|registry, _context| registry.register("sensors::SensorService", |_conn| Box::new(42u32) as ServiceInstance))
		.start()
		.unwrap();

	let report = shell.extraction().wait().unwrap();
	assert_eq!(report.extracted, vec!["fonts.bin".to_string()]);
	assert!(shell.config().data_dir.join("fonts.bin").is_file());

	let sensor = shell.connect("sensors::SensorService", ConnectionContext::new("app", PipeHandle::allocate())).unwrap().unwrap();
	assert_eq!(sensor.downcast_ref::<u32>(), Some(&42));
	assert!(shell.registry().is_sealed());
}

#[test]
fn duplicate_service_hook_fails_startup() {
	let dirs = Dirs::new();
	let runtime = Arc::new(JournalRuntime::default());

	let err = Shell::builder(dirs.config(), runtime)
		.services(|registry, _context| registry.register(PATH_SERVICE, |_conn| Box::new(()) as ServiceInstance))
		.start()
		.unwrap_err();

	assert!(matches!(err, ShellError::Registry(RegistryError::Duplicate(name)) if name == PATH_SERVICE));
}

#[test]
fn extraction_failure_is_fatal_for_initialization() {
	let dirs = Dirs::new();
	let mut config = dirs.config();
	let blocker = dirs.data.path().join("not-a-dir");
	std::fs::write(&blocker, "file").unwrap();
	config.data_dir = blocker.join("sky_shell");
	let runtime = Arc::new(JournalRuntime::default());

	let shell = Shell::builder(config, runtime.clone()).start().unwrap();

	assert!(matches!(shell.ensure_initialized(&[]), Err(sky_shell::InitError::Resources(_))));
	assert_eq!(runtime.journal.count(|c| matches!(c, Call::Bootstrap(_))), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn start_schedules_updates_before_populating_services() {
	let dirs = Dirs::new();
	let mut config = dirs.config();
	config.update.enabled = true;
	let runtime = Arc::new(JournalRuntime::default());
	let alarms = AlarmManager::new();

	let scheduled_at_hook = Arc::new(AtomicBool::new(false));
	let (hook_alarms, hook_seen) = (alarms.clone(), Arc::clone(&scheduled_at_hook));
	let shell = Shell::builder(config, runtime.clone())
		.alarms(alarms.clone())
		.services(move |_registry, _context| {
			hook_seen.store(hook_alarms.exists(UPDATE_ALARM), Ordering::SeqCst);
			Ok(())
		})
		.start()
		.unwrap();

	assert!(scheduled_at_hook.load(Ordering::SeqCst));
	assert!(shell.updates().is_scheduled());
	assert!(shell.registry().is_sealed());

	// The alarm fires once on registration; that check bootstraps the runtime.
	for _ in 0..500 {
		if runtime.journal.count(|c| matches!(c, Call::Check(_))) > 0 {
			break;
		}
		tokio::time::sleep(Duration::from_millis(10)).await;
	}
	assert_eq!(runtime.journal.count(|c| matches!(c, Call::Check(_))), 1);
	assert_eq!(runtime.journal.count(|c| matches!(c, Call::Bootstrap(_))), 1);
	assert!(alarms.cancel(UPDATE_ALARM));
}
