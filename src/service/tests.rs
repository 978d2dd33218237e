use super::*;
use crate::dispatcher::ControlCode;
use crate::error::ERROR_SERVICE_SPECIFIC_ERROR;
use crate::hooks::WorkerFn;
use crate::manager::LocalServiceManager;
use crate::status::ServiceState;
use crate::testing::{FailingSignalFactory, RecordingHooks};
use parking_lot::Mutex;
use std::thread::{self, JoinHandle};
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(5);

fn spawn_run(service: Service, manager: Arc<LocalServiceManager>) -> JoinHandle<Result<u32>> {
    thread::spawn(move || service.run(manager.as_ref()))
}

fn position(events: &[&str], event: &str) -> usize {
    events
        .iter()
        .position(|e| *e == event)
        .unwrap_or_else(|| panic!("missing event {}", event))
}

#[test]
fn test_pause_interrogate_continue_stop_scenario() {
    let manager = Arc::new(LocalServiceManager::new(Vec::new()));
    let sender = manager.control_sender();
    let hooks = Arc::new(RecordingHooks::default());
    let service = Service::from_shared(ServiceIdentity::new("scenario", true), hooks.clone());

    let run = spawn_run(service, Arc::clone(&manager));
    assert!(manager.wait_for_state(ServiceState::Running, WAIT));

    sender.send(ControlCode::Pause);
    assert!(manager.wait_for_state(ServiceState::Paused, WAIT));

    sender.send(ControlCode::Interrogate);
    assert!(manager.wait_for_reports(5, WAIT));

    sender.send(ControlCode::Continue);
    assert!(manager.wait_for_reports(7, WAIT));

    sender.send(ControlCode::Stop);
    let exit_code = run.join().unwrap().unwrap();
    assert_eq!(exit_code, 0);

    assert_eq!(
        manager.states(),
        vec![
            ServiceState::StartPending,
            ServiceState::Running,
            ServiceState::PausePending,
            ServiceState::Paused,
            ServiceState::Paused,
            ServiceState::ContinuePending,
            ServiceState::Running,
            ServiceState::StopPending,
            ServiceState::Stopped,
        ]
    );

    let last = manager.last_status().unwrap();
    assert_eq!(last.win32_exit_code, 0);
    assert!(last.controls_accepted.is_empty());

    let events = hooks.events();
    assert!(position(&events, "worker_exited") < position(&events, "on_exit"));
    let lifecycle: Vec<_> = events
        .into_iter()
        .filter(|e| !e.starts_with("worker"))
        .collect();
    assert_eq!(
        lifecycle,
        vec!["on_startup", "on_pause", "on_continue", "on_stop", "on_exit"]
    );
}

#[test]
fn test_stop_while_paused_exits_worker_before_on_exit() {
    let manager = Arc::new(LocalServiceManager::new(Vec::new()));
    let sender = manager.control_sender();
    let hooks = Arc::new(RecordingHooks::default());
    let service = Service::from_shared(ServiceIdentity::new("paused-stop", true), hooks.clone());

    let run = spawn_run(service, Arc::clone(&manager));
    assert!(manager.wait_for_state(ServiceState::Running, WAIT));

    sender.send(ControlCode::Pause);
    assert!(manager.wait_for_state(ServiceState::Paused, WAIT));
    sender.send(ControlCode::Stop);

    assert_eq!(run.join().unwrap().unwrap(), 0);
    assert_eq!(manager.states().last(), Some(&ServiceState::Stopped));

    let events = hooks.events();
    assert!(position(&events, "worker_exited") < position(&events, "on_exit"));
    assert!(!events.contains(&"on_stop"));
}

#[test]
fn test_signal_allocation_failure_never_starts_worker() {
    let manager = Arc::new(LocalServiceManager::new(Vec::new()));
    let hooks = Arc::new(RecordingHooks::default());
    let service = Service::from_shared(ServiceIdentity::new("no-signals", true), hooks.clone())
        .with_signal_factory(Arc::new(FailingSignalFactory { code: 14 }));

    let result = spawn_run(service, Arc::clone(&manager)).join().unwrap();

    assert_eq!(result.unwrap_err().code(), 14);
    assert_eq!(
        manager.states(),
        vec![ServiceState::StartPending, ServiceState::Stopped]
    );
    let last = manager.last_status().unwrap();
    assert!(last.controls_accepted.is_empty());
    assert_eq!(last.win32_exit_code, 14);
    assert_eq!(hooks.events(), vec!["on_startup", "on_error"]);
}

#[test]
fn test_registration_failure_is_returned_as_code() {
    let manager = Arc::new(LocalServiceManager::new(Vec::new()).with_registration_error(1063));
    let hooks = Arc::new(RecordingHooks::default());
    let service = Service::from_shared(ServiceIdentity::new("unregistered", false), hooks.clone());

    let err = service.run(manager.as_ref()).unwrap_err();

    assert!(matches!(err, ServiceError::Registration { code: 1063 }));
    assert_eq!(err.code(), 1063);
    assert!(manager.history().is_empty());
    assert!(hooks.events().is_empty());
}

#[test]
fn test_worker_exit_code_reported_on_stop() {
    let manager = Arc::new(LocalServiceManager::new(vec![
        "--alpha".to_string(),
        "beta".to_string(),
    ]));
    let seen_args = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&seen_args);
    let service = Service::new(
        ServiceIdentity::new("short-lived", false),
        WorkerFn(move |_ctx: WorkerContext, args: &[String]| {
            *recorder.lock() = args.to_vec();
            3
        }),
    );

    let exit_code = spawn_run(service, Arc::clone(&manager))
        .join()
        .unwrap()
        .unwrap();

    assert_eq!(exit_code, 3);
    assert_eq!(*seen_args.lock(), vec!["--alpha", "beta"]);

    let last = manager.last_status().unwrap();
    assert_eq!(last.current_state, ServiceState::Stopped);
    assert_eq!(last.win32_exit_code, ERROR_SERVICE_SPECIFIC_ERROR);
    assert_eq!(last.service_specific_exit_code, 3);
}

#[test]
fn test_rejected_reports_do_not_block_run() {
    let manager = Arc::new(LocalServiceManager::new(Vec::new()));
    manager.set_reject_reports(true);
    let sender = manager.control_sender();
    let hooks = Arc::new(RecordingHooks::default());
    let service = Service::from_shared(ServiceIdentity::new("rejected", true), hooks.clone());

    let run = spawn_run(service, Arc::clone(&manager));

    // Nothing is mirrored, so poll the hooks until the worker is up
    let deadline = std::time::Instant::now() + WAIT;
    while !hooks.events().contains(&"worker_started") && std::time::Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    sender.send(ControlCode::Stop);

    assert_eq!(run.join().unwrap().unwrap(), 0);
    assert!(manager.history().is_empty());
    assert_eq!(hooks.events().last(), Some(&"on_exit"));
}

#[test]
fn test_from_config_applies_identity_and_options() {
    let mut config = ServiceConfig::default();
    config.service.name = "configured".to_string();
    config.service.supports_pause_continue = false;
    config.lifecycle.pending_wait_hint_ms = 2500;

    let service = Service::from_config(&config, RecordingHooks::default());

    assert_eq!(service.identity().name(), "configured");
    assert!(!service.identity().supports_pause_continue());
    assert_eq!(
        service.options.pending_wait_hint,
        Duration::from_millis(2500)
    );
}
