//! Integration tests: dispatch passes against a probe updater.

use std::sync::Arc;
use std::time::Duration;

use cadence_core::{KernelNotice, WorkKind};
use cadence_dispatch::{Dispatcher, DispatcherConfig};
use cadence_test_utils::{ProbeUpdater, RecordingObserver};

fn dispatcher(probe: &Arc<ProbeUpdater>, config: DispatcherConfig) -> Dispatcher {
    Dispatcher::new(Arc::clone(probe) as _, config).expect("valid config")
}

#[test]
fn single_thread_pass_is_sequential_in_registration_order() {
    let probe = Arc::new(ProbeUpdater::new());
    let mut disp = dispatcher(
        &probe,
        DispatcherConfig {
            thread_count: 1,
            ..DispatcherConfig::default()
        },
    );
    let handles: Vec<_> = (0..8).map(|_| disp.add_platform()).collect();

    let report = disp.update_platforms(2.0);
    assert_eq!(report.executed, 8);
    assert_eq!(report.skipped + report.failed, 0);
    assert_eq!(probe.entities_updated(WorkKind::Platform), handles);
    assert!(probe.calls().iter().all(|&(_, _, t)| t == 2.0));
}

#[test]
fn multi_thread_pass_updates_each_platform_exactly_once() {
    let probe = Arc::new(ProbeUpdater::new());
    let mut disp = dispatcher(
        &probe,
        DispatcherConfig {
            thread_count: 4,
            ..DispatcherConfig::default()
        },
    );
    let handles: Vec<_> = (0..32).map(|_| disp.add_platform()).collect();

    let report = disp.update_platforms(1.0);
    assert_eq!(report.executed, 32);

    let mut updated = probe.entities_updated(WorkKind::Platform);
    updated.sort();
    let mut expected = handles.clone();
    expected.sort();
    assert_eq!(updated, expected, "each entity once, none missed");
}

#[test]
fn deleted_platform_is_not_updated() {
    let probe = Arc::new(ProbeUpdater::new());
    let mut disp = dispatcher(&probe, DispatcherConfig::default());
    let keep = disp.add_platform();
    let gone = disp.add_platform();
    assert!(disp.delete_platform(gone));
    assert!(!disp.delete_platform(gone), "stale handle is a no-op");

    disp.update_platforms(1.0);
    assert_eq!(probe.entities_updated(WorkKind::Platform), vec![keep]);
    assert_eq!(disp.platform_count(), 1);
}

#[test]
fn sensors_run_only_when_due_and_reschedule_by_interval() {
    let probe = Arc::new(ProbeUpdater::new());
    let mut disp = dispatcher(
        &probe,
        DispatcherConfig {
            thread_count: 1,
            ..DispatcherConfig::default()
        },
    );
    let a = disp.add_platform();
    let b = disp.add_platform();
    assert!(disp.turn_sensor_on(a, 2.0, 1.0));
    assert!(disp.turn_sensor_on(b, 2.0, 5.0));

    // t=1: only a is due.
    assert_eq!(disp.update_sensors(1.0).executed, 1);
    assert_eq!(probe.entities_updated(WorkKind::Sensor), vec![a]);

    // a rescheduled to 1 + 2 = 3; at t=2.9 nothing is due.
    assert_eq!(disp.update_sensors(2.9).executed, 0);

    // t=5: both due; a (due 3) is more overdue than b (due 5).
    assert_eq!(disp.update_sensors(5.0).executed, 2);
    assert_eq!(probe.entities_updated(WorkKind::Sensor), vec![a, a, b]);
}

#[test]
fn turned_off_sensor_stops_updating() {
    let probe = Arc::new(ProbeUpdater::new());
    let mut disp = dispatcher(&probe, DispatcherConfig::default());
    let a = disp.add_platform();
    disp.turn_sensor_on(a, 1.0, 0.0);
    disp.update_sensors(0.0);
    assert!(disp.turn_sensor_off(a));
    disp.update_sensors(100.0);
    assert_eq!(probe.entities_updated(WorkKind::Sensor).len(), 1);
}

#[test]
fn hook_panic_is_contained_and_reported() {
    let probe = Arc::new(ProbeUpdater::new());
    let observer = Arc::new(RecordingObserver::new());
    let mut disp = dispatcher(
        &probe,
        DispatcherConfig {
            thread_count: 2,
            observer: Some(observer.clone()),
            ..DispatcherConfig::default()
        },
    );
    let handles: Vec<_> = (0..6).map(|_| disp.add_platform()).collect();
    probe.panic_on(handles[3]);

    let report = disp.update_platforms(1.0);
    assert_eq!(report.failed, 1);
    assert_eq!(report.executed, 5);
    assert_eq!(
        observer.count_matching(|n| matches!(
            n,
            KernelNotice::EntityUpdateFailed { entity, kind: WorkKind::Platform, .. }
                if *entity == handles[3]
        )),
        1
    );

    // The pool survives: the next pass runs normally.
    assert_eq!(disp.update_platforms(2.0).failed, 1, "still panicking");
    assert_eq!(disp.platform_count(), 6);
}

#[test]
fn break_update_defers_least_overdue_sensors() {
    // One worker burning ~15ms per item against a ~40ms deadline: the
    // most overdue sensors run, the rest are deferred intact.
    let probe = Arc::new(ProbeUpdater::with_delay(Duration::from_millis(15)));
    let mut disp = dispatcher(
        &probe,
        DispatcherConfig {
            thread_count: 1,
            break_update_time: Some(0.04),
            ..DispatcherConfig::default()
        },
    );
    let handles: Vec<_> = (0..10).map(|_| disp.add_platform()).collect();
    for (i, &h) in handles.iter().enumerate() {
        // Distinct due times so the execution order is deterministic.
        disp.turn_sensor_on(h, 100.0, i as f64);
    }

    let report = disp.update_sensors(50.0);
    assert_eq!(report.executed + report.skipped, 10);
    assert!(report.executed >= 1, "at least one item ran");
    assert!(report.skipped >= 1, "deadline deferred the tail");
    assert!(disp.break_update());

    // Deferred sensors kept their old due time; executed ones moved to
    // 50 + 100 = 150. So exactly the skipped ones are due again now.
    let probe_calls = probe.calls().len();
    let rerun = disp.update_sensors(50.0);
    assert_eq!(rerun.executed + rerun.skipped, report.skipped);
    assert!(probe.calls().len() > probe_calls || rerun.skipped > 0);
}

#[test]
fn deadline_free_pass_clears_break_update_flag() {
    let probe = Arc::new(ProbeUpdater::with_delay(Duration::from_millis(10)));
    let mut disp = dispatcher(
        &probe,
        DispatcherConfig {
            thread_count: 1,
            break_update_time: Some(0.015),
            ..DispatcherConfig::default()
        },
    );
    for i in 0..5 {
        let h = disp.add_platform();
        disp.turn_sensor_on(h, 1_000.0, f64::from(i));
    }
    disp.update_sensors(10.0);
    // Keep re-running until the backlog drains; the flag must reflect
    // only the most recent pass.
    for _ in 0..20 {
        if disp.update_sensors(10.0).skipped == 0 {
            break;
        }
    }
    assert!(!disp.break_update());
}

#[test]
fn empty_passes_return_immediately() {
    let probe = Arc::new(ProbeUpdater::new());
    let mut disp = dispatcher(&probe, DispatcherConfig::default());
    assert_eq!(disp.update_platforms(1.0).executed, 0);
    assert_eq!(disp.update_sensors(1.0).executed, 0);
    assert!(probe.calls().is_empty());
}

#[test]
fn debug_mode_emits_pass_notices() {
    let probe = Arc::new(ProbeUpdater::new());
    let observer = Arc::new(RecordingObserver::new());
    let mut disp = dispatcher(
        &probe,
        DispatcherConfig {
            thread_count: 2,
            debug: true,
            observer: Some(observer.clone()),
            ..DispatcherConfig::default()
        },
    );
    for _ in 0..4 {
        disp.add_platform();
    }
    disp.update_platforms(1.0);
    disp.update_sensors(1.0);

    let notices = observer.notices();
    assert!(notices.iter().any(|n| matches!(
        n,
        KernelNotice::DispatchPass { kind: WorkKind::Platform, executed: 4, .. }
    )));
    assert!(notices.iter().any(|n| matches!(
        n,
        KernelNotice::DispatchPass { kind: WorkKind::Sensor, executed: 0, .. }
    )));
}
