//! Tests for the milestone-driven recompute scheduler

use gatefind::engine::{PassKind, RecomputeScheduler, SchedulerConfig};
use gatefind::{GateDiscoveryError, GateDiscoveryEngine, GpsSample};
use std::time::Duration;

#[test]
fn test_initial_pass_due_at_volume_milestone() {
    let scheduler = RecomputeScheduler::new();
    assert_eq!(scheduler.due("ev-1", 0), None);
    assert_eq!(scheduler.due("ev-1", 9), None);
    assert_eq!(scheduler.due("ev-1", 10), Some(PassKind::Full));
    assert_eq!(scheduler.due("ev-1", 11), Some(PassKind::Full));
}

#[test]
fn test_refresh_and_sweep_cadence_after_first_pass() {
    let mut scheduler = RecomputeScheduler::new();
    scheduler.begin("ev-1").unwrap();
    scheduler.finish("ev-1", PassKind::Full, 10);

    // Under both intervals: nothing due
    assert_eq!(scheduler.due("ev-1", 15), None);
    // 10 more check-ins: orphan sweep
    assert_eq!(scheduler.due("ev-1", 20), Some(PassKind::OrphanSweep));
    // 25 more: the full refresh outranks the sweep
    assert_eq!(scheduler.due("ev-1", 35), Some(PassKind::Full));
}

#[test]
fn test_sweep_milestone_advances_independently() {
    let mut scheduler = RecomputeScheduler::new();
    scheduler.begin("ev-1").unwrap();
    scheduler.finish("ev-1", PassKind::Full, 10);

    scheduler.begin("ev-1").unwrap();
    scheduler.finish("ev-1", PassKind::OrphanSweep, 20);

    // The sweep at 20 pushed the next sweep to 30; the full refresh still
    // counts from 10
    assert_eq!(scheduler.due("ev-1", 25), None);
    assert_eq!(scheduler.due("ev-1", 30), Some(PassKind::OrphanSweep));
    assert_eq!(scheduler.due("ev-1", 35), Some(PassKind::Full));
}

#[test]
fn test_concurrent_trigger_is_deferred_not_failed() {
    let mut scheduler = RecomputeScheduler::new();
    scheduler.begin("ev-1").unwrap();
    assert!(scheduler.is_running("ev-1"));

    let second = scheduler.begin("ev-1");
    assert!(matches!(
        second,
        Err(GateDiscoveryError::PassInProgress { .. })
    ));

    // Repeated triggers coalesce to one deferred entry
    let _ = scheduler.begin("ev-1");
    scheduler.finish("ev-1", PassKind::Full, 12);
    assert_eq!(scheduler.take_deferred(), vec!["ev-1".to_string()]);
    assert!(scheduler.take_deferred().is_empty());
}

#[test]
fn test_events_lock_independently() {
    let mut scheduler = RecomputeScheduler::new();
    scheduler.begin("ev-1").unwrap();
    scheduler.begin("ev-2").unwrap();
    assert!(scheduler.is_running("ev-1"));
    assert!(scheduler.is_running("ev-2"));
}

#[test]
fn test_abandon_releases_lock_without_progress() {
    let mut scheduler = RecomputeScheduler::new();
    scheduler.begin("ev-1").unwrap();
    scheduler.abandon("ev-1");
    assert!(!scheduler.is_running("ev-1"));

    // The milestone was not consumed: the initial pass is still due
    assert_eq!(scheduler.due("ev-1", 10), Some(PassKind::Full));
    scheduler.begin("ev-1").unwrap();
}

#[test]
fn test_stuck_pass_lock_is_reclaimed_after_timeout() {
    let mut scheduler = RecomputeScheduler::with_config(SchedulerConfig {
        pass_timeout: Duration::from_millis(0),
        ..SchedulerConfig::default()
    });
    scheduler.begin("ev-1").unwrap();
    // Zero timeout: the stale lock is immediately reclaimable
    scheduler.begin("ev-1").unwrap();
}

#[test]
fn test_custom_milestones() {
    let scheduler = RecomputeScheduler::with_config(SchedulerConfig {
        initial_pass_at: 3,
        refresh_interval: 5,
        orphan_sweep_interval: 2,
        pass_timeout: Duration::from_secs(60),
    });
    assert_eq!(scheduler.due("ev-1", 2), None);
    assert_eq!(scheduler.due("ev-1", 3), Some(PassKind::Full));
}

#[test]
fn test_ingestion_reports_due_pass_without_running_it() {
    let mut engine = GateDiscoveryEngine::new();

    for i in 0..10 {
        let due = engine
            .record_checkin(gatefind::CheckinEvent {
                id: format!("chk-{i}"),
                event_id: "gig".to_string(),
                attendee_id: format!("wb-{i}"),
                category: "general".to_string(),
                timestamp: 1_700_000_000 + i as i64 * 600,
                gps: Some(GpsSample::new(47.37, 8.55, 10.0)),
                gate_id: None,
            })
            .unwrap();

        if i < 9 {
            assert_eq!(due, None, "pass due after only {} check-ins", i + 1);
        } else {
            assert_eq!(due, Some(PassKind::Full));
        }
    }

    // Ingestion never materializes anything by itself
    assert!(engine.gates("gig").is_empty());
}

#[test]
fn test_orphan_sweep_due_after_full_pass() {
    let mut engine = GateDiscoveryEngine::new();
    let checkin = |i: usize| gatefind::CheckinEvent {
        id: format!("chk-{i}"),
        event_id: "gig".to_string(),
        attendee_id: format!("wb-{i}"),
        category: "general".to_string(),
        timestamp: 1_700_000_000 + i as i64 * 600,
        gps: Some(GpsSample::new(47.37, 8.55, 10.0)),
        gate_id: None,
    };

    for i in 0..10 {
        engine.record_checkin(checkin(i)).unwrap();
    }
    engine.run_pipeline("gig").unwrap();

    let mut due = None;
    for i in 10..20 {
        due = engine.record_checkin(checkin(i)).unwrap();
    }
    assert_eq!(due, Some(PassKind::OrphanSweep));

    let assigned = engine.run_orphan_sweep("gig").unwrap();
    assert_eq!(assigned, 10);
}
