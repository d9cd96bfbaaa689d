//! Unit tests for SelectableTimer
//!
//! These tests verify:
//! - Arming/disarming semantics of start, stop and set_interval
//! - Periodic firing cadence through the reactor
//! - Consume behavior with and without pending expirations

use std::sync::Arc;
use std::thread::sleep;
use std::time::Duration;
use std::time::Instant;

use parking_lot::Mutex;

use super::*;

fn shared_timer(
    initial: Duration,
    period: Duration,
) -> Arc<Mutex<SelectableTimer>> {
    Arc::new(Mutex::new(SelectableTimer::with_schedule(initial, period).unwrap()))
}

/// Test: A new timer is created disarmed
///
/// Scenario:
/// - Create timer with 10ms interval
/// - It must not be armed and must not fire
#[test]
fn test_new_timer_is_not_armed() {
    let timer = SelectableTimer::new(Duration::from_millis(10)).unwrap();
    assert!(!timer.is_armed().unwrap());

    sleep(Duration::from_millis(30));
    let mut timer = timer;
    assert_eq!(timer.consume().unwrap(), Readiness::NoData);
}

/// Test: set_interval stores the schedule without arming
#[test]
fn test_set_interval_does_not_arm() {
    let mut timer = SelectableTimer::new(Duration::from_secs(1)).unwrap();
    timer.set_interval(Duration::from_millis(5));

    assert_eq!(
        timer.schedule(),
        (Duration::from_millis(5), Duration::from_millis(5))
    );
    assert!(!timer.is_armed().unwrap());
}

/// Test: try_consume never reports data for a timer
#[test]
fn test_try_consume_is_always_no_data() {
    let mut timer = SelectableTimer::new(Duration::from_millis(1)).unwrap();
    timer.start().unwrap();
    sleep(Duration::from_millis(10));

    assert_eq!(timer.try_consume().unwrap(), Readiness::NoData);
    // The expiration is still there for consume
    assert_eq!(timer.consume().unwrap(), Readiness::HasData);
    assert!(timer.expirations() >= 1);
}

/// Test: consume resets readiness
///
/// Scenario:
/// - Start one-shot timer, wait for expiration
/// - First consume returns HasData, second one NoData
#[test]
fn test_consume_resets_readiness() {
    let mut timer =
        SelectableTimer::with_schedule(Duration::from_millis(5), Duration::ZERO).unwrap();
    timer.start().unwrap();
    sleep(Duration::from_millis(30));

    assert_eq!(timer.consume().unwrap(), Readiness::HasData);
    assert_eq!(timer.expirations(), 1);
    assert_eq!(timer.consume().unwrap(), Readiness::NoData);
}

/// Test: Zero initial delay fires immediately, then every period
///
/// Scenario:
/// - Timer with schedule (0, 50ms)
/// - First firing close to time 0
/// - Following firings roughly one period apart
#[test]
fn test_periodic_firing_cadence() {
    let period = Duration::from_millis(50);
    let timer = shared_timer(Duration::ZERO, period);
    let mut reactor = Reactor::new();
    let id = reactor.add_selectable(timer.clone());

    let started = Instant::now();
    timer.lock().start().unwrap();

    let first = reactor.select(Some(Duration::from_secs(1))).unwrap();
    assert!(matches!(first, SelectOutcome::Object { id: got, .. } if got == id));
    assert!(started.elapsed() < Duration::from_millis(40));

    let mut last = Instant::now();
    for _ in 0..3 {
        let outcome = reactor.select(Some(Duration::from_secs(1))).unwrap();
        assert!(matches!(outcome, SelectOutcome::Object { id: got, .. } if got == id));

        let gap = last.elapsed();
        assert!(gap >= Duration::from_millis(30), "gap {gap:?} too short");
        assert!(gap <= Duration::from_millis(300), "gap {gap:?} too long");
        last = Instant::now();
    }

    timer.lock().stop().unwrap();
}

/// Test: stop without start never fires again
#[test]
fn test_stop_prevents_further_firing() {
    let timer = shared_timer(Duration::ZERO, Duration::from_millis(20));
    let mut reactor = Reactor::new();
    reactor.add_selectable(timer.clone());

    timer.lock().start().unwrap();
    assert!(matches!(
        reactor.select(Some(Duration::from_secs(1))).unwrap(),
        SelectOutcome::Object { .. }
    ));

    timer.lock().stop().unwrap();
    assert!(!timer.lock().is_armed().unwrap());
    assert_eq!(
        reactor.select(Some(Duration::from_millis(150))).unwrap(),
        SelectOutcome::Timeout
    );
}

/// Test: Re-arming replaces the running schedule
///
/// Scenario:
/// - Start with a 10s interval
/// - Change interval to 20ms and start again
/// - Timer fires well before the original 10s
#[test]
fn test_restart_replaces_schedule() {
    let timer = shared_timer(Duration::from_secs(10), Duration::from_secs(10));
    let mut reactor = Reactor::new();
    reactor.add_selectable(timer.clone());

    timer.lock().start().unwrap();
    {
        let mut t = timer.lock();
        t.set_interval(Duration::from_millis(20));
        t.start().unwrap();
    }

    let started = Instant::now();
    let outcome = reactor.select(Some(Duration::from_secs(2))).unwrap();
    assert!(matches!(outcome, SelectOutcome::Object { .. }));
    assert!(started.elapsed() < Duration::from_secs(1));
}

/// Test: The timer owns exactly its own handle
#[test]
fn test_owns_handle() {
    let timer = SelectableTimer::new(Duration::from_millis(1)).unwrap();
    let mut handles = HandleSet::new();
    timer.register_handles(&mut handles);

    assert_eq!(handles.len(), 1);
    assert!(timer.owns_handle(&handles));
    assert!(!timer.owns_handle(&HandleSet::new()));
    assert!(handles.contains(timer.raw_fd()));
}
