use std::sync::Arc;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use parking_lot::Mutex;
use state_relay::ProducerStateTable;
use state_relay::Reactor;
use state_relay::SelectOutcome;
use state_relay::SelectableEvent;
use state_relay::SelectableTimer;
use state_relay::SubscriberStateTable;
use state_relay::APPL_DB;
use state_relay::APP_NEIGH_TABLE_NAME;

use crate::commons::connector;
use crate::commons::fvs;
use crate::commons::key;

/// Test: A periodic timer keeps firing next to a subscriber with a backlog
///
/// Scenario:
/// - 5000 queued keys keep the subscriber ready on every call
/// - a 10ms periodic timer registered after it
/// - over 200ms both sources are returned repeatedly
#[test]
fn test_timer_is_not_starved_by_busy_subscriber() {
    let db = connector(APPL_DB);
    let producer = ProducerStateTable::new(&db, APP_NEIGH_TABLE_NAME);
    let subscriber = Arc::new(Mutex::new(
        SubscriberStateTable::new(&db, APP_NEIGH_TABLE_NAME).unwrap(),
    ));
    for i in 0..5000 {
        producer.set(&key(i), &fvs(&[("neigh", "00:11:22:33:44:55")])).unwrap();
    }

    let timer = Arc::new(Mutex::new(
        SelectableTimer::with_schedule(Duration::ZERO, Duration::from_millis(10)).unwrap(),
    ));
    let mut reactor = Reactor::new();
    let subscriber_id = reactor.add_selectable(subscriber.clone());
    let timer_id = reactor.add_selectable(timer.clone());
    timer.lock().start().unwrap();

    let (mut from_subscriber, mut from_timer) = (0, 0);
    let started = Instant::now();
    while started.elapsed() < Duration::from_millis(200) {
        match reactor.select(Some(Duration::from_millis(50))).unwrap() {
            SelectOutcome::Object { id, .. } if id == subscriber_id => {
                subscriber.lock().pop().unwrap();
                from_subscriber += 1;
            }
            SelectOutcome::Object { id, .. } => {
                assert_eq!(id, timer_id);
                from_timer += 1;
            }
            SelectOutcome::Timeout => {}
        }
    }
    timer.lock().stop().unwrap();

    assert!(from_timer >= 5, "timer served {from_timer} times");
    assert!(from_subscriber >= 100, "subscriber served {from_subscriber} times");
}

/// Test: An event notified from another thread interleaves with table updates
#[test]
fn test_event_and_subscriber_share_reactor() {
    let db = connector(APPL_DB);
    let producer = ProducerStateTable::new(&db, "INTF_TABLE");
    let subscriber = Arc::new(Mutex::new(
        SubscriberStateTable::new(&db, "INTF_TABLE").unwrap(),
    ));
    let event = Arc::new(Mutex::new(SelectableEvent::new().unwrap()));
    let notifier = event.lock().notifier();

    let mut reactor = Reactor::new();
    let subscriber_id = reactor.add_selectable(subscriber.clone());
    let event_id = reactor.add_selectable(event.clone());

    let worker = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        producer.set("Ethernet0|10.0.0.1/31", &fvs(&[("scope", "global")])).unwrap();
        notifier.notify().unwrap();
    });

    let (mut updated_key, mut event_seen) = (None, false);
    while updated_key.is_none() || !event_seen {
        match reactor.select(Some(Duration::from_secs(2))).unwrap() {
            SelectOutcome::Object { id, .. } if id == subscriber_id => {
                updated_key = Some(subscriber.lock().pop().unwrap().key);
            }
            SelectOutcome::Object { id, .. } => {
                assert_eq!(id, event_id);
                event_seen = true;
            }
            SelectOutcome::Timeout => panic!("timed out, key={updated_key:?} event={event_seen}"),
        }
    }
    worker.join().unwrap();

    assert_eq!(updated_key.as_deref(), Some("Ethernet0|10.0.0.1/31"));
    assert_eq!(event.lock().pending(), 1);
}
