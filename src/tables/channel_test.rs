use std::sync::Arc;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use super::*;
use crate::test_utils::mem_connector;
use crate::EventFd;

#[test]
fn test_channel_name_derives_from_table() {
    assert_eq!(
        NotificationChannel::channel_name("PORT_TABLE"),
        "_PORT_TABLE_KEY_QUEUE"
    );

    let db = mem_connector();
    let channel = NotificationChannel::new(&db, "ROUTE_TABLE");
    assert_eq!(channel.name(), "_ROUTE_TABLE_KEY_QUEUE");
}

#[test]
fn test_push_pop_is_fifo_and_coalesces_waiting_keys() {
    let db = mem_connector();
    let channel = NotificationChannel::new(&db, "T");

    assert!(channel.push("a").unwrap());
    assert!(channel.push("b").unwrap());
    assert!(!channel.push("a").unwrap());
    assert_eq!(channel.len().unwrap(), 2);

    let zero = Some(Duration::ZERO);
    assert_eq!(channel.pop_blocking(zero).unwrap().as_deref(), Some("a"));
    assert!(channel.push("a").unwrap());
    assert_eq!(channel.pop_blocking(zero).unwrap().as_deref(), Some("b"));
    assert_eq!(channel.pop_blocking(zero).unwrap().as_deref(), Some("a"));
    assert_eq!(channel.pop_blocking(zero).unwrap(), None);
    assert!(channel.is_empty().unwrap());
}

#[test]
fn test_pop_blocking_times_out() {
    let db = mem_connector();
    let channel = NotificationChannel::new(&db, "T");

    let start = Instant::now();
    assert_eq!(
        channel.pop_blocking(Some(Duration::from_millis(30))).unwrap(),
        None
    );
    assert!(start.elapsed() >= Duration::from_millis(30));
}

#[test]
fn test_pop_blocking_forever_wakes_on_push() {
    let db = mem_connector();
    let channel = NotificationChannel::new(&db, "T");
    let producer = channel.clone();

    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        producer.push("late").unwrap();
    });

    assert_eq!(channel.pop_blocking(None).unwrap().as_deref(), Some("late"));
    handle.join().unwrap();
}

#[test]
fn test_attached_waker_is_signalled_per_push() {
    let db = mem_connector();
    let channel = NotificationChannel::new(&db, "T");
    let waker = Arc::new(EventFd::new().unwrap());
    channel.attach_waker(&waker).unwrap();

    channel.push("a").unwrap();
    channel.push("b").unwrap();

    assert_eq!(waker.drain().unwrap(), 2);
    assert_eq!(waker.drain().unwrap(), 0);
}

#[test]
fn test_channels_of_different_tables_are_isolated() {
    let db = mem_connector();
    let ports = NotificationChannel::new(&db, "PORT_TABLE");
    let vlans = NotificationChannel::new(&db, "VLAN_TABLE");

    ports.push("Ethernet0").unwrap();
    assert_eq!(vlans.pop_blocking(Some(Duration::ZERO)).unwrap(), None);
    assert_eq!(ports.len().unwrap(), 1);
}
