use std::collections::HashSet;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;

use state_relay::KeyOpFieldsValues;
use state_relay::ProducerStateTable;
use state_relay::SubscriberStateTable;
use state_relay::CONFIG_DB;

use crate::commons::connector;
use crate::commons::fvs;
use crate::commons::key;
use crate::commons::run_consumer;

const KEYS: usize = 1000;

fn deleted_keys(observed: &[KeyOpFieldsValues]) -> HashSet<String> {
    observed
        .iter()
        .filter(|k| k.is_del())
        .map(|k| k.key.clone())
        .collect()
}

/// Test: Competing consumers partition the channel
///
/// Scenario:
/// - two consumers of the same table, each in its own thread and reactor
/// - producer sets then deletes 1000 keys
/// - the union of DEL keys is exactly the deleted keys, and no key is
///   reported deleted by both consumers
#[test]
fn test_two_consumers_partition_deletes() {
    let db = connector(CONFIG_DB);
    assert_eq!(db.separator(), "|");

    let producer = ProducerStateTable::new(&db, "VLAN");
    let done = Arc::new(AtomicBool::new(false));

    let consumers: Vec<_> = (0..2)
        .map(|_| {
            let subscriber = SubscriberStateTable::new(&db, "VLAN").unwrap();
            let done = done.clone();
            thread::spawn(move || run_consumer(subscriber, done))
        })
        .collect();

    for i in 0..KEYS {
        producer.set(&key(i), &fvs(&[("vlanid", "10")])).unwrap();
    }
    for i in 0..KEYS {
        producer.del(&key(i)).unwrap();
    }
    done.store(true, Ordering::Release);

    let results: Vec<Vec<KeyOpFieldsValues>> =
        consumers.into_iter().map(|c| c.join().unwrap()).collect();
    let first = deleted_keys(&results[0]);
    let second = deleted_keys(&results[1]);

    assert!(first.is_disjoint(&second), "a key was reported by both consumers");

    let union: HashSet<String> = first.union(&second).cloned().collect();
    let expected: HashSet<String> = (0..KEYS).map(key).collect();
    assert_eq!(union, expected);
    assert_eq!(
        results.iter().map(|r| r.iter().filter(|k| k.is_del()).count()).sum::<usize>(),
        KEYS
    );
}
