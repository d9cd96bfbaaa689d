use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;

use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use state_relay::FieldValue;
use state_relay::Operation;
use state_relay::ProducerStateTable;
use state_relay::SubscriberStateTable;
use state_relay::Table;
use state_relay::APP_PORT_TABLE_NAME;
use state_relay::APP_ROUTE_TABLE_NAME;
use state_relay::APPL_DB;

use crate::commons::connector;
use crate::commons::fvs;
use crate::commons::key;
use crate::commons::last_observations;
use crate::commons::run_consumer;

const KEYS: usize = 1000;

/// Test: 1000 keys set then deleted while one consumer drains concurrently
///
/// Scenario:
/// - producer sets 1000 distinct keys, then deletes all of them
/// - a single consumer runs its reactor the whole time
/// - SET count <= DEL count <= 1000, one DEL per key, every key ends as DEL
#[test]
fn test_set_then_delete_thousand_keys() {
    let db = connector(APPL_DB);
    let producer = ProducerStateTable::new(&db, APP_PORT_TABLE_NAME);
    let subscriber = SubscriberStateTable::new(&db, APP_PORT_TABLE_NAME).unwrap();
    let done = Arc::new(AtomicBool::new(false));

    let consumer = {
        let done = done.clone();
        thread::spawn(move || run_consumer(subscriber, done))
    };

    for i in 0..KEYS {
        producer
            .set(&key(i), &fvs(&[("admin_status", "up"), ("mtu", "9100")]))
            .unwrap();
    }
    for i in 0..KEYS {
        producer.del(&key(i)).unwrap();
    }
    done.store(true, Ordering::Release);

    let observed = consumer.join().unwrap();
    let sets = observed.iter().filter(|k| k.op == Operation::Set).count();
    let dels: Vec<&str> = observed
        .iter()
        .filter(|k| k.op == Operation::Del)
        .map(|k| k.key.as_str())
        .collect();

    assert!(sets <= dels.len(), "sets={sets} dels={}", dels.len());
    assert!(dels.len() <= KEYS);

    let distinct: HashSet<&str> = dels.iter().copied().collect();
    assert_eq!(distinct.len(), dels.len(), "a key was deleted twice");

    let last = last_observations(&observed);
    assert_eq!(last.len(), KEYS);
    for i in 0..KEYS {
        let kofv = &last[&key(i)];
        assert!(kofv.is_del(), "{} ended as {}", kofv.key, kofv.op);
        assert!(kofv.fields.is_empty());
    }
    assert!(Table::new(&db, APP_PORT_TABLE_NAME).get_keys().unwrap().is_empty());
}

/// Mirror of the producer's writes: current record per key and every
/// non-empty state each record went through
#[derive(Default)]
struct RecordModel {
    current: HashMap<String, Vec<FieldValue>>,
    history: HashMap<String, Vec<Vec<FieldValue>>>,
}

impl RecordModel {
    fn merge(
        &mut self,
        key: &str,
        fields: &[FieldValue],
    ) {
        let record = self.current.entry(key.to_string()).or_default();
        for (field, value) in fields {
            match record.iter_mut().find(|(f, _)| f == field) {
                Some(existing) => existing.1 = value.clone(),
                None => record.push((field.clone(), value.clone())),
            }
        }
        self.snapshot(key);
    }

    fn delete_field(
        &mut self,
        key: &str,
        field: &str,
    ) {
        if let Some(record) = self.current.get_mut(key) {
            record.retain(|(f, _)| f != field);
            if record.is_empty() {
                self.current.remove(key);
            }
        }
        self.snapshot(key);
    }

    fn delete(
        &mut self,
        key: &str,
    ) {
        self.current.remove(key);
    }

    fn snapshot(
        &mut self,
        key: &str,
    ) {
        if let Some(record) = self.current.get(key) {
            self.history
                .entry(key.to_string())
                .or_default()
                .push(record.clone());
        }
    }

    fn held(
        &self,
        key: &str,
        fields: &[FieldValue],
    ) -> bool {
        self.history
            .get(key)
            .is_some_and(|states| states.iter().any(|state| state == fields))
    }
}

/// Test: Every observation is a state the store really held, and the last
/// observation of every key matches the store's final state
///
/// Scenario:
/// - producer performs random merges, field deletes and deletes over a small
///   key space while the consumer drains concurrently
/// - the writes are mirrored into a model recording each record's history
/// - every SET carries exactly one of the key's historical records
/// - after the run, the last observation per key equals the final record
#[test]
fn test_random_writes_converge_to_final_state() {
    let db = connector(APPL_DB);
    let producer = ProducerStateTable::new(&db, APP_ROUTE_TABLE_NAME);
    let subscriber = SubscriberStateTable::new(&db, APP_ROUTE_TABLE_NAME).unwrap();
    let done = Arc::new(AtomicBool::new(false));

    let consumer = {
        let done = done.clone();
        thread::spawn(move || run_consumer(subscriber, done))
    };

    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut model = RecordModel::default();
    let mut touched = HashSet::new();
    for round in 0..3000 {
        let k = key(rng.gen_range(0..20));
        touched.insert(k.clone());
        let field = format!("f{}", rng.gen_range(0..3));
        match rng.gen_range(0..10) {
            0..=5 => {
                let fields = fvs(&[(field.as_str(), round.to_string().as_str())]);
                producer.set(&k, &fields).unwrap();
                model.merge(&k, &fields);
            }
            6 => {
                producer.del_fields(&k, &[field.clone()]).unwrap();
                model.delete_field(&k, &field);
            }
            _ => {
                producer.del(&k).unwrap();
                model.delete(&k);
            }
        }
    }
    done.store(true, Ordering::Release);

    let observed = consumer.join().unwrap();
    for kofv in &observed {
        if kofv.is_set() {
            assert!(
                model.held(&kofv.key, &kofv.fields),
                "SET {} {:?} was never stored",
                kofv.key,
                kofv.fields
            );
        }
    }

    let table = Table::new(&db, APP_ROUTE_TABLE_NAME);
    let last = last_observations(&observed);
    for k in &touched {
        let kofv = &last[k];
        let stored = table.get(k).unwrap();
        assert_eq!(stored.as_ref(), model.current.get(k));
        match stored {
            Some(fields) => {
                assert!(kofv.is_set(), "{k} should be SET");
                assert_eq!(kofv.fields, fields);
            }
            None => assert!(kofv.is_del(), "{k} should be DEL"),
        }
    }
}
