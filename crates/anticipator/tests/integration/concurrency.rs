use std::collections::BTreeSet;
use std::sync::{Arc, Barrier};
use std::thread;

use anticipator_test::{Constant, Instances};

use crate::{TIMEOUT, setup_anticipator, wait_until};

#[test]
fn test_concurrent_takes_are_distinct() {
    const THREADS: usize = 16;

    let anticipator = Arc::new(setup_anticipator());
    let key = Instances::new(1);

    for _ in 0..THREADS {
        anticipator.anticipate_allocation(key.clone()).unwrap();
    }
    assert!(wait_until(TIMEOUT, || {
        anticipator.allocation_heap().pooled(&key) == THREADS
    }));

    let barrier = Arc::new(Barrier::new(THREADS));
    let takers: Vec<_> = (0..THREADS)
        .map(|_| {
            let anticipator = Arc::clone(&anticipator);
            let barrier = Arc::clone(&barrier);
            let key = key.clone();
            thread::spawn(move || {
                barrier.wait();
                anticipator.allocate(&key).unwrap()
            })
        })
        .collect();

    let taken: Vec<_> = takers.into_iter().map(|t| t.join().unwrap()).collect();
    let serials: BTreeSet<_> = taken.iter().map(|instance| instance.serial).collect();

    assert_eq!(serials, (0..THREADS).collect());
    assert_eq!(key.created(), THREADS);
    assert!(anticipator.allocation_heap().is_empty());
}

#[test]
fn test_readers_race_with_worker() {
    const KEYS: u64 = 200;

    let anticipator = Arc::new(setup_anticipator());
    let keys: Vec<_> = (0..KEYS)
        .map(|i| Constant::new(format!("key-{i}"), i * 3))
        .collect();

    for key in &keys {
        anticipator.anticipate_value(key.clone()).unwrap();
    }

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let anticipator = Arc::clone(&anticipator);
            let keys = keys.clone();
            thread::spawn(move || {
                for key in keys.iter().rev() {
                    assert_eq!(anticipator.get_value(key).unwrap(), key.value);
                }
            })
        })
        .collect();
    for reader in readers {
        reader.join().unwrap();
    }

    assert!(wait_until(TIMEOUT, || {
        anticipator.value_cache().len() == KEYS as usize
    }));
    for key in &keys {
        assert_eq!(anticipator.get_value(key).unwrap(), key.value);
    }
}

#[test]
fn test_anticipate_from_many_threads() {
    let anticipator = Arc::new(setup_anticipator());
    let key = Instances::new(9);

    let producers: Vec<_> = (0..4)
        .map(|_| {
            let anticipator = Arc::clone(&anticipator);
            let key = key.clone();
            thread::spawn(move || {
                for _ in 0..25 {
                    anticipator.anticipate_allocation(key.clone()).unwrap();
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }

    assert!(wait_until(TIMEOUT, || {
        anticipator.allocation_heap().pooled(&key) == 100
    }));
    assert_eq!(key.created(), 100);
}
