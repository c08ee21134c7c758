use std::time::{Duration, Instant};

use anticipator::{Anticipatable, ScheduleError, WorkerScheduler};
use anticipator_test::{Constant, Failing, Instances, Panicking, Slow, TestError};

use crate::{TIMEOUT, setup_anticipator, wait_until};

#[test]
fn test_never_anticipated_computes_inline() {
    let anticipator = setup_anticipator();
    let key = Constant::new("answer", 42);

    let direct = key.compute().unwrap();
    assert_eq!(anticipator.get_value(&key).unwrap(), direct);
    assert_eq!(key.calls(), 2);

    // misses never fill the cache
    anticipator.get_value(&key).unwrap();
    assert_eq!(key.calls(), 3);
    assert!(anticipator.value_cache().is_empty());
}

#[test]
fn test_anticipated_value_is_computed_once() {
    let anticipator = setup_anticipator();
    let key = Constant::new("sdk_version", 42);

    anticipator.anticipate_value(key.clone()).unwrap();
    assert!(wait_until(TIMEOUT, || anticipator.value_cache().contains(&key)));

    for _ in 0..5 {
        assert_eq!(anticipator.get_value(&key).unwrap(), 42);
    }
    assert_eq!(key.calls(), 1);
}

#[test]
fn test_first_anticipation_wins() {
    let anticipator = setup_anticipator();
    let first = Constant::new("theme", 1);
    let second = Constant::new("theme", 2);
    let marker = Constant::new("marker", 0);

    anticipator.anticipate_value(first.clone()).unwrap();
    anticipator.anticipate_value(second.clone()).unwrap();
    anticipator.anticipate_value(marker.clone()).unwrap();

    // jobs run in order, so both anticipations are done once the marker is there
    assert!(wait_until(TIMEOUT, || anticipator.value_cache().contains(&marker)));

    assert_eq!(first.calls(), 1);
    assert_eq!(second.calls(), 1);
    assert_eq!(anticipator.value_cache().len(), 2);
    assert_eq!(anticipator.get_value(&second).unwrap(), 1);
}

#[test]
fn test_allocation_heap_drains() {
    let anticipator = setup_anticipator();
    let key = Instances::new(1);

    for _ in 0..3 {
        anticipator.anticipate_allocation(key.clone()).unwrap();
    }
    assert!(wait_until(TIMEOUT, || {
        anticipator.allocation_heap().pooled(&key) == 3
    }));

    let mut serials: Vec<_> = (0..3)
        .map(|_| anticipator.allocate(&key).unwrap().serial)
        .collect();
    serials.sort_unstable();
    assert_eq!(serials, vec![0, 1, 2]);
    assert_eq!(key.created(), 3);

    // the pool is empty, so this one is built inline
    let fresh = anticipator.allocate(&key).unwrap();
    assert_eq!(fresh.serial, 3);
    assert_eq!(key.created(), 4);
}

#[test]
fn test_failures_do_not_stop_the_worker() {
    let anticipator = setup_anticipator();
    let failing = Failing::new(7);
    let after = Constant::new("after", 5);

    anticipator.anticipate_value(failing.clone()).unwrap();
    anticipator.anticipate_allocation(Panicking(8)).unwrap();
    anticipator.anticipate_value(after.clone()).unwrap();

    assert!(wait_until(TIMEOUT, || anticipator.value_cache().contains(&after)));
    assert_eq!(failing.calls(), 1);
    assert!(!anticipator.value_cache().contains(&failing));
    assert!(anticipator.allocation_heap().is_empty());

    // the failure surfaces once the value is requested inline
    assert!(matches!(anticipator.get_value(&failing), Err(TestError(7))));
    assert_eq!(failing.calls(), 2);
    assert_eq!(anticipator.get_value(&after).unwrap(), 5);
}

#[test]
fn test_dispose_runs_pending_anticipations() {
    let anticipator = setup_anticipator();
    let key = Constant::new("sdk_version", 42);

    anticipator.anticipate_value(key.clone()).unwrap();

    let start = Instant::now();
    assert_eq!(anticipator.dispose(), 1);
    assert!(start.elapsed() < Duration::from_secs(30));
    assert_eq!(key.calls(), 1);

    // the cache is gone, values are computed inline from now on
    assert_eq!(anticipator.get_value(&key).unwrap(), 42);
    assert_eq!(key.calls(), 2);

    assert!(matches!(
        anticipator.anticipate_value(key.clone()),
        Err(ScheduleError::Joined)
    ));
}

#[test]
fn test_dispose_drops_unclaimed_allocations() {
    let anticipator = setup_anticipator();
    let key = Instances::new(2);

    for _ in 0..4 {
        anticipator.anticipate_allocation(key.clone()).unwrap();
    }
    assert!(wait_until(TIMEOUT, || {
        anticipator.allocation_heap().pooled(&key) == 4
    }));
    let claimed = anticipator.allocate(&key).unwrap();

    drop(anticipator);
    assert_eq!(key.drops(), 3);

    drop(claimed);
    assert_eq!(key.drops(), 4);
}

#[test]
fn test_anticipations_after_idle_exit() {
    anticipator_test::setup();
    let scheduler = WorkerScheduler::new("anticipator-idle", Duration::from_millis(20));
    let anticipator = anticipator::Anticipator::with_scheduler(Box::new(scheduler));
    let early = Constant::new("early", 1);
    let late = Constant::new("late", 2);

    anticipator.anticipate_value(early.clone()).unwrap();
    assert!(wait_until(TIMEOUT, || anticipator.value_cache().contains(&early)));

    // long enough for the worker to give up waiting
    std::thread::sleep(Duration::from_millis(100));

    anticipator.anticipate_value(late.clone()).unwrap();
    assert!(wait_until(TIMEOUT, || anticipator.value_cache().contains(&late)));
    assert_eq!(anticipator.get_value(&late).unwrap(), 2);
    assert_eq!(late.calls(), 1);
}

#[test]
fn test_retrieval_does_not_wait_for_worker() {
    let anticipator = setup_anticipator();
    let blocker = Slow::new(1, Duration::from_millis(500));
    let key = Constant::new("queued", 3);

    anticipator.anticipate_value(blocker.clone()).unwrap();
    anticipator.anticipate_value(key.clone()).unwrap();

    // the worker is still busy with the blocker, so this is computed inline
    let start = Instant::now();
    assert_eq!(anticipator.get_value(&key).unwrap(), 3);
    assert!(start.elapsed() < Duration::from_millis(500));

    assert!(wait_until(TIMEOUT, || anticipator.value_cache().contains(&key)));
    assert_eq!(key.calls(), 2);
    assert_eq!(blocker.calls(), 1);
}
