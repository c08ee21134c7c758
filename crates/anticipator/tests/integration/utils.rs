use std::time::Duration;

use anticipator::{Anticipator, WorkerScheduler};
use anticipator_test as test;

pub use test::wait_until;

/// How long tests wait for background anticipations before giving up.
pub const TIMEOUT: Duration = Duration::from_secs(10);

/// Setup tests and create an anticipator with a background worker.
///
/// The worker is given a generous idle timeout, so it does not exit in the middle of a test.
pub fn setup_anticipator() -> Anticipator {
    test::setup();
    let scheduler = WorkerScheduler::new("anticipator-test", Duration::from_secs(60));
    Anticipator::with_scheduler(Box::new(scheduler))
}
