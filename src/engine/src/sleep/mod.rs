use std::cmp::Ordering;
use std::time::{Duration, Instant};
use serde_json::Value;
use crate::callback::CallbackSlot;
use crate::scheduler::{set_timeout, Task};

/// The deadline of a timer whose duration does not fit in an [`Instant`]. It never comes due in practice.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// A timer task. Ordered by deadline, then by registration.
pub(crate) struct SleepingTask {
    pub(crate) execution_time: Instant,
    seq: u64,
    pub(crate) task: Task,
}

impl SleepingTask {
    pub(crate) fn new(dur: Duration, seq: u64, task: Task) -> Self {
        let now = Instant::now();
        Self {
            execution_time: now.checked_add(dur).unwrap_or_else(|| now + FAR_FUTURE),
            seq,
            task,
        }
    }

    fn key(&self) -> (Instant, u64) {
        (self.execution_time, self.seq)
    }
}

impl PartialEq for SleepingTask {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for SleepingTask {}

impl PartialOrd for SleepingTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SleepingTask {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

/// Returns a slot that fires with `null` once `dur` has passed.
///
/// # Example
///
/// ```ignore
/// co.wait(sleep(Duration::from_millis(500))).await?;
/// ```
pub fn sleep(dur: Duration) -> CallbackSlot {
    let slot = CallbackSlot::new();
    let completion = slot.callback();
    set_timeout(dur, move || {
        completion.ok(Value::Null);
    });
    slot
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{block_on, run};

    #[test]
    fn test_ordering() {
        let first = SleepingTask::new(Duration::from_millis(5), 1, Box::new(|| {}));
        let mut second = SleepingTask::new(Duration::ZERO, 0, Box::new(|| {}));
        second.execution_time = first.execution_time;
        assert!(second < first);
    }

    #[test]
    fn test_huge_duration_never_comes_due() {
        let task = SleepingTask::new(Duration::MAX, 0, Box::new(|| {}));
        assert!(task.execution_time >= Instant::now() + Duration::from_secs(86400 * 365));

        set_timeout(Duration::from_secs(u64::MAX), || panic!("a timer this far out must not fire"));
        let unit = run(|co| async move {
            let _forever = sleep(Duration::MAX);
            co.wait(sleep(Duration::from_millis(5))).await
        });
        assert_eq!(block_on(unit), Ok(Value::Null));
    }

    #[test]
    fn test_sleep_does_not_fire_early() {
        let started = Instant::now();
        let unit = run(|co| async move {
            co.wait(sleep(Duration::from_millis(50))).await?;
            Ok(Value::from(started.elapsed().as_millis() as u64))
        });

        let elapsed = block_on(unit).unwrap().as_u64().unwrap();
        assert!(elapsed >= 50);
    }
}
