use std::time::Duration;
use crossbeam::channel::{self, Receiver, Sender};
use tracing::debug;
use crate::error::{Error, Outcome, Result};
use crate::scheduler::blocking_pool::worker::Worker;

/// A closure to run off the event loop.
pub(crate) type BlockingWork = Box<dyn FnOnce() -> Outcome + Send>;

/// A job sent to the workers. The key identifies the callback waiting for it.
pub(crate) struct Job {
    pub(crate) key: usize,
    pub(crate) work: BlockingWork,
}

/// A finished job: its key and its outcome.
pub(crate) type Finished = (usize, Outcome);

/// Worker threads for the blocking operations of one event loop.
///
/// Only outcomes cross back to the owning thread. Dropping the pool closes the job channel,
/// and the workers exit once they finish what they hold.
pub(crate) struct BlockingPool {
    jobs: Sender<Job>,
    finished: Receiver<Finished>,
}

impl BlockingPool {
    /// Starts `threads` workers (at least one).
    pub(crate) fn start(threads: usize) -> Result<Self> {
        let (jobs, job_receiver) = channel::unbounded();
        let (finished_sender, finished) = channel::unbounded();

        for index in 0..threads.max(1) {
            Worker::new(index, job_receiver.clone(), finished_sender.clone()).spawn()?;
        }
        debug!(threads, "blocking pool started");

        Ok(Self { jobs, finished })
    }

    pub(crate) fn submit(&self, job: Job) -> Result<()> {
        self.jobs
            .send(job)
            .map_err(|_| Error::raise("the blocking pool has shut down"))
    }

    /// Returns every job that has finished so far, without waiting.
    pub(crate) fn try_finished(&self) -> Vec<Finished> {
        self.finished.try_iter().collect()
    }

    /// Waits for the next finished job for at most `timeout`.
    pub(crate) fn finished_timeout(&self, timeout: Duration) -> Option<Finished> {
        self.finished.recv_timeout(timeout).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn job(key: usize, work: impl FnOnce() -> Outcome + Send + 'static) -> Job {
        Job { key, work: Box::new(work) }
    }

    #[test]
    fn test_jobs_come_back_with_their_keys() {
        let pool = BlockingPool::start(2).unwrap();
        for key in 0..4 {
            pool.submit(job(key, move || Ok(json!(key * 10)))).unwrap();
        }

        let mut finished: Vec<Finished> = (0..4)
            .map(|_| pool.finished_timeout(Duration::from_secs(5)).expect("job must finish"))
            .collect();
        finished.sort_by_key(|(key, _)| *key);

        assert_eq!(
            finished,
            vec![(0, Ok(json!(0))), (1, Ok(json!(10))), (2, Ok(json!(20))), (3, Ok(json!(30)))]
        );
        assert!(pool.try_finished().is_empty());
    }

    #[test]
    fn test_panicking_job_does_not_kill_the_worker() {
        let pool = BlockingPool::start(1).unwrap();
        pool.submit(job(0, || panic!("boom"))).unwrap();
        pool.submit(job(1, || Ok(json!("alive")))).unwrap();

        let first = pool.finished_timeout(Duration::from_secs(5)).unwrap();
        let second = pool.finished_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(first, (0, Err(Error::BlockingPanicked("boom".to_string()))));
        assert_eq!(second, (1, Ok(json!("alive"))));
    }
}
