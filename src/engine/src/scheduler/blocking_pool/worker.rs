use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread;
use crossbeam::channel::{Receiver, Sender};
use tracing::{trace, warn};
use crate::error::{Error, Outcome, Result};
use crate::scheduler::blocking_pool::blocking_pool::{Finished, Job};

pub(super) struct Worker {
    index: usize,
    input: Receiver<Job>,
    output: Sender<Finished>,
}

impl Worker {
    pub(super) fn new(index: usize, input: Receiver<Job>, output: Sender<Finished>) -> Self {
        Self { index, input, output }
    }

    pub(super) fn spawn(self) -> Result<()> {
        thread::Builder::new()
            .name(format!("monocle blocking worker {}", self.index))
            .spawn(move || self.run())?;
        Ok(())
    }

    /// Runs jobs until the pool is dropped or the owning loop stops listening.
    fn run(self) {
        while let Ok(job) = self.input.recv() {
            trace!(worker = self.index, key = job.key, "blocking job started");
            let outcome = run_job(job.work);
            if self.output.send((job.key, outcome)).is_err() {
                break;
            }
        }
    }
}

fn run_job(work: impl FnOnce() -> Outcome) -> Outcome {
    match panic::catch_unwind(AssertUnwindSafe(work)) {
        Ok(outcome) => outcome,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!(panic = %message, "blocking job panicked");
            Err(Error::BlockingPanicked(message))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return message.to_string();
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.clone();
    }
    "unknown panic payload".to_string()
}
