use std::cell::RefCell;
use std::collections::{BTreeSet, VecDeque};
use std::mem;
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};
use serde_json::Value;
use slab::Slab;
use tracing::trace;
use crate::callback::{Callback, CallbackSlot, Unit};
use crate::cfg::config;
use crate::error::{Error, Outcome};
use crate::scheduler::blocking_pool::{BlockingPool, BlockingWork, Job};
use crate::sleep::SleepingTask;

/// A piece of work queued on the event loop.
pub(crate) type Task = Box<dyn FnOnce()>;

thread_local! {
    /// [`Scheduler`] for the current thread. It is created on first use.
    ///
    /// This is thread-local, so it can be used without synchronization.
    static LOCAL_SCHEDULER: RefCell<Scheduler> = RefCell::new(Scheduler::new());
}

/// The event loop of one thread. Specifically, it:
///
/// - queues tasks for the next turn;
///
/// - stores timers and monitors the time until they need to fire;
///
/// - owns the blocking pool and routes finished jobs back to their callbacks.
pub(crate) struct Scheduler {
    task_queue: VecDeque<Task>,
    sleeping: BTreeSet<SleepingTask>,
    next_seq: u64,
    blocking_pool: Option<BlockingPool>,
    in_flight: Slab<Callback>,
}

/// What one turn of the loop did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Turn {
    /// Some tasks ran or some callbacks fired.
    Ran,
    /// Nothing was ready, the thread waited for a timer or a blocking job.
    Parked,
    /// Nothing is queued, sleeping or in flight.
    Idle,
}

impl Scheduler {
    fn new() -> Self {
        Self {
            task_queue: VecDeque::with_capacity(8),
            sleeping: BTreeSet::new(),
            next_seq: 0,
            blocking_pool: None,
            in_flight: Slab::new(),
        }
    }

    /// Stores the task to run it on the next turn.
    fn sched(&mut self, task: Task) {
        self.task_queue.push_back(task);
    }

    fn sleep(&mut self, dur: Duration, task: Task) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.sleeping.insert(SleepingTask::new(dur, seq, task));
    }

    /// Moves the timers that are due to the task queue, in deadline then registration order.
    fn awake_sleeping(&mut self) {
        let now = Instant::now();
        while let Some(sleeping_task) = self.sleeping.pop_first() {
            if now >= sleeping_task.execution_time {
                self.sched(sleeping_task.task);
            } else {
                self.sleeping.insert(sleeping_task);
                break;
            }
        }
    }

    fn submit_blocking(&mut self, completion: Callback, work: BlockingWork) -> Result<(), (Callback, Error)> {
        let pool = match self.blocking_pool.take() {
            Some(pool) => pool,
            None => match BlockingPool::start(config().blocking_threads()) {
                Ok(pool) => pool,
                Err(err) => return Err((completion, err)),
            },
        };

        let key = self.in_flight.insert(completion);
        let submitted = pool.submit(Job { key, work });
        self.blocking_pool = Some(pool);

        submitted.map_err(|err| (self.in_flight.remove(key), err))
    }

    /// Takes the finished blocking jobs together with the callbacks waiting for them.
    fn take_finished(&mut self) -> Vec<(Callback, Outcome)> {
        let Some(pool) = self.blocking_pool.as_ref() else {
            return Vec::new();
        };

        pool.try_finished()
            .into_iter()
            .filter_map(|(key, outcome)| Some((self.in_flight.try_remove(key)?, outcome)))
            .collect()
    }

    fn is_idle(&self) -> bool {
        self.task_queue.is_empty() && self.sleeping.is_empty() && self.in_flight.is_empty()
    }

    /// Waits until the next timer is due or a blocking job finishes, at most for `max_park`.
    fn park(&mut self, max_park: Duration) -> Option<(Callback, Outcome)> {
        let timeout = match self.sleeping.first() {
            Some(next) => next.execution_time.saturating_duration_since(Instant::now()).min(max_park),
            None => max_park,
        };
        trace!(?timeout, in_flight = self.in_flight.len(), "event loop parked");

        match self.blocking_pool.as_ref() {
            Some(pool) if !self.in_flight.is_empty() => {
                let (key, outcome) = pool.finished_timeout(timeout)?;
                Some((self.in_flight.try_remove(key)?, outcome))
            }
            _ => {
                thread::sleep(timeout);
                None
            }
        }
    }
}

fn with_scheduler<R>(f: impl FnOnce(&mut Scheduler) -> R) -> R {
    LOCAL_SCHEDULER.with(|scheduler| f(&mut scheduler.borrow_mut()))
}

/// Runs one turn of the loop. The scheduler is never borrowed while tasks run or callbacks fire,
/// so both may schedule more work.
fn turn() -> Turn {
    let (tasks, finished) = with_scheduler(|scheduler| {
        scheduler.awake_sleeping();
        (mem::take(&mut scheduler.task_queue), scheduler.take_finished())
    });

    if !tasks.is_empty() || !finished.is_empty() {
        for (completion, outcome) in finished {
            completion.complete(outcome);
        }
        for task in tasks {
            task();
        }
        return Turn::Ran;
    }

    let max_park = config().max_park();
    let parked = with_scheduler(|scheduler| {
        if scheduler.is_idle() {
            return Err(Turn::Idle);
        }
        Ok(scheduler.park(max_park))
    });

    match parked {
        Err(turn) => turn,
        Ok(Some((completion, outcome))) => {
            completion.complete(outcome);
            Turn::Ran
        }
        Ok(None) => Turn::Parked,
    }
}

/// Queues `task` to run on the next turn of the event loop.
pub fn defer(task: impl FnOnce() + 'static) {
    with_scheduler(|scheduler| scheduler.sched(Box::new(task)));
}

/// Runs `task` once, at least `dur` later. Timers with equal deadlines fire in registration order.
pub fn set_timeout(dur: Duration, task: impl FnOnce() + 'static) {
    with_scheduler(|scheduler| scheduler.sleep(dur, Box::new(task)));
}

/// A slot that fires on the next turn of the event loop.
pub(crate) fn next_turn() -> CallbackSlot {
    let slot = CallbackSlot::new();
    let completion = slot.callback();
    defer(move || {
        completion.ok(Value::Null);
    });
    slot
}

/// Runs `work` on the blocking pool and returns a slot that fires with its outcome.
///
/// The pool is started on first use with [`blocking_threads`](crate::cfg::SchedulerCfg::blocking_threads) workers.
/// A panicking job fires the slot with [`Error::BlockingPanicked`].
///
/// # Example
///
/// ```ignore
/// let contents = co.wait(spawn_blocking(|| Ok(Value::from(std::fs::read_to_string("config.json")?)))).await?;
/// ```
pub fn spawn_blocking<F>(work: F) -> CallbackSlot
where
    F: FnOnce() -> Outcome + Send + 'static,
{
    let slot = CallbackSlot::new();
    let rejected = with_scheduler(|scheduler| scheduler.submit_blocking(slot.callback(), Box::new(work)));
    if let Err((completion, err)) = rejected {
        completion.err(err);
    }

    slot
}

/// Turns the event loop until nothing is queued, sleeping or in flight.
pub fn run_until_idle() {
    while turn() != Turn::Idle {}
}

/// Turns the event loop until `unit` completes, and returns its outcome.
///
/// Returns [`Error::Stalled`] if the loop goes idle while the unit is still pending:
/// nothing left could ever complete it.
pub fn block_on(unit: Unit) -> Outcome {
    let result: Rc<RefCell<Option<Outcome>>> = Rc::default();
    let result_ref = result.clone();
    unit.then(move |outcome| *result_ref.borrow_mut() = Some(outcome));

    loop {
        if let Some(outcome) = result.borrow_mut().take() {
            return outcome;
        }
        if turn() == Turn::Idle {
            return result.borrow_mut().take().unwrap_or(Err(Error::Stalled));
        }
    }
}
