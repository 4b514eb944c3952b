use std::str::FromStr;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use crate::error::{Error, Result};

/// The name of the environment variable read by [`SchedulerCfg::from_env`] for the blocking pool size.
pub const BLOCKING_THREADS_ENV: &str = "MONOCLE_BLOCKING_THREADS";
/// The name of the environment variable read by [`SchedulerCfg::from_env`] for the park bound, in milliseconds.
pub const MAX_PARK_MS_ENV: &str = "MONOCLE_MAX_PARK_MS";

/// Process-wide settings of the event loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerCfg {
    blocking_threads: usize,
    max_park: Duration,
}

impl SchedulerCfg {
    pub const fn default() -> Self {
        Self {
            blocking_threads: 4,
            max_park: Duration::from_millis(50),
        }
    }

    /// Reads the settings from `MONOCLE_BLOCKING_THREADS` and `MONOCLE_MAX_PARK_MS`.
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut cfg = Self::default();
        if let Some(threads) = parse::<usize>(BLOCKING_THREADS_ENV, lookup(BLOCKING_THREADS_ENV))? {
            cfg = cfg.with_blocking_threads(threads);
        }
        if let Some(ms) = parse::<u64>(MAX_PARK_MS_ENV, lookup(MAX_PARK_MS_ENV))? {
            cfg = cfg.with_max_park(Duration::from_millis(ms));
        }
        Ok(cfg)
    }

    /// Sets the number of blocking pool workers. It is never less than 1.
    pub fn with_blocking_threads(mut self, threads: usize) -> Self {
        self.blocking_threads = threads.max(1);
        self
    }

    /// Sets how long an idle loop waits before checking its timers again.
    pub fn with_max_park(mut self, max_park: Duration) -> Self {
        self.max_park = max_park;
        self
    }

    pub fn blocking_threads(&self) -> usize {
        self.blocking_threads
    }

    pub fn max_park(&self) -> Duration {
        self.max_park
    }
}

fn parse<T: FromStr>(name: &str, raw: Option<String>) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    let Some(raw) = raw else {
        return Ok(None);
    };
    raw.trim()
        .parse()
        .map(Some)
        .map_err(|err| Error::Conversion(format!("{name}={raw:?}: {err}")))
}

static SCHEDULER_CFG: RwLock<SchedulerCfg> = RwLock::new(SchedulerCfg::default());

/// Returns the current settings.
pub fn config() -> SchedulerCfg {
    *SCHEDULER_CFG.read().unwrap_or_else(PoisonError::into_inner)
}

/// Replaces the settings. A blocking pool that has already started keeps its size.
pub fn set_config(config: SchedulerCfg) {
    *SCHEDULER_CFG.write().unwrap_or_else(PoisonError::into_inner) = config;
}

/// Sets the size of blocking pools started from now on. At least one thread is used.
pub fn set_blocking_threads(threads: usize) {
    set_config(config().with_blocking_threads(threads));
}

/// Sets how long the event loop may park without checking its timers.
pub fn set_max_park(max_park: Duration) {
    set_config(config().with_max_park(max_park));
}
