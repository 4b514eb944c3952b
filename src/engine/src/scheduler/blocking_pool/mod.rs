pub(crate) mod blocking_pool;
mod worker;

pub(crate) use blocking_pool::*;
