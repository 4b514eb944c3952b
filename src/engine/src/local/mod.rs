pub mod context;
pub mod current;

pub use context::Context;
pub use current::current_context;
