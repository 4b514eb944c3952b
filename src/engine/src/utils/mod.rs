pub mod sink;

pub use sink::{reset_unobserved_hook, set_unobserved_hook};
