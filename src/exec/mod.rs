/// Action execution: dry-run/live runner over commands and file primitives
pub mod executor;

pub use executor::{build, Executor};
