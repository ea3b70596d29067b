/// Cleanup policy: protected-path matching and the mode matrix
pub mod mode_policy;
pub mod path_guard;

pub use mode_policy::ModePolicy;
pub use path_guard::PathGuard;
