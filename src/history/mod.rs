/// Shell-history reconciliation: live-session discovery and atomic rewrite
pub mod reconciler;
pub mod sessions;

pub use reconciler::{HistoryReconciler, HistoryUser};
pub use sessions::{discover_sessions, ShellSession};
