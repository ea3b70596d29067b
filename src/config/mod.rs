/// Configuration and shared type definitions
pub mod run_config;
pub mod types;

pub use run_config::RunConfig;
pub use types::{
    ActionOutcome, AuditLevel, CleanupAction, ConsoleTier, Mode, Resource, ResourceKind, Result,
    SweepError,
};
