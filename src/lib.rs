//! syssweep: a privileged maintenance agent for transient system state
//!
//! Removes logs, caches, temporary files and shell command history under
//! operator-selected modes, while guaranteeing a fixed set of protected
//! paths is never touched.
//!
//! # Architecture
//!
//! The crate is organized by concern, leaves first:
//!
//! ## Policy ([`policy`])
//! - [`policy::path_guard`]: protected-path matcher (segment-wise, fail-safe)
//! - [`policy::mode_policy`]: mode × resource action matrix
//!
//! ## Execution ([`exec`])
//! - [`exec::executor`]: dry-run/live runner over commands and file
//!   primitives (truncate, delete, keep-last rewrite, secure erase)
//!
//! ## Observability ([`observability`])
//! - [`observability::audit`]: line-oriented audit trail with per-mode
//!   console tiers; never created in ghost mode
//!
//! ## History ([`history`])
//! - [`history::sessions`]: live interactive-shell discovery via /proc
//! - [`history::reconciler`]: flush-signal + grace + atomic-rename trim
//!
//! ## External collaborators ([`external`])
//! - [`external::backup`]: timestamped export of logs and root history
//! - [`external::packages`]: native package-manager cache cleaning
//! - [`external::services`]: logging-daemon restarts
//!
//! ## Campaign ([`campaign`])
//! - [`campaign::orchestrator`]: the fixed-order sweep sequence and the
//!   ghost-mode self-teardown
//!
//! # Design principles
//!
//! 1. **Protection before policy** - the path guard overrides every mode
//! 2. **Best effort, never abort** - one failing resource is a warning
//! 3. **Atomic rewrites** - no reader ever sees a half-written history file
//! 4. **One immutable config** - no ambient mode globals
//! 5. **Idempotent actions** - re-running converges, never errors

pub mod campaign;
pub mod cli;
pub mod config;
pub mod exec;
pub mod external;
pub mod history;
pub mod observability;
pub mod policy;
