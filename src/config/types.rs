/// Core types and structures for the syssweep system
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Operating mode selecting verbosity, destructiveness and history retention.
///
/// Modes form a total destructiveness order: each mode implies everything the
/// modes below it do. Dry-run is not a mode; it is an orthogonal modifier on
/// [`crate::config::run_config::RunConfig`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Mode {
    Standard,
    Stealth,
    StealthMax,
    Ghost,
}

impl Mode {
    /// True if this mode is at least as aggressive as `other`.
    pub fn at_least(self, other: Mode) -> bool {
        self >= other
    }

    /// Ghost runs leave no audit trail at all.
    pub fn audit_enabled(self) -> bool {
        self != Mode::Ghost
    }

    /// Console verbosity tier for this mode.
    pub fn console_tier(self) -> ConsoleTier {
        match self {
            Mode::Standard => ConsoleTier::All,
            Mode::Stealth | Mode::StealthMax => ConsoleTier::ErrorsOnly,
            Mode::Ghost => ConsoleTier::Silent,
        }
    }

    /// Resolve the active mode from independently toggled flags.
    /// Ghost implies StealthMax implies Stealth.
    pub fn from_flags(stealth: bool, stealth_max: bool, ghost: bool) -> Mode {
        if ghost {
            Mode::Ghost
        } else if stealth_max {
            Mode::StealthMax
        } else if stealth {
            Mode::Stealth
        } else {
            Mode::Standard
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Standard => "standard",
            Mode::Stealth => "stealth",
            Mode::StealthMax => "stealth-max",
            Mode::Ghost => "ghost",
        };
        write!(f, "{}", name)
    }
}

/// How much of the run is echoed to the operator's console.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsoleTier {
    /// Every audit level is echoed (Standard).
    All,
    /// Only errors reach the console (Stealth, StealthMax).
    ErrorsOnly,
    /// Nothing is echoed; errors go straight to stderr (Ghost).
    Silent,
}

/// Kinds of cleanup targets the policy engine knows about.
///
/// The enum is closed on purpose: resolving an action for an unknown kind is
/// a programming error, so unknown kinds are unrepresentable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    LogFile,
    LogArchive,
    TempEntry,
    PackageCache,
    BashHistory,
    ExtendedHistory,
    UserCacheEntry,
    AuditArtifact,
    SelfArtifact,
}

/// An abstract cleanup target.
#[derive(Clone, Debug)]
pub struct Resource {
    pub kind: ResourceKind,
    /// Absolute path of the target (empty for purely command-driven kinds
    /// such as PackageCache).
    pub path: PathBuf,
    /// Owning user, where relevant (history files, user caches).
    pub owner: Option<String>,
    /// Age of the entry, where relevant (temp entries).
    pub age: Option<Duration>,
}

impl Resource {
    pub fn new(kind: ResourceKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
            owner: None,
            age: None,
        }
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn with_age(mut self, age: Duration) -> Self {
        self.age = Some(age);
        self
    }
}

/// A resolved per-resource action. Produced by the mode policy, consumed by
/// the executor and the history reconciler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CleanupAction {
    /// Leave the resource alone.
    Skip,
    /// Truncate the file to zero length, keeping the inode.
    Truncate,
    /// Plain removal (unlink / recursive remove).
    Delete,
    /// Multi-pass overwrite followed by unlink.
    SecureErase,
    /// Keep only the last N lines (history files). N == 0 clears the file
    /// but keeps it present with valid structure.
    KeepLast(usize),
    /// Invoke the host package manager's native clean subcommand.
    CleanCache { purge_lists: bool },
}

/// Result of one executed (or simulated) action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionOutcome {
    /// Nothing was done; the reason says why (protected, absent, policy).
    Skipped(String),
    /// Dry-run: the action was described but not performed.
    Simulated(String),
    /// The action ran to completion.
    Performed(String),
    /// The action ran and failed; cleanup continues regardless.
    Failed(String, i32),
}

impl ActionOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, ActionOutcome::Failed(..))
    }
}

/// Audit record severity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditLevel {
    Info,
    Warning,
    Error,
    Success,
}

impl AuditLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditLevel::Info => "INFO",
            AuditLevel::Warning => "WARNING",
            AuditLevel::Error => "ERROR",
            AuditLevel::Success => "SUCCESS",
        }
    }
}

/// Errors for the syssweep system.
///
/// Only Config and Privilege are fatal, and only before any action has run.
/// Everything else is recovered: a failing resource is logged as a warning
/// and the sweep continues best-effort.
#[derive(Error, Debug)]
pub enum SweepError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Privilege error: {0}")]
    Privilege(String),

    #[error("Filesystem error: {0}")]
    Filesystem(String),

    #[error("Process error: {0}")]
    Process(String),

    #[error("History error: {0}")]
    History(String),

    #[error("Audit error: {0}")]
    Audit(String),
}

pub type Result<T> = std::result::Result<T, SweepError>;
