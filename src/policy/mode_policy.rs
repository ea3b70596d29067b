/// Mode matrix: resolves one action per (resource, mode) pair
///
/// The protected-path check runs first and overrides everything: a protected
/// resource is skipped no matter how aggressive the mode is. After that, the
/// action comes from a fixed table, written out as one exhaustive match so
/// the whole policy surface is visible in a single screen.
use crate::config::types::{CleanupAction, Mode, Resource, ResourceKind};
use crate::policy::path_guard::PathGuard;
use std::time::Duration;

/// Lines kept in a bash-family history file in Standard mode.
pub const BASH_KEEP_STANDARD: usize = 50;
/// Lines kept in an extended-format history file in StealthMax mode.
pub const EXTENDED_KEEP_STEALTH_MAX: usize = 1000;

pub struct ModePolicy {
    guard: PathGuard,
    temp_max_age: Duration,
}

impl ModePolicy {
    pub fn new(guard: PathGuard, temp_max_age: Duration) -> Self {
        Self {
            guard,
            temp_max_age,
        }
    }

    pub fn guard(&self) -> &PathGuard {
        &self.guard
    }

    /// Resolve the action for `resource` under `mode`.
    pub fn resolve(&self, resource: &Resource, mode: Mode) -> CleanupAction {
        // Protection trumps mode. Command-driven kinds carry no path and
        // cannot collide with the protection table.
        if !resource.path.as_os_str().is_empty()
            && self.guard.is_protected(&resource.path.to_string_lossy())
        {
            return CleanupAction::Skip;
        }

        match resource.kind {
            ResourceKind::LogFile => {
                if mode == Mode::Ghost {
                    // Ghost removes rather than truncates, with audit off.
                    CleanupAction::Delete
                } else {
                    CleanupAction::Truncate
                }
            }
            ResourceKind::LogArchive => CleanupAction::Delete,
            ResourceKind::TempEntry => {
                let old_enough = resource
                    .age
                    .map(|age| age > self.temp_max_age)
                    .unwrap_or(false);
                if old_enough && mode.at_least(Mode::StealthMax) {
                    CleanupAction::Delete
                } else {
                    CleanupAction::Skip
                }
            }
            ResourceKind::PackageCache => CleanupAction::CleanCache {
                purge_lists: mode.at_least(Mode::StealthMax),
            },
            ResourceKind::BashHistory => match mode {
                Mode::Standard => CleanupAction::KeepLast(BASH_KEEP_STANDARD),
                Mode::Stealth | Mode::StealthMax => CleanupAction::KeepLast(0),
                Mode::Ghost => CleanupAction::SecureErase,
            },
            ResourceKind::ExtendedHistory => match mode {
                Mode::Standard | Mode::Stealth => CleanupAction::Skip,
                Mode::StealthMax => CleanupAction::KeepLast(EXTENDED_KEEP_STEALTH_MAX),
                Mode::Ghost => CleanupAction::SecureErase,
            },
            ResourceKind::UserCacheEntry => CleanupAction::Delete,
            ResourceKind::AuditArtifact | ResourceKind::SelfArtifact => {
                if mode == Mode::Ghost {
                    CleanupAction::SecureErase
                } else {
                    CleanupAction::Skip
                }
            }
        }
    }
}
