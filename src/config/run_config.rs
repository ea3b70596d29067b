/// Immutable per-run configuration
///
/// Built exactly once from parsed command-line flags and passed by reference
/// to every component. There are no ambient globals: everything a component
/// needs to decide how hard to act travels through this struct.
use crate::config::types::Mode;
use std::path::PathBuf;
use std::time::Duration;

/// How full the target filesystem may be before the precheck emits a
/// warning (percentage of used space). The campaign proceeds either way.
pub const DISK_USAGE_WARN_PERCENT: u64 = 90;

/// Temp entries younger than this are never touched.
pub const TEMP_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Default grace interval after a flush signal, giving live shells a chance
/// to persist their history buffer. Heuristic; success is never confirmed.
pub const DEFAULT_FLUSH_GRACE: Duration = Duration::from_millis(400);

#[derive(Clone, Debug)]
pub struct RunConfig {
    pub mode: Mode,
    /// Simulate every action; byte-identical filesystem afterwards.
    pub dry_run: bool,
    /// Export logs and root history to a timestamped backup dir first.
    pub backup: bool,
    /// Wait after sending flush signals to live shells.
    pub flush_grace: Duration,
    /// Drive external collaborators (journal, package manager, service
    /// supervisor, container engines). Off turns those steps into no-ops
    /// while the file-level sweep still runs; hermetic tests rely on it.
    pub drive_external_tools: bool,

    // Filesystem roots. Defaults are the live system locations; tests point
    // them into a tempdir to exercise the whole campaign hermetically.
    pub log_root: PathBuf,
    pub temp_roots: Vec<PathBuf>,
    pub home_root: PathBuf,
    pub root_home: PathBuf,
    pub audit_path: PathBuf,
    pub backup_parent: PathBuf,
    /// procfs mount used for session discovery; tests point this at an
    /// empty directory to keep runs hermetic.
    pub proc_root: PathBuf,
    /// The program's own on-disk artifact, erased last by ghost teardown.
    /// Resolved once at startup; None when the executable is not locatable.
    pub self_artifact: Option<PathBuf>,

    pub disk_warn_percent: u64,
    pub temp_max_age: Duration,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Standard,
            dry_run: false,
            backup: false,
            flush_grace: DEFAULT_FLUSH_GRACE,
            drive_external_tools: true,
            log_root: PathBuf::from("/var/log"),
            temp_roots: vec![PathBuf::from("/tmp"), PathBuf::from("/var/tmp")],
            home_root: PathBuf::from("/home"),
            root_home: PathBuf::from("/root"),
            audit_path: PathBuf::from("/var/log/syssweep.log"),
            backup_parent: PathBuf::from("/var/backups"),
            proc_root: PathBuf::from("/proc"),
            self_artifact: None,
            disk_warn_percent: DISK_USAGE_WARN_PERCENT,
            temp_max_age: TEMP_MAX_AGE,
        }
    }
}

impl RunConfig {
    /// Build the run configuration from parsed flag state.
    pub fn from_flags(
        dry_run: bool,
        stealth: bool,
        stealth_max: bool,
        ghost: bool,
        backup: bool,
    ) -> Self {
        Self {
            mode: Mode::from_flags(stealth, stealth_max, ghost),
            dry_run,
            backup,
            ..Self::default()
        }
    }

    /// Backup export only happens when requested and not in ghost mode:
    /// a ghost run must not create new artifacts that outlive it.
    pub fn backup_enabled(&self) -> bool {
        self.backup && self.mode != Mode::Ghost
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_point_at_system_locations() {
        let cfg = RunConfig::default();
        assert_eq!(cfg.log_root, PathBuf::from("/var/log"));
        assert_eq!(cfg.temp_roots.len(), 2);
        assert_eq!(cfg.disk_warn_percent, DISK_USAGE_WARN_PERCENT);
    }

    #[test]
    fn test_ghost_suppresses_backup() {
        let cfg = RunConfig::from_flags(false, false, false, true, true);
        assert_eq!(cfg.mode, Mode::Ghost);
        assert!(!cfg.backup_enabled());

        let cfg = RunConfig::from_flags(false, true, false, false, true);
        assert!(cfg.backup_enabled());
    }

    #[test]
    fn test_dry_run_orthogonal_to_mode() {
        let cfg = RunConfig::from_flags(true, false, true, false, false);
        assert_eq!(cfg.mode, Mode::StealthMax);
        assert!(cfg.dry_run);
    }
}
