/// Campaign orchestrator
///
/// Runs the sweep steps in one fixed order regardless of mode; the mode only
/// changes whether and how hard each step acts, never the sequence:
///
///   disk precheck -> backup export -> journal vacuum -> log cleanup ->
///   temp cleanup -> package cache -> per-home user data -> root home ->
///   container prune -> page-cache hint -> own-session history ->
///   logging-daemon restart -> history reconciliation -> ghost teardown
///
/// Single-threaded and sequential: every action runs to completion before
/// the next begins. Each resource-level action is idempotent, so an
/// interrupted run leaves a state that a re-run simply finishes.
use crate::config::run_config::RunConfig;
use crate::config::types::{ActionOutcome, CleanupAction, Mode, Resource, ResourceKind};
use crate::exec::{self, Executor};
use crate::external::{BackupExporter, PackageManager, ServiceSupervisor};
use crate::history::{HistoryReconciler, HistoryUser};
use crate::policy::{ModePolicy, PathGuard};
use log::debug;
use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

/// Plain log names without a `.log` suffix that still count as log files.
const PLAIN_LOG_NAMES: &[&str] = &[
    "syslog", "messages", "debug", "dmesg", "lastlog", "wtmp", "btmp", "faillog",
];

/// Compressed or rotated archive suffixes.
const ARCHIVE_SUFFIXES: &[&str] = &[".gz", ".xz", ".bz2", ".zst", ".old"];

/// Per-user cache directories swept in every mode.
const USER_CACHE_DIRS: &[&str] = &[".cache", ".thumbnails", ".local/share/Trash"];

/// Extra per-user artifacts only ghost mode takes along.
const GHOST_EXTRA_FILES: &[&str] = &[".lesshst", ".viminfo", ".wget-hsts", ".python_history"];

/// Container engines whose build/image caches are pruned in the harder modes.
const CONTAINER_ENGINES: &[&str] = &["docker", "podman"];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CampaignSummary {
    pub performed: usize,
    pub simulated: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl CampaignSummary {
    fn tally(&mut self, outcome: &ActionOutcome) {
        match outcome {
            ActionOutcome::Performed(_) => self.performed += 1,
            ActionOutcome::Simulated(_) => self.simulated += 1,
            ActionOutcome::Failed(..) => self.failed += 1,
            ActionOutcome::Skipped(_) => self.skipped += 1,
        }
    }
}

pub struct CampaignOrchestrator {
    cfg: RunConfig,
    policy: ModePolicy,
    ex: Executor,
    summary: CampaignSummary,
    /// Backup directory created this session, if any; ghost teardown erases it.
    backup_dir: Option<PathBuf>,
}

impl CampaignOrchestrator {
    pub fn new(cfg: RunConfig) -> Self {
        let policy = ModePolicy::new(PathGuard::with_defaults(), cfg.temp_max_age);
        let ex = exec::build(cfg.mode, cfg.dry_run, &cfg.audit_path);
        Self {
            cfg,
            policy,
            ex,
            summary: CampaignSummary::default(),
            backup_dir: None,
        }
    }

    /// Run the whole campaign. Always returns a summary; nothing below the
    /// startup gates is allowed to abort the run.
    pub fn run(mut self) -> CampaignSummary {
        let banner = format!(
            "sweep starting (mode: {}, dry-run: {})",
            self.cfg.mode, self.cfg.dry_run
        );
        self.ex.audit().info(&banner);

        self.precheck_disk();
        if self.cfg.backup_enabled() {
            self.backup_dir = BackupExporter::export(&self.cfg, &mut self.ex);
        }
        self.vacuum_journal();
        self.sweep_logs();
        self.sweep_temp();
        self.sweep_package_cache();
        self.sweep_home_dirs();
        self.sweep_one_home(&self.cfg.root_home.clone(), "root");
        self.prune_container_caches();
        self.hint_page_cache_drop();
        self.neutralize_own_session();
        if self.cfg.drive_external_tools {
            for outcome in ServiceSupervisor::restart_logging_daemons(&mut self.ex) {
                self.summary.tally(&outcome);
            }
        }
        self.reconcile_histories();

        if self.cfg.mode == Mode::Ghost {
            self.self_teardown();
            // A ghost run is otherwise mute; the operator still gets one
            // closing line on the console stream before the process dies.
            eprintln!("{}", completion_notice(&self.summary));
        } else {
            self.ex.audit().success("sweep complete");
            if let Err(e) = self.ex.audit().tighten_permissions() {
                debug!("audit permission tightening failed: {}", e);
            }
        }
        self.summary
    }

    /// Warn when the filesystem holding the log root is nearly full. The
    /// warning aborts only this precheck step; the campaign proceeds.
    fn precheck_disk(&mut self) {
        let stat = match nix::sys::statvfs::statvfs(&self.cfg.log_root) {
            Ok(stat) => stat,
            Err(e) => {
                debug!("statvfs on {} failed: {}", self.cfg.log_root.display(), e);
                return;
            }
        };
        let blocks = stat.blocks() as u64;
        if blocks == 0 {
            return;
        }
        let used = blocks.saturating_sub(stat.blocks_available() as u64);
        let percent = used * 100 / blocks;
        if percent >= self.cfg.disk_warn_percent {
            self.ex.audit().warning(&format!(
                "disk usage at {}% exceeds {}% threshold",
                percent, self.cfg.disk_warn_percent
            ));
        } else {
            self.ex
                .audit()
                .info(&format!("disk usage at {}%", percent));
        }
    }

    fn vacuum_journal(&mut self) {
        if !self.cfg.drive_external_tools || Executor::probe_tool("journalctl").is_none() {
            return;
        }
        for argv in [
            &["journalctl", "--rotate"][..],
            &["journalctl", "--vacuum-time=1s"][..],
        ] {
            let outcome = self.ex.run_command(argv);
            self.summary.tally(&outcome);
        }
    }

    fn sweep_logs(&mut self) {
        let root = self.cfg.log_root.clone();
        let mut files = Vec::new();
        collect_files(&root, &mut files);
        for path in files {
            // Our own audit trail also lives under the log root; it is an
            // AuditArtifact, kept until a ghost teardown, never a log file.
            let kind = if path == self.cfg.audit_path {
                ResourceKind::AuditArtifact
            } else {
                match classify_log(&path) {
                    Some(kind) => kind,
                    None => continue,
                }
            };
            let resource = Resource::new(kind, &path);
            let action = self.policy.resolve(&resource, self.cfg.mode);
            let outcome = self.apply_file_action(&path, action);
            self.summary.tally(&outcome);
        }
    }

    fn sweep_temp(&mut self) {
        for root in self.cfg.temp_roots.clone() {
            let entries = match fs::read_dir(&root) {
                Ok(entries) => entries,
                Err(_) => continue,
            };
            for entry in entries.flatten() {
                let path = entry.path();
                let age = entry
                    .metadata()
                    .and_then(|m| m.modified())
                    .ok()
                    .and_then(|t| t.elapsed().ok());
                let mut resource = Resource::new(ResourceKind::TempEntry, &path);
                if let Some(age) = age {
                    resource = resource.with_age(age);
                }
                let action = self.policy.resolve(&resource, self.cfg.mode);
                let outcome = match action {
                    CleanupAction::Delete => self.ex.remove_tree(&path),
                    _ => ActionOutcome::Skipped("age or policy".to_string()),
                };
                self.summary.tally(&outcome);
            }
        }
    }

    fn sweep_package_cache(&mut self) {
        if !self.cfg.drive_external_tools {
            return;
        }
        let manager = match PackageManager::detect() {
            Some(manager) => manager,
            None => return,
        };
        let resource = Resource::new(ResourceKind::PackageCache, "");
        if let CleanupAction::CleanCache { purge_lists } =
            self.policy.resolve(&resource, self.cfg.mode)
        {
            for outcome in manager.clean(&mut self.ex, purge_lists) {
                self.summary.tally(&outcome);
            }
        }
    }

    fn sweep_home_dirs(&mut self) {
        let entries = match fs::read_dir(&self.cfg.home_root) {
            Ok(entries) => entries,
            Err(_) => return,
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            self.sweep_one_home(&path, &name);
        }
    }

    fn sweep_one_home(&mut self, home: &Path, user: &str) {
        for rel in USER_CACHE_DIRS {
            let path = home.join(rel);
            let resource =
                Resource::new(ResourceKind::UserCacheEntry, &path).with_owner(user);
            let action = self.policy.resolve(&resource, self.cfg.mode);
            let outcome = match action {
                CleanupAction::Delete => self.ex.remove_tree(&path),
                _ => ActionOutcome::Skipped("policy".to_string()),
            };
            self.summary.tally(&outcome);
        }
        if self.cfg.mode == Mode::Ghost {
            for rel in GHOST_EXTRA_FILES {
                let path = home.join(rel);
                let outcome = self.ex.remove_file(&path);
                self.summary.tally(&outcome);
            }
        }
    }

    fn prune_container_caches(&mut self) {
        if !self.cfg.drive_external_tools || !self.cfg.mode.at_least(Mode::StealthMax) {
            return;
        }
        for &engine in CONTAINER_ENGINES {
            if Executor::probe_tool(engine).is_none() {
                continue;
            }
            let outcome = self
                .ex
                .run_command(&[engine, "system", "prune", "-af"]);
            self.summary.tally(&outcome);
        }
    }

    /// Ask the kernel to drop clean page-cache pages. Purely advisory.
    fn hint_page_cache_drop(&mut self) {
        if !self.cfg.drive_external_tools {
            return;
        }
        let outcome = self.ex.run_command(&["sync"]);
        self.summary.tally(&outcome);
        let knob = self.cfg.proc_root.join("sys/vm/drop_caches");
        if self.cfg.dry_run {
            return;
        }
        if let Err(e) = fs::write(&knob, "1\n") {
            debug!("page cache drop hint unavailable: {}", e);
        }
    }

    /// Keep this run's own commands out of the surviving environment: our
    /// process stops pointing at any history file. A child cannot reach into
    /// its parent shell's in-memory history; that buffer is handled by the
    /// reconciliation pass against the parent's history file instead.
    fn neutralize_own_session(&mut self) {
        std::env::remove_var("HISTFILE");
        self.ex.audit().info("own session history detached");
    }

    fn reconcile_histories(&mut self) {
        let mut users = self.enumerate_users();
        if let Some(root_user) = history_user(&self.cfg.root_home, "root") {
            users.push(root_user);
        }
        let cfg = self.cfg.clone();
        let reconciler = HistoryReconciler::new(&cfg);
        for user in users {
            let targets = [
                (ResourceKind::BashHistory, user.home.join(".bash_history")),
                (ResourceKind::ExtendedHistory, user.home.join(".zsh_history")),
                // Both canonical extended-history names are processed
                // independently when present; no merging between them.
                (ResourceKind::ExtendedHistory, user.home.join(".histfile")),
            ];
            for (kind, path) in targets {
                let resource = Resource::new(kind, &path).with_owner(user.name.clone());
                let action = self.policy.resolve(&resource, self.cfg.mode);
                let outcome = reconciler.reconcile(&mut self.ex, &user, &path, action);
                self.summary.tally(&outcome);
            }
        }
    }

    fn enumerate_users(&self) -> Vec<HistoryUser> {
        let mut users = Vec::new();
        let entries = match fs::read_dir(&self.cfg.home_root) {
            Ok(entries) => entries,
            Err(_) => return users,
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if let Some(user) = history_user(&path, &name) {
                users.push(user);
            }
        }
        users
    }

    /// Ghost-only final pass: erase the audit artifact, this session's
    /// backup, any self-named temp artifacts, and the program's own binary.
    /// Every erase is best-effort; a missing piece is simply skipped.
    fn self_teardown(&mut self) {
        let audit_path = self.cfg.audit_path.clone();
        let resource = Resource::new(ResourceKind::AuditArtifact, &audit_path);
        let action = self.policy.resolve(&resource, self.cfg.mode);
        let outcome = self.apply_file_action(&audit_path, action);
        self.summary.tally(&outcome);

        if let Some(dir) = self.backup_dir.clone() {
            let outcome = self.ex.remove_tree(&dir);
            self.summary.tally(&outcome);
        }

        for root in self.cfg.temp_roots.clone() {
            let entries = match fs::read_dir(&root) {
                Ok(entries) => entries,
                Err(_) => continue,
            };
            for entry in entries.flatten() {
                if entry
                    .file_name()
                    .to_string_lossy()
                    .starts_with("syssweep")
                {
                    let outcome = self.ex.remove_tree(&entry.path());
                    self.summary.tally(&outcome);
                }
            }
        }

        // The running binary goes last, after everything else is gone.
        match self.cfg.self_artifact.clone() {
            Some(exe) => {
                let resource = Resource::new(ResourceKind::SelfArtifact, &exe);
                match self.policy.resolve(&resource, self.cfg.mode) {
                    CleanupAction::SecureErase => {
                        let outcome = self.ex.secure_erase(&exe);
                        self.summary.tally(&outcome);
                    }
                    _ => debug!("own binary at {} left in place", exe.display()),
                }
            }
            None => debug!("own binary not locatable"),
        }
    }

    fn apply_file_action(&mut self, path: &Path, action: CleanupAction) -> ActionOutcome {
        match action {
            CleanupAction::Skip => ActionOutcome::Skipped("policy".to_string()),
            CleanupAction::Truncate => self.ex.truncate_file(path),
            CleanupAction::Delete => self.ex.remove_tree(path),
            CleanupAction::SecureErase => self.ex.secure_erase(path),
            CleanupAction::KeepLast(keep) => self.ex.keep_last_lines(path, keep),
            CleanupAction::CleanCache { .. } => {
                ActionOutcome::Skipped("not a file action".to_string())
            }
        }
    }
}

fn history_user(home: &Path, name: &str) -> Option<HistoryUser> {
    let meta = fs::metadata(home).ok()?;
    Some(HistoryUser {
        name: name.to_string(),
        uid: meta.uid(),
        gid: meta.gid(),
        home: home.to_path_buf(),
    })
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return,
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_symlink() {
            continue;
        }
        if path.is_dir() {
            collect_files(&path, out);
        } else if path.is_file() {
            out.push(path);
        }
    }
}

/// The single closing line a ghost run prints to stderr.
fn completion_notice(summary: &CampaignSummary) -> String {
    format!(
        "sweep complete: {} performed, {} failed",
        summary.performed, summary.failed
    )
}

/// Classify a file under the log root. Unrecognized files are left alone.
fn classify_log(path: &Path) -> Option<ResourceKind> {
    let name = path.file_name()?.to_string_lossy();

    if ARCHIVE_SUFFIXES.iter().any(|s| name.ends_with(s)) {
        return Some(ResourceKind::LogArchive);
    }
    // Rotated plain logs: trailing ".N".
    if let Some((_, suffix)) = name.rsplit_once('.') {
        if !suffix.is_empty() && suffix.chars().all(|c| c.is_ascii_digit()) {
            return Some(ResourceKind::LogArchive);
        }
    }
    if name.ends_with(".log") || PLAIN_LOG_NAMES.contains(&name.as_ref()) {
        return Some(ResourceKind::LogFile);
    }
    None
}
