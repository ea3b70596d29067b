//! Integration tests for the sweep campaign
//!
//! Every test redirects the whole campaign into a tempdir-rooted fake
//! filesystem and disables external collaborators, so runs are hermetic:
//! no host tooling is invoked and no signals leave the test process.

use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::Path;
use std::time::Duration;

use syssweep::campaign::CampaignOrchestrator;
use syssweep::config::run_config::RunConfig;
use syssweep::config::types::Mode;
use tempfile::TempDir;

struct Fixture {
    _dir: TempDir,
    cfg: RunConfig,
}

fn fixture(mode: Mode, dry_run: bool) -> Fixture {
    let dir = TempDir::new().unwrap();
    let root = dir.path();

    let cfg = RunConfig {
        mode,
        dry_run,
        backup: false,
        flush_grace: Duration::from_millis(1),
        drive_external_tools: false,
        log_root: root.join("var/log"),
        temp_roots: vec![root.join("tmp")],
        home_root: root.join("home"),
        root_home: root.join("root"),
        audit_path: root.join("var/log/syssweep.log"),
        backup_parent: root.join("var/backups"),
        proc_root: root.join("proc"),
        self_artifact: None,
        ..RunConfig::default()
    };

    fs::create_dir_all(cfg.log_root.join("nginx")).unwrap();
    fs::write(cfg.log_root.join("syslog"), "a\nb\nc\n").unwrap();
    fs::write(cfg.log_root.join("nginx/access.log"), "hit\nhit\n").unwrap();
    fs::write(cfg.log_root.join("syslog.1.gz"), "old compressed").unwrap();
    fs::write(cfg.log_root.join("README"), "not a log").unwrap();

    fs::create_dir_all(root.join("tmp")).unwrap();
    fs::write(root.join("tmp/fresh-build"), "young").unwrap();

    let alice = cfg.home_root.join("alice");
    fs::create_dir_all(alice.join(".cache")).unwrap();
    fs::write(alice.join(".cache/blob"), "cached").unwrap();
    let history: String = (1..=80).map(|i| format!("cmd {}\n", i)).collect();
    fs::write(alice.join(".bash_history"), history).unwrap();
    let extended: String = (1..=2000).map(|i| format!(": 0:0;cmd {}\n", i)).collect();
    fs::write(alice.join(".zsh_history"), extended).unwrap();

    fs::create_dir_all(&cfg.root_home).unwrap();
    fs::write(cfg.root_home.join(".bash_history"), "root cmd\n").unwrap();

    Fixture { _dir: dir, cfg }
}

fn line_count(path: &Path) -> usize {
    fs::read_to_string(path).unwrap().lines().count()
}

#[test]
fn standard_campaign_truncates_logs_and_trims_history() {
    let fx = fixture(Mode::Standard, false);
    let cfg = fx.cfg.clone();

    let summary = CampaignOrchestrator::new(fx.cfg).run();
    assert_eq!(summary.failed, 0);
    assert!(summary.performed > 0);

    // Logs truncated in place, archives removed, non-logs untouched.
    assert_eq!(fs::metadata(cfg.log_root.join("syslog")).unwrap().len(), 0);
    assert_eq!(
        fs::metadata(cfg.log_root.join("nginx/access.log")).unwrap().len(),
        0
    );
    assert!(!cfg.log_root.join("syslog.1.gz").exists());
    assert_eq!(
        fs::read_to_string(cfg.log_root.join("README")).unwrap(),
        "not a log"
    );

    // User caches deleted; fresh temp entries survive Standard mode.
    let alice = cfg.home_root.join("alice");
    assert!(!alice.join(".cache").exists());
    assert!(cfg.temp_roots[0].join("fresh-build").exists());

    // Bash history keeps its last 50 lines; extended history is untouched
    // in Standard mode.
    let bash = alice.join(".bash_history");
    assert_eq!(line_count(&bash), 50);
    let content = fs::read_to_string(&bash).unwrap();
    assert!(content.starts_with("cmd 31\n"));
    assert!(content.ends_with("cmd 80\n"));
    assert_eq!(line_count(&alice.join(".zsh_history")), 2000);

    // Ownership survives the rewrite (same-uid case).
    let home_uid = fs::metadata(&alice).unwrap().uid();
    assert_eq!(fs::metadata(&bash).unwrap().uid(), home_uid);

    // Audit trail exists, is line-oriented, and is owner-only.
    let audit = fs::read_to_string(&cfg.audit_path).unwrap();
    assert!(audit.lines().count() > 0);
    assert!(audit.lines().all(|l| l.starts_with('[')));
    let mode = fs::metadata(&cfg.audit_path).unwrap().mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[test]
fn dry_run_leaves_targets_byte_identical() {
    let fx = fixture(Mode::StealthMax, true);
    let cfg = fx.cfg.clone();

    let targets = [
        cfg.log_root.join("syslog"),
        cfg.log_root.join("nginx/access.log"),
        cfg.log_root.join("syslog.1.gz"),
        cfg.home_root.join("alice/.bash_history"),
        cfg.home_root.join("alice/.zsh_history"),
        cfg.home_root.join("alice/.cache/blob"),
    ];
    let before: Vec<Vec<u8>> = targets.iter().map(|p| fs::read(p).unwrap()).collect();

    let summary = CampaignOrchestrator::new(fx.cfg).run();
    assert!(summary.simulated > 0);
    assert_eq!(summary.performed, 0);
    assert_eq!(summary.failed, 0);

    for (path, content) in targets.iter().zip(&before) {
        assert_eq!(&fs::read(path).unwrap(), content, "{}", path.display());
    }

    // Simulated actions are still audited, marked as such.
    let audit = fs::read_to_string(&cfg.audit_path).unwrap();
    assert!(audit.contains("DRY-RUN"));
}

#[test]
fn second_run_produces_no_new_failures() {
    let fx = fixture(Mode::Stealth, false);
    let cfg = fx.cfg.clone();

    let first = CampaignOrchestrator::new(cfg.clone()).run();
    assert_eq!(first.failed, 0);

    // Already-clean state: truncating empty files and trimming trimmed
    // history must succeed again.
    let second = CampaignOrchestrator::new(cfg.clone()).run();
    assert_eq!(second.failed, 0);

    // Stealth clears bash history down to the placeholder, stably.
    let bash = cfg.home_root.join("alice/.bash_history");
    assert_eq!(fs::read_to_string(&bash).unwrap(), "# cleared\n");
}

#[test]
fn stealth_max_trims_extended_history() {
    let fx = fixture(Mode::StealthMax, false);
    let cfg = fx.cfg.clone();

    let summary = CampaignOrchestrator::new(fx.cfg).run();
    assert_eq!(summary.failed, 0);

    let zsh = cfg.home_root.join("alice/.zsh_history");
    assert_eq!(line_count(&zsh), 1000);
    assert!(fs::read_to_string(&zsh).unwrap().ends_with(";cmd 2000\n"));

    // The rewrite leaves no temporary files behind.
    let leftovers: Vec<String> = fs::read_dir(cfg.home_root.join("alice"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|n| n.ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty(), "leftover temp files: {:?}", leftovers);
}

#[test]
fn ghost_run_leaves_no_trace() {
    let mut fx = fixture(Mode::Ghost, false);
    let root = fx._dir.path();

    // A fake on-disk artifact standing in for the installed binary.
    let self_path = root.join("tmp/syssweep");
    fs::write(&self_path, "#!fake binary").unwrap();
    fx.cfg.self_artifact = Some(self_path.clone());
    let cfg = fx.cfg.clone();

    let summary = CampaignOrchestrator::new(fx.cfg).run();
    assert_eq!(summary.failed, 0);

    // No audit artifact, no history files, no self artifact.
    assert!(!cfg.audit_path.exists());
    assert!(!cfg.home_root.join("alice/.bash_history").exists());
    assert!(!cfg.home_root.join("alice/.zsh_history").exists());
    assert!(!cfg.root_home.join(".bash_history").exists());
    assert!(!self_path.exists());

    // Ghost removes log files instead of truncating them.
    assert!(!cfg.log_root.join("syslog").exists());
}

#[test]
fn disk_precheck_warns_but_campaign_proceeds() {
    let mut fx = fixture(Mode::Standard, false);
    // Any usage at all trips a zero threshold.
    fx.cfg.disk_warn_percent = 0;
    let cfg = fx.cfg.clone();

    let summary = CampaignOrchestrator::new(fx.cfg).run();
    assert_eq!(summary.failed, 0);
    assert!(summary.performed > 0, "campaign must proceed past the warning");

    let audit = fs::read_to_string(&cfg.audit_path).unwrap();
    assert!(audit.contains("[WARNING] disk usage"));
    assert_eq!(fs::metadata(cfg.log_root.join("syslog")).unwrap().len(), 0);
}

#[test]
fn backup_exports_before_sweep() {
    let mut fx = fixture(Mode::Standard, false);
    fx.cfg.backup = true;
    let cfg = fx.cfg.clone();

    let summary = CampaignOrchestrator::new(fx.cfg).run();
    assert_eq!(summary.failed, 0);

    let backups: Vec<_> = fs::read_dir(&cfg.backup_parent)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(backups.len(), 1);
    let backup = &backups[0];

    // The copy holds the pre-sweep content while the live file is truncated.
    assert_eq!(
        fs::read_to_string(backup.join("logs/syslog")).unwrap(),
        "a\nb\nc\n"
    );
    assert_eq!(fs::metadata(cfg.log_root.join("syslog")).unwrap().len(), 0);
    assert!(backup.join("manifest.json").is_file());
    assert_eq!(
        fs::read_to_string(backup.join("bash_history")).unwrap(),
        "root cmd\n"
    );
}
