/// History reconciliation
///
/// Safely shortens or erases a user's shell history file while live shells
/// may still be appending to it. The race cannot be closed from outside the
/// shell process; it is only narrowed: best-effort flush signals and a fixed
/// grace interval give the shell a chance to persist its buffer, then the
/// rewrite itself is atomic (write-temp-then-rename), so no reader or writer
/// ever observes a partially written file.
///
/// Per (user, file) state machine:
///   discover -> [live sessions?] -> flush + grace -> trim -> restore owner
///                        \-> cold trim -> restore owner
/// Ghost runs take a different tail: one flush pass, then secure erase; no
/// trim, no ownership restore (the file is gone).
use crate::config::run_config::RunConfig;
use crate::config::types::{ActionOutcome, CleanupAction};
use crate::exec::Executor;
use crate::history::sessions::{discover_sessions, ShellSession};
use log::debug;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::path::{Path, PathBuf};
use std::thread;

/// Request injected into a live shell's terminal to persist its buffer now.
const FLUSH_REQUEST: &[u8] = b"history -a\n";

/// A user whose history files are being reconciled. Identity comes from the
/// home directory's ownership, not from /etc/passwd.
#[derive(Clone, Debug)]
pub struct HistoryUser {
    pub name: String,
    pub uid: u32,
    pub gid: u32,
    pub home: PathBuf,
}

pub struct HistoryReconciler<'a> {
    cfg: &'a RunConfig,
}

impl<'a> HistoryReconciler<'a> {
    pub fn new(cfg: &'a RunConfig) -> Self {
        Self { cfg }
    }

    /// Reconcile one history file under the resolved action.
    pub fn reconcile(
        &self,
        ex: &mut Executor,
        user: &HistoryUser,
        file: &Path,
        action: CleanupAction,
    ) -> ActionOutcome {
        match action {
            CleanupAction::Skip => ActionOutcome::Skipped("policy".to_string()),
            CleanupAction::SecureErase => {
                // Ghost tail: one best-effort flush pass, then destroy.
                if !ex.dry_run() {
                    self.flush_pass(user, false);
                }
                ex.secure_erase(file)
            }
            CleanupAction::KeepLast(keep) => {
                // Dry runs must not signal anyone's shell.
                if !ex.dry_run() {
                    self.flush_pass(user, true);
                }
                let outcome = ex.keep_last_lines(file, keep);
                if matches!(outcome, ActionOutcome::Performed(_)) {
                    restore_ownership(file, user);
                }
                outcome
            }
            // Truncate/Delete are not meaningful for history files but stay
            // best-effort rather than being rejected.
            CleanupAction::Truncate => ex.truncate_file(file),
            CleanupAction::Delete => ex.remove_file(file),
            CleanupAction::CleanCache { .. } => {
                ActionOutcome::Skipped("not a history action".to_string())
            }
        }
    }

    /// Signal every live session of this user to flush its history buffer,
    /// then (optionally) wait the grace interval. Every step is best-effort:
    /// a pid may vanish mid-send, the terminal may be gone, the shell may
    /// simply ignore us. The result is always unconfirmed.
    fn flush_pass(&self, user: &HistoryUser, wait: bool) {
        let sessions = discover_sessions(&self.cfg.proc_root, user.uid);
        if sessions.is_empty() {
            return;
        }
        for session in &sessions {
            nudge_session(session);
        }
        if wait {
            thread::sleep(self.cfg.flush_grace);
        }
    }
}

fn nudge_session(session: &ShellSession) {
    // SIGWINCH is ignored by anything that doesn't handle it, so an
    // untrapped shell is never harmed; shells that do handle it wake up and
    // service pending work. The terminal injection below carries the actual
    // flush request.
    if let Err(e) = kill(Pid::from_raw(session.pid), Signal::SIGWINCH) {
        // ESRCH: exited between discovery and now. EPERM: not ours to poke.
        debug!("flush signal to pid {} failed: {}", session.pid, e);
    }
    if let Some(tty) = &session.tty {
        inject_flush_request(tty);
    }
}

/// Type the flush builtin into the session's terminal input queue. Requires
/// the TIOCSTI ioctl; refused kernels and unwritable terminals are ignored.
#[cfg(target_os = "linux")]
fn inject_flush_request(tty: &Path) {
    use std::os::unix::io::AsRawFd;

    let file = match std::fs::OpenOptions::new().read(true).write(true).open(tty) {
        Ok(f) => f,
        Err(e) => {
            debug!("cannot open {}: {}", tty.display(), e);
            return;
        }
    };
    let fd = file.as_raw_fd();
    for byte in FLUSH_REQUEST {
        let rc = unsafe { libc::ioctl(fd, libc::TIOCSTI, byte as *const u8) };
        if rc != 0 {
            debug!(
                "TIOCSTI into {} refused: {}",
                tty.display(),
                std::io::Error::last_os_error()
            );
            return;
        }
    }
}

#[cfg(not(target_os = "linux"))]
fn inject_flush_request(_tty: &Path) {}

/// Root performs the rewrite, so the fresh file must be handed back to its
/// owner. Best-effort: the user may have been deleted mid-run.
fn restore_ownership(file: &Path, user: &HistoryUser) {
    use nix::unistd::{chown, Gid, Uid};
    if let Err(e) = chown(
        file,
        Some(Uid::from_raw(user.uid)),
        Some(Gid::from_raw(user.gid)),
    ) {
        debug!(
            "chown {} back to {}:{} failed: {}",
            file.display(),
            user.uid,
            user.gid,
            e
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::Mode;
    use crate::exec;
    use std::fs;
    use std::os::unix::fs::MetadataExt;
    use tempfile::TempDir;

    fn test_user(dir: &TempDir) -> HistoryUser {
        let meta = fs::metadata(dir.path()).unwrap();
        HistoryUser {
            name: "tester".to_string(),
            uid: meta.uid(),
            gid: meta.gid(),
            home: dir.path().to_path_buf(),
        }
    }

    fn cfg(dir: &TempDir) -> RunConfig {
        RunConfig {
            flush_grace: std::time::Duration::from_millis(1),
            // Empty proc root: no live sessions, no signals leave the test.
            proc_root: dir.path().join("proc"),
            ..RunConfig::default()
        }
    }

    #[test]
    fn test_cold_trim_keeps_last_lines_and_ownership() {
        let dir = TempDir::new().unwrap();
        let user = test_user(&dir);
        let file = dir.path().join(".bash_history");
        let content: String = (1..=80).map(|i| format!("cmd {}\n", i)).collect();
        fs::write(&file, content).unwrap();
        let uid_before = fs::metadata(&file).unwrap().uid();

        let config = cfg(&dir);
        let rec = HistoryReconciler::new(&config);
        let mut ex = exec::build(Mode::Standard, false, &dir.path().join("audit.log"));
        let outcome = rec.reconcile(&mut ex, &user, &file, CleanupAction::KeepLast(50));
        assert!(matches!(outcome, ActionOutcome::Performed(_)));

        let after = fs::read_to_string(&file).unwrap();
        assert_eq!(after.lines().count(), 50);
        assert_eq!(after.lines().last().unwrap(), "cmd 80");
        assert_eq!(fs::metadata(&file).unwrap().uid(), uid_before);
    }

    #[test]
    fn test_trim_convergence() {
        let dir = TempDir::new().unwrap();
        let user = test_user(&dir);
        let file = dir.path().join(".zsh_history");
        let content: String = (1..=2000).map(|i| format!(": 0:0;cmd {}\n", i)).collect();
        fs::write(&file, content).unwrap();

        let config = cfg(&dir);
        let rec = HistoryReconciler::new(&config);
        let mut ex = exec::build(Mode::StealthMax, false, &dir.path().join("audit.log"));
        rec.reconcile(&mut ex, &user, &file, CleanupAction::KeepLast(1000));
        let first = fs::read_to_string(&file).unwrap();
        assert_eq!(first.lines().count(), 1000);

        rec.reconcile(&mut ex, &user, &file, CleanupAction::KeepLast(1000));
        assert_eq!(fs::read_to_string(&file).unwrap(), first);
    }

    #[test]
    fn test_clear_keeps_file_with_placeholder() {
        let dir = TempDir::new().unwrap();
        let user = test_user(&dir);
        let file = dir.path().join(".bash_history");
        fs::write(&file, "secret\n").unwrap();

        let config = cfg(&dir);
        let rec = HistoryReconciler::new(&config);
        let mut ex = exec::build(Mode::Stealth, false, &dir.path().join("audit.log"));
        rec.reconcile(&mut ex, &user, &file, CleanupAction::KeepLast(0));
        assert_eq!(fs::read_to_string(&file).unwrap(), "# cleared\n");
    }

    #[test]
    fn test_ghost_secure_erase_removes_file() {
        let dir = TempDir::new().unwrap();
        let user = test_user(&dir);
        let file = dir.path().join(".bash_history");
        fs::write(&file, "secret\n").unwrap();

        let config = cfg(&dir);
        let rec = HistoryReconciler::new(&config);
        let mut ex = exec::build(Mode::Ghost, false, &dir.path().join("audit.log"));
        let outcome = rec.reconcile(&mut ex, &user, &file, CleanupAction::SecureErase);
        assert!(matches!(outcome, ActionOutcome::Performed(_)));
        assert!(!file.exists());
    }

    #[test]
    fn test_dry_run_leaves_history_untouched() {
        let dir = TempDir::new().unwrap();
        let user = test_user(&dir);
        let file = dir.path().join(".bash_history");
        fs::write(&file, "cmd 1\ncmd 2\n").unwrap();

        let config = cfg(&dir);
        let rec = HistoryReconciler::new(&config);
        let mut ex = exec::build(Mode::Standard, true, &dir.path().join("audit.log"));
        let outcome = rec.reconcile(&mut ex, &user, &file, CleanupAction::KeepLast(50));
        assert!(matches!(outcome, ActionOutcome::Simulated(_)));
        assert_eq!(fs::read_to_string(&file).unwrap(), "cmd 1\ncmd 2\n");
    }

    #[test]
    fn test_missing_history_is_silent_noop() {
        let dir = TempDir::new().unwrap();
        let user = test_user(&dir);
        let file = dir.path().join(".bash_history");

        let config = cfg(&dir);
        let rec = HistoryReconciler::new(&config);
        let mut ex = exec::build(Mode::Standard, false, &dir.path().join("audit.log"));
        let outcome = rec.reconcile(&mut ex, &user, &file, CleanupAction::KeepLast(50));
        assert_eq!(outcome, ActionOutcome::Skipped("absent".to_string()));
    }
}
