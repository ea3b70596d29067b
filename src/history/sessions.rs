/// Live interactive-shell discovery
///
/// Walks /proc looking for processes owned by a given uid whose command name
/// belongs to the interactive-shell family, and resolves the controlling
/// terminal of fd 0 when possible. Sessions are recomputed on every pass and
/// never persisted; a pid may vanish between discovery and use, which every
/// caller must tolerate.
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

/// Command names treated as interactive shells.
const SHELL_FAMILY: &[&str] = &["bash", "zsh", "sh", "dash", "fish", "ksh"];

/// One live shell process believed to hold a history buffer in memory.
#[derive(Clone, Debug)]
pub struct ShellSession {
    pub pid: i32,
    pub uid: u32,
    pub comm: String,
    /// Controlling terminal of fd 0, when resolvable and an actual tty.
    pub tty: Option<PathBuf>,
}

/// Enumerate live shell sessions owned by `uid`, reading from the given
/// procfs root.
pub fn discover_sessions(proc_root: &Path, uid: u32) -> Vec<ShellSession> {
    let mut sessions = Vec::new();
    let entries = match fs::read_dir(proc_root) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("cannot read {}: {}", proc_root.display(), e);
            return sessions;
        }
    };

    for entry in entries.flatten() {
        let name = entry.file_name();
        let pid: i32 = match name.to_string_lossy().parse() {
            Ok(pid) => pid,
            Err(_) => continue,
        };
        let pid_dir = entry.path();

        let comm = match fs::read_to_string(pid_dir.join("comm")) {
            Ok(c) => c.trim().to_string(),
            // Process exited between readdir and read; normal.
            Err(_) => continue,
        };
        if !is_shell_comm(&comm) {
            continue;
        }

        let status = match fs::read_to_string(pid_dir.join("status")) {
            Ok(s) => s,
            Err(_) => continue,
        };
        match parse_real_uid(&status) {
            Some(owner) if owner == uid => {}
            _ => continue,
        }

        sessions.push(ShellSession {
            pid,
            uid,
            comm,
            tty: resolve_tty(&pid_dir),
        });
    }
    sessions
}

fn is_shell_comm(comm: &str) -> bool {
    // A login shell shows up as "-bash".
    let trimmed = comm.strip_prefix('-').unwrap_or(comm);
    SHELL_FAMILY.contains(&trimmed)
}

/// Real uid from a /proc/<pid>/status blob.
fn parse_real_uid(status: &str) -> Option<u32> {
    let line = status.lines().find(|l| l.starts_with("Uid:"))?;
    line.split_whitespace().nth(1)?.parse().ok()
}

/// Resolve fd 0 to a terminal device, if it is one.
fn resolve_tty(pid_dir: &Path) -> Option<PathBuf> {
    let target = fs::read_link(pid_dir.join("fd/0")).ok()?;
    let s = target.to_string_lossy();
    if s.starts_with("/dev/pts/") || s.starts_with("/dev/tty") {
        Some(target)
    } else {
        None
    }
}
