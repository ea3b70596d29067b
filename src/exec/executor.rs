/// Dry-run/live action runner
///
/// Every side effect of a sweep goes through here: external commands and the
/// small set of file primitives (truncate, delete, keep-last rewrite, secure
/// erase). The executor owns the audit sink, consults the dry-run bit, and
/// enforces the best-effort contract: a failing action is audited as a
/// warning and reported in its outcome, never escalated. Absent targets are
/// silent no-ops.
///
/// All primitives are idempotent; re-running a sweep over already-clean state
/// produces no new failures.
use crate::config::types::{ActionOutcome, Mode};
use crate::observability::audit::AuditSink;
use log::debug;
use rand::RngCore;
use std::fs::{self, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Overwrite passes for secure erase: random, zero, random.
const ERASE_PASSES: usize = 3;

pub struct Executor {
    dry_run: bool,
    audit: AuditSink,
}

impl Executor {
    pub fn new(dry_run: bool, audit: AuditSink) -> Self {
        Self { dry_run, audit }
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn audit(&mut self) -> &mut AuditSink {
        &mut self.audit
    }

    pub fn into_audit(self) -> AuditSink {
        self.audit
    }

    /// Locate a tool on PATH. Missing tools make the corresponding step a
    /// silent no-op rather than an error.
    pub fn probe_tool(name: &str) -> Option<PathBuf> {
        let path = std::env::var_os("PATH")?;
        for dir in std::env::split_paths(&path) {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        None
    }

    /// Run an external command with stdout/stderr suppressed.
    ///
    /// Dry-run yields `Simulated` and audits the would-be invocation. A
    /// non-zero exit yields `Failed`, audited as a warning; the sweep
    /// continues.
    pub fn run_command(&mut self, argv: &[&str]) -> ActionOutcome {
        let rendered = argv.join(" ");
        if self.dry_run {
            self.audit.info(&format!("DRY-RUN: would run: {}", rendered));
            return ActionOutcome::Simulated(rendered);
        }

        let (program, args) = match argv.split_first() {
            Some(split) => split,
            None => return ActionOutcome::Skipped("empty command".to_string()),
        };

        match Command::new(program)
            .args(args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
        {
            Ok(status) if status.success() => {
                self.audit.success(&format!("ran: {}", rendered));
                ActionOutcome::Performed(rendered)
            }
            Ok(status) => {
                let code = status.code().unwrap_or(-1);
                self.audit
                    .warning(&format!("command failed ({}): {}", code, rendered));
                ActionOutcome::Failed(rendered, code)
            }
            Err(e) => {
                // Spawn failure usually means the tool is absent.
                debug!("spawn failed for {}: {}", rendered, e);
                ActionOutcome::Skipped(format!("not available: {}", program))
            }
        }
    }

    /// Truncate a file to zero length in place. Used for live log files so
    /// the writing daemon keeps its open inode.
    pub fn truncate_file(&mut self, path: &Path) -> ActionOutcome {
        if !path.is_file() {
            return ActionOutcome::Skipped("absent".to_string());
        }
        let desc = format!("truncate {}", path.display());
        if self.dry_run {
            self.audit.info(&format!("DRY-RUN: would {}", desc));
            return ActionOutcome::Simulated(desc);
        }
        match OpenOptions::new().write(true).truncate(true).open(path) {
            Ok(_) => {
                self.audit.info(&desc);
                ActionOutcome::Performed(desc)
            }
            Err(e) => {
                self.audit.warning(&format!("{} failed: {}", desc, e));
                ActionOutcome::Failed(desc, e.raw_os_error().unwrap_or(-1))
            }
        }
    }

    /// Unlink a single file.
    pub fn remove_file(&mut self, path: &Path) -> ActionOutcome {
        if !path.exists() {
            return ActionOutcome::Skipped("absent".to_string());
        }
        let desc = format!("remove {}", path.display());
        if self.dry_run {
            self.audit.info(&format!("DRY-RUN: would {}", desc));
            return ActionOutcome::Simulated(desc);
        }
        match fs::remove_file(path) {
            Ok(()) => {
                self.audit.info(&desc);
                ActionOutcome::Performed(desc)
            }
            Err(e) => {
                self.audit.warning(&format!("{} failed: {}", desc, e));
                ActionOutcome::Failed(desc, e.raw_os_error().unwrap_or(-1))
            }
        }
    }

    /// Recursively remove a directory tree (or a single file).
    pub fn remove_tree(&mut self, path: &Path) -> ActionOutcome {
        if !path.exists() {
            return ActionOutcome::Skipped("absent".to_string());
        }
        if path.is_file() || path.is_symlink() {
            return self.remove_file(path);
        }
        let desc = format!("remove tree {}", path.display());
        if self.dry_run {
            self.audit.info(&format!("DRY-RUN: would {}", desc));
            return ActionOutcome::Simulated(desc);
        }
        match fs::remove_dir_all(path) {
            Ok(()) => {
                self.audit.info(&desc);
                ActionOutcome::Performed(desc)
            }
            Err(e) => {
                self.audit.warning(&format!("{} failed: {}", desc, e));
                ActionOutcome::Failed(desc, e.raw_os_error().unwrap_or(-1))
            }
        }
    }

    /// Rewrite a line-oriented file keeping only its last `keep` lines.
    ///
    /// The new content is written to a fresh temporary file in the same
    /// directory and atomically renamed over the target, so a concurrent
    /// reader or appender never observes a half-written file. An empty
    /// result is replaced by a single placeholder comment line so the file
    /// keeps valid structure. Convergent: a second pass with no new writes
    /// leaves the file unchanged.
    pub fn keep_last_lines(&mut self, path: &Path, keep: usize) -> ActionOutcome {
        if !path.is_file() {
            return ActionOutcome::Skipped("absent".to_string());
        }
        let desc = format!("trim {} to last {} lines", path.display(), keep);
        if self.dry_run {
            self.audit.info(&format!("DRY-RUN: would {}", desc));
            return ActionOutcome::Simulated(desc);
        }
        match trim_file_atomic(path, keep) {
            Ok(()) => {
                self.audit.info(&desc);
                ActionOutcome::Performed(desc)
            }
            Err(e) => {
                self.audit.warning(&format!("{} failed: {}", desc, e));
                ActionOutcome::Failed(desc, e.raw_os_error().unwrap_or(-1))
            }
        }
    }

    /// Multi-pass overwrite followed by unlink. If the overwrite cannot be
    /// performed (permission, odd file type), falls back to a plain unlink.
    pub fn secure_erase(&mut self, path: &Path) -> ActionOutcome {
        if !path.is_file() {
            return ActionOutcome::Skipped("absent".to_string());
        }
        let desc = format!("secure-erase {}", path.display());
        if self.dry_run {
            self.audit.info(&format!("DRY-RUN: would {}", desc));
            return ActionOutcome::Simulated(desc);
        }
        if let Err(e) = overwrite_passes(path) {
            debug!("overwrite of {} failed ({}), plain unlink", path.display(), e);
        }
        match fs::remove_file(path) {
            Ok(()) => {
                self.audit.info(&desc);
                ActionOutcome::Performed(desc)
            }
            Err(e) => {
                self.audit.warning(&format!("{} failed: {}", desc, e));
                ActionOutcome::Failed(desc, e.raw_os_error().unwrap_or(-1))
            }
        }
    }
}

fn trim_file_atomic(path: &Path, keep: usize) -> std::io::Result<()> {
    let content = fs::read(path)?;
    let mut kept: Vec<u8> = Vec::with_capacity(content.len().min(1 << 20));

    // The trailing newline yields one empty final fragment; drop only that,
    // so blank lines inside the kept window survive byte-for-byte.
    let mut lines: Vec<&[u8]> = content.split(|&b| b == b'\n').collect();
    if lines.last().map_or(false, |l| l.is_empty()) {
        lines.pop();
    }
    let start = lines.len().saturating_sub(keep);
    for line in &lines[start..] {
        kept.extend_from_slice(line);
        kept.push(b'\n');
    }
    if kept.is_empty() {
        kept.extend_from_slice(b"# cleared\n");
    }

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let tmp = dir.join(format!(
        ".{}.{}.tmp",
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "trim".to_string()),
        std::process::id()
    ));

    let result = (|| {
        let mut f = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp)?;
        f.write_all(&kept)?;
        f.sync_all()?;
        fs::rename(&tmp, path)
    })();

    if result.is_err() {
        // Never leave the temp file behind.
        let _ = fs::remove_file(&tmp);
    }
    result
}

fn overwrite_passes(path: &Path) -> std::io::Result<()> {
    let len = fs::metadata(path)?.len() as usize;
    if len == 0 {
        return Ok(());
    }
    let mut file = OpenOptions::new().write(true).open(path)?;
    let mut rng = rand::thread_rng();
    let mut buf = vec![0u8; len.min(1 << 20)];

    for pass in 0..ERASE_PASSES {
        file.seek(SeekFrom::Start(0))?;
        let mut remaining = len;
        while remaining > 0 {
            let chunk = remaining.min(buf.len());
            if pass == 1 {
                buf[..chunk].fill(0);
            } else {
                rng.fill_bytes(&mut buf[..chunk]);
            }
            file.write_all(&buf[..chunk])?;
            remaining -= chunk;
        }
        file.sync_all()?;
    }
    Ok(())
}

/// Build an executor wired to an audit sink for the given mode.
pub fn build(mode: Mode, dry_run: bool, audit_path: &Path) -> Executor {
    Executor::new(dry_run, AuditSink::new(audit_path, mode))
}
