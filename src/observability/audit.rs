/// Audit trail for sweep runs
///
/// Line-oriented append-only log, one record per line:
/// `[2024-05-01 12:00:00] [LEVEL] message`. The file is created lazily on
/// the first write so that a run which never acts leaves no artifact, and it
/// is never created at all in ghost mode. At the end of a non-ghost run its
/// permissions are tightened to owner read/write only.
///
/// Console echo follows the mode's verbosity tier: Standard surfaces every
/// level, Stealth/StealthMax only errors, Ghost nothing except an immediate
/// ERROR line on stderr.
use crate::config::types::{AuditLevel, ConsoleTier, Mode, Result, SweepError};
use chrono::Local;
use log::debug;
use std::fs::OpenOptions;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub struct AuditSink {
    path: PathBuf,
    tier: ConsoleTier,
    enabled: bool,
    session_id: Uuid,
    /// Lazily opened on first write.
    file: Option<std::fs::File>,
}

impl AuditSink {
    pub fn new(path: impl Into<PathBuf>, mode: Mode) -> Self {
        Self {
            path: path.into(),
            tier: mode.console_tier(),
            enabled: mode.audit_enabled(),
            session_id: Uuid::new_v4(),
            file: None,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record. File-write failures degrade to console-only
    /// operation; auditing must never break the sweep itself.
    pub fn record(&mut self, level: AuditLevel, message: &str) {
        self.echo(level, message);

        if !self.enabled {
            return;
        }
        if self.file.is_none() {
            match self.open_file() {
                Ok(f) => self.file = Some(f),
                Err(e) => {
                    debug!("audit sink unavailable, continuing without: {}", e);
                    self.enabled = false;
                    return;
                }
            }
        }
        if let Some(file) = self.file.as_mut() {
            let stamp = Local::now().format("%Y-%m-%d %H:%M:%S");
            let line = format!("[{}] [{}] {}\n", stamp, level.as_str(), message);
            if let Err(e) = file.write_all(line.as_bytes()) {
                debug!("audit write failed: {}", e);
            }
        }
    }

    pub fn info(&mut self, message: &str) {
        self.record(AuditLevel::Info, message);
    }

    pub fn warning(&mut self, message: &str) {
        self.record(AuditLevel::Warning, message);
    }

    pub fn error(&mut self, message: &str) {
        self.record(AuditLevel::Error, message);
    }

    pub fn success(&mut self, message: &str) {
        self.record(AuditLevel::Success, message);
    }

    fn echo(&self, level: AuditLevel, message: &str) {
        match self.tier {
            ConsoleTier::All => {
                if level == AuditLevel::Error {
                    eprintln!("[{}] {}", level.as_str(), message);
                } else {
                    println!("[{}] {}", level.as_str(), message);
                }
            }
            ConsoleTier::ErrorsOnly => {
                if level == AuditLevel::Error {
                    eprintln!("[{}] {}", level.as_str(), message);
                }
            }
            ConsoleTier::Silent => {
                // Ghost still surfaces hard errors immediately.
                if level == AuditLevel::Error {
                    eprintln!("{}", message);
                }
            }
        }
    }

    fn open_file(&self) -> Result<std::fs::File> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SweepError::Audit(format!("create audit directory: {}", e)))?;
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| SweepError::Audit(format!("open audit log {}: {}", self.path.display(), e)))
    }

    /// Whether any record has been flushed to disk this run.
    pub fn file_created(&self) -> bool {
        self.file.is_some()
    }

    /// Tighten the audit file to owner read/write only. Called at the end of
    /// a non-ghost run; a missing file (nothing was logged) is a no-op.
    pub fn tighten_permissions(&self) -> Result<()> {
        if !self.path.exists() {
            return Ok(());
        }
        std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
            .map_err(|e| SweepError::Audit(format!("chmod audit log: {}", e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::Mode;
    use tempfile::TempDir;

    #[test]
    fn test_lazy_creation_and_line_format() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("audit.log");
        let mut sink = AuditSink::new(&path, Mode::Stealth);

        assert!(!path.exists(), "no file before first write");
        sink.info("journal vacuum complete");
        sink.warning("apt clean exited with status 1");
        assert!(path.exists());

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("[INFO] journal vacuum complete"));
        assert!(lines[1].contains("[WARNING] apt clean exited with status 1"));
        // Timestamp bracket leads every record.
        assert!(lines[0].starts_with('['));
    }

    #[test]
    fn test_ghost_mode_never_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("audit.log");
        let mut sink = AuditSink::new(&path, Mode::Ghost);

        sink.info("should not persist");
        sink.success("nor this");
        assert!(!path.exists());
        assert!(!sink.file_created());
    }

    #[test]
    fn test_tighten_permissions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("audit.log");
        let mut sink = AuditSink::new(&path, Mode::Standard);
        sink.info("one record");
        sink.tighten_permissions().unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_tighten_permissions_without_file_is_noop() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("never-created.log");
        let sink = AuditSink::new(&path, Mode::Standard);
        assert!(sink.tighten_permissions().is_ok());
    }
}
