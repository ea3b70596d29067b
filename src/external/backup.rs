/// Backup exporter
///
/// Copies the log subtree and root-owned shell history files into a
/// timestamped directory before the sweep touches them, and writes a
/// manifest listing every copied file. Per-file copy failures are warnings;
/// the export keeps going.
use crate::config::run_config::RunConfig;
use crate::exec::Executor;
use chrono::Local;
use log::debug;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct Manifest {
    created: String,
    files: Vec<String>,
}

pub struct BackupExporter;

impl BackupExporter {
    /// Export logs and root history. Returns the backup directory when one
    /// was created (live run only; dry-run simulates and creates nothing).
    pub fn export(cfg: &RunConfig, ex: &mut Executor) -> Option<PathBuf> {
        let stamp = Local::now().format("%Y%m%d-%H%M%S");
        let dest = cfg.backup_parent.join(format!("syssweep-{}", stamp));

        if ex.dry_run() {
            ex.audit()
                .info(&format!("DRY-RUN: would export backup to {}", dest.display()));
            return None;
        }

        if let Err(e) = fs::create_dir_all(&dest) {
            ex.audit()
                .warning(&format!("backup dir {} failed: {}", dest.display(), e));
            return None;
        }

        let mut copied = Vec::new();
        copy_tree(&cfg.log_root, &dest.join("logs"), &mut copied, ex);

        for name in [".bash_history", ".zsh_history", ".histfile"] {
            let src = cfg.root_home.join(name);
            if src.is_file() {
                let target = dest.join(name.trim_start_matches('.'));
                match fs::copy(&src, &target) {
                    Ok(_) => copied.push(src.to_string_lossy().into_owned()),
                    Err(e) => ex
                        .audit()
                        .warning(&format!("backup copy {} failed: {}", src.display(), e)),
                }
            }
        }

        let file_count = copied.len();
        let manifest = Manifest {
            created: stamp.to_string(),
            files: copied,
        };
        match serde_json::to_vec_pretty(&manifest) {
            Ok(bytes) => {
                if let Err(e) = fs::write(dest.join("manifest.json"), bytes) {
                    ex.audit().warning(&format!("manifest write failed: {}", e));
                }
            }
            Err(e) => debug!("manifest serialize failed: {}", e),
        }

        ex.audit().success(&format!(
            "backup exported to {} ({} files)",
            dest.display(),
            file_count
        ));
        Some(dest)
    }
}

fn copy_tree(src: &Path, dest: &Path, copied: &mut Vec<String>, ex: &mut Executor) {
    if !src.is_dir() {
        return;
    }
    if let Err(e) = fs::create_dir_all(dest) {
        ex.audit()
            .warning(&format!("backup mkdir {} failed: {}", dest.display(), e));
        return;
    }
    let entries = match fs::read_dir(src) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("backup readdir {} failed: {}", src.display(), e);
            return;
        }
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let target = dest.join(entry.file_name());
        if path.is_symlink() {
            continue;
        }
        if path.is_dir() {
            copy_tree(&path, &target, copied, ex);
        } else if path.is_file() {
            match fs::copy(&path, &target) {
                Ok(_) => copied.push(path.to_string_lossy().into_owned()),
                Err(e) => ex
                    .audit()
                    .warning(&format!("backup copy {} failed: {}", path.display(), e)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::Mode;
    use crate::exec;
    use tempfile::TempDir;

    fn cfg(dir: &TempDir) -> RunConfig {
        RunConfig {
            log_root: dir.path().join("var/log"),
            root_home: dir.path().join("root"),
            backup_parent: dir.path().join("var/backups"),
            ..RunConfig::default()
        }
    }

    #[test]
    fn test_export_copies_logs_and_history_with_manifest() {
        let dir = TempDir::new().unwrap();
        let cfg = cfg(&dir);
        fs::create_dir_all(cfg.log_root.join("nginx")).unwrap();
        fs::write(cfg.log_root.join("syslog"), "log data\n").unwrap();
        fs::write(cfg.log_root.join("nginx/access.log"), "hits\n").unwrap();
        fs::create_dir_all(&cfg.root_home).unwrap();
        fs::write(cfg.root_home.join(".bash_history"), "cmd\n").unwrap();

        let mut ex = exec::build(Mode::Standard, false, &dir.path().join("audit.log"));
        let dest = BackupExporter::export(&cfg, &mut ex).expect("backup dir");

        assert!(dest.join("logs/syslog").is_file());
        assert!(dest.join("logs/nginx/access.log").is_file());
        assert!(dest.join("bash_history").is_file());

        let manifest: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dest.join("manifest.json")).unwrap()).unwrap();
        let files = manifest["files"].as_array().unwrap();
        assert_eq!(files.len(), 3);
    }

    #[test]
    fn test_dry_run_creates_nothing() {
        let dir = TempDir::new().unwrap();
        let cfg = cfg(&dir);
        fs::create_dir_all(&cfg.log_root).unwrap();

        let mut ex = exec::build(Mode::Standard, true, &dir.path().join("audit.log"));
        assert!(BackupExporter::export(&cfg, &mut ex).is_none());
        assert!(!cfg.backup_parent.exists());
    }
}
