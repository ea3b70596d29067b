/// Protected-path matcher
///
/// Decides whether a candidate filesystem object may be acted on at all.
/// Deliberately a small segment-wise matcher instead of regex or full glob:
/// the protected-path semantics must stay auditable in isolation.
///
/// Two pattern classes:
/// - hard patterns protect the path itself and its whole subtree;
/// - keep-file exceptions protect exactly one path, checked after hard
///   patterns, and can only add protection, never remove it.
///
/// A single `*` segment matches exactly one path segment, literally. The
/// matcher is conservative: malformed input (empty or relative paths) is
/// reported as protected.

/// One pre-split pattern. Built once at construction, read-only after that,
/// so the guard is shareable without synchronization.
#[derive(Clone, Debug)]
struct Pattern {
    segments: Vec<Segment>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Literal(String),
    AnyOne,
}

impl Pattern {
    fn parse(raw: &str) -> Self {
        let segments = split_segments(raw)
            .into_iter()
            .map(|s| {
                if s == "*" {
                    Segment::AnyOne
                } else {
                    Segment::Literal(s)
                }
            })
            .collect();
        Self { segments }
    }

    /// True if `path_segs` equals this pattern or lies underneath it.
    fn covers_subtree(&self, path_segs: &[String]) -> bool {
        if path_segs.len() < self.segments.len() {
            return false;
        }
        self.matches_prefix(path_segs)
    }

    /// True if `path_segs` equals this pattern exactly.
    fn covers_exact(&self, path_segs: &[String]) -> bool {
        path_segs.len() == self.segments.len() && self.matches_prefix(path_segs)
    }

    fn matches_prefix(&self, path_segs: &[String]) -> bool {
        self.segments.iter().zip(path_segs).all(|(pat, seg)| match pat {
            Segment::Literal(lit) => lit == seg,
            Segment::AnyOne => true,
        })
    }
}

fn split_segments(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

/// The protected-path matcher. Pure and read-only after construction.
#[derive(Clone, Debug)]
pub struct PathGuard {
    hard: Vec<Pattern>,
    keep_files: Vec<Pattern>,
}

/// Subtrees the sweep must never enter. System configuration, binaries and
/// package state; per-user SSH material.
const DEFAULT_HARD: &[&str] = &[
    "/etc",
    "/boot",
    "/bin",
    "/sbin",
    "/usr",
    "/lib",
    "/lib64",
    "/opt",
    "/srv",
    "/var/lib",
    "/root/.ssh",
    "/home/*/.ssh",
];

/// Single files that must survive even though their parent directory is fair
/// game. Only meaningful under /var/log, which is intentionally not a hard
/// pattern: login accounting records are kept while ordinary logs are swept.
const DEFAULT_KEEP_FILES: &[&str] = &[
    "/var/log/wtmp",
    "/var/log/btmp",
    "/var/log/lastlog",
    "/var/log/faillog",
];

impl PathGuard {
    /// Guard with the built-in protection table.
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_HARD, DEFAULT_KEEP_FILES)
    }

    pub fn new(hard: &[&str], keep_files: &[&str]) -> Self {
        Self {
            hard: hard.iter().map(|p| Pattern::parse(p)).collect(),
            keep_files: keep_files.iter().map(|p| Pattern::parse(p)).collect(),
        }
    }

    /// Whether `path` must not be modified or deleted.
    ///
    /// Fail safe: empty or relative input is always protected.
    pub fn is_protected(&self, path: &str) -> bool {
        let trimmed = path.trim_end_matches('/');
        if trimmed.is_empty() {
            // "" and "/" both land here; refusing to touch the filesystem
            // root is the right call for both.
            return true;
        }
        if !trimmed.starts_with('/') {
            return true;
        }

        let segs = split_segments(trimmed);

        if self.hard.iter().any(|p| p.covers_subtree(&segs)) {
            return true;
        }
        // Exceptions come second and only ever widen protection.
        self.keep_files.iter().any(|p| p.covers_exact(&segs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard() -> PathGuard {
        PathGuard::with_defaults()
    }

    #[test]
    fn test_hard_pattern_protects_itself_and_descendants() {
        let g = guard();
        assert!(g.is_protected("/etc"));
        assert!(g.is_protected("/etc/passwd"));
        assert!(g.is_protected("/etc/ssh/sshd_config"));
        assert!(g.is_protected("/var/lib/dpkg/status"));
    }

    #[test]
    fn test_prefix_match_respects_segment_boundary() {
        let g = guard();
        // /etcetera is not under /etc.
        assert!(!g.is_protected("/etcetera"));
        assert!(!g.is_protected("/var/libvirt"));
    }

    #[test]
    fn test_wildcard_segment_matches_one_segment() {
        let g = guard();
        assert!(g.is_protected("/home/alice/.ssh"));
        assert!(g.is_protected("/home/bob/.ssh/id_ed25519"));
        // Wildcard covers one segment, not two.
        assert!(!g.is_protected("/home/alice/projects/.ssh-agent.log"));
        assert!(!g.is_protected("/home/.ssh"));
    }

    #[test]
    fn test_keep_file_exceptions() {
        let g = guard();
        assert!(g.is_protected("/var/log/wtmp"));
        assert!(g.is_protected("/var/log/btmp"));
        assert!(g.is_protected("/var/log/lastlog"));
        // The parent directory is still sweepable.
        assert!(!g.is_protected("/var/log"));
        assert!(!g.is_protected("/var/log/syslog"));
        assert!(!g.is_protected("/var/log/wtmp.1"));
    }

    #[test]
    fn test_fail_safe_on_malformed_input() {
        let g = guard();
        assert!(g.is_protected(""));
        assert!(g.is_protected("/"));
        assert!(g.is_protected("var/log/syslog"));
        assert!(g.is_protected("relative/path"));
    }

    #[test]
    fn test_trailing_slash_normalized() {
        let g = guard();
        assert!(g.is_protected("/etc/"));
        assert!(g.is_protected("/etc/ssh/"));
        assert!(!g.is_protected("/var/log/"));
    }

    #[test]
    fn test_unprotected_targets() {
        let g = guard();
        assert!(!g.is_protected("/tmp/build-12345"));
        assert!(!g.is_protected("/home/alice/.cache"));
        assert!(!g.is_protected("/home/alice/.bash_history"));
        assert!(!g.is_protected("/var/cache/apt/archives"));
    }
}
