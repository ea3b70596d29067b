/// Package-cache driver
///
/// Detects the host package manager and maps the resolved cache action onto
/// its native clean subcommand. The purge-lists variant (StealthMax and up)
/// uses the manager's deeper clean where one exists.
use crate::config::types::ActionOutcome;
use crate::exec::Executor;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PackageManager {
    Apt,
    Dnf,
    Yum,
    Pacman,
    Zypper,
}

impl PackageManager {
    /// Probe PATH for a known package manager, first match wins.
    pub fn detect() -> Option<Self> {
        const CANDIDATES: [(&str, PackageManager); 5] = [
            ("apt-get", PackageManager::Apt),
            ("dnf", PackageManager::Dnf),
            ("yum", PackageManager::Yum),
            ("pacman", PackageManager::Pacman),
            ("zypper", PackageManager::Zypper),
        ];
        CANDIDATES
            .iter()
            .find(|(tool, _)| Executor::probe_tool(tool).is_some())
            .map(|(_, pm)| *pm)
    }

    /// Native clean invocations for this manager.
    pub fn clean_commands(self, purge_lists: bool) -> Vec<Vec<&'static str>> {
        match self {
            PackageManager::Apt => {
                let mut cmds = vec![vec!["apt-get", "clean"]];
                if purge_lists {
                    cmds.push(vec!["apt-get", "autoclean"]);
                }
                cmds
            }
            PackageManager::Dnf => {
                if purge_lists {
                    vec![vec!["dnf", "clean", "all"]]
                } else {
                    vec![vec!["dnf", "clean", "packages"]]
                }
            }
            PackageManager::Yum => {
                if purge_lists {
                    vec![vec!["yum", "clean", "all"]]
                } else {
                    vec![vec!["yum", "clean", "packages"]]
                }
            }
            PackageManager::Pacman => {
                if purge_lists {
                    vec![vec!["pacman", "-Scc", "--noconfirm"]]
                } else {
                    vec![vec!["pacman", "-Sc", "--noconfirm"]]
                }
            }
            PackageManager::Zypper => {
                if purge_lists {
                    vec![vec!["zypper", "clean", "--all"]]
                } else {
                    vec![vec!["zypper", "clean"]]
                }
            }
        }
    }

    /// Run the native clean through the executor, one outcome per command.
    pub fn clean(self, ex: &mut Executor, purge_lists: bool) -> Vec<ActionOutcome> {
        self.clean_commands(purge_lists)
            .iter()
            .map(|argv| ex.run_command(argv))
            .collect()
    }
}
