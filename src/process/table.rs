// Process table snapshot via sysinfo and PID resolution by logical name

use crate::error::CollectError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

/// One row of the process table: PID, short command name, full argv.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEntry {
    pub pid: u32,
    pub comm: String,
    pub args: Vec<String>,
}

impl ProcessEntry {
    pub fn new(pid: u32, comm: impl Into<String>, args: &[&str]) -> Self {
        Self {
            pid,
            comm: comm.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Base name of `argv[0]`, if any.
    pub fn exe_base_name(&self) -> Option<&str> {
        let first = self.args.first()?.split_whitespace().next()?;
        Path::new(first).file_name()?.to_str()
    }
}

/// Point-in-time source of the process table.
#[async_trait]
pub trait ProcessLister: Send + Sync {
    async fn list(&self, cancel: &CancellationToken) -> Result<Vec<ProcessEntry>, CollectError>;
}

/// Resolve configured names to PIDs. A process matches by short command name
/// first, then by the base name of its first argument. Configured names are
/// compared trimmed and the result is keyed by the name as configured. Names
/// with no match are absent from the result.
pub fn match_processes(entries: &[ProcessEntry], names: &[String]) -> HashMap<String, Vec<u32>> {
    let mut out: HashMap<String, Vec<u32>> = HashMap::new();
    let configured = |n: &str| {
        names
            .iter()
            .find(|w| !n.is_empty() && w.trim() == n)
            .cloned()
    };
    for e in entries {
        let name = configured(&e.comm).or_else(|| e.exe_base_name().and_then(|exe| configured(exe)));
        if let Some(name) = name {
            out.entry(name).or_default().push(e.pid);
        }
    }
    for pids in out.values_mut() {
        pids.sort_unstable();
    }
    out
}

/// Live process table backed by sysinfo.
pub struct ProcessTable {
    sys: Arc<std::sync::Mutex<System>>,
}

impl Default for ProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessTable {
    pub fn new() -> Self {
        Self {
            sys: Arc::new(std::sync::Mutex::new(System::new())),
        }
    }
}

#[async_trait]
impl ProcessLister for ProcessTable {
    #[instrument(skip(self, cancel), fields(repo = "sysinfo", operation = "list_processes"))]
    async fn list(&self, cancel: &CancellationToken) -> Result<Vec<ProcessEntry>, CollectError> {
        crate::procfs::check_cancel(cancel)?;
        let sys = self.sys.clone();
        tokio::task::spawn_blocking(move || {
            let mut sys = sys.lock().map_err(|e| {
                CollectError::io(
                    "process table",
                    std::io::Error::other(format!("sysinfo lock poisoned: {e}")),
                )
            })?;
            sys.refresh_processes_specifics(
                ProcessesToUpdate::All,
                true,
                ProcessRefreshKind::nothing().with_cmd(UpdateKind::OnlyIfNotSet),
            );
            Ok(sys
                .processes()
                .values()
                .filter(|p| p.thread_kind().is_none())
                .map(|p| ProcessEntry {
                    pid: p.pid().as_u32(),
                    comm: p.name().to_string_lossy().into_owned(),
                    args: p
                        .cmd()
                        .iter()
                        .map(|a| a.to_string_lossy().into_owned())
                        .collect(),
                })
                .collect())
        })
        .await
        .map_err(|e| {
            CollectError::io(
                "process table",
                std::io::Error::other(format!("sysinfo task join: {e}")),
            )
        })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn matches_comm_before_argv_base_name() {
        let entries = vec![
            ProcessEntry::new(10, "nginx", &["nginx: master process"]),
            ProcessEntry::new(11, "nginx", &["nginx: worker process"]),
            ProcessEntry::new(20, "python3", &["/usr/local/bin/gunicorn", "app:wsgi"]),
            ProcessEntry::new(30, "bash", &["-bash"]),
        ];
        let m = match_processes(&entries, &names(&["nginx", "gunicorn", "postgres"]));
        assert_eq!(m["nginx"], vec![10, 11]);
        assert_eq!(m["gunicorn"], vec![20]);
        assert!(!m.contains_key("postgres"));
    }

    #[test]
    fn padded_name_is_keyed_as_configured() {
        let entries = vec![ProcessEntry::new(10, "nginx", &["nginx"])];
        let m = match_processes(&entries, &names(&[" nginx "]));
        assert_eq!(m.get(" nginx "), Some(&vec![10]));
        assert!(!m.contains_key("nginx"));
    }

    #[test]
    fn exe_base_name_of_empty_args_is_none() {
        assert_eq!(ProcessEntry::new(1, "kthreadd", &[]).exe_base_name(), None);
        assert_eq!(
            ProcessEntry::new(2, "x", &["/usr/sbin/sshd", "-D"]).exe_base_name(),
            Some("sshd")
        );
    }
}
