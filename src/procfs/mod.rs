// Counter readers over a proc filesystem root.
// Each reader checks cancellation before reading and per line while parsing,
// and returns a complete snapshot or a CollectError. No caching, no retries.

mod disk;
mod linux;
mod net;
mod pid;
mod stat;
mod system;

pub use disk::{parse_diskstats, parse_mounts};
pub use linux::{device_numbers, filesystem_usage, page_size, ticks_per_second};
pub use net::parse_net_dev;
pub use pid::{parse_pid_io, parse_pid_stat, parse_status_ctxt};
pub use stat::{parse_interrupts, parse_kernel_counters};
pub use system::{
    parse_entropy, parse_fs_handle_usage, parse_loadavg, parse_meminfo, parse_status_state,
    parse_uptime,
};

use crate::error::CollectError;
use crate::models::*;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

pub const DEFAULT_PROC_ROOT: &str = "/proc";

/// Returns `Cancelled` once the token fires.
pub fn check_cancel(cancel: &CancellationToken) -> Result<(), CollectError> {
    if cancel.is_cancelled() {
        Err(CollectError::Cancelled)
    } else {
        Ok(())
    }
}

/// Line iterator that yields `Cancelled` as soon as the token fires.
pub(crate) fn lines<'a>(
    text: &'a str,
    cancel: &'a CancellationToken,
) -> impl Iterator<Item = Result<&'a str, CollectError>> + 'a {
    text.lines().map(move |line| check_cancel(cancel).map(|_| line))
}

pub(crate) fn parse_field<T: std::str::FromStr>(
    what: &str,
    field: Option<&str>,
) -> Result<T, CollectError> {
    let raw = field.ok_or_else(|| CollectError::parse(what, "missing field"))?;
    raw.parse::<T>()
        .map_err(|_| CollectError::parse(what, format!("invalid number {raw:?}")))
}

/// Reader handle rooted at a proc mount (`/proc` in production, a temp tree in tests).
#[derive(Debug, Clone)]
pub struct ProcFs {
    root: PathBuf,
}

impl Default for ProcFs {
    fn default() -> Self {
        Self::new(DEFAULT_PROC_ROOT)
    }
}

impl ProcFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    fn read(&self, rel: &str, cancel: &CancellationToken) -> Result<String, CollectError> {
        check_cancel(cancel)?;
        let path = self.path(rel);
        std::fs::read_to_string(&path).map_err(|e| CollectError::io(path, e))
    }

    /// `stat`: CPU times, context switches, forks.
    pub fn kernel_counters(&self, cancel: &CancellationToken) -> Result<KernelCounters, CollectError> {
        let text = self.read("stat", cancel)?;
        parse_kernel_counters(&text, cancel)
    }

    /// `intr` line of `stat`.
    pub fn interrupts(&self, cancel: &CancellationToken) -> Result<InterruptCounters, CollectError> {
        let text = self.read("stat", cancel)?;
        parse_interrupts(&text, cancel)
    }

    /// `net/dev`, in file order.
    pub fn net_dev(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<(String, NetIfCounters)>, CollectError> {
        let text = self.read("net/dev", cancel)?;
        parse_net_dev(&text, cancel)
    }

    pub fn diskstats(&self, cancel: &CancellationToken) -> Result<Vec<DiskCounters>, CollectError> {
        let text = self.read("diskstats", cancel)?;
        parse_diskstats(&text, cancel)
    }

    pub fn mounts(&self, cancel: &CancellationToken) -> Result<Vec<Mount>, CollectError> {
        let text = self.read("self/mounts", cancel)?;
        parse_mounts(&text, cancel)
    }

    pub fn meminfo(&self, cancel: &CancellationToken) -> Result<MemInfo, CollectError> {
        let text = self.read("meminfo", cancel)?;
        parse_meminfo(&text, cancel)
    }

    pub fn loadavg(&self, cancel: &CancellationToken) -> Result<LoadAvg, CollectError> {
        let text = self.read("loadavg", cancel)?;
        parse_loadavg(&text)
    }

    pub fn entropy(&self, cancel: &CancellationToken) -> Result<u64, CollectError> {
        let text = self.read("sys/kernel/random/entropy_avail", cancel)?;
        parse_entropy(&text)
    }

    /// System uptime in seconds.
    pub fn uptime(&self, cancel: &CancellationToken) -> Result<f64, CollectError> {
        let text = self.read("uptime", cancel)?;
        parse_uptime(&text)
    }

    /// Dentry cache, file handle and inode usage from `sys/fs`.
    pub fn fs_handle_usage(&self, cancel: &CancellationToken) -> Result<FsHandleUsage, CollectError> {
        let dentry = self.read("sys/fs/dentry-state", cancel)?;
        let file = self.read("sys/fs/file-nr", cancel)?;
        let inode = self.read("sys/fs/inode-nr", cancel)?;
        parse_fs_handle_usage(&dentry, &file, &inode)
    }

    /// Numeric entries of the proc root.
    pub fn pids(&self, cancel: &CancellationToken) -> Result<Vec<u32>, CollectError> {
        check_cancel(cancel)?;
        let entries = std::fs::read_dir(&self.root).map_err(|e| CollectError::io(&self.root, e))?;
        let mut pids = Vec::new();
        for entry in entries.flatten() {
            check_cancel(cancel)?;
            if let Some(pid) = entry.file_name().to_str().and_then(|s| s.parse::<u32>().ok()) {
                pids.push(pid);
            }
        }
        pids.sort_unstable();
        Ok(pids)
    }

    /// Census of `State:` letters across every `<pid>/status`. Processes that
    /// exit while scanning are skipped.
    pub fn process_states(&self, cancel: &CancellationToken) -> Result<ProcessStates, CollectError> {
        let mut states = ProcessStates::default();
        for pid in self.pids(cancel)? {
            match self.read(&format!("{pid}/status"), cancel) {
                Ok(text) => {
                    if let Some(state) = parse_status_state(&text) {
                        states.count(state);
                    }
                }
                Err(CollectError::Cancelled) => return Err(CollectError::Cancelled),
                Err(_) => continue,
            }
        }
        Ok(states)
    }

    pub fn pid_stat(&self, pid: u32, cancel: &CancellationToken) -> Result<PidStat, CollectError> {
        let text = self.read(&format!("{pid}/stat"), cancel)?;
        parse_pid_stat(pid, &text)
    }

    pub fn pid_io(&self, pid: u32, cancel: &CancellationToken) -> Result<PidIo, CollectError> {
        let text = self.read(&format!("{pid}/io"), cancel)?;
        parse_pid_io(&text, cancel)
    }

    /// Open descriptors (entries in `<pid>/fdinfo`) and context switches from `<pid>/status`.
    pub fn pid_fd_ctx(&self, pid: u32, cancel: &CancellationToken) -> Result<PidFdCtx, CollectError> {
        check_cancel(cancel)?;
        let fdinfo = self.path(&format!("{pid}/fdinfo"));
        let open_fds = std::fs::read_dir(&fdinfo)
            .map_err(|e| CollectError::io(&fdinfo, e))?
            .count() as u64;
        let status = self.read(&format!("{pid}/status"), cancel)?;
        let (voluntary, involuntary) = parse_status_ctxt(&status, cancel)?;
        Ok(PidFdCtx {
            open_fds,
            voluntary_ctxt_switches: voluntary,
            involuntary_ctxt_switches: involuntary,
        })
    }
}
