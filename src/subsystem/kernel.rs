// Kernel: CPU state distribution, pass-through counters, VFS usage

use super::{CycleContext, Subsystem, append_logged};
use crate::archive::{FileKey, Schema};
use crate::chart::{ChartSpec, KERNEL_CHARTS};
use crate::error::CollectError;
use crate::history::HistoryStore;
use crate::models::{CpuTimes, FsHandleUsage, KernelCounters, Metric};
use crate::procfs::ProcFs;
use crate::rate::percentage_distribution;
use async_trait::async_trait;
use tracing::instrument;

pub const DATA_SOURCES: &[&str] = &[
    "user", "nice", "sys", "idle", "iow", "irq", "sirq", "steal", "guest", "cs", "forks",
    "vforks", "dentry", "file", "inode",
];

const PERCENT_COLUMNS: &[&str] = &[
    "user", "nice", "sys", "idle", "iow", "irq", "sirq", "steal", "guest", "dentry", "file",
    "inode",
];

const HISTORY_KEY: &str = "cpu";

/// One kernel archive row. CPU percentages are all `Undefined` without a
/// previous sample or when the distribution is invalid; context switches and
/// forks are raw cumulative counters and always defined.
pub fn kernel_row(
    current: &KernelCounters,
    previous: Option<&CpuTimes>,
    vfs: &FsHandleUsage,
) -> Vec<Metric> {
    let mut row = match previous {
        Some(prev) => percentage_distribution(&current.cpu.states(), &prev.states()).percentages,
        None => vec![Metric::Undefined; current.cpu.states().len()],
    };
    row.push(Metric::from(current.context_switches));
    row.push(Metric::from(current.forks));
    row.push(Metric::from(current.vforks));
    row.push(Metric::from_f64(vfs.dentry));
    row.push(Metric::from_f64(vfs.file));
    row.push(Metric::from_f64(vfs.inode));
    row
}

pub struct KernelSubsystem {
    procfs: ProcFs,
    key: FileKey,
    history: HistoryStore<CpuTimes>,
}

impl KernelSubsystem {
    pub fn new(procfs: ProcFs, prefix: &str) -> Self {
        Self {
            procfs,
            key: FileKey::host(prefix, "kernel"),
            history: HistoryStore::new(),
        }
    }

    pub fn key(&self) -> &FileKey {
        &self.key
    }
}

#[async_trait]
impl Subsystem for KernelSubsystem {
    fn name(&self) -> &'static str {
        "kernel"
    }

    fn archives(&self) -> Vec<(FileKey, Schema)> {
        vec![(
            self.key.clone(),
            Schema::gauges(DATA_SOURCES).with_max(PERCENT_COLUMNS, 100.0),
        )]
    }

    fn charts(&self) -> &'static [ChartSpec] {
        KERNEL_CHARTS
    }

    #[instrument(skip_all, fields(subsystem = "kernel"))]
    async fn cycle(&mut self, ctx: &CycleContext<'_>) -> Result<(), CollectError> {
        let counters = self.procfs.kernel_counters(ctx.cancel)?;
        let vfs = self.procfs.fs_handle_usage(ctx.cancel)?;

        let row = kernel_row(
            &counters,
            self.history.get(HISTORY_KEY).map(|r| &r.sample),
            &vfs,
        );
        self.history.replace(HISTORY_KEY, ctx.now, counters.cpu);

        append_logged(ctx.archive, self.name(), &self.key, &row).await;
        Ok(())
    }
}
