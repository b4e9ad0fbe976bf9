// System gauges: memory, load, process states, entropy, uptime

use super::{CycleContext, Subsystem, append_logged};
use crate::archive::{FileKey, Schema};
use crate::chart::{ChartSpec, SYSTEM_CHARTS};
use crate::error::CollectError;
use crate::models::Metric;
use crate::procfs::ProcFs;
use async_trait::async_trait;
use tracing::instrument;

pub const DATA_SOURCES: &[&str] = &[
    "mem_total",
    "mem_free",
    "mem_buffers",
    "mem_cached",
    "mem_active",
    "mem_inactive",
    "load1",
    "load5",
    "load15",
    "proc_run",
    "proc_sleep",
    "proc_wio",
    "proc_zombie",
    "proc_stop",
    "proc_swap",
    "proc_total",
    "entropy",
    "uptime",
];

pub struct SystemSubsystem {
    procfs: ProcFs,
    key: FileKey,
}

impl SystemSubsystem {
    pub fn new(procfs: ProcFs, prefix: &str) -> Self {
        Self {
            procfs,
            key: FileKey::host(prefix, "system"),
        }
    }

    pub fn key(&self) -> &FileKey {
        &self.key
    }
}

#[async_trait]
impl Subsystem for SystemSubsystem {
    fn name(&self) -> &'static str {
        "system"
    }

    fn archives(&self) -> Vec<(FileKey, Schema)> {
        vec![(self.key.clone(), Schema::gauges(DATA_SOURCES))]
    }

    fn charts(&self) -> &'static [ChartSpec] {
        SYSTEM_CHARTS
    }

    #[instrument(skip_all, fields(subsystem = "system"))]
    async fn cycle(&mut self, ctx: &CycleContext<'_>) -> Result<(), CollectError> {
        let mem = self.procfs.meminfo(ctx.cancel)?;
        let load = self.procfs.loadavg(ctx.cancel)?;
        let procs = self.procfs.process_states(ctx.cancel)?;
        let entropy = self.procfs.entropy(ctx.cancel)?;
        let uptime = self.procfs.uptime(ctx.cancel)?;

        let row = vec![
            Metric::from(mem.total),
            Metric::from(mem.free),
            Metric::from(mem.buffers),
            Metric::from(mem.cached),
            Metric::from(mem.active),
            Metric::from(mem.inactive),
            Metric::from_f64(load.one),
            Metric::from_f64(load.five),
            Metric::from_f64(load.fifteen),
            Metric::from(procs.run),
            Metric::from(procs.sleep),
            Metric::from(procs.wio),
            Metric::from(procs.zombie),
            Metric::from(procs.stop),
            Metric::from(procs.swap),
            Metric::from(procs.total()),
            Metric::from(entropy),
            Metric::from_f64(uptime),
        ];
        append_logged(ctx.archive, self.name(), &self.key, &row).await;
        Ok(())
    }
}
