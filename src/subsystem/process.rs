// Logical processes: PID resolution by name, per-name aggregation and rates

use super::{CycleContext, Subsystem, append_logged};
use crate::archive::{FileKey, Schema};
use crate::chart::{ChartSpec, PROCESS_CHARTS};
use crate::error::CollectError;
use crate::process::{
    ProcessAggregate, ProcessAggregator, ProcessLister, SystemContext, match_processes,
    read_pid_samples,
};
use crate::procfs::{ProcFs, page_size, ticks_per_second};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::instrument;

pub const DATA_SOURCES: &[&str] = &[
    "cpu", "mem", "dsk", "net", "nof", "pro", "nth", "vcs", "ics", "upt",
];

/// Process entry from config.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProcessSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

pub struct ProcessSubsystem {
    procfs: ProcFs,
    lister: Arc<dyn ProcessLister>,
    names: Vec<String>,
    keys: Vec<FileKey>,
    aggregator: ProcessAggregator,
    ticks_per_sec: u64,
    page_size: u64,
}

impl ProcessSubsystem {
    pub fn new(
        procfs: ProcFs,
        prefix: &str,
        processes: &[ProcessSpec],
        lister: Arc<dyn ProcessLister>,
    ) -> Self {
        let names: Vec<String> = processes.iter().map(|p| p.name.trim().to_string()).collect();
        let keys = names
            .iter()
            .map(|n| FileKey::entity(prefix, "process", n))
            .collect();
        Self {
            procfs,
            lister,
            names,
            keys,
            aggregator: ProcessAggregator::new(),
            ticks_per_sec: ticks_per_second(),
            page_size: page_size(),
        }
    }

    pub fn aggregator(&self) -> &ProcessAggregator {
        &self.aggregator
    }
}

#[async_trait]
impl Subsystem for ProcessSubsystem {
    fn name(&self) -> &'static str {
        "process"
    }

    fn archives(&self) -> Vec<(FileKey, Schema)> {
        self.keys
            .iter()
            .map(|k| (k.clone(), Schema::gauges(DATA_SOURCES)))
            .collect()
    }

    fn charts(&self) -> &'static [ChartSpec] {
        PROCESS_CHARTS
    }

    #[instrument(skip_all, fields(subsystem = "process"))]
    async fn cycle(&mut self, ctx: &CycleContext<'_>) -> Result<(), CollectError> {
        let counters = self.procfs.kernel_counters(ctx.cancel)?;
        let sys = SystemContext {
            total_cpu_ticks: counters.cpu.total(),
            uptime_secs: self.procfs.uptime(ctx.cancel)?,
            ticks_per_sec: self.ticks_per_sec,
            page_size: self.page_size,
        };

        let entries = self.lister.list(ctx.cancel).await?;
        let mut matched = match_processes(&entries, &self.names);

        for (name, key) in self.names.iter().zip(&self.keys) {
            crate::procfs::check_cancel(ctx.cancel)?;
            let pids = matched.remove(name).unwrap_or_default();
            if pids.is_empty() {
                tracing::info!(entity = %name, "no running process matched");
                self.aggregator.forget(name);
                continue;
            }

            let samples = read_pid_samples(&self.procfs, &pids, ctx.cancel)?;
            if samples.is_empty() {
                tracing::info!(entity = %name, pids = pids.len(), "no readable pid");
                self.aggregator.forget(name);
                continue;
            }

            let agg = ProcessAggregate::fold(&samples, &sys);
            let rates = self
                .aggregator
                .update(name, &agg, sys.total_cpu_ticks, ctx.now);
            append_logged(ctx.archive, self.name(), key, &rates.row()).await;
        }
        Ok(())
    }
}
