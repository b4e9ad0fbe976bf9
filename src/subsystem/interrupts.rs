// Interrupt activity: rate of the `intr` total

use super::{CycleContext, Subsystem, append_logged};
use crate::archive::{FileKey, Schema};
use crate::chart::{ChartSpec, INTERRUPTS_CHARTS};
use crate::error::CollectError;
use crate::history::HistoryStore;
use crate::models::Metric;
use crate::procfs::ProcFs;
use crate::rate::rate_u64;
use async_trait::async_trait;

pub const DATA_SOURCES: &[&str] = &["total"];

const HISTORY_KEY: &str = "interrupts";

pub struct InterruptsSubsystem {
    procfs: ProcFs,
    key: FileKey,
    history: HistoryStore<u64>,
}

impl InterruptsSubsystem {
    pub fn new(procfs: ProcFs, prefix: &str) -> Self {
        Self {
            procfs,
            key: FileKey::host(prefix, "interrupts"),
            history: HistoryStore::new(),
        }
    }

    pub fn key(&self) -> &FileKey {
        &self.key
    }
}

#[async_trait]
impl Subsystem for InterruptsSubsystem {
    fn name(&self) -> &'static str {
        "interrupts"
    }

    fn archives(&self) -> Vec<(FileKey, Schema)> {
        vec![(self.key.clone(), Schema::gauges(DATA_SOURCES))]
    }

    fn charts(&self) -> &'static [ChartSpec] {
        INTERRUPTS_CHARTS
    }

    async fn cycle(&mut self, ctx: &CycleContext<'_>) -> Result<(), CollectError> {
        let intr = self.procfs.interrupts(ctx.cancel)?;
        let per_sec = match self.history.replace(HISTORY_KEY, ctx.now, intr.total) {
            Some(prev) => rate_u64(intr.total, prev.sample, ctx.now - prev.at),
            None => 0.0,
        };
        append_logged(ctx.archive, self.name(), &self.key, &[Metric::from_f64(per_sec)]).await;
        Ok(())
    }
}
