// Latency: resolve targets once, then one bounded-parallel probe round per cycle

use super::{CycleContext, Subsystem};
use crate::archive::{FileKey, Schema};
use crate::chart::{ChartSpec, LATENCY_CHARTS};
use crate::error::CollectError;
use crate::latency::{ProbeScheduler, ScheduledTarget, resolve_targets};
use crate::models::ProbeTarget;
use crate::route::Routes;
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub const DATA_SOURCES: &[&str] = &["min", "avg", "max", "loss"];

pub struct LatencySubsystem {
    prefix: String,
    configured: Vec<ProbeTarget>,
    discover_gateways: bool,
    routes: Arc<dyn Routes>,
    scheduler: ProbeScheduler,
    targets: Vec<ScheduledTarget>,
}

impl LatencySubsystem {
    pub fn new(
        prefix: &str,
        configured: Vec<ProbeTarget>,
        discover_gateways: bool,
        routes: Arc<dyn Routes>,
        scheduler: ProbeScheduler,
    ) -> Self {
        Self {
            prefix: prefix.to_string(),
            configured,
            discover_gateways,
            routes,
            scheduler,
            targets: Vec::new(),
        }
    }

    /// Targets fixed at `init`.
    pub fn targets(&self) -> &[ScheduledTarget] {
        &self.targets
    }
}

#[async_trait]
impl Subsystem for LatencySubsystem {
    fn name(&self) -> &'static str {
        "latency"
    }

    async fn init(&mut self, cancel: &CancellationToken) -> Result<(), CollectError> {
        let resolved = resolve_targets(
            &self.configured,
            self.discover_gateways,
            self.routes.as_ref(),
            cancel,
        )
        .await?;
        self.targets = resolved
            .into_iter()
            .map(|target| ScheduledTarget {
                key: FileKey::entity(&self.prefix, "latency", &target.name),
                target,
            })
            .collect();
        tracing::info!(
            targets = self.targets.len(),
            max_parallel = self.scheduler.max_parallel(),
            "probe targets resolved"
        );
        Ok(())
    }

    fn archives(&self) -> Vec<(FileKey, Schema)> {
        self.targets
            .iter()
            .map(|t| {
                (
                    t.key.clone(),
                    Schema::gauges(DATA_SOURCES).with_max(&["loss"], 100.0),
                )
            })
            .collect()
    }

    fn charts(&self) -> &'static [ChartSpec] {
        LATENCY_CHARTS
    }

    async fn cycle(&mut self, ctx: &CycleContext<'_>) -> Result<(), CollectError> {
        self.scheduler
            .run_cycle(&self.targets, ctx.archive, ctx.cancel)
            .await;
        crate::procfs::check_cancel(ctx.cancel)
    }
}
