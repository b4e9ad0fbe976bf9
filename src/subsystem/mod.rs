// Per-subsystem orchestration: one independent, cancellable polling loop each.
// Loop shape: first cycle immediately, then a fixed-period interval (missed ticks
// skipped), a separate render tick, and shutdown via the shared token.

mod connections;
mod filesystem;
mod interrupts;
mod kernel;
mod latency;
mod netif;
mod process;
mod system;

pub use connections::{ConnTool, ConnectionsSubsystem, parse_netstat, parse_ss};
pub use filesystem::{DeviceLookup, FilesystemSubsystem, UsageLookup, mount_entity};
pub use interrupts::InterruptsSubsystem;
pub use kernel::{KernelSubsystem, kernel_row};
pub use latency::LatencySubsystem;
pub use netif::{InterfaceSpec, NetifSubsystem};
pub use process::{ProcessSpec, ProcessSubsystem};
pub use system::SystemSubsystem;

use crate::archive::{Archive, FileKey, RetentionPolicy, Schema};
use crate::chart::{ChartSpec, Period};
use crate::error::CollectError;
use crate::history::now_secs;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::time::{Duration, Instant, MissedTickBehavior, interval, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Inputs of one sampling cycle.
pub struct CycleContext<'a> {
    /// Wall-clock seconds; rates use differences of this value.
    pub now: f64,
    pub archive: &'a Arc<dyn Archive>,
    pub cancel: &'a CancellationToken,
}

#[async_trait]
pub trait Subsystem: Send + Sync {
    fn name(&self) -> &'static str;

    /// One-time setup before the first cycle (entity discovery, target resolution).
    async fn init(&mut self, cancel: &CancellationToken) -> Result<(), CollectError> {
        let _ = cancel;
        Ok(())
    }

    /// Archives this subsystem appends to; valid after `init`.
    fn archives(&self) -> Vec<(FileKey, Schema)>;

    fn charts(&self) -> &'static [ChartSpec];

    /// Read, convert, append. An error skips the rest of this cycle only.
    async fn cycle(&mut self, ctx: &CycleContext<'_>) -> Result<(), CollectError>;
}

/// Append one row, logging instead of failing the cycle.
pub(crate) async fn append_logged(
    archive: &Arc<dyn Archive>,
    subsystem: &str,
    key: &FileKey,
    row: &[crate::models::Metric],
) {
    if let Err(e) = archive.append(key, row).await {
        tracing::warn!(subsystem, key = %key, error = %e, "archive append failed");
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LoopSettings {
    pub step: Duration,
    /// `None` disables chart rendering for this subsystem.
    pub render_every: Option<Duration>,
    pub retention: RetentionPolicy,
}

/// Create archives declared by the subsystem. Failures are logged per key.
pub async fn create_archives(
    sub: &dyn Subsystem,
    archive: &Arc<dyn Archive>,
    retention: &RetentionPolicy,
) {
    for (key, schema) in sub.archives() {
        if let Err(e) = archive.create_if_absent(&key, &schema, retention).await {
            tracing::warn!(subsystem = sub.name(), key = %key, error = %e, "archive create failed");
        }
    }
}

/// Issue render requests for every chart of every archive and period.
pub async fn render_all(sub: &dyn Subsystem, archive: &Arc<dyn Archive>) {
    for (key, _) in sub.archives() {
        for chart in sub.charts() {
            for period in Period::ALL {
                if let Err(e) = archive.render_chart(&key, period, chart).await {
                    tracing::warn!(
                        subsystem = sub.name(),
                        key = %key,
                        chart = chart.name,
                        period = %period,
                        error = %e,
                        "chart render failed"
                    );
                }
            }
        }
    }
}

/// Spawn the polling loop for one subsystem. The task ends when `cancel` fires
/// or when `init` fails.
pub fn spawn(
    mut sub: Box<dyn Subsystem>,
    archive: Arc<dyn Archive>,
    settings: LoopSettings,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    let span = tracing::info_span!("subsystem", name = sub.name());
    let task = async move {
        match sub.init(&cancel).await {
            Ok(()) => {}
            Err(e) if e.is_cancelled() => {
                tracing::info!("stopped during init");
                return;
            }
            Err(e) => {
                tracing::warn!(error = %e, "init failed, subsystem disabled");
                return;
            }
        }
        create_archives(sub.as_ref(), &archive, &settings.retention).await;
        tracing::info!(step_secs = settings.step.as_secs(), "started");

        let mut tick = interval(settings.step);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let render_every = settings.render_every.unwrap_or(Duration::from_secs(3600));
        let mut render_tick = interval_at(Instant::now() + render_every, render_every);
        render_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!("stopped");
                    break;
                }
                _ = tick.tick() => {
                    let ctx = CycleContext {
                        now: now_secs(),
                        archive: &archive,
                        cancel: &cancel,
                    };
                    match sub.cycle(&ctx).await {
                        Ok(()) => {}
                        Err(e) if e.is_cancelled() => {
                            tracing::info!("stopped");
                            break;
                        }
                        Err(e) => tracing::warn!(error = %e, "cycle skipped"),
                    }
                }
                _ = render_tick.tick(), if settings.render_every.is_some() => {
                    render_all(sub.as_ref(), &archive).await;
                }
            }
        }
    };
    tokio::spawn(task.instrument(span))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::*;

    #[test]
    fn every_chart_series_names_a_data_source() {
        let tables: [(&[ChartSpec], &[&str]); 8] = [
            (SYSTEM_CHARTS, system::DATA_SOURCES),
            (KERNEL_CHARTS, kernel::DATA_SOURCES),
            (NETIF_CHARTS, netif::DATA_SOURCES),
            (FILESYSTEM_CHARTS, filesystem::DATA_SOURCES),
            (PROCESS_CHARTS, process::DATA_SOURCES),
            (LATENCY_CHARTS, latency::DATA_SOURCES),
            (CONNECTIONS_CHARTS, connections::DATA_SOURCES),
            (INTERRUPTS_CHARTS, interrupts::DATA_SOURCES),
        ];
        for (charts, sources) in tables {
            for chart in charts {
                for series in chart.series {
                    assert!(
                        sources.contains(&series.ds),
                        "chart {} uses unknown data source {}",
                        chart.name,
                        series.ds
                    );
                }
            }
        }
    }

    #[test]
    fn kernel_row_without_history_is_undefined_cpu() {
        let counters = crate::models::KernelCounters {
            context_switches: 9,
            ..Default::default()
        };
        let row = kernel_row(&counters, None, &Default::default());
        assert_eq!(row.len(), kernel::DATA_SOURCES.len());
        assert!(row[..9].iter().all(|m| m.is_undefined()));
        assert_eq!(row[9], crate::models::Metric::Value(9.0));
    }
}
