// Bounded-parallel probe fan-out: semaphore admission, JoinSet barrier, cancellation.

use super::ping::{PingParser, Prober};
use crate::archive::{Archive, FileKey};
use crate::models::{Metric, ProbeTarget};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

/// A resolved target and the archive key its results go to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTarget {
    pub target: ProbeTarget,
    pub key: FileKey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Appended,
    Failed,
    Cancelled,
}

/// Per-cycle tally. `succeeded + failed + cancelled` equals the number of targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl CycleSummary {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed + self.cancelled
    }
}

pub struct ProbeScheduler {
    prober: Arc<dyn Prober>,
    parser: Arc<PingParser>,
    max_parallel: usize,
}

impl ProbeScheduler {
    pub fn new(prober: Arc<dyn Prober>, parser: PingParser, max_parallel: usize) -> Self {
        Self {
            prober,
            parser: Arc::new(parser),
            max_parallel: max_parallel.max(1),
        }
    }

    pub fn max_parallel(&self) -> usize {
        self.max_parallel
    }

    /// Probe every target once, at most `max_parallel` at a time, and wait for
    /// all of them. Failures are per target; nothing is appended after
    /// cancellation is observed.
    #[instrument(skip_all, fields(subsystem = "latency", targets = targets.len()))]
    pub async fn run_cycle(
        &self,
        targets: &[ScheduledTarget],
        archive: &Arc<dyn Archive>,
        cancel: &CancellationToken,
    ) -> CycleSummary {
        let semaphore = Arc::new(Semaphore::new(self.max_parallel));
        let mut in_flight: JoinSet<Outcome> = JoinSet::new();

        for st in targets {
            in_flight.spawn(probe_one(
                st.clone(),
                self.prober.clone(),
                archive.clone(),
                self.parser.clone(),
                semaphore.clone(),
                cancel.clone(),
            ));
        }

        let mut summary = CycleSummary::default();
        while let Some(joined) = in_flight.join_next().await {
            match joined {
                Ok(Outcome::Appended) => summary.succeeded += 1,
                Ok(Outcome::Failed) => summary.failed += 1,
                Ok(Outcome::Cancelled) => summary.cancelled += 1,
                Err(e) => {
                    tracing::warn!(error = %e, "probe task aborted");
                    summary.failed += 1;
                }
            }
        }

        if summary.cancelled > 0 {
            tracing::info!(cancelled = summary.cancelled, "latency cycle cancelled");
        } else {
            tracing::debug!(
                succeeded = summary.succeeded,
                failed = summary.failed,
                "latency cycle done"
            );
        }
        summary
    }
}

async fn probe_one(
    st: ScheduledTarget,
    prober: Arc<dyn Prober>,
    archive: Arc<dyn Archive>,
    parser: Arc<PingParser>,
    semaphore: Arc<Semaphore>,
    cancel: CancellationToken,
) -> Outcome {
    let permit = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Outcome::Cancelled,
        permit = semaphore.acquire_owned() => match permit {
            Ok(p) => p,
            Err(_) => return Outcome::Cancelled,
        },
    };
    if cancel.is_cancelled() {
        return Outcome::Cancelled;
    }

    let raw = prober.probe(&st.target, &cancel).await;
    drop(permit);

    let text = match raw {
        Ok(text) => text,
        Err(e) if e.is_cancelled() => return Outcome::Cancelled,
        Err(e) => {
            tracing::warn!(host = %st.target.name, address = %st.target.address, error = %e, "probe failed");
            return Outcome::Failed;
        }
    };
    let result = match parser.parse(&text) {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(host = %st.target.name, address = %st.target.address, error = %e, "probe failed");
            return Outcome::Failed;
        }
    };

    if cancel.is_cancelled() {
        return Outcome::Cancelled;
    }
    let row: Vec<Metric> = result.as_array().into_iter().map(Metric::from_f64).collect();
    match archive.append(&st.key, &row).await {
        Ok(()) => Outcome::Appended,
        Err(e) => {
            tracing::warn!(key = %st.key, error = %e, "latency append failed");
            Outcome::Failed
        }
    }
}
