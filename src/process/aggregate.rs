// Fold per-PID counters into one aggregate per logical process, then convert to rates.

use crate::error::CollectError;
use crate::history::HistoryStore;
use crate::models::{Metric, PidFdCtx, PidIo, PidStat};
use crate::procfs::ProcFs;
use crate::rate::{rate_u64, round6};
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

/// Raw counters of one PID for one cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidSample {
    pub stat: PidStat,
    pub io: PidIo,
    pub fd: PidFdCtx,
}

/// Host-wide values needed to fold and rate a process aggregate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SystemContext {
    /// Sum of all CPU state ticks from /proc/stat.
    pub total_cpu_ticks: u64,
    pub uptime_secs: f64,
    pub ticks_per_sec: u64,
    pub page_size: u64,
}

/// Read stat, io and fd/status counters for every PID. PIDs that vanish or
/// cannot be read are omitted; only cancellation aborts.
pub fn read_pid_samples(
    procfs: &ProcFs,
    pids: &[u32],
    cancel: &CancellationToken,
) -> Result<Vec<PidSample>, CollectError> {
    let mut out = Vec::with_capacity(pids.len());
    for &pid in pids {
        let sample = procfs.pid_stat(pid, cancel).and_then(|stat| {
            Ok(PidSample {
                stat,
                io: procfs.pid_io(pid, cancel)?,
                fd: procfs.pid_fd_ctx(pid, cancel)?,
            })
        });
        match sample {
            Ok(s) => out.push(s),
            Err(CollectError::Cancelled) => return Err(CollectError::Cancelled),
            Err(e) => {
                tracing::debug!(pid, error = %e, "pid skipped");
            }
        }
    }
    Ok(out)
}

/// Sums across all PIDs of one logical process; uptime is the maximum.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProcessAggregate {
    pub cpu_ticks: u64,
    pub rss_bytes: u64,
    pub disk_bytes: u64,
    /// Sum of per-PID `max(0, logical - physical)` I/O. Heuristic: includes
    /// pipes, sockets and page cache hits, not just network traffic.
    pub net_bytes: u64,
    pub voluntary_ctxt: u64,
    pub involuntary_ctxt: u64,
    pub open_fds: u64,
    pub threads: u64,
    pub pid_count: u64,
    pub uptime_secs: f64,
}

impl ProcessAggregate {
    pub fn fold(samples: &[PidSample], ctx: &SystemContext) -> Self {
        let mut agg = Self::default();
        for s in samples {
            agg.cpu_ticks += s.stat.utime + s.stat.stime;
            agg.rss_bytes += s.stat.rss_pages.saturating_mul(ctx.page_size);
            agg.disk_bytes += s.io.physical_bytes();
            agg.net_bytes += s.io.estimated_net_bytes();
            agg.voluntary_ctxt += s.fd.voluntary_ctxt_switches;
            agg.involuntary_ctxt += s.fd.involuntary_ctxt_switches;
            agg.open_fds += s.fd.open_fds;
            agg.threads += (s.stat.threads - 1).max(0) as u64;
            agg.pid_count += 1;
            if ctx.ticks_per_sec > 0 {
                let started = s.stat.start_time as f64 / ctx.ticks_per_sec as f64;
                let up = (ctx.uptime_secs - started).max(0.0);
                agg.uptime_secs = agg.uptime_secs.max(up);
            }
        }
        agg
    }
}

/// Per-cycle output for one logical process, in archive column order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessRates {
    pub cpu_percent: f64,
    pub rss_bytes: u64,
    pub disk_bytes_per_sec: f64,
    pub net_bytes_per_sec: f64,
    pub open_fds: u64,
    pub pid_count: u64,
    pub threads: u64,
    pub voluntary_ctxt_per_sec: f64,
    pub involuntary_ctxt_per_sec: f64,
    pub uptime_secs: f64,
}

impl ProcessRates {
    pub fn row(&self) -> Vec<Metric> {
        vec![
            Metric::from_f64(self.cpu_percent),
            Metric::from(self.rss_bytes),
            Metric::from_f64(self.disk_bytes_per_sec),
            Metric::from_f64(self.net_bytes_per_sec),
            Metric::from(self.open_fds),
            Metric::from(self.pid_count),
            Metric::from(self.threads),
            Metric::from_f64(self.voluntary_ctxt_per_sec),
            Metric::from_f64(self.involuntary_ctxt_per_sec),
            Metric::from_f64(self.uptime_secs),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ProcessBaseline {
    cpu_ticks: u64,
    system_ticks: u64,
    disk_bytes: u64,
    net_bytes: u64,
    voluntary_ctxt: u64,
    involuntary_ctxt: u64,
}

/// Tracking state of one logical process name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackState {
    /// No baseline; the next update seeds one and reports zero rates.
    Unseen,
    Tracked,
    /// The last update saw the process or system CPU counter go backwards;
    /// both CPU baselines were reset.
    Reset,
}

/// Cross-cycle state for the process subsystem, keyed by logical name.
#[derive(Debug, Default)]
pub struct ProcessAggregator {
    history: HistoryStore<ProcessBaseline>,
    states: HashMap<String, TrackState>,
}

impl ProcessAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, name: &str) -> TrackState {
        self.states.get(name).copied().unwrap_or(TrackState::Unseen)
    }

    /// Drop the baseline of a process that had no matching PIDs this cycle, so
    /// the next cycle with PIDs starts fresh.
    pub fn forget(&mut self, name: &str) {
        self.history.forget(name);
        self.states.remove(name);
    }

    /// Convert one aggregate into rates and advance the baseline to it.
    pub fn update(
        &mut self,
        name: &str,
        agg: &ProcessAggregate,
        system_cpu_ticks: u64,
        now: f64,
    ) -> ProcessRates {
        let current = ProcessBaseline {
            cpu_ticks: agg.cpu_ticks,
            system_ticks: system_cpu_ticks,
            disk_bytes: agg.disk_bytes,
            net_bytes: agg.net_bytes,
            voluntary_ctxt: agg.voluntary_ctxt,
            involuntary_ctxt: agg.involuntary_ctxt,
        };
        let prev = self.history.replace(name, now, current);

        let mut rates = ProcessRates {
            cpu_percent: 0.0,
            rss_bytes: agg.rss_bytes,
            disk_bytes_per_sec: 0.0,
            net_bytes_per_sec: 0.0,
            open_fds: agg.open_fds,
            pid_count: agg.pid_count,
            threads: agg.threads,
            voluntary_ctxt_per_sec: 0.0,
            involuntary_ctxt_per_sec: 0.0,
            uptime_secs: agg.uptime_secs,
        };

        let Some(prev) = prev else {
            self.states.insert(name.to_string(), TrackState::Tracked);
            return rates;
        };

        let dt = now - prev.at;
        let base = prev.sample;
        let cpu_reset =
            current.cpu_ticks < base.cpu_ticks || current.system_ticks < base.system_ticks;
        if !cpu_reset {
            let delta_sys = current.system_ticks - base.system_ticks;
            if delta_sys > 0 {
                let delta_proc = current.cpu_ticks - base.cpu_ticks;
                rates.cpu_percent = round6(100.0 * delta_proc as f64 / delta_sys as f64);
            }
        }
        rates.disk_bytes_per_sec = rate_u64(current.disk_bytes, base.disk_bytes, dt);
        rates.net_bytes_per_sec = rate_u64(current.net_bytes, base.net_bytes, dt);
        rates.voluntary_ctxt_per_sec = rate_u64(current.voluntary_ctxt, base.voluntary_ctxt, dt);
        rates.involuntary_ctxt_per_sec =
            rate_u64(current.involuntary_ctxt, base.involuntary_ctxt, dt);

        let state = if cpu_reset {
            TrackState::Reset
        } else {
            TrackState::Tracked
        };
        self.states.insert(name.to_string(), state);
        rates
    }
}
