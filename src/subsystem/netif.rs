// Network interfaces: rx/tx bytes, packets, errors per second

use super::{CycleContext, Subsystem, append_logged};
use crate::archive::{FileKey, Schema};
use crate::chart::{ChartSpec, NETIF_CHARTS};
use crate::error::CollectError;
use crate::history::HistoryStore;
use crate::models::{Metric, NetIfCounters};
use crate::procfs::ProcFs;
use crate::rate::rate_u64;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

pub const DATA_SOURCES: &[&str] = &[
    "rx_bytes",
    "tx_bytes",
    "rx_packets",
    "tx_packets",
    "rx_errors",
    "tx_errors",
];

/// Interface entry from config.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InterfaceSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_enable")]
    pub enable: bool,
}

fn default_enable() -> bool {
    true
}

pub struct NetifSubsystem {
    procfs: ProcFs,
    prefix: String,
    configured: Vec<InterfaceSpec>,
    auto_discovery: bool,
    interfaces: Vec<(String, FileKey)>,
    history: HistoryStore<NetIfCounters>,
}

impl NetifSubsystem {
    pub fn new(
        procfs: ProcFs,
        prefix: &str,
        configured: Vec<InterfaceSpec>,
        auto_discovery: bool,
    ) -> Self {
        Self {
            procfs,
            prefix: prefix.to_string(),
            configured,
            auto_discovery,
            interfaces: Vec::new(),
            history: HistoryStore::new(),
        }
    }

    /// Monitored interface names, valid after `init`.
    pub fn interfaces(&self) -> Vec<&str> {
        self.interfaces.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Rates for one interface against its stored baseline, then advance it.
    fn rates(&mut self, iface: &str, now: f64, cur: NetIfCounters) -> Vec<Metric> {
        let Some(prev) = self.history.replace(iface, now, cur) else {
            return vec![Metric::Value(0.0); DATA_SOURCES.len()];
        };
        let dt = now - prev.at;
        cur.as_array()
            .iter()
            .zip(prev.sample.as_array())
            .map(|(c, p)| Metric::from_f64(rate_u64(*c, p, dt)))
            .collect()
    }
}

#[async_trait]
impl Subsystem for NetifSubsystem {
    fn name(&self) -> &'static str {
        "netif"
    }

    /// Configured, enabled interfaces; with auto-discovery, every interface in
    /// /proc/net/dev except loopback and those explicitly disabled.
    async fn init(&mut self, cancel: &CancellationToken) -> Result<(), CollectError> {
        let mut names: Vec<String> = self
            .configured
            .iter()
            .filter(|i| i.enable)
            .map(|i| i.name.clone())
            .collect();
        if self.auto_discovery {
            let disabled: Vec<&str> = self
                .configured
                .iter()
                .filter(|i| !i.enable)
                .map(|i| i.name.as_str())
                .collect();
            for (name, _) in self.procfs.net_dev(cancel)? {
                if name != "lo" && !disabled.contains(&name.as_str()) && !names.contains(&name) {
                    tracing::info!(iface = %name, "interface discovered");
                    names.push(name);
                }
            }
        }
        self.interfaces = names
            .into_iter()
            .map(|n| {
                let key = FileKey::entity(&self.prefix, "netif", &n);
                (n, key)
            })
            .collect();
        Ok(())
    }

    fn archives(&self) -> Vec<(FileKey, Schema)> {
        self.interfaces
            .iter()
            .map(|(_, key)| (key.clone(), Schema::gauges(DATA_SOURCES)))
            .collect()
    }

    fn charts(&self) -> &'static [ChartSpec] {
        NETIF_CHARTS
    }

    #[instrument(skip_all, fields(subsystem = "netif"))]
    async fn cycle(&mut self, ctx: &CycleContext<'_>) -> Result<(), CollectError> {
        let counters: HashMap<String, NetIfCounters> =
            self.procfs.net_dev(ctx.cancel)?.into_iter().collect();

        for (iface, key) in self.interfaces.clone() {
            crate::procfs::check_cancel(ctx.cancel)?;
            let Some(cur) = counters.get(&iface) else {
                tracing::debug!(iface = %iface, "interface not present");
                continue;
            };
            let row = self.rates(&iface, ctx.now, *cur);
            append_logged(ctx.archive, self.name(), &key, &row).await;
        }
        Ok(())
    }
}
