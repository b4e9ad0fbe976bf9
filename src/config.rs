use crate::archive::{RetentionPolicy, sanitize_name};
use crate::models::ProbeTarget;
use crate::subsystem::{ConnTool, InterfaceSpec, LoopSettings, ProcessSpec};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub global: GlobalConfig,
    pub system: SubsystemSettings,
    pub kernel: SubsystemSettings,
    pub interrupts: SubsystemSettings,
    pub netif: NetifConfig,
    pub filesystem: FilesystemConfig,
    pub process: ProcessConfig,
    pub latency: LatencyConfig,
    pub connections: ConnectionsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// Directory the JSON-lines archive writes into.
    pub archive_path: String,
    /// Prefix every archive key with `<hostname>_`.
    pub hostname_prefix: bool,
    pub proc_root: String,
    pub render_interval_secs: u64,
    pub max_historic_years: u32,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            archive_path: "data/archive".into(),
            hostname_prefix: false,
            proc_root: crate::procfs::DEFAULT_PROC_ROOT.into(),
            render_interval_secs: 300,
            max_historic_years: 1,
        }
    }
}

/// Fields shared by every subsystem section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SubsystemSettings {
    pub enable: bool,
    /// Sampling period in seconds.
    pub step: u64,
    pub create_graphs: bool,
}

impl Default for SubsystemSettings {
    fn default() -> Self {
        Self {
            enable: true,
            step: 60,
            create_graphs: true,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NetifConfig {
    #[serde(flatten)]
    pub settings: SubsystemSettings,
    pub auto_discovery: bool,
    pub interfaces: Vec<InterfaceSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FilesystemConfig {
    #[serde(flatten)]
    pub settings: SubsystemSettings,
    pub mountpoints: Vec<String>,
}

impl Default for FilesystemConfig {
    fn default() -> Self {
        Self {
            settings: SubsystemSettings::default(),
            mountpoints: vec!["/".into()],
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProcessConfig {
    #[serde(flatten)]
    pub settings: SubsystemSettings,
    pub processes: Vec<ProcessSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LatencyConfig {
    #[serde(flatten)]
    pub settings: SubsystemSettings,
    /// Probe the default gateways in addition to `hosts`.
    pub default_gateway: bool,
    pub max_parallel_probes: usize,
    pub probe_timeout_secs: u64,
    pub probe_packets: u32,
    pub hosts: Vec<ProbeTarget>,
}

impl Default for LatencyConfig {
    fn default() -> Self {
        Self {
            settings: SubsystemSettings::default(),
            default_gateway: true,
            max_parallel_probes: 4,
            probe_timeout_secs: 2,
            probe_packets: 5,
            hosts: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConnectionsConfig {
    #[serde(flatten)]
    pub settings: SubsystemSettings,
    /// Preferred census tool; detected from `PATH` when unset or missing.
    pub command: Option<ConnTool>,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "hostwatch.toml".into());
        let s = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("reading config {path}: {e}"))?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Archive key prefix: `<hostname>_` when `hostname_prefix` is set.
    pub fn file_prefix(&self) -> String {
        if !self.global.hostname_prefix {
            return String::new();
        }
        match sysinfo::System::host_name() {
            Some(host) => format!("{}_", sanitize_name(&host)),
            None => {
                tracing::warn!("hostname unavailable, archive keys left unprefixed");
                String::new()
            }
        }
    }

    /// Loop timing and retention for one subsystem section.
    pub fn loop_settings(&self, settings: &SubsystemSettings) -> LoopSettings {
        LoopSettings {
            step: Duration::from_secs(settings.step),
            render_every: settings
                .create_graphs
                .then(|| Duration::from_secs(self.global.render_interval_secs)),
            retention: RetentionPolicy::for_step(settings.step, self.global.max_historic_years),
        }
    }

    fn sections(&self) -> [(&'static str, &SubsystemSettings); 8] {
        [
            ("system", &self.system),
            ("kernel", &self.kernel),
            ("interrupts", &self.interrupts),
            ("netif", &self.netif.settings),
            ("filesystem", &self.filesystem.settings),
            ("process", &self.process.settings),
            ("latency", &self.latency.settings),
            ("connections", &self.connections.settings),
        ]
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            !self.global.archive_path.is_empty(),
            "global.archive_path must be non-empty"
        );
        anyhow::ensure!(
            self.global.render_interval_secs > 0,
            "global.render_interval_secs must be > 0, got {}",
            self.global.render_interval_secs
        );
        anyhow::ensure!(
            self.global.max_historic_years > 0,
            "global.max_historic_years must be > 0, got {}",
            self.global.max_historic_years
        );
        for (name, settings) in self.sections() {
            anyhow::ensure!(
                !settings.enable || settings.step > 0,
                "{name}.step must be > 0, got {}",
                settings.step
            );
        }
        if self.latency.settings.enable {
            anyhow::ensure!(
                self.latency.max_parallel_probes > 0,
                "latency.max_parallel_probes must be > 0, got {}",
                self.latency.max_parallel_probes
            );
            anyhow::ensure!(
                self.latency.probe_timeout_secs > 0,
                "latency.probe_timeout_secs must be > 0, got {}",
                self.latency.probe_timeout_secs
            );
            anyhow::ensure!(
                self.latency.probe_packets > 0,
                "latency.probe_packets must be > 0, got {}",
                self.latency.probe_packets
            );
        }
        Ok(())
    }
}
