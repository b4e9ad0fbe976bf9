// Latency probe targets and results

use serde::Deserialize;

/// A latency target. `iface` is resolved once at startup when not pinned in config.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProbeTarget {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub address: String,
    #[serde(default)]
    pub iface: Option<String>,
}

impl ProbeTarget {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            address: address.into(),
            iface: None,
        }
    }

    pub fn with_iface(mut self, iface: impl Into<String>) -> Self {
        self.iface = Some(iface.into());
        self
    }
}

/// Outcome of one ICMP echo sequence. Round-trip times in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeResult {
    pub min_ms: f64,
    pub avg_ms: f64,
    pub max_ms: f64,
    pub loss_percent: f64,
}

impl ProbeResult {
    /// Order matches the latency archive schema.
    pub fn as_array(&self) -> [f64; 4] {
        [self.min_ms, self.avg_ms, self.max_ms, self.loss_percent]
    }
}
