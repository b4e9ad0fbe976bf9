// Archive/chart collaborator contract: create, append, render.
// Storage and rendering live behind this trait; samplers only push rows.

mod jsonl;
mod memory;

pub use jsonl::JsonlArchive;
pub use memory::{MemoryArchive, RenderRequest};

use crate::chart::{ChartSpec, Period};
use crate::error::ArchiveError;
use crate::models::Metric;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical storage unit, e.g. `myhost_netif_eth0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileKey(String);

impl FileKey {
    /// `<prefix><kind>` for host-wide archives.
    pub fn host(prefix: &str, kind: &str) -> Self {
        Self(format!("{prefix}{kind}"))
    }

    /// `<prefix><kind>_<sanitized entity>` for per-entity archives.
    pub fn entity(prefix: &str, kind: &str, entity: &str) -> Self {
        Self(format!("{prefix}{kind}_{}", sanitize_name(entity)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lowercase; `:` `.` `/` and space become `_`.
pub fn sanitize_name(s: &str) -> String {
    s.to_lowercase()
        .chars()
        .map(|c| match c {
            ':' | '.' | '/' | ' ' => '_',
            c => c,
        })
        .collect()
}

/// One column of an archive row. All columns are gauges: rates are computed
/// before the append.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSource {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub data_sources: Vec<DataSource>,
}

impl Schema {
    pub fn gauges(names: &[&str]) -> Self {
        Self {
            data_sources: names
                .iter()
                .map(|n| DataSource {
                    name: n.to_string(),
                    max: None,
                })
                .collect(),
        }
    }

    /// Cap named columns (e.g. percentages at 100).
    pub fn with_max(mut self, names: &[&str], max: f64) -> Self {
        for ds in &mut self.data_sources {
            if names.contains(&ds.name.as_str()) {
                ds.max = Some(max);
            }
        }
        self
    }

    pub fn len(&self) -> usize {
        self.data_sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data_sources.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.data_sources.iter().any(|d| d.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    pub step_secs: u64,
    /// Longest gap before a slot is considered unknown.
    pub heartbeat_secs: u64,
    pub max_historic_years: u32,
}

impl RetentionPolicy {
    pub fn for_step(step_secs: u64, max_historic_years: u32) -> Self {
        Self {
            step_secs,
            heartbeat_secs: step_secs * 2,
            max_historic_years,
        }
    }
}

#[async_trait]
pub trait Archive: Send + Sync {
    /// Idempotent; called once per key before the first append.
    async fn create_if_absent(
        &self,
        key: &FileKey,
        schema: &Schema,
        retention: &RetentionPolicy,
    ) -> Result<(), ArchiveError>;

    /// One row whose length matches the key's schema. `Undefined` slots are
    /// stored as the unknown marker.
    async fn append(&self, key: &FileKey, values: &[Metric]) -> Result<(), ArchiveError>;

    async fn render_chart(
        &self,
        key: &FileKey,
        period: Period,
        chart: &ChartSpec,
    ) -> Result<(), ArchiveError>;
}

pub(crate) fn check_arity(key: &FileKey, expected: usize, got: usize) -> Result<(), ArchiveError> {
    if expected != got {
        return Err(ArchiveError::SchemaMismatch {
            key: key.to_string(),
            expected,
            got,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_separators_and_lowercases() {
        assert_eq!(sanitize_name("Gateway-ETH0"), "gateway-eth0");
        assert_eq!(sanitize_name("/var/lib data"), "_var_lib_data");
        assert_eq!(sanitize_name("fe80::1.x"), "fe80__1_x");
    }

    #[test]
    fn file_keys() {
        assert_eq!(FileKey::host("web1_", "kernel").as_str(), "web1_kernel");
        assert_eq!(FileKey::entity("", "fs", "/").as_str(), "fs__");
        assert_eq!(FileKey::entity("", "netif", "eth0.100").as_str(), "netif_eth0_100");
    }

    #[test]
    fn heartbeat_is_twice_step() {
        let r = RetentionPolicy::for_step(60, 5);
        assert_eq!(r.heartbeat_secs, 120);
    }
}
