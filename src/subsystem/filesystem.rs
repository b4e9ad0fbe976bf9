// Filesystems: space/inode usage via statvfs, I/O time from diskstats

use super::{CycleContext, Subsystem, append_logged};
use crate::archive::{FileKey, Schema};
use crate::chart::{ChartSpec, FILESYSTEM_CHARTS};
use crate::error::CollectError;
use crate::history::HistoryStore;
use crate::models::{FilesystemUsage, Metric};
use crate::procfs::{ProcFs, device_numbers, filesystem_usage};
use crate::rate::rate_u64;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

pub const DATA_SOURCES: &[&str] = &["usage", "ioa", "tim", "inode"];

pub type DeviceLookup = fn(&Path) -> Result<(u32, u32), CollectError>;
pub type UsageLookup = fn(&Path) -> Result<FilesystemUsage, CollectError>;

#[derive(Debug, Clone, PartialEq, Eq)]
struct MonitoredFs {
    mount_point: String,
    major: u32,
    minor: u32,
    key: FileKey,
}

/// Archive entity name of a mount point: `/` becomes `root`, other mount
/// points lose their outer slashes.
pub fn mount_entity(mount_point: &str) -> String {
    let trimmed = mount_point.trim_matches('/');
    if trimmed.is_empty() {
        "root".to_string()
    } else {
        trimmed.to_string()
    }
}

pub struct FilesystemSubsystem {
    procfs: ProcFs,
    prefix: String,
    mount_points: Vec<String>,
    monitored: Vec<MonitoredFs>,
    history: HistoryStore<(u64, u64)>,
    device_lookup: DeviceLookup,
    usage_lookup: UsageLookup,
}

impl FilesystemSubsystem {
    pub fn new(procfs: ProcFs, prefix: &str, mount_points: Vec<String>) -> Self {
        Self {
            procfs,
            prefix: prefix.to_string(),
            mount_points,
            monitored: Vec::new(),
            history: HistoryStore::new(),
            device_lookup: device_numbers,
            usage_lookup: filesystem_usage,
        }
    }

    /// Replace the statvfs and device-node lookups (fake proc trees in tests).
    pub fn with_lookups(mut self, device_lookup: DeviceLookup, usage_lookup: UsageLookup) -> Self {
        self.device_lookup = device_lookup;
        self.usage_lookup = usage_lookup;
        self
    }

    /// Mount points resolved to a block device during `init`.
    pub fn mount_points(&self) -> Vec<&str> {
        self.monitored.iter().map(|m| m.mount_point.as_str()).collect()
    }
}

#[async_trait]
impl Subsystem for FilesystemSubsystem {
    fn name(&self) -> &'static str {
        "filesystem"
    }

    /// Resolve each configured mount point to `major:minor` through the mount
    /// table. Mount points that are not mounted or whose device cannot be
    /// resolved are skipped with a warning.
    async fn init(&mut self, cancel: &CancellationToken) -> Result<(), CollectError> {
        let mounts = self.procfs.mounts(cancel)?;
        self.monitored.clear();
        for mp in &self.mount_points {
            let Some(mount) = mounts.iter().rev().find(|m| &m.mount_point == mp) else {
                tracing::warn!(mount_point = %mp, "mount point not found, skipped");
                continue;
            };
            match (self.device_lookup)(&PathBuf::from(&mount.device)) {
                Ok((major, minor)) => {
                    tracing::debug!(mount_point = %mp, device = %mount.device, major, minor, "filesystem resolved");
                    self.monitored.push(MonitoredFs {
                        mount_point: mp.clone(),
                        major,
                        minor,
                        key: FileKey::entity(&self.prefix, "fs", &mount_entity(mp)),
                    });
                }
                Err(e) => {
                    tracing::warn!(mount_point = %mp, device = %mount.device, error = %e, "device not resolved, skipped");
                }
            }
        }
        Ok(())
    }

    fn archives(&self) -> Vec<(FileKey, Schema)> {
        self.monitored
            .iter()
            .map(|m| {
                (
                    m.key.clone(),
                    Schema::gauges(DATA_SOURCES).with_max(&["usage", "inode"], 100.0),
                )
            })
            .collect()
    }

    fn charts(&self) -> &'static [ChartSpec] {
        FILESYSTEM_CHARTS
    }

    #[instrument(skip_all, fields(subsystem = "filesystem"))]
    async fn cycle(&mut self, ctx: &CycleContext<'_>) -> Result<(), CollectError> {
        let disks = self.procfs.diskstats(ctx.cancel)?;

        for fs in self.monitored.clone() {
            crate::procfs::check_cancel(ctx.cancel)?;

            let (ioa, tim) = match disks
                .iter()
                .find(|d| d.major == fs.major && d.minor == fs.minor)
            {
                Some(d) => {
                    let cur = (d.io_ticks_ms, d.weighted_io_ms);
                    match self.history.replace(&fs.mount_point, ctx.now, cur) {
                        Some(prev) => {
                            let dt = ctx.now - prev.at;
                            (
                                Metric::from_f64(rate_u64(cur.0, prev.sample.0, dt)),
                                Metric::from_f64(rate_u64(cur.1, prev.sample.1, dt)),
                            )
                        }
                        None => (Metric::Value(0.0), Metric::Value(0.0)),
                    }
                }
                None => {
                    tracing::debug!(mount_point = %fs.mount_point, major = fs.major, minor = fs.minor, "device missing from diskstats");
                    (Metric::Undefined, Metric::Undefined)
                }
            };

            let (usage, inode) = match (self.usage_lookup)(Path::new(&fs.mount_point)) {
                Ok(u) => (Metric::from_f64(u.space_percent), Metric::from_f64(u.inode_percent)),
                Err(e) => {
                    tracing::warn!(mount_point = %fs.mount_point, error = %e, "statvfs failed");
                    (Metric::Undefined, Metric::Undefined)
                }
            };

            append_logged(ctx.archive, self.name(), &fs.key, &[usage, ioa, tim, inode]).await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mount_entity_names() {
        assert_eq!(mount_entity("/"), "root");
        assert_eq!(mount_entity("/var/log"), "var/log");
        assert_eq!(FileKey::entity("", "fs", &mount_entity("/var/log")).as_str(), "fs_var_log");
    }
}
