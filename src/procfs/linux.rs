// Linux-specific helpers: statvfs, block device numbers, sysconf.

use crate::error::CollectError;
use crate::models::FilesystemUsage;
use std::path::Path;

const DEFAULT_CLK_TCK: u64 = 100;
const DEFAULT_PAGE_SIZE: u64 = 4096;

/// Clock ticks per second (`CLK_TCK`); 100 when sysconf has no answer.
pub fn ticks_per_second() -> u64 {
    #[cfg(target_os = "linux")]
    {
        use nix::unistd::{SysconfVar, sysconf};
        if let Ok(Some(v)) = sysconf(SysconfVar::CLK_TCK)
            && v > 0
        {
            return v as u64;
        }
    }
    DEFAULT_CLK_TCK
}

/// Page size in bytes for converting RSS pages.
pub fn page_size() -> u64 {
    #[cfg(target_os = "linux")]
    {
        use nix::unistd::{SysconfVar, sysconf};
        if let Ok(Some(v)) = sysconf(SysconfVar::PAGE_SIZE)
            && v > 0
        {
            return v as u64;
        }
    }
    DEFAULT_PAGE_SIZE
}

/// Space and inode usage of a mounted filesystem. Space uses blocks available
/// to unprivileged users, matching `df`. Zero totals yield 0%.
pub fn filesystem_usage(mount_point: &Path) -> Result<FilesystemUsage, CollectError> {
    let st = nix::sys::statvfs::statvfs(mount_point)
        .map_err(|e| CollectError::io(mount_point, std::io::Error::from(e)))?;
    let total = st.blocks() as f64 * st.fragment_size() as f64;
    let avail = st.blocks_available() as f64 * st.fragment_size() as f64;
    let files = st.files() as f64;
    let files_free = st.files_free() as f64;
    Ok(FilesystemUsage {
        space_percent: if total > 0.0 {
            (total - avail) / total * 100.0
        } else {
            0.0
        },
        inode_percent: if files > 0.0 {
            (files - files_free) / files * 100.0
        } else {
            0.0
        },
    })
}

/// `(major, minor)` of a block device node, following symlinks such as
/// `/dev/disk/by-uuid/...`.
pub fn device_numbers(device: &Path) -> Result<(u32, u32), CollectError> {
    use std::os::unix::fs::MetadataExt;
    let resolved = std::fs::canonicalize(device).unwrap_or_else(|_| device.to_path_buf());
    let meta = std::fs::metadata(&resolved).map_err(|e| CollectError::io(&resolved, e))?;
    let rdev = meta.rdev();
    Ok((
        nix::sys::stat::major(rdev) as u32,
        nix::sys::stat::minor(rdev) as u32,
    ))
}
