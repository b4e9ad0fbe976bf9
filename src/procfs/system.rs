// Memory, load, entropy, uptime, fs handle usage and process-state census

use super::{lines, parse_field};
use crate::error::CollectError;
use crate::models::{FsHandleUsage, LoadAvg, MemInfo};
use tokio_util::sync::CancellationToken;

/// Values in kB. Slab (`SReclaimable` + `SUnreclaim`) is counted as free.
pub fn parse_meminfo(text: &str, cancel: &CancellationToken) -> Result<MemInfo, CollectError> {
    let mut mem = MemInfo::default();
    let mut has_total = false;
    let mut slab = 0u64;
    for line in lines(text, cancel) {
        let line = line?;
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        let Some(Ok(v)) = rest.split_whitespace().next().map(str::parse::<u64>) else {
            continue;
        };
        match key {
            "MemTotal" => {
                mem.total = v;
                has_total = true;
            }
            "MemFree" => mem.free = v,
            "Buffers" => mem.buffers = v,
            "Cached" => mem.cached = v,
            "Active" => mem.active = v,
            "Inactive" => mem.inactive = v,
            "SReclaimable" | "SUnreclaim" => slab += v,
            _ => {}
        }
    }
    if !has_total {
        return Err(CollectError::parse("/proc/meminfo", "MemTotal not found"));
    }
    mem.free += slab;
    Ok(mem)
}

pub fn parse_loadavg(text: &str) -> Result<LoadAvg, CollectError> {
    const WHAT: &str = "/proc/loadavg";
    let mut f = text.split_whitespace();
    Ok(LoadAvg {
        one: parse_field(WHAT, f.next())?,
        five: parse_field(WHAT, f.next())?,
        fifteen: parse_field(WHAT, f.next())?,
    })
}

pub fn parse_entropy(text: &str) -> Result<u64, CollectError> {
    parse_field("entropy_avail", text.split_whitespace().next())
}

pub fn parse_uptime(text: &str) -> Result<f64, CollectError> {
    parse_field("/proc/uptime", text.split_whitespace().next())
}

/// Percentages from `dentry-state`, `file-nr` and `inode-nr`. A zero
/// denominator yields 0 for that entry.
pub fn parse_fs_handle_usage(
    dentry_state: &str,
    file_nr: &str,
    inode_nr: &str,
) -> Result<FsHandleUsage, CollectError> {
    let floats = |what: &str, text: &str, need: usize| -> Result<Vec<f64>, CollectError> {
        let v: Vec<f64> = text
            .split_whitespace()
            .map(|f| parse_field(what, Some(f)))
            .collect::<Result<_, _>>()?;
        if v.len() < need {
            return Err(CollectError::parse(what, format!("need {need} fields")));
        }
        Ok(v)
    };
    let share = |used: f64, other: f64| {
        if used + other > 0.0 {
            used * 100.0 / (used + other)
        } else {
            0.0
        }
    };

    let d = floats("dentry-state", dentry_state, 2)?;
    let f = floats("file-nr", file_nr, 3)?;
    let i = floats("inode-nr", inode_nr, 2)?;
    Ok(FsHandleUsage {
        dentry: share(d[0], d[1]),
        file: if f[2] > 0.0 { f[0] * 100.0 / f[2] } else { 0.0 },
        inode: share(i[0], i[1]),
    })
}

/// Scheduler state letter from a `<pid>/status` file.
pub fn parse_status_state(text: &str) -> Option<&str> {
    text.lines()
        .find_map(|l| l.strip_prefix("State:"))
        .and_then(|rest| rest.split_whitespace().next())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meminfo_folds_slab_into_free() {
        let text = "MemTotal:       16000 kB\nMemFree:         4000 kB\nBuffers:          100 kB\nCached:          2000 kB\nActive:          5000 kB\nInactive:        3000 kB\nSReclaimable:     300 kB\nSUnreclaim:       200 kB\n";
        let m = parse_meminfo(text, &CancellationToken::new()).unwrap();
        assert_eq!(m.total, 16000);
        assert_eq!(m.free, 4500);
        assert_eq!(m.cached, 2000);
    }

    #[test]
    fn loadavg_three_floats() {
        let l = parse_loadavg("0.50 1.25 2.00 1/234 5678\n").unwrap();
        assert_eq!((l.one, l.five, l.fifteen), (0.5, 1.25, 2.0));
    }

    #[test]
    fn fs_handle_usage_percentages() {
        let u = parse_fs_handle_usage("300 100 45 0 0 0\n", "1000 0 10000\n", "50 50\n").unwrap();
        assert_eq!(u.dentry, 75.0);
        assert_eq!(u.file, 10.0);
        assert_eq!(u.inode, 50.0);
    }

    #[test]
    fn status_state_letter() {
        assert_eq!(parse_status_state("Name:\tx\nState:\tZ (zombie)\n"), Some("Z"));
        assert_eq!(parse_status_state("Name:\tx\n"), None);
    }
}
