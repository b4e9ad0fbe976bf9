// Raw counter snapshots, one struct per OS data source.

use serde::Serialize;

/// Number of CPU states in the kernel percentage distribution.
pub const CPU_STATES: usize = 9;

/// Cumulative CPU ticks from the aggregate `cpu` line of /proc/stat.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CpuTimes {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
    pub guest: u64,
}

impl CpuTimes {
    pub fn states(&self) -> [u64; CPU_STATES] {
        [
            self.user,
            self.nice,
            self.system,
            self.idle,
            self.iowait,
            self.irq,
            self.softirq,
            self.steal,
            self.guest,
        ]
    }

    pub fn total(&self) -> u64 {
        self.states().iter().sum()
    }
}

/// /proc/stat: CPU times plus cumulative kernel counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KernelCounters {
    pub cpu: CpuTimes,
    pub context_switches: u64,
    pub forks: u64,
    /// Linux does not expose vforks separately; always 0.
    pub vforks: u64,
}

/// The `intr` line of /proc/stat.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterruptCounters {
    pub total: u64,
    pub per_irq: Vec<u64>,
}

/// One interface row of /proc/net/dev.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetIfCounters {
    pub rx_bytes: u64,
    pub rx_packets: u64,
    pub rx_errors: u64,
    pub tx_bytes: u64,
    pub tx_packets: u64,
    pub tx_errors: u64,
}

impl NetIfCounters {
    /// Order matches the netif archive schema.
    pub fn as_array(&self) -> [u64; 6] {
        [
            self.rx_bytes,
            self.tx_bytes,
            self.rx_packets,
            self.tx_packets,
            self.rx_errors,
            self.tx_errors,
        ]
    }
}

/// One device row of /proc/diskstats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskCounters {
    pub major: u32,
    pub minor: u32,
    pub device: String,
    /// Milliseconds spent doing I/O.
    pub io_ticks_ms: u64,
    /// Weighted milliseconds spent doing I/O.
    pub weighted_io_ms: u64,
}

/// One entry of the mount table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    pub device: String,
    pub mount_point: String,
    pub fs_type: String,
    pub options: String,
}

/// Fields of /proc/<pid>/stat used by the process aggregator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PidStat {
    pub pid: u32,
    pub utime: u64,
    pub stime: u64,
    pub threads: i64,
    /// Clock ticks after boot.
    pub start_time: u64,
    pub vsize_bytes: u64,
    pub rss_pages: u64,
}

/// /proc/<pid>/io.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PidIo {
    pub rchar: u64,
    pub wchar: u64,
    pub read_bytes: u64,
    pub write_bytes: u64,
}

impl PidIo {
    pub fn physical_bytes(&self) -> u64 {
        self.read_bytes.saturating_add(self.write_bytes)
    }

    pub fn logical_bytes(&self) -> u64 {
        self.rchar.saturating_add(self.wchar)
    }

    /// Approximation of non-disk I/O (network, pipes, page cache hits):
    /// logical I/O minus physical I/O, floored at zero.
    pub fn estimated_net_bytes(&self) -> u64 {
        self.logical_bytes().saturating_sub(self.physical_bytes())
    }
}

/// Open descriptors from /proc/<pid>/fdinfo and context switches from /proc/<pid>/status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PidFdCtx {
    pub open_fds: u64,
    pub voluntary_ctxt_switches: u64,
    pub involuntary_ctxt_switches: u64,
}

/// /proc/meminfo in kB. `free` already includes reclaimable and unreclaimable slab.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MemInfo {
    pub total: u64,
    pub free: u64,
    pub buffers: u64,
    pub cached: u64,
    pub active: u64,
    pub inactive: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LoadAvg {
    pub one: f64,
    pub five: f64,
    pub fifteen: f64,
}

/// Census of processes by scheduler state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProcessStates {
    pub run: u64,
    pub sleep: u64,
    pub wio: u64,
    pub zombie: u64,
    pub stop: u64,
    pub swap: u64,
}

impl ProcessStates {
    pub fn total(&self) -> u64 {
        self.run + self.sleep + self.wio + self.zombie + self.stop + self.swap
    }

    pub fn count(&mut self, state: &str) {
        match state {
            "R" => self.run += 1,
            "S" => self.sleep += 1,
            "D" => self.wio += 1,
            "Z" => self.zombie += 1,
            "T" => self.stop += 1,
            "W" => self.swap += 1,
            _ => {}
        }
    }
}

/// Usage percentages of the kernel dentry cache, file handles and inodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FsHandleUsage {
    pub dentry: f64,
    pub file: f64,
    pub inode: f64,
}

/// Space and inode usage of one mounted filesystem, in percent.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FilesystemUsage {
    pub space_percent: f64,
    pub inode_percent: f64,
}

/// TCP state census plus UDP socket count for one address family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnStats {
    pub closed: u64,
    pub listen: u64,
    pub syn_sent: u64,
    pub syn_recv: u64,
    pub established: u64,
    pub fin_wait1: u64,
    pub fin_wait2: u64,
    pub closing: u64,
    pub time_wait: u64,
    pub close_wait: u64,
    pub last_ack: u64,
    pub unknown: u64,
    pub udp: u64,
}

impl ConnStats {
    pub fn as_array(&self) -> [u64; 13] {
        [
            self.closed,
            self.listen,
            self.syn_sent,
            self.syn_recv,
            self.established,
            self.fin_wait1,
            self.fin_wait2,
            self.closing,
            self.time_wait,
            self.close_wait,
            self.last_ack,
            self.unknown,
            self.udp,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn net_estimate_floors_at_zero() {
        let io = PidIo {
            rchar: 100,
            wchar: 50,
            read_bytes: 4096,
            write_bytes: 0,
        };
        assert_eq!(io.estimated_net_bytes(), 0);
        let io = PidIo {
            rchar: 5000,
            wchar: 1000,
            read_bytes: 4096,
            write_bytes: 0,
        };
        assert_eq!(io.estimated_net_bytes(), 1904);
    }

    #[test]
    fn process_states_ignore_unknown_letters() {
        let mut s = ProcessStates::default();
        for st in ["R", "S", "S", "D", "Z", "T", "W", "I", "X"] {
            s.count(st);
        }
        assert_eq!(s.total(), 7);
        assert_eq!(s.sleep, 2);
    }
}
