// Domain models: raw counter snapshots, computed metrics, probe targets

mod counters;
mod metric;
mod probe;

pub use counters::{
    CPU_STATES, ConnStats, CpuTimes, DiskCounters, FilesystemUsage, FsHandleUsage,
    InterruptCounters, KernelCounters, LoadAvg, MemInfo, Mount, NetIfCounters, PidFdCtx, PidIo,
    PidStat, ProcessStates,
};
pub use metric::{Metric, UNKNOWN_MARKER};
pub use probe::{ProbeResult, ProbeTarget};
