// ICMP latency: target resolution, ping probe, bounded-parallel scheduler

mod ping;
mod scheduler;
mod target;

pub use ping::{PingParser, PingProber, Prober};
pub use scheduler::{CycleSummary, ProbeScheduler, ScheduledTarget};
pub use target::resolve_targets;
