// /proc/stat: aggregate CPU line, ctxt, processes, intr

use super::{lines, parse_field};
use crate::error::CollectError;
use crate::models::{CpuTimes, InterruptCounters, KernelCounters};
use tokio_util::sync::CancellationToken;

const WHAT: &str = "/proc/stat";

pub fn parse_kernel_counters(
    text: &str,
    cancel: &CancellationToken,
) -> Result<KernelCounters, CollectError> {
    let mut cpu = None;
    let mut context_switches = None;
    let mut forks = None;

    for line in lines(text, cancel) {
        let line = line?;
        let mut fields = line.split_whitespace();
        match fields.next() {
            Some("cpu") => {
                let v: Vec<&str> = fields.collect();
                if v.len() < 9 {
                    return Err(CollectError::parse(
                        WHAT,
                        format!("cpu line has {} fields, need 9", v.len()),
                    ));
                }
                cpu = Some(CpuTimes {
                    user: parse_field(WHAT, Some(v[0]))?,
                    nice: parse_field(WHAT, Some(v[1]))?,
                    system: parse_field(WHAT, Some(v[2]))?,
                    idle: parse_field(WHAT, Some(v[3]))?,
                    iowait: parse_field(WHAT, Some(v[4]))?,
                    irq: parse_field(WHAT, Some(v[5]))?,
                    softirq: parse_field(WHAT, Some(v[6]))?,
                    steal: parse_field(WHAT, Some(v[7]))?,
                    guest: parse_field(WHAT, Some(v[8]))?,
                });
            }
            Some("ctxt") => context_switches = Some(parse_field(WHAT, fields.next())?),
            Some("processes") => forks = Some(parse_field(WHAT, fields.next())?),
            _ => {}
        }
    }

    Ok(KernelCounters {
        cpu: cpu.ok_or_else(|| CollectError::parse(WHAT, "no aggregate cpu line"))?,
        context_switches: context_switches
            .ok_or_else(|| CollectError::parse(WHAT, "no ctxt line"))?,
        forks: forks.ok_or_else(|| CollectError::parse(WHAT, "no processes line"))?,
        vforks: 0,
    })
}

pub fn parse_interrupts(
    text: &str,
    cancel: &CancellationToken,
) -> Result<InterruptCounters, CollectError> {
    for line in lines(text, cancel) {
        let line = line?;
        let mut fields = line.split_whitespace();
        if fields.next() != Some("intr") {
            continue;
        }
        let total = parse_field(WHAT, fields.next())?;
        let per_irq = fields.filter_map(|f| f.parse().ok()).collect();
        return Ok(InterruptCounters { total, per_irq });
    }
    Err(CollectError::parse(WHAT, "no intr line"))
}
