// ICMP echo probe via the system `ping` and its summary parser.

use crate::error::ProbeError;
use crate::exec::run_command;
use crate::models::{ProbeResult, ProbeTarget};
use async_trait::async_trait;
use regex::Regex;
use std::net::IpAddr;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Extracts loss and the min/avg/max triple from a ping summary.
#[derive(Debug, Clone)]
pub struct PingParser {
    loss: Regex,
    rtt: Regex,
}

impl PingParser {
    pub fn new() -> Result<Self, ProbeError> {
        Ok(Self {
            loss: Regex::new(r"(\d+(?:\.\d+)?)%\s+packet loss")?,
            rtt: Regex::new(r"=\s*([\d.]+)/([\d.]+)/([\d.]+)/")?,
        })
    }

    /// Both loss and RTT must be present; 100% loss prints no RTT line and is
    /// therefore a failed probe.
    pub fn parse(&self, text: &str) -> Result<ProbeResult, ProbeError> {
        let loss = self
            .loss
            .captures(text)
            .and_then(|c| c[1].parse::<f64>().ok())
            .ok_or(ProbeError::Parse("packet loss"))?;
        let rtt = self.rtt.captures(text).ok_or(ProbeError::Parse("rtt"))?;
        let num = |i: usize| rtt[i].parse::<f64>().map_err(|_| ProbeError::Parse("rtt"));
        Ok(ProbeResult {
            min_ms: num(1)?,
            avg_ms: num(2)?,
            max_ms: num(3)?,
            loss_percent: loss,
        })
    }
}

/// One probe execution against one target. Returns the raw textual report.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(
        &self,
        target: &ProbeTarget,
        cancel: &CancellationToken,
    ) -> Result<String, ProbeError>;
}

/// Runs `ping -q -n -U -c <packets> -W <timeout> [-I iface] <addr>`.
#[derive(Debug, Clone)]
pub struct PingProber {
    pub packets: u32,
    /// Per-reply wait passed to `-W`.
    pub timeout: Duration,
}

impl PingProber {
    pub fn new(packets: u32, timeout: Duration) -> Self {
        Self { packets, timeout }
    }

    pub fn args(&self, target: &ProbeTarget) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(iface) = &target.iface {
            args.push("-I".to_string());
            args.push(iface.clone());
        }
        match target.address.parse::<IpAddr>() {
            Ok(IpAddr::V4(_)) => args.push("-4".to_string()),
            Ok(IpAddr::V6(_)) => args.push("-6".to_string()),
            Err(_) => {}
        }
        args.extend(["-q", "-n", "-U", "-c"].map(String::from));
        args.push(self.packets.to_string());
        args.push("-W".to_string());
        args.push(self.timeout.as_secs().max(1).to_string());
        args.push(target.address.clone());
        args
    }

    /// Outer bound on one ping run: one second per packet plus the reply wait.
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(u64::from(self.packets)) + self.timeout
    }
}

#[async_trait]
impl Prober for PingProber {
    async fn probe(
        &self,
        target: &ProbeTarget,
        cancel: &CancellationToken,
    ) -> Result<String, ProbeError> {
        let out = run_command("ping", &self.args(target), self.deadline(), cancel).await?;
        if !out.success {
            tracing::debug!(address = %target.address, "ping exited non-zero");
        }
        Ok(out.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ping_output(text: &str) -> Result<ProbeResult, ProbeError> {
        PingParser::new().unwrap().parse(text)
    }

    const OK: &str = "\
PING 1.1.1.1 (1.1.1.1) 56(84) bytes of data.

--- 1.1.1.1 ping statistics ---
3 packets transmitted, 3 received, 0% packet loss, time 2003ms
rtt min/avg/max/mdev = 10.123/12.456/15.789/2.001 ms
";

    #[test]
    fn parses_summary() {
        let r = parse_ping_output(OK).unwrap();
        assert_eq!(r.min_ms, 10.123);
        assert_eq!(r.avg_ms, 12.456);
        assert_eq!(r.max_ms, 15.789);
        assert_eq!(r.loss_percent, 0.0);
    }

    #[test]
    fn total_loss_has_no_rtt() {
        let text = "3 packets transmitted, 0 received, 100% packet loss, time 2040ms\n";
        assert!(matches!(parse_ping_output(text), Err(ProbeError::Parse("rtt"))));
    }

    #[test]
    fn fractional_loss() {
        let text = "10 packets transmitted, 9 received, 10.5% packet loss\nrtt min/avg/max/mdev = 1.0/2.0/3.0/0.5 ms\n";
        assert_eq!(parse_ping_output(text).unwrap().loss_percent, 10.5);
    }

    #[test]
    fn garbage_is_loss_parse_error() {
        assert!(matches!(
            parse_ping_output("ping: unknown host"),
            Err(ProbeError::Parse("packet loss"))
        ));
    }

    #[test]
    fn args_bind_interface_and_family() {
        let p = PingProber::new(3, Duration::from_secs(2));
        let t = ProbeTarget::new("gw", "192.168.1.1").with_iface("eth0");
        assert_eq!(
            p.args(&t),
            ["-I", "eth0", "-4", "-q", "-n", "-U", "-c", "3", "-W", "2", "192.168.1.1"]
        );
        assert!(p.args(&ProbeTarget::new("v6", "2001:db8::1")).contains(&"-6".to_string()));
        assert_eq!(p.deadline(), Duration::from_secs(5));
    }
}
