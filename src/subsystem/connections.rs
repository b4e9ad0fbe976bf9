// Socket census: TCP states and UDP count per address family, via ss or netstat.

use super::{CycleContext, Subsystem, append_logged};
use crate::archive::{FileKey, Schema};
use crate::chart::{CONNECTIONS_CHARTS, ChartSpec};
use crate::error::CollectError;
use crate::exec::{DEFAULT_TIMEOUT, command_exists, run_command};
use crate::models::{ConnStats, Metric};
use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

pub const DATA_SOURCES: &[&str] = &[
    "tcp4_closed",
    "tcp4_listen",
    "tcp4_syn_sent",
    "tcp4_syn_recv",
    "tcp4_established",
    "tcp4_fin_wait1",
    "tcp4_fin_wait2",
    "tcp4_closing",
    "tcp4_time_wait",
    "tcp4_close_wait",
    "tcp4_last_ack",
    "tcp4_unknown",
    "udp4",
    "tcp6_closed",
    "tcp6_listen",
    "tcp6_syn_sent",
    "tcp6_syn_recv",
    "tcp6_established",
    "tcp6_fin_wait1",
    "tcp6_fin_wait2",
    "tcp6_closing",
    "tcp6_time_wait",
    "tcp6_close_wait",
    "tcp6_last_ack",
    "tcp6_unknown",
    "udp6",
];

const FAMILIES: [&str; 2] = ["inet", "inet6"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnTool {
    Ss,
    Netstat,
}

impl ConnTool {
    pub fn program(&self) -> &'static str {
        match self {
            ConnTool::Ss => "ss",
            ConnTool::Netstat => "netstat",
        }
    }

    /// The preferred tool when installed, otherwise the first of `ss`,
    /// `netstat` found in `PATH`.
    pub fn detect(preferred: Option<ConnTool>) -> Option<ConnTool> {
        preferred
            .into_iter()
            .chain([ConnTool::Ss, ConnTool::Netstat])
            .find(|t| command_exists(t.program()))
    }
}

impl fmt::Display for ConnTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.program())
    }
}

/// Census from `ss -naut -f <family>`: first column is the protocol, second
/// the state. Every UDP socket counts once regardless of state.
pub fn parse_ss(text: &str) -> ConnStats {
    let mut stats = ConnStats::default();
    for line in text.lines() {
        let mut fields = line.split_whitespace();
        let (Some(proto), Some(state)) = (fields.next(), fields.next()) else {
            continue;
        };
        match proto {
            "tcp" => match state {
                "LISTEN" => stats.listen += 1,
                "ESTAB" => stats.established += 1,
                "TIME-WAIT" => stats.time_wait += 1,
                "CLOSE-WAIT" => stats.close_wait += 1,
                "FIN-WAIT-1" => stats.fin_wait1 += 1,
                "FIN-WAIT-2" => stats.fin_wait2 += 1,
                "SYN-SENT" => stats.syn_sent += 1,
                "SYN-RECV" => stats.syn_recv += 1,
                "CLOSING" => stats.closing += 1,
                "LAST-ACK" => stats.last_ack += 1,
                "UNCONN" => stats.closed += 1,
                "UNKNOWN" => stats.unknown += 1,
                _ => {}
            },
            "udp" => stats.udp += 1,
            _ => {}
        }
    }
    stats
}

/// Census from the three netstat runs of one family: `-tn` (state in the last
/// column), `-ltn` (listening sockets) and `-lun` (UDP lines, `udp` for
/// inet, `udp6` for inet6).
pub fn parse_netstat(tcp: &str, listen: &str, udp: &str, family: &str) -> ConnStats {
    let mut stats = ConnStats::default();
    for line in tcp.lines() {
        match line.split_whitespace().last() {
            Some("CLOSED") => stats.closed += 1,
            Some("SYN_SENT") => stats.syn_sent += 1,
            Some("SYN_RECV") => stats.syn_recv += 1,
            Some("ESTABLISHED") => stats.established += 1,
            Some("FIN_WAIT1") => stats.fin_wait1 += 1,
            Some("FIN_WAIT2") => stats.fin_wait2 += 1,
            Some("CLOSING") => stats.closing += 1,
            Some("TIME_WAIT") => stats.time_wait += 1,
            Some("CLOSE_WAIT") => stats.close_wait += 1,
            Some("LAST_ACK") => stats.last_ack += 1,
            Some("UNKNOWN") => stats.unknown += 1,
            _ => {}
        }
    }
    stats.listen = listen
        .lines()
        .filter(|l| l.split_whitespace().last() == Some("LISTEN"))
        .count() as u64;
    let udp_prefix = if family == "inet6" { "udp6" } else { "udp " };
    stats.udp = udp.lines().filter(|l| l.starts_with(udp_prefix)).count() as u64;
    stats
}

pub struct ConnectionsSubsystem {
    key: FileKey,
    preferred: Option<ConnTool>,
    tool: Option<ConnTool>,
}

impl ConnectionsSubsystem {
    pub fn new(prefix: &str, preferred: Option<ConnTool>) -> Self {
        Self {
            key: FileKey::host(prefix, "connections"),
            preferred,
            tool: None,
        }
    }

    pub fn tool(&self) -> Option<ConnTool> {
        self.tool
    }

    async fn run(
        &self,
        program: &str,
        args: &[&str],
        cancel: &CancellationToken,
    ) -> Result<String, CollectError> {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        let out = run_command(program, &args, DEFAULT_TIMEOUT, cancel).await?;
        if !out.success {
            return Err(CollectError::parse(
                format!("{program} {}", args.join(" ")),
                out.text.trim().to_string(),
            ));
        }
        Ok(out.text)
    }

    async fn census(
        &self,
        tool: ConnTool,
        family: &str,
        cancel: &CancellationToken,
    ) -> Result<ConnStats, CollectError> {
        match tool {
            ConnTool::Ss => {
                let text = self.run("ss", &["-naut", "-f", family], cancel).await?;
                Ok(parse_ss(&text))
            }
            ConnTool::Netstat => {
                let tcp = self.run("netstat", &["-tn", "-A", family], cancel).await?;
                let listen = self.run("netstat", &["-ltn", "-A", family], cancel).await?;
                let udp = self.run("netstat", &["-lun", "-A", family], cancel).await?;
                Ok(parse_netstat(&tcp, &listen, &udp, family))
            }
        }
    }
}

#[async_trait]
impl Subsystem for ConnectionsSubsystem {
    fn name(&self) -> &'static str {
        "connections"
    }

    async fn init(&mut self, _cancel: &CancellationToken) -> Result<(), CollectError> {
        let Some(tool) = ConnTool::detect(self.preferred) else {
            return Err(CollectError::parse(
                "connections",
                "neither ss nor netstat found in PATH",
            ));
        };
        if let Some(preferred) = self.preferred
            && preferred != tool
        {
            tracing::warn!(preferred = %preferred, using = %tool, "preferred tool not installed");
        }
        tracing::info!(tool = %tool, "connection census tool selected");
        self.tool = Some(tool);
        Ok(())
    }

    fn archives(&self) -> Vec<(FileKey, Schema)> {
        vec![(self.key.clone(), Schema::gauges(DATA_SOURCES))]
    }

    fn charts(&self) -> &'static [ChartSpec] {
        CONNECTIONS_CHARTS
    }

    #[instrument(skip_all, fields(subsystem = "connections"))]
    async fn cycle(&mut self, ctx: &CycleContext<'_>) -> Result<(), CollectError> {
        let Some(tool) = self.tool else {
            return Err(CollectError::parse("connections", "no census tool selected"));
        };
        let mut row = Vec::with_capacity(DATA_SOURCES.len());
        for family in FAMILIES {
            let stats = self.census(tool, family, ctx.cancel).await?;
            row.extend(stats.as_array().into_iter().map(Metric::from));
        }
        append_logged(ctx.archive, self.name(), &self.key, &row).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ss_states_and_udp() {
        let text = "\
Netid State      Recv-Q Send-Q Local Address:Port  Peer Address:Port
udp   UNCONN     0      0      0.0.0.0:68          0.0.0.0:*
udp   ESTAB      0      0      10.0.0.2:5353       10.0.0.1:53
tcp   LISTEN     0      128    0.0.0.0:22          0.0.0.0:*
tcp   ESTAB      0      0      10.0.0.2:22         10.0.0.9:51000
tcp   ESTAB      0      0      10.0.0.2:22         10.0.0.9:51001
tcp   TIME-WAIT  0      0      10.0.0.2:40000      1.1.1.1:443
tcp   FIN-WAIT-2 0      0      10.0.0.2:40001      1.1.1.1:443
tcp   UNCONN     0      0      10.0.0.2:40002      1.1.1.1:443
";
        let s = parse_ss(text);
        assert_eq!(s.udp, 2);
        assert_eq!(s.listen, 1);
        assert_eq!(s.established, 2);
        assert_eq!(s.time_wait, 1);
        assert_eq!(s.fin_wait2, 1);
        assert_eq!(s.closed, 1);
        assert_eq!(s.syn_sent, 0);
    }

    #[test]
    fn netstat_three_runs() {
        let tcp = "\
Active Internet connections (w/o servers)
Proto Recv-Q Send-Q Local Address           Foreign Address         State
tcp        0      0 10.0.0.2:22             10.0.0.9:51000          ESTABLISHED
tcp        0      0 10.0.0.2:40000          1.1.1.1:443             TIME_WAIT
tcp        0      0 10.0.0.2:40001          1.1.1.1:443             CLOSE_WAIT
";
        let listen = "\
Active Internet connections (only servers)
Proto Recv-Q Send-Q Local Address           Foreign Address         State
tcp        0      0 0.0.0.0:22              0.0.0.0:*               LISTEN
tcp        0      0 127.0.0.1:631           0.0.0.0:*               LISTEN
";
        let udp = "\
Active Internet connections (only servers)
Proto Recv-Q Send-Q Local Address           Foreign Address         State
udp        0      0 0.0.0.0:68              0.0.0.0:*
udp6       0      0 :::546                  :::*
";
        let v4 = parse_netstat(tcp, listen, udp, "inet");
        assert_eq!(v4.established, 1);
        assert_eq!(v4.time_wait, 1);
        assert_eq!(v4.close_wait, 1);
        assert_eq!(v4.listen, 2);
        assert_eq!(v4.udp, 1);

        let v6 = parse_netstat("", "", udp, "inet6");
        assert_eq!(v6.udp, 1);
        assert_eq!(v6.listen, 0);
    }

    #[test]
    fn schema_matches_row_width() {
        assert_eq!(DATA_SOURCES.len(), 2 * ConnStats::default().as_array().len());
    }
}
