// /proc/net/dev

use super::{lines, parse_field};
use crate::error::CollectError;
use crate::models::NetIfCounters;
use tokio_util::sync::CancellationToken;

const WHAT: &str = "/proc/net/dev";

/// Skips the two header lines; rows with fewer than 16 counters are ignored.
pub fn parse_net_dev(
    text: &str,
    cancel: &CancellationToken,
) -> Result<Vec<(String, NetIfCounters)>, CollectError> {
    let mut out = Vec::new();
    for line in lines(text, cancel).skip(2) {
        let line = line?;
        let Some((name, rest)) = line.split_once(':') else {
            continue;
        };
        let f: Vec<&str> = rest.split_whitespace().collect();
        if f.len() < 16 {
            continue;
        }
        out.push((
            name.trim().to_string(),
            NetIfCounters {
                rx_bytes: parse_field(WHAT, Some(f[0]))?,
                rx_packets: parse_field(WHAT, Some(f[1]))?,
                rx_errors: parse_field(WHAT, Some(f[2]))?,
                tx_bytes: parse_field(WHAT, Some(f[8]))?,
                tx_packets: parse_field(WHAT, Some(f[9]))?,
                tx_errors: parse_field(WHAT, Some(f[10]))?,
            },
        ));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NET_DEV: &str = "\
Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
    lo:  5000      50    0    0    0     0          0         0     5000      50    0    0    0     0       0          0
  eth0:  1000      10    1    0    0     0          0         0     2000      20    2    0    0     0       0          0
";

    #[test]
    fn parses_rows_after_headers() {
        let rows = parse_net_dev(NET_DEV, &CancellationToken::new()).unwrap();
        assert_eq!(rows.len(), 2);
        let (name, eth0) = &rows[1];
        assert_eq!(name, "eth0");
        assert_eq!(eth0.rx_bytes, 1000);
        assert_eq!(eth0.rx_errors, 1);
        assert_eq!(eth0.tx_bytes, 2000);
        assert_eq!(eth0.tx_packets, 20);
        assert_eq!(eth0.tx_errors, 2);
    }

    #[test]
    fn short_rows_are_skipped() {
        let text = "h1\nh2\n  eth1: 1 2 3\n";
        assert!(parse_net_dev(text, &CancellationToken::new()).unwrap().is_empty());
    }
}
