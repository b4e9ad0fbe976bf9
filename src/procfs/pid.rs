// Per-PID readers: <pid>/stat, <pid>/io, <pid>/status

use super::{lines, parse_field};
use crate::error::CollectError;
use crate::models::{PidIo, PidStat};
use tokio_util::sync::CancellationToken;

/// Field positions counted after the `pid (comm) state` prefix.
const UTIME: usize = 10;
const STIME: usize = 11;
const NUM_THREADS: usize = 16;
const STARTTIME: usize = 18;
const VSIZE: usize = 19;
const RSS: usize = 20;

/// `comm` may contain spaces and parentheses, so fields are taken after the last `)`.
pub fn parse_pid_stat(pid: u32, text: &str) -> Result<PidStat, CollectError> {
    let what = format!("/proc/{pid}/stat");
    let close = text
        .rfind(')')
        .ok_or_else(|| CollectError::parse(&what, "no comm terminator"))?;
    // first token after `)` is the state letter
    let f: Vec<&str> = text[close + 1..].split_whitespace().skip(1).collect();
    if f.len() <= RSS {
        return Err(CollectError::parse(
            &what,
            format!("{} fields after comm, need {}", f.len(), RSS + 1),
        ));
    }
    Ok(PidStat {
        pid,
        utime: parse_field(&what, Some(f[UTIME]))?,
        stime: parse_field(&what, Some(f[STIME]))?,
        threads: parse_field(&what, Some(f[NUM_THREADS]))?,
        start_time: parse_field(&what, Some(f[STARTTIME]))?,
        vsize_bytes: parse_field(&what, Some(f[VSIZE]))?,
        rss_pages: parse_field(&what, Some(f[RSS]))?,
    })
}

pub fn parse_pid_io(text: &str, cancel: &CancellationToken) -> Result<PidIo, CollectError> {
    let mut io = PidIo::default();
    let mut seen = 0;
    for line in lines(text, cancel) {
        let line = line?;
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let slot = match key.trim() {
            "rchar" => &mut io.rchar,
            "wchar" => &mut io.wchar,
            "read_bytes" => &mut io.read_bytes,
            "write_bytes" => &mut io.write_bytes,
            _ => continue,
        };
        *slot = parse_field("/proc/<pid>/io", Some(value.trim()))?;
        seen += 1;
    }
    if seen < 4 {
        return Err(CollectError::parse("/proc/<pid>/io", "missing counters"));
    }
    Ok(io)
}

/// `(voluntary, nonvoluntary)` context switches; absent keys count as 0.
pub fn parse_status_ctxt(
    text: &str,
    cancel: &CancellationToken,
) -> Result<(u64, u64), CollectError> {
    let mut voluntary = 0;
    let mut involuntary = 0;
    for line in lines(text, cancel) {
        let line = line?;
        if let Some(v) = line.strip_prefix("voluntary_ctxt_switches:") {
            voluntary = parse_field("/proc/<pid>/status", Some(v.trim()))?;
        } else if let Some(v) = line.strip_prefix("nonvoluntary_ctxt_switches:") {
            involuntary = parse_field("/proc/<pid>/status", Some(v.trim()))?;
        }
    }
    Ok((voluntary, involuntary))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stat_handles_comm_with_spaces_and_parens() {
        let text = "42 (my (odd) proc) S 1 42 42 0 -1 4194304 100 0 0 0 250 50 0 0 20 0 3 0 12345 1048576 256 18446744073709551615";
        let s = parse_pid_stat(42, text).unwrap();
        assert_eq!(s.utime, 250);
        assert_eq!(s.stime, 50);
        assert_eq!(s.threads, 3);
        assert_eq!(s.start_time, 12345);
        assert_eq!(s.vsize_bytes, 1048576);
        assert_eq!(s.rss_pages, 256);
    }

    #[test]
    fn truncated_stat_is_parse_error() {
        assert!(parse_pid_stat(1, "1 (init) S 0 1 1").is_err());
    }

    #[test]
    fn io_requires_all_four_counters() {
        let cancel = CancellationToken::new();
        let full = "rchar: 10\nwchar: 20\nsyscr: 1\nsyscw: 1\nread_bytes: 4\nwrite_bytes: 8\ncancelled_write_bytes: 0\n";
        let io = parse_pid_io(full, &cancel).unwrap();
        assert_eq!((io.rchar, io.wchar, io.read_bytes, io.write_bytes), (10, 20, 4, 8));
        assert!(parse_pid_io("rchar: 10\n", &cancel).is_err());
    }

    #[test]
    fn status_context_switches() {
        let text = "Name:\tnginx\nState:\tS (sleeping)\nvoluntary_ctxt_switches:\t120\nnonvoluntary_ctxt_switches:\t7\n";
        assert_eq!(
            parse_status_ctxt(text, &CancellationToken::new()).unwrap(),
            (120, 7)
        );
    }
}
