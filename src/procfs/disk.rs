// /proc/diskstats and the mount table

use super::lines;
use crate::error::CollectError;
use crate::models::{DiskCounters, Mount};
use tokio_util::sync::CancellationToken;

/// Rows with fewer than 14 fields or non-numeric counters are skipped.
pub fn parse_diskstats(
    text: &str,
    cancel: &CancellationToken,
) -> Result<Vec<DiskCounters>, CollectError> {
    let mut out = Vec::new();
    for line in lines(text, cancel) {
        let line = line?;
        let f: Vec<&str> = line.split_whitespace().collect();
        if f.len() < 14 {
            continue;
        }
        let (Ok(major), Ok(minor), Ok(io_ticks_ms), Ok(weighted_io_ms)) = (
            f[0].parse::<u32>(),
            f[1].parse::<u32>(),
            f[12].parse::<u64>(),
            f[13].parse::<u64>(),
        ) else {
            continue;
        };
        out.push(DiskCounters {
            major,
            minor,
            device: f[2].to_string(),
            io_ticks_ms,
            weighted_io_ms,
        });
    }
    Ok(out)
}

/// Mount table in /proc/self/mounts format. Octal escapes (`\040` for space) are decoded.
pub fn parse_mounts(text: &str, cancel: &CancellationToken) -> Result<Vec<Mount>, CollectError> {
    let mut out = Vec::new();
    for line in lines(text, cancel) {
        let line = line?;
        let f: Vec<&str> = line.split_whitespace().collect();
        if f.len() < 4 {
            continue;
        }
        out.push(Mount {
            device: unescape_octal(f[0]),
            mount_point: unescape_octal(f[1]),
            fs_type: f[2].to_string(),
            options: f[3].to_string(),
        });
    }
    Ok(out)
}

fn unescape_octal(s: &str) -> String {
    if !s.contains('\\') {
        return s.to_string();
    }
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\'
            && i + 4 <= bytes.len()
            && bytes[i + 1..i + 4].iter().all(|b| (b'0'..=b'7').contains(b))
        {
            let code = bytes[i + 1..i + 4]
                .iter()
                .fold(0u32, |acc, b| acc * 8 + u32::from(b - b'0'));
            out.push(code as u8);
            i += 4;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}
