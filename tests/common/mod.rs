// Shared test helpers: fake proc trees and archive fixtures

#![allow(dead_code)]

use hostwatch::archive::{Archive, MemoryArchive};
use hostwatch::procfs::ProcFs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// A proc root in a temp dir. Files are written on demand.
pub struct FakeProc {
    dir: TempDir,
}

impl FakeProc {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("tempdir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn procfs(&self) -> ProcFs {
        ProcFs::new(self.dir.path())
    }

    pub fn write(&self, rel: &str, contents: &str) {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent");
        }
        std::fs::write(path, contents).expect("write fixture");
    }

    pub fn remove(&self, rel: &str) {
        let path = self.dir.path().join(rel);
        if path.is_dir() {
            std::fs::remove_dir_all(path).expect("remove dir");
        } else {
            std::fs::remove_file(path).expect("remove file");
        }
    }

    /// `stat` with the aggregate cpu line, ctxt, processes and intr.
    pub fn stat(&self, cpu: [u64; 9], ctxt: u64, forks: u64, intr: u64) {
        let cpu: Vec<String> = cpu.iter().map(u64::to_string).collect();
        self.write(
            "stat",
            &format!(
                "cpu  {} 0\ncpu0 {} 0\nintr {intr} 5 0 7\nctxt {ctxt}\nbtime 1700000000\nprocesses {forks}\nprocs_running 1\n",
                cpu.join(" "),
                cpu.join(" "),
            ),
        );
    }

    pub fn uptime(&self, secs: f64) {
        self.write("uptime", &format!("{secs:.2} 1000.00\n"));
    }

    pub fn net_dev(&self, rows: &[(&str, u64, u64)]) {
        let mut text = String::from(
            "Inter-|   Receive                                                |  Transmit\n \
             face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed\n",
        );
        for (name, rx, tx) in rows {
            text.push_str(&format!(
                "{name:>6}: {rx} 10 0 0 0 0 0 0 {tx} 20 0 0 0 0 0 0\n"
            ));
        }
        self.write("net/dev", &text);
    }

    pub fn vfs(&self) {
        self.write("sys/fs/dentry-state", "300 100 45 0 0 0\n");
        self.write("sys/fs/file-nr", "1000 0 10000\n");
        self.write("sys/fs/inode-nr", "50 50\n");
    }

    /// One process: stat, io, status and `fds` entries under fdinfo.
    pub fn pid(&self, pid: u32, p: &FakePid) {
        self.write(
            &format!("{pid}/stat"),
            &format!(
                "{pid} ({}) {} 1 {pid} {pid} 0 -1 4194304 100 0 0 0 {} {} 0 0 20 0 {} 0 {} 1048576 {} 18446744073709551615\n",
                p.comm, p.state, p.utime, p.stime, p.threads, p.start_ticks, p.rss_pages
            ),
        );
        self.write(
            &format!("{pid}/io"),
            &format!(
                "rchar: {}\nwchar: {}\nsyscr: 1\nsyscw: 1\nread_bytes: {}\nwrite_bytes: {}\ncancelled_write_bytes: 0\n",
                p.rchar, p.wchar, p.read_bytes, p.write_bytes
            ),
        );
        self.write(
            &format!("{pid}/status"),
            &format!(
                "Name:\t{}\nState:\t{} (x)\nvoluntary_ctxt_switches:\t{}\nnonvoluntary_ctxt_switches:\t{}\n",
                p.comm, p.state, p.voluntary, p.involuntary
            ),
        );
        std::fs::create_dir_all(self.dir.path().join(format!("{pid}/fdinfo"))).expect("fdinfo");
        for fd in 0..p.fds {
            self.write(&format!("{pid}/fdinfo/{fd}"), "pos:\t0\nflags:\t02\n");
        }
    }
}

#[derive(Debug, Clone)]
pub struct FakePid {
    pub comm: &'static str,
    pub state: &'static str,
    pub utime: u64,
    pub stime: u64,
    pub threads: i64,
    pub start_ticks: u64,
    pub rss_pages: u64,
    pub rchar: u64,
    pub wchar: u64,
    pub read_bytes: u64,
    pub write_bytes: u64,
    pub voluntary: u64,
    pub involuntary: u64,
    pub fds: u32,
}

impl Default for FakePid {
    fn default() -> Self {
        Self {
            comm: "nginx",
            state: "S",
            utime: 0,
            stime: 0,
            threads: 1,
            start_ticks: 0,
            rss_pages: 0,
            rchar: 0,
            wchar: 0,
            read_bytes: 0,
            write_bytes: 0,
            voluntary: 0,
            involuntary: 0,
            fds: 0,
        }
    }
}

pub fn memory_archive() -> (Arc<MemoryArchive>, Arc<dyn Archive>) {
    let mem = Arc::new(MemoryArchive::new());
    let dyn_archive: Arc<dyn Archive> = mem.clone();
    (mem, dyn_archive)
}
