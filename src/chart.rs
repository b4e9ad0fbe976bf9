// Declarative chart tables: each chart is a list of {data source, label, color}.
// One generic renderer (the archive collaborator) consumes them.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Series {
    pub ds: &'static str,
    pub label: &'static str,
    pub color: &'static str,
}

const fn s(ds: &'static str, label: &'static str, color: &'static str) -> Series {
    Series { ds, label, color }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChartSpec {
    pub name: &'static str,
    pub title: &'static str,
    pub vertical_label: &'static str,
    pub series: &'static [Series],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Day,
    Week,
    Month,
    Year,
}

impl Period {
    pub const ALL: [Period; 4] = [Period::Day, Period::Week, Period::Month, Period::Year];

    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Day => "day",
            Period::Week => "week",
            Period::Month => "month",
            Period::Year => "year",
        }
    }

    pub fn seconds(&self) -> u64 {
        match self {
            Period::Day => 86_400,
            Period::Week => 7 * 86_400,
            Period::Month => 30 * 86_400,
            Period::Year => 365 * 86_400,
        }
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const RED: &str = "#EE4444";
const GREEN: &str = "#44EE44";
const BLUE: &str = "#4444EE";
const YELLOW: &str = "#EEEE44";
const CYAN: &str = "#44EEEE";
const MAGENTA: &str = "#EE44EE";
const ORANGE: &str = "#FFA500";
const GREY: &str = "#888888";
const WHITE: &str = "#CCCCCC";

pub static SYSTEM_CHARTS: &[ChartSpec] = &[
    ChartSpec {
        name: "load",
        title: "System load",
        vertical_label: "Load average",
        series: &[
            s("load1", "1 min", YELLOW),
            s("load5", "5 min", ORANGE),
            s("load15", "15 min", RED),
        ],
    },
    ChartSpec {
        name: "memory",
        title: "Memory allocation",
        vertical_label: "kB",
        series: &[
            s("mem_active", "Active", RED),
            s("mem_inactive", "Inactive", ORANGE),
            s("mem_buffers", "Buffers", BLUE),
            s("mem_cached", "Cached", CYAN),
            s("mem_free", "Free", GREEN),
        ],
    },
    ChartSpec {
        name: "processes",
        title: "Active processes",
        vertical_label: "Processes",
        series: &[
            s("proc_run", "Running", GREEN),
            s("proc_sleep", "Sleeping", BLUE),
            s("proc_wio", "Wait I/O", ORANGE),
            s("proc_zombie", "Zombie", RED),
            s("proc_stop", "Stopped", YELLOW),
            s("proc_swap", "Paging", MAGENTA),
            s("proc_total", "Total", WHITE),
        ],
    },
    ChartSpec {
        name: "entropy",
        title: "Entropy",
        vertical_label: "Bits",
        series: &[s("entropy", "Entropy", GREEN)],
    },
    ChartSpec {
        name: "uptime",
        title: "Uptime",
        vertical_label: "Seconds",
        series: &[s("uptime", "Uptime", YELLOW)],
    },
];

pub static KERNEL_CHARTS: &[ChartSpec] = &[
    ChartSpec {
        name: "cpu",
        title: "Kernel usage",
        vertical_label: "Percent (%)",
        series: &[
            s("user", "User", BLUE),
            s("nice", "Nice", CYAN),
            s("sys", "System", RED),
            s("iow", "I/O wait", ORANGE),
            s("irq", "IRQ", MAGENTA),
            s("sirq", "Soft IRQ", YELLOW),
            s("steal", "Steal", GREY),
            s("guest", "Guest", GREEN),
        ],
    },
    ChartSpec {
        name: "context_switches",
        title: "Context switches and forks",
        vertical_label: "Count",
        series: &[
            s("cs", "Context switches", YELLOW),
            s("forks", "Forks", BLUE),
            s("vforks", "VForks", MAGENTA),
        ],
    },
    ChartSpec {
        name: "vfs",
        title: "VFS usage",
        vertical_label: "Percent (%)",
        series: &[
            s("dentry", "dentry", BLUE),
            s("file", "file", GREEN),
            s("inode", "inode", RED),
        ],
    },
];

pub static NETIF_CHARTS: &[ChartSpec] = &[
    ChartSpec {
        name: "traffic",
        title: "Network traffic",
        vertical_label: "Bytes/s",
        series: &[s("rx_bytes", "Input", GREEN), s("tx_bytes", "Output", BLUE)],
    },
    ChartSpec {
        name: "packets",
        title: "Network packets",
        vertical_label: "Packets/s",
        series: &[
            s("rx_packets", "Input", GREEN),
            s("tx_packets", "Output", BLUE),
        ],
    },
    ChartSpec {
        name: "errors",
        title: "Network errors",
        vertical_label: "Errors/s",
        series: &[s("rx_errors", "Input", ORANGE), s("tx_errors", "Output", RED)],
    },
];

pub static FILESYSTEM_CHARTS: &[ChartSpec] = &[
    ChartSpec {
        name: "usage",
        title: "Filesystem usage",
        vertical_label: "Percent (%)",
        series: &[s("usage", "Space", GREEN), s("inode", "Inodes", BLUE)],
    },
    ChartSpec {
        name: "io_activity",
        title: "Time spent in I/O activity",
        vertical_label: "Milliseconds/s",
        series: &[s("ioa", "I/O time", ORANGE)],
    },
    ChartSpec {
        name: "io_weighted",
        title: "Weighted time spent in I/O",
        vertical_label: "Milliseconds/s",
        series: &[s("tim", "Weighted I/O time", RED)],
    },
];

pub static PROCESS_CHARTS: &[ChartSpec] = &[
    ChartSpec {
        name: "cpu",
        title: "CPU time usage",
        vertical_label: "Percent (%)",
        series: &[s("cpu", "CPU", RED)],
    },
    ChartSpec {
        name: "memory",
        title: "Resident memory",
        vertical_label: "Bytes",
        series: &[s("mem", "RSS", BLUE)],
    },
    ChartSpec {
        name: "io",
        title: "Disk and network usage",
        vertical_label: "Bytes/s",
        series: &[s("dsk", "Disk", ORANGE), s("net", "Network", GREEN)],
    },
    ChartSpec {
        name: "counts",
        title: "Processes, threads and open files",
        vertical_label: "Count",
        series: &[
            s("pro", "Processes", YELLOW),
            s("nth", "Threads", CYAN),
            s("nof", "Open files", MAGENTA),
        ],
    },
    ChartSpec {
        name: "context_switches",
        title: "Context switches",
        vertical_label: "Switches/s",
        series: &[s("vcs", "Voluntary", GREEN), s("ics", "Involuntary", RED)],
    },
    ChartSpec {
        name: "uptime",
        title: "Uptime",
        vertical_label: "Seconds",
        series: &[s("upt", "Uptime", YELLOW)],
    },
];

pub static LATENCY_CHARTS: &[ChartSpec] = &[
    ChartSpec {
        name: "rtt",
        title: "Round-trip time",
        vertical_label: "Milliseconds",
        series: &[
            s("min", "Min", GREEN),
            s("avg", "Avg", BLUE),
            s("max", "Max", RED),
        ],
    },
    ChartSpec {
        name: "loss",
        title: "Packet loss",
        vertical_label: "Percent (%)",
        series: &[s("loss", "Loss", ORANGE)],
    },
];

pub static CONNECTIONS_CHARTS: &[ChartSpec] = &[
    ChartSpec {
        name: "ipv4",
        title: "IPv4 TCP connections",
        vertical_label: "Connections",
        series: &[
            s("tcp4_established", "Established", GREEN),
            s("tcp4_listen", "Listen", BLUE),
            s("tcp4_time_wait", "Time wait", YELLOW),
            s("tcp4_close_wait", "Close wait", ORANGE),
            s("tcp4_syn_sent", "SYN sent", CYAN),
            s("tcp4_syn_recv", "SYN recv", MAGENTA),
        ],
    },
    ChartSpec {
        name: "ipv6",
        title: "IPv6 TCP connections",
        vertical_label: "Connections",
        series: &[
            s("tcp6_established", "Established", GREEN),
            s("tcp6_listen", "Listen", BLUE),
            s("tcp6_time_wait", "Time wait", YELLOW),
            s("tcp6_close_wait", "Close wait", ORANGE),
            s("tcp6_syn_sent", "SYN sent", CYAN),
            s("tcp6_syn_recv", "SYN recv", MAGENTA),
        ],
    },
    ChartSpec {
        name: "closing",
        title: "Closing TCP connections",
        vertical_label: "Connections",
        series: &[
            s("tcp4_fin_wait1", "FIN wait 1 (v4)", YELLOW),
            s("tcp4_fin_wait2", "FIN wait 2 (v4)", ORANGE),
            s("tcp4_closing", "Closing (v4)", RED),
            s("tcp4_last_ack", "Last ACK (v4)", MAGENTA),
            s("tcp6_fin_wait1", "FIN wait 1 (v6)", CYAN),
            s("tcp6_fin_wait2", "FIN wait 2 (v6)", BLUE),
            s("tcp6_closing", "Closing (v6)", GREEN),
            s("tcp6_last_ack", "Last ACK (v6)", GREY),
        ],
    },
    ChartSpec {
        name: "udp",
        title: "UDP sockets",
        vertical_label: "Sockets",
        series: &[s("udp4", "IPv4", GREEN), s("udp6", "IPv6", BLUE)],
    },
];

pub static INTERRUPTS_CHARTS: &[ChartSpec] = &[ChartSpec {
    name: "total",
    title: "Interrupt activity",
    vertical_label: "Interrupts/s",
    series: &[s("total", "Total", YELLOW)],
}];
