// Error taxonomy for counter readers, probes and the archive collaborator.

use std::path::PathBuf;
use thiserror::Error;

/// Failure of a counter reader. A failed read skips the current cycle for the
/// affected subsystem or entity; nothing here is retried.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed {what}: {detail}")]
    Parse { what: String, detail: String },
    #[error("collection cancelled")]
    Cancelled,
}

impl CollectError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn parse(what: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Parse {
            what: what.into(),
            detail: detail.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// True when the source vanished (e.g. a PID exited between listing and reading).
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}

/// Failure of an external command (ping, ip, ss, netstat).
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} timed out after {secs:.1}s")]
    Timeout { program: String, secs: f64 },
    #[error("command cancelled")]
    Cancelled,
}

/// Failure of a single latency probe. Never aborts sibling probes.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error(transparent)]
    Exec(#[from] ExecError),
    #[error("could not parse {0} from probe output")]
    Parse(&'static str),
    #[error("invalid probe output pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl ProbeError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Exec(ExecError::Cancelled))
    }
}

impl From<ExecError> for CollectError {
    fn from(e: ExecError) -> Self {
        match e {
            ExecError::Cancelled => CollectError::Cancelled,
            ExecError::Spawn { program, source } => CollectError::Io {
                path: PathBuf::from(program),
                source,
            },
            ExecError::Timeout { program, secs } => CollectError::Io {
                path: PathBuf::from(program),
                source: std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!("timed out after {secs:.1}s"),
                ),
            },
        }
    }
}

/// Failure reported by the archive/chart collaborator.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("archive io on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("archive serialization: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("{key}: row has {got} values, schema declares {expected}")]
    SchemaMismatch {
        key: String,
        expected: usize,
        got: usize,
    },
    #[error("{key}: append before create_if_absent")]
    UnknownKey { key: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_detected_only_for_io_not_found() {
        let e = CollectError::io(
            "/proc/42/stat",
            std::io::Error::from(std::io::ErrorKind::NotFound),
        );
        assert!(e.is_not_found());
        assert!(!e.is_cancelled());
        assert!(!CollectError::parse("x", "y").is_not_found());
    }

    #[test]
    fn cancelled_exec_maps_to_cancelled_collect() {
        let e: CollectError = ExecError::Cancelled.into();
        assert!(e.is_cancelled());
        let p: ProbeError = ExecError::Cancelled.into();
        assert!(p.is_cancelled());
    }
}
