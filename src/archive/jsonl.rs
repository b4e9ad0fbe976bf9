// JSON-lines archive: one append-only file per key plus schema and chart descriptors.

use super::{Archive, FileKey, RetentionPolicy, Schema, check_arity};
use crate::chart::{ChartSpec, Period};
use crate::error::ArchiveError;
use crate::history::now_secs;
use crate::models::Metric;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::instrument;

#[derive(Serialize, Deserialize)]
struct SchemaFile {
    key: FileKey,
    #[serde(flatten)]
    schema: Schema,
    retention: RetentionPolicy,
}

#[derive(Serialize)]
struct Row<'a> {
    ts: f64,
    values: &'a [Metric],
}

#[derive(Serialize)]
struct RenderFile<'a> {
    key: &'a FileKey,
    period: Period,
    span_secs: u64,
    requested_at: f64,
    chart: &'a ChartSpec,
}

/// Files under `root`: `<key>.schema.json`, `<key>.jsonl`, `<key>-<period>.chart.json`.
pub struct JsonlArchive {
    root: PathBuf,
    arity: std::sync::Mutex<HashMap<FileKey, usize>>,
}

impl JsonlArchive {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            arity: std::sync::Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn data_path(&self, key: &FileKey) -> PathBuf {
        self.root.join(format!("{key}.jsonl"))
    }

    pub fn schema_path(&self, key: &FileKey) -> PathBuf {
        self.root.join(format!("{key}.schema.json"))
    }

    pub fn chart_path(&self, key: &FileKey, period: Period) -> PathBuf {
        self.root.join(format!("{key}-{period}.chart.json"))
    }

    fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> ArchiveError + '_ {
        move |source| ArchiveError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn registered(&self, key: &FileKey) -> Option<usize> {
        self.arity
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(key)
            .copied()
    }

    fn register(&self, key: &FileKey, n: usize) {
        let mut m = self.arity.lock().unwrap_or_else(|p| p.into_inner());
        m.insert(key.clone(), n);
    }
}

#[async_trait]
impl Archive for JsonlArchive {
    #[instrument(skip(self, schema, retention), fields(archive = "jsonl", key = %key))]
    async fn create_if_absent(
        &self,
        key: &FileKey,
        schema: &Schema,
        retention: &RetentionPolicy,
    ) -> Result<(), ArchiveError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(Self::io_err(&self.root))?;
        let path = self.schema_path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let existing: SchemaFile = serde_json::from_slice(&bytes)?;
                check_arity(key, existing.schema.len(), schema.len())?;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let file = SchemaFile {
                    key: key.clone(),
                    schema: schema.clone(),
                    retention: *retention,
                };
                let body = serde_json::to_vec_pretty(&file)?;
                tokio::fs::write(&path, body)
                    .await
                    .map_err(Self::io_err(&path))?;
                tracing::info!(key = %key, data_sources = schema.len(), "archive created");
            }
            Err(e) => return Err(Self::io_err(&path)(e)),
        }
        self.register(key, schema.len());
        Ok(())
    }

    async fn append(&self, key: &FileKey, values: &[Metric]) -> Result<(), ArchiveError> {
        let expected = self
            .registered(key)
            .ok_or_else(|| ArchiveError::UnknownKey {
                key: key.to_string(),
            })?;
        check_arity(key, expected, values.len())?;

        let mut line = serde_json::to_vec(&Row {
            ts: now_secs(),
            values,
        })?;
        line.push(b'\n');

        let path = self.data_path(key);
        let mut f = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(Self::io_err(&path))?;
        f.write_all(&line).await.map_err(Self::io_err(&path))?;
        // the write finishes on a blocking task; wait for it before reporting success
        f.flush().await.map_err(Self::io_err(&path))?;
        Ok(())
    }

    async fn render_chart(
        &self,
        key: &FileKey,
        period: Period,
        chart: &ChartSpec,
    ) -> Result<(), ArchiveError> {
        let path = self.chart_path(key, period);
        let body = serde_json::to_vec_pretty(&RenderFile {
            key,
            period,
            span_secs: period.seconds(),
            requested_at: now_secs(),
            chart,
        })?;
        tokio::fs::write(&path, body)
            .await
            .map_err(Self::io_err(&path))?;
        Ok(())
    }
}
