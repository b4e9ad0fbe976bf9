// In-process archive recorder for tests and dry runs.

use super::{Archive, FileKey, RetentionPolicy, Schema, check_arity};
use crate::chart::{ChartSpec, Period};
use crate::error::ArchiveError;
use crate::models::Metric;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    pub key: FileKey,
    pub period: Period,
    pub chart: &'static str,
}

#[derive(Default)]
struct State {
    schemas: HashMap<FileKey, (Schema, RetentionPolicy)>,
    create_calls: usize,
    rows: Vec<(FileKey, Vec<Metric>)>,
    renders: Vec<RenderRequest>,
}

/// Same contract checks as the file archive (unknown key, row arity).
#[derive(Default)]
pub struct MemoryArchive {
    state: Mutex<State>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        let mut guard = self.state.lock().unwrap_or_else(|p| p.into_inner());
        f(&mut guard)
    }

    /// Every appended row, in append order.
    pub fn rows(&self) -> Vec<(FileKey, Vec<Metric>)> {
        self.with(|s| s.rows.clone())
    }

    pub fn rows_for(&self, key: &FileKey) -> Vec<Vec<Metric>> {
        self.with(|s| {
            s.rows
                .iter()
                .filter(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
                .collect()
        })
    }

    pub fn append_count(&self) -> usize {
        self.with(|s| s.rows.len())
    }

    pub fn schema(&self, key: &FileKey) -> Option<Schema> {
        self.with(|s| s.schemas.get(key).map(|(schema, _)| schema.clone()))
    }

    pub fn retention(&self, key: &FileKey) -> Option<RetentionPolicy> {
        self.with(|s| s.schemas.get(key).map(|(_, r)| *r))
    }

    pub fn keys(&self) -> Vec<FileKey> {
        self.with(|s| {
            let mut keys: Vec<FileKey> = s.schemas.keys().cloned().collect();
            keys.sort();
            keys
        })
    }

    pub fn create_calls(&self) -> usize {
        self.with(|s| s.create_calls)
    }

    pub fn renders(&self) -> Vec<RenderRequest> {
        self.with(|s| s.renders.clone())
    }
}

#[async_trait]
impl Archive for MemoryArchive {
    async fn create_if_absent(
        &self,
        key: &FileKey,
        schema: &Schema,
        retention: &RetentionPolicy,
    ) -> Result<(), ArchiveError> {
        self.with(|s| {
            s.create_calls += 1;
            if let Some((existing, _)) = s.schemas.get(key) {
                return check_arity(key, existing.len(), schema.len());
            }
            s.schemas
                .insert(key.clone(), (schema.clone(), *retention));
            Ok(())
        })
    }

    async fn append(&self, key: &FileKey, values: &[Metric]) -> Result<(), ArchiveError> {
        self.with(|s| {
            let (schema, _) = s.schemas.get(key).ok_or_else(|| ArchiveError::UnknownKey {
                key: key.to_string(),
            })?;
            check_arity(key, schema.len(), values.len())?;
            s.rows.push((key.clone(), values.to_vec()));
            Ok(())
        })
    }

    async fn render_chart(
        &self,
        key: &FileKey,
        period: Period,
        chart: &ChartSpec,
    ) -> Result<(), ArchiveError> {
        self.with(|s| {
            s.renders.push(RenderRequest {
                key: key.clone(),
                period,
                chart: chart.name,
            })
        });
        Ok(())
    }
}
