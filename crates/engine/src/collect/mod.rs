//! Collector contract and the snapshot-backed collector.
//!
//! Real deployments plug in one collector per cloud, each wrapping vendor
//! APIs and pagination. The engine only depends on this trait: given the
//! API-call set the selector computed, produce one immutable
//! [`CollectionSnapshot`] before any plugin runs. A collector failure is
//! scan-fatal; there is nothing useful to scan without data.

use crate::core::{CloudContext, CollectionSnapshot};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;

/// What to collect for one scan.
#[derive(Debug, Clone, Default)]
pub struct CollectionRequest {
    /// `Service:apiName` identifiers, de-duplicated and in first-seen order.
    pub api_calls: Vec<String>,
    pub paginate: bool,
    pub govcloud: bool,
    pub china: bool,
}

#[async_trait]
pub trait Collector: Send + Sync {
    async fn collect(
        &self,
        context: &CloudContext,
        request: &CollectionRequest,
    ) -> Result<CollectionSnapshot>;
}

/// Collector backed by an already-materialized snapshot: a previous run's
/// cached collection file, or a fixture built in tests. Serves the subset
/// of the snapshot the request names, which is exactly what a live
/// collector would have fetched.
pub struct SnapshotCollector {
    snapshot: CollectionSnapshot,
}

impl SnapshotCollector {
    pub fn new(snapshot: CollectionSnapshot) -> Self {
        Self { snapshot }
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let snapshot = CollectionSnapshot::from_value(value)
            .context("Collection JSON does not match the service/api/region shape")?;
        Ok(Self::new(snapshot))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read collection file: {}", path.display()))?;
        let value = serde_json::from_str(&raw)
            .with_context(|| format!("Collection file is not valid JSON: {}", path.display()))?;
        Self::from_value(value)
    }
}

#[async_trait]
impl Collector for SnapshotCollector {
    async fn collect(
        &self,
        _context: &CloudContext,
        request: &CollectionRequest,
    ) -> Result<CollectionSnapshot> {
        let mut snapshot = self.snapshot.clone();
        snapshot.retain_api_calls(&request.api_calls);
        Ok(snapshot)
    }
}
