//! Output sink contract and the sinks that ship with the engine.
//!
//! The aggregator writes through a sink exactly three ways: the collection
//! snapshot once before any plugin runs, one call per unsuppressed finding
//! as results stream in, and `close` once after the executor's join.
//! Console rendering lives in the CLI crate; the engine ships the JSON and
//! in-memory sinks.

use crate::core::{CollectionSnapshot, Finding, Plugin, Status};
use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

pub trait OutputSink: Send {
    fn write_collection(&mut self, _snapshot: &CollectionSnapshot, _provider: &str) -> Result<()> {
        Ok(())
    }

    fn write_result(
        &mut self,
        finding: &Finding,
        plugin: &dyn Plugin,
        plugin_id: &str,
        compliance: Option<&str>,
    ) -> Result<()>;

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// One row of the JSON report.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRecord {
    pub plugin: String,
    pub category: String,
    pub title: String,
    pub description: String,
    pub resource: String,
    pub region: String,
    pub status: String,
    pub status_code: u8,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compliance: Option<String>,
}

/// Accumulates findings and writes a single JSON array on close.
pub struct JsonSink {
    writer: Box<dyn Write + Send>,
    records: Vec<JsonRecord>,
    ignore_ok: bool,
}

impl JsonSink {
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer,
            records: Vec::new(),
            ignore_ok: false,
        }
    }

    pub fn to_file(path: &Path) -> Result<Self> {
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create output file: {}", path.display()))?;
        Ok(Self::new(Box::new(file)))
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    pub fn with_ignore_ok(mut self, ignore_ok: bool) -> Self {
        self.ignore_ok = ignore_ok;
        self
    }
}

impl OutputSink for JsonSink {
    fn write_result(
        &mut self,
        finding: &Finding,
        plugin: &dyn Plugin,
        plugin_id: &str,
        compliance: Option<&str>,
    ) -> Result<()> {
        if self.ignore_ok && finding.status == Status::Pass {
            return Ok(());
        }

        self.records.push(JsonRecord {
            plugin: plugin_id.to_string(),
            category: plugin.category().to_string(),
            title: plugin.title().to_string(),
            description: plugin.description().to_string(),
            resource: finding.resource.clone().unwrap_or_else(|| "N/A".to_string()),
            region: finding.region.clone().unwrap_or_else(|| "Global".to_string()),
            status: finding.status.to_string(),
            status_code: finding.status.code(),
            message: finding.message.clone(),
            compliance: compliance.map(str::to_string),
        });
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        serde_json::to_writer_pretty(&mut self.writer, &self.records)
            .context("Failed to serialize scan report")?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Everything a scan wrote, captured for inspection.
#[derive(Debug, Default)]
pub struct CapturedOutput {
    pub collection_writes: usize,
    pub results: Vec<CapturedResult>,
    pub closed: bool,
}

#[derive(Debug, Clone)]
pub struct CapturedResult {
    pub plugin_id: String,
    pub finding: Finding,
    pub compliance: Option<String>,
}

/// Sink that records every write in memory. Used by the test suites and by
/// embedders that post-process findings themselves.
#[derive(Default)]
pub struct MemorySink {
    captured: Arc<Mutex<CapturedOutput>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle to the captured output; valid after the sink itself
    /// has been moved into the engine.
    pub fn handle(&self) -> Arc<Mutex<CapturedOutput>> {
        self.captured.clone()
    }
}

impl OutputSink for MemorySink {
    fn write_collection(&mut self, _snapshot: &CollectionSnapshot, _provider: &str) -> Result<()> {
        let mut captured = lock(&self.captured)?;
        captured.collection_writes += 1;
        Ok(())
    }

    fn write_result(
        &mut self,
        finding: &Finding,
        _plugin: &dyn Plugin,
        plugin_id: &str,
        compliance: Option<&str>,
    ) -> Result<()> {
        let mut captured = lock(&self.captured)?;
        captured.results.push(CapturedResult {
            plugin_id: plugin_id.to_string(),
            finding: finding.clone(),
            compliance: compliance.map(str::to_string),
        });
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let mut captured = lock(&self.captured)?;
        captured.closed = true;
        Ok(())
    }
}

fn lock(captured: &Arc<Mutex<CapturedOutput>>) -> Result<std::sync::MutexGuard<'_, CapturedOutput>> {
    captured
        .lock()
        .map_err(|_| anyhow::anyhow!("captured output lock poisoned"))
}
