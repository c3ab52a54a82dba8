//! Result aggregation and exit severity.
//!
//! Many plugin tasks report findings concurrently. Writes to the output
//! sink are serialized behind a mutex, and the running maximum is an atomic
//! so `final_status` is order-independent no matter how the tasks
//! interleave.

use crate::core::{CollectionSnapshot, Finding, Plugin, Status};
use crate::output::OutputSink;
use anyhow::{anyhow, Result};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Mutex;

pub struct ResultAggregator {
    sink: Mutex<Box<dyn OutputSink + Send>>,
    maximum: AtomicU8,
}

impl ResultAggregator {
    pub fn new(sink: Box<dyn OutputSink + Send>) -> Self {
        Self {
            sink: Mutex::new(sink),
            maximum: AtomicU8::new(Status::Pass.code()),
        }
    }

    pub fn write_collection(&self, snapshot: &CollectionSnapshot, provider: &str) -> Result<()> {
        self.locked_sink()?.write_collection(snapshot, provider)
    }

    /// Forwards one unsuppressed finding to the sink and folds its status
    /// into the running maximum.
    pub fn observe(
        &self,
        finding: &Finding,
        plugin: &dyn Plugin,
        plugin_id: &str,
        compliance: Option<&str>,
    ) -> Result<()> {
        self.locked_sink()?
            .write_result(finding, plugin, plugin_id, compliance)?;
        self.maximum
            .fetch_max(finding.status.code(), Ordering::AcqRel);
        Ok(())
    }

    pub fn final_status(&self) -> Status {
        Status::from_code(self.maximum.load(Ordering::Acquire))
    }

    pub fn close(&self) -> Result<()> {
        self.locked_sink()?.close()
    }

    fn locked_sink(&self) -> Result<std::sync::MutexGuard<'_, Box<dyn OutputSink + Send>>> {
        self.sink.lock().map_err(|_| anyhow!("output sink lock poisoned"))
    }
}
