//! The scan orchestrator: selection, collection, bounded execution, and the
//! final severity.

use crate::collect::{CollectionRequest, Collector};
use crate::core::{CloudContext, ScanSettings, Status};
use crate::output::OutputSink;
use crate::runner::{
    selector, EngineError, PluginExecutor, PluginRegistry, ResultAggregator, SuppressionFilter,
    DEFAULT_CONCURRENCY,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// What one completed scan produced.
#[derive(Debug)]
pub struct ScanSummary {
    /// Per-plugin worst status among its own unsuppressed findings.
    /// Skipped plugins report [`Status::Pass`].
    pub statuses: HashMap<String, Status>,

    /// Running maximum across every unsuppressed finding of the run.
    pub final_status: Status,

    /// The value to exit with: `final_status.code()` when the settings ask
    /// for a severity-reflecting exit, otherwise 0.
    pub exit_code: i32,
}

pub struct ScanningEngine {
    registry: PluginRegistry,
    concurrency: usize,
}

impl ScanningEngine {
    pub fn new(registry: PluginRegistry) -> Self {
        Self {
            registry,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    /// Executes one full scan: select plugins, collect their data, run them
    /// with bounded concurrency, and close the sink after the join.
    ///
    /// Configuration and collection errors abort before any plugin runs.
    /// Individual plugin failures never surface here; they are isolated
    /// into Unknown findings by the executor.
    pub async fn run(
        &self,
        context: &CloudContext,
        settings: ScanSettings,
        collector: &dyn Collector,
        sink: Box<dyn OutputSink + Send>,
    ) -> Result<ScanSummary, EngineError> {
        let suppression = SuppressionFilter::compile(&settings.suppress)?;

        if !settings.compliance.is_empty() {
            info!(programs = ?settings.compliance, "using compliance modes");
        }
        if settings.govcloud {
            info!("using GovCloud mode");
        }
        if settings.china {
            info!("using China region mode");
        }
        if settings.ignore_ok {
            info!("ignoring passing results");
        }
        if settings.skip_paginate {
            info!("skipping pagination");
        }
        if !suppression.is_empty() {
            info!("suppressing results based on suppress expressions");
        }
        if let Some(filter) = &settings.plugin {
            if let Some(plugin) = self.registry.get(filter) {
                info!(plugin = plugin.title(), "testing single plugin");
            }
        }

        info!("determining API calls to make");
        let selection = selector::select(&self.registry, &settings, context)?;
        info!(
            api_calls = selection.required_apis.len(),
            provider = %context.provider,
            "collecting metadata, this may take several minutes"
        );

        let request = CollectionRequest {
            api_calls: selection.required_apis.clone(),
            paginate: !settings.skip_paginate,
            govcloud: settings.govcloud,
            china: settings.china,
        };
        let snapshot = collector
            .collect(context, &request)
            .await
            .map_err(|err| EngineError::Collection(err.to_string()))?;
        if snapshot.is_empty() {
            return Err(EngineError::Collection("No data returned".to_string()));
        }

        let aggregator = Arc::new(ResultAggregator::new(sink));
        aggregator.write_collection(&snapshot, &context.provider)?;

        info!("metadata collection complete, analyzing");
        let statuses = PluginExecutor::new(self.concurrency)
            .execute(
                &self.registry,
                &selection,
                Arc::new(snapshot),
                Arc::new(settings.clone()),
                Arc::new(suppression),
                aggregator.clone(),
            )
            .await?;

        aggregator.close()?;

        let final_status = aggregator.final_status();
        let exit_code = if settings.exit_code {
            i32::from(final_status.code())
        } else {
            0
        };
        info!(%final_status, exit_code, "scan complete");

        Ok(ScanSummary {
            statuses,
            final_status,
            exit_code,
        })
    }
}
