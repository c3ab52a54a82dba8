//! Concurrency-limited plugin execution with per-plugin failure isolation.
//!
//! Plugins are admitted to the worker pool in registry order, with at most
//! `concurrency` invocations in flight at once. Each invocation runs behind
//! a failure boundary: a plugin that returns an error or panics produces a
//! single Unknown finding and nothing else, and every other plugin is
//! unaffected. Completion is latched through a [`CompletionGuard`], so a
//! completion signalled more than once is honored exactly once.
//!
//! Findings stream to the aggregator as each plugin produces them; the
//! executor's own result, the per-plugin status map, is ready only after
//! the join over every in-flight task.

use crate::core::{CollectionSnapshot, Finding, Plugin, ScanSettings, Status};
use crate::runner::{EngineError, PluginRegistry, ResultAggregator, Selection, SuppressionFilter};
use futures::FutureExt;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::debug;

/// Reference concurrency bound: at most ten plugin invocations in flight.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Single-completion latch: a two-state machine (pending → completed) where
/// every completion attempt after the first is a no-op.
#[derive(Debug, Default)]
pub struct CompletionGuard {
    done: AtomicBool,
}

impl CompletionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempts the pending → completed transition. True only for the one
    /// caller that wins it.
    pub fn complete(&self) -> bool {
        self.done
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_complete(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }
}

pub struct PluginExecutor {
    concurrency: usize,
}

impl Default for PluginExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_CONCURRENCY)
    }
}

impl PluginExecutor {
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    /// Runs every runnable plugin against the shared snapshot and returns
    /// the per-plugin statuses once all of them have completed. Plugins in
    /// the skipped set contribute [`Status::Pass`] without being invoked.
    pub async fn execute(
        &self,
        registry: &PluginRegistry,
        selection: &Selection,
        snapshot: Arc<CollectionSnapshot>,
        settings: Arc<ScanSettings>,
        suppression: Arc<SuppressionFilter>,
        aggregator: Arc<ResultAggregator>,
    ) -> Result<HashMap<String, Status>, EngineError> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut statuses: HashMap<String, Status> = HashMap::new();
        let mut tasks: JoinSet<anyhow::Result<(String, Status)>> = JoinSet::new();

        for plugin in registry.iter() {
            let id = plugin.id().to_string();
            if selection.is_skipped(&id) {
                statuses.insert(id, Status::Pass);
                continue;
            }

            let plugin = plugin.clone();
            let semaphore = semaphore.clone();
            let snapshot = snapshot.clone();
            let settings = settings.clone();
            let suppression = suppression.clone();
            let aggregator = aggregator.clone();

            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|_| anyhow::anyhow!("executor semaphore closed"))?;
                invoke(plugin, snapshot, settings, suppression, aggregator).await
            });
        }

        while let Some(joined) = tasks.join_next().await {
            // A failure here is not a plugin failure (those are isolated
            // inside `invoke`), so the whole scan aborts.
            let (id, status) = joined
                .map_err(|err| EngineError::Join(err.to_string()))?
                .map_err(EngineError::Output)?;
            statuses.entry(id).or_insert(status);
        }

        Ok(statuses)
    }
}

/// One plugin invocation: failure boundary, suppression, compliance
/// annotation, streaming to the aggregator, and the per-plugin maximum over
/// unsuppressed findings.
async fn invoke(
    plugin: Arc<dyn Plugin>,
    snapshot: Arc<CollectionSnapshot>,
    settings: Arc<ScanSettings>,
    suppression: Arc<SuppressionFilter>,
    aggregator: Arc<ResultAggregator>,
) -> anyhow::Result<(String, Status)> {
    let id = plugin.id().to_string();
    let guard = CompletionGuard::new();

    let attempt = AssertUnwindSafe(plugin.run(&snapshot, &settings))
        .catch_unwind()
        .await;

    let findings = match attempt {
        Ok(Ok(findings)) => findings,
        Ok(Err(error)) => {
            debug!(plugin = %id, %error, "plugin reported an error");
            vec![failure_finding(error.to_string())]
        }
        Err(panic) => {
            let detail = panic_detail(panic.as_ref());
            debug!(plugin = %id, detail, "plugin panicked");
            vec![failure_finding(detail.to_string())]
        }
    };

    let mut worst = Status::Pass;
    for finding in &findings {
        if suppression.matches(&finding.suppression_key(&id)) {
            continue;
        }
        let annotation = compliance_annotation(plugin.as_ref(), &settings);
        aggregator.observe(finding, plugin.as_ref(), &id, annotation.as_deref())?;
        worst = worst.max(finding.status);
    }

    if guard.complete() {
        Ok((id, worst))
    } else {
        Ok((id, Status::Pass))
    }
}

/// The single finding attributed to a plugin whose code crashed rather
/// than reporting results.
fn failure_finding(detail: String) -> Finding {
    Finding::unknown(detail).with_region("unknown")
}

fn panic_detail(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "plugin panicked"
    }
}

/// `"PROGRAM: clause"` entries joined by `"; "` for every requested
/// program the plugin declares, or None when there is nothing to annotate.
pub fn compliance_annotation(plugin: &dyn Plugin, settings: &ScanSettings) -> Option<String> {
    if settings.compliance.is_empty() {
        return None;
    }

    let parts: Vec<String> = settings
        .compliance
        .iter()
        .filter_map(|program| {
            plugin
                .compliance_clause(program)
                .map(|clause| format!("{}: {}", program.to_uppercase(), clause))
        })
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("; "))
    }
}
