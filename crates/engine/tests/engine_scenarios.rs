//! End-to-end scans against mock plugins and a snapshot-backed collector.

use anyhow::Result;
use async_trait::async_trait;
use kumori_engine::collect::{CollectionRequest, Collector};
use kumori_engine::core::{CloudContext, CollectionSnapshot, Finding, Plugin, ResultCell, ScanSettings, Status};
use kumori_engine::output::MemorySink;
use kumori_engine::runner::{EngineError, PluginRegistryBuilder, ScanningEngine};
use kumori_engine::SnapshotCollector;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct Scripted {
    id: &'static str,
    apis: &'static [&'static str],
    findings: Vec<Finding>,
}

#[async_trait]
impl Plugin for Scripted {
    fn id(&self) -> &'static str {
        self.id
    }
    fn title(&self) -> &'static str {
        "Scripted"
    }
    fn category(&self) -> &'static str {
        "Test"
    }
    fn apis(&self) -> &'static [&'static str] {
        self.apis
    }
    async fn run(&self, _: &CollectionSnapshot, _: &ScanSettings) -> Result<Vec<Finding>> {
        Ok(self.findings.clone())
    }
}

struct Crashing;

#[async_trait]
impl Plugin for Crashing {
    fn id(&self) -> &'static str {
        "crashing"
    }
    fn title(&self) -> &'static str {
        "Crashing"
    }
    fn category(&self) -> &'static str {
        "Test"
    }
    fn apis(&self) -> &'static [&'static str] {
        &["Svc:call"]
    }
    async fn run(&self, _: &CollectionSnapshot, _: &ScanSettings) -> Result<Vec<Finding>> {
        panic!("index out of range while walking instances")
    }
}

/// Collector that counts invocations, to prove fatal selection errors
/// abort before any collection attempt.
struct CountingCollector {
    calls: Arc<AtomicUsize>,
    inner: SnapshotCollector,
}

#[async_trait]
impl Collector for CountingCollector {
    async fn collect(
        &self,
        context: &CloudContext,
        request: &CollectionRequest,
    ) -> Result<CollectionSnapshot> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.collect(context, request).await
    }
}

fn fixture_snapshot() -> CollectionSnapshot {
    let mut snapshot = CollectionSnapshot::new();
    snapshot.insert("svc", "call", "us-east-1", ResultCell::ok(json!([])));
    snapshot
}

#[tokio::test]
async fn single_plugin_run_collects_its_apis() {
    let registry = PluginRegistryBuilder::new()
        .with_plugin(Scripted {
            id: "solo",
            apis: &["Svc:call", "Svc:other"],
            findings: vec![Finding::pass("fine").with_region("us-east-1")],
        })
        .build();
    let engine = ScanningEngine::new(registry);

    let sink = MemorySink::new();
    let handle = sink.handle();
    let summary = engine
        .run(
            &CloudContext::new("aws"),
            ScanSettings::default(),
            &SnapshotCollector::new(fixture_snapshot()),
            Box::new(sink),
        )
        .await
        .unwrap();

    assert_eq!(summary.final_status, Status::Pass);
    assert_eq!(summary.statuses["solo"], Status::Pass);

    let captured = handle.lock().unwrap();
    assert_eq!(captured.collection_writes, 1);
    assert_eq!(captured.results.len(), 1);
    assert!(captured.closed);
}

#[tokio::test]
async fn unknown_plugin_filter_aborts_before_collection() {
    let registry = PluginRegistryBuilder::new()
        .with_plugin(Scripted {
            id: "present",
            apis: &["Svc:call"],
            findings: Vec::new(),
        })
        .build();
    let engine = ScanningEngine::new(registry);

    let calls = Arc::new(AtomicUsize::new(0));
    let collector = CountingCollector {
        calls: calls.clone(),
        inner: SnapshotCollector::new(fixture_snapshot()),
    };

    let settings = ScanSettings::new().with_plugin("X");
    let result = engine
        .run(
            &CloudContext::new("aws"),
            settings,
            &collector,
            Box::new(MemorySink::new()),
        )
        .await;

    match result {
        Err(EngineError::InvalidPlugin(id)) => assert_eq!(id, "X"),
        other => panic!("expected InvalidPlugin, got {other:?}"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn final_severity_is_the_worst_unsuppressed_status() {
    let registry = PluginRegistryBuilder::new()
        .with_plugin(Scripted {
            id: "mixed",
            apis: &["Svc:call"],
            findings: vec![
                Finding::pass("fine"),
                Finding::fail("broken"),
                Finding::unknown("cannot tell"),
            ],
        })
        .build();
    let engine = ScanningEngine::new(registry);

    let summary = engine
        .run(
            &CloudContext::new("aws"),
            ScanSettings::new().with_exit_code(true),
            &SnapshotCollector::new(fixture_snapshot()),
            Box::new(MemorySink::new()),
        )
        .await
        .unwrap();

    assert_eq!(summary.final_status, Status::Unknown);
    assert_eq!(summary.exit_code, 3);
}

#[tokio::test]
async fn suppressed_finding_is_dropped_from_output_and_severity() {
    let registry = PluginRegistryBuilder::new()
        .with_plugin(Scripted {
            id: "pluginA",
            apis: &["Svc:call"],
            findings: vec![Finding::fail("left open").with_region("us-east-1")],
        })
        .build();
    let engine = ScanningEngine::new(registry);

    let sink = MemorySink::new();
    let handle = sink.handle();
    let settings = ScanSettings::new()
        .with_suppress(vec!["pluginA:us-east-1:any".to_string()])
        .with_exit_code(true);

    let summary = engine
        .run(
            &CloudContext::new("aws"),
            settings,
            &SnapshotCollector::new(fixture_snapshot()),
            Box::new(sink),
        )
        .await
        .unwrap();

    assert_eq!(summary.final_status, Status::Pass);
    assert_eq!(summary.exit_code, 0);
    assert!(handle.lock().unwrap().results.is_empty());
}

#[tokio::test]
async fn crash_is_isolated_from_the_other_plugin() {
    let registry = PluginRegistryBuilder::new()
        .with_plugin(Crashing)
        .with_plugin(Scripted {
            id: "healthy",
            apis: &["Svc:call"],
            findings: vec![
                Finding::pass("first").with_region("us-east-1"),
                Finding::pass("second").with_region("us-east-1"),
            ],
        })
        .build();
    let engine = ScanningEngine::new(registry);

    let sink = MemorySink::new();
    let handle = sink.handle();
    let summary = engine
        .run(
            &CloudContext::new("aws"),
            ScanSettings::new().with_exit_code(true),
            &SnapshotCollector::new(fixture_snapshot()),
            Box::new(sink),
        )
        .await
        .unwrap();

    assert_eq!(summary.final_status, Status::Unknown);
    assert_eq!(summary.exit_code, 3);
    assert_eq!(summary.statuses["crashing"], Status::Unknown);
    assert_eq!(summary.statuses["healthy"], Status::Pass);

    let captured = handle.lock().unwrap();
    let unknowns = captured
        .results
        .iter()
        .filter(|r| r.finding.status == Status::Unknown)
        .count();
    let passes = captured
        .results
        .iter()
        .filter(|r| r.finding.status == Status::Pass)
        .count();
    assert_eq!(unknowns, 1);
    assert_eq!(passes, 2);
}

#[tokio::test]
async fn empty_collection_is_fatal() {
    let registry = PluginRegistryBuilder::new()
        .with_plugin(Scripted {
            id: "solo",
            apis: &["Other:call"],
            findings: Vec::new(),
        })
        .build();
    let engine = ScanningEngine::new(registry);

    // The fixture has no data for Other:call, so the served snapshot is
    // empty and the scan must abort before running the plugin.
    let result = engine
        .run(
            &CloudContext::new("aws"),
            ScanSettings::default(),
            &SnapshotCollector::new(fixture_snapshot()),
            Box::new(MemorySink::new()),
        )
        .await;

    assert!(matches!(result, Err(EngineError::Collection(_))));
}

#[tokio::test]
async fn aws_catalog_runs_against_a_fixture_collection() {
    let collection = json!({
        "sts": { "getCallerIdentity": { "us-east-1": { "data": "111122223333" } } },
        "ec2": {
            "describeVolumes": {
                "us-east-1": { "data": [{ "VolumeId": "vol-1" }] }
            },
            "describeSnapshots": {
                "us-east-1": { "data": [] }
            }
        }
    });
    let collector = SnapshotCollector::from_value(collection).unwrap();

    let engine = ScanningEngine::new(kumori_engine::default_registry("aws"));
    let sink = MemorySink::new();
    let handle = sink.handle();

    let settings = ScanSettings::new()
        .with_plugin("ebsBackupEnabled")
        .with_exit_code(true);
    let summary = engine
        .run(&CloudContext::new("aws"), settings, &collector, Box::new(sink))
        .await
        .unwrap();

    assert_eq!(summary.final_status, Status::Fail);
    assert_eq!(summary.exit_code, 2);

    let captured = handle.lock().unwrap();
    assert_eq!(captured.results.len(), 1);
    assert_eq!(captured.results[0].plugin_id, "ebsBackupEnabled");
    assert_eq!(captured.results[0].finding.status, Status::Fail);
}
