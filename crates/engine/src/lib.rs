//! Kumori Engine - Cloud Compliance Scan Orchestration
//!
//! This crate provides a trait-based system for scanning cloud accounts
//! against a catalog of independent compliance checks. Plugins declare the
//! provider data they need; the runner collects that data once, executes
//! every applicable plugin concurrently against the shared snapshot, and
//! folds findings into a single aggregate severity.

pub mod collect;
pub mod core;
pub mod output;
pub mod plugins;
pub mod runner;

pub use crate::core::{
    AccountScope, CloudContext, CollectionSnapshot, Finding, Plugin, ResultCell, ScanSettings,
    SkipList, Status,
};

pub use collect::{CollectionRequest, Collector, SnapshotCollector};

pub use output::{JsonSink, MemorySink, OutputSink};

pub use runner::{
    EngineError, PluginRegistry, PluginRegistryBuilder, ScanSummary, ScanningEngine,
};

pub use plugins::default_registry;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
