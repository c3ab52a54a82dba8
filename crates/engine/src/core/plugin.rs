//! Plugin trait: one independent compliance check over a collection
//! snapshot.
//!
//! ## Design: static catalog, data-driven checks
//!
//! Every check declares up front which provider API calls it reads
//! (`apis`). The selector unions those declarations across the runnable set
//! so the collector fetches each API exactly once, no matter how many
//! plugins share it. By the time `run` is called, all the data a plugin can
//! ever see is already in the snapshot; plugins never perform network I/O
//! themselves, which is what makes it safe to run them concurrently against
//! one shared, immutable snapshot.
//!
//! Plugins are registered explicitly in [`crate::plugins`] rather than
//! discovered from the filesystem, so the catalog is known at compile time
//! and a typo in a plugin id is a hard configuration error instead of a
//! silent no-op.

use crate::core::{CollectionSnapshot, Finding, ScanSettings};
use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait Plugin: Send + Sync {
    fn id(&self) -> &'static str;

    fn title(&self) -> &'static str;

    fn category(&self) -> &'static str;

    fn description(&self) -> &'static str {
        "No description provided"
    }

    /// Provider API calls this plugin reads, as `Service:apiName`
    /// identifiers.
    fn apis(&self) -> &'static [&'static str];

    /// Compliance programs this plugin maps to, as `(program, clause)`
    /// pairs. Empty for plugins with no compliance relevance.
    fn compliance(&self) -> &'static [(&'static str, &'static str)] {
        &[]
    }

    /// Applicability tags for multi-tenant providers (`"org"`, `"user"`).
    /// Empty means the plugin applies to every credential scope.
    fn types(&self) -> &'static [&'static str] {
        &[]
    }

    /// Evaluate the check against the snapshot. Either returns every
    /// finding the plugin produced or fails as a whole; the executor
    /// converts a failure (or a panic) into a single Unknown finding
    /// without affecting any other plugin.
    async fn run(&self, snapshot: &CollectionSnapshot, settings: &ScanSettings)
        -> Result<Vec<Finding>>;

    fn compliance_clause(&self, program: &str) -> Option<&'static str> {
        self.compliance()
            .iter()
            .find(|(name, _)| *name == program)
            .map(|(_, clause)| *clause)
    }
}
