//! Core abstractions shared by the scan runner and the plugin catalog
//!
//! Fundamental building blocks of the engine. The Plugin trait defines the
//! interface every compliance check implements, findings carry the ordered
//! status the aggregator folds into an exit severity, the collection
//! snapshot holds pre-fetched provider data shared read-only across all
//! concurrently running plugins, and the context layer carries the per-run
//! settings and credential scope.

pub mod context;
pub mod finding;
pub mod plugin;
pub mod snapshot;
pub mod status;

pub use context::{AccountScope, CloudContext, ScanSettings, SkipList};
pub use finding::{Finding, ANY};
pub use plugin::Plugin;
pub use snapshot::{CollectionSnapshot, RegionEntry, ResultCell};
pub use status::Status;
