//! The static plugin catalog.
//!
//! Plugins are registered explicitly per provider; there is no dynamic
//! discovery. Adding a check means adding its module and one registration
//! line here.

pub mod aws;

use crate::runner::PluginRegistry;

/// The full catalog for a provider, in the order plugins are admitted to
/// the executor. Unknown providers get an empty registry, which selection
/// rejects as a configuration error.
pub fn default_registry(provider: &str) -> PluginRegistry {
    match provider {
        "aws" => aws::registry(),
        _ => PluginRegistry::new(),
    }
}
