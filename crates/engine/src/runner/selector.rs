//! Plugin selection: partitions the registry into runnable and skipped
//! plugins for one run and computes the union of provider API calls the
//! runnable set needs.

use crate::core::{CloudContext, ScanSettings};
use crate::runner::{EngineError, PluginRegistry};
use std::collections::HashSet;
use tracing::debug;

/// Outcome of selection. `runnable` preserves registry order; the executor
/// admits plugins in exactly this order. `required_apis` is the
/// de-duplicated union of declared API calls in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub runnable: Vec<String>,
    pub skipped: HashSet<String>,
    pub required_apis: Vec<String>,
}

impl Selection {
    pub fn is_skipped(&self, id: &str) -> bool {
        self.skipped.contains(id)
    }
}

/// Classifies every plugin in the registry as runnable or skipped, first
/// matching rule wins:
///
/// 1. a plugin filter that names a different plugin skips it, and a filter
///    that names this plugin runs it regardless of any other rule;
/// 2. the skip list skips it;
/// 3. a multi-tenant credential scope skips plugins not tagged for it;
/// 4. requested compliance programs skip plugins declaring none of them.
///
/// Fails with [`EngineError::InvalidPlugin`] when the filter names an
/// unknown id, and with [`EngineError::NothingToCollect`] when no runnable
/// plugin remains.
pub fn select(
    registry: &PluginRegistry,
    settings: &ScanSettings,
    context: &CloudContext,
) -> Result<Selection, EngineError> {
    if let Some(filter) = &settings.plugin {
        if !registry.contains(filter) {
            return Err(EngineError::InvalidPlugin(filter.clone()));
        }
    }

    let skip_list = settings.skip_plugins.normalize();
    let mut selection = Selection::default();

    for plugin in registry.iter() {
        let id = plugin.id();

        let skip_reason = classify(
            id,
            plugin.types(),
            plugin.compliance(),
            settings,
            context,
            &skip_list,
        );

        if let Some(reason) = skip_reason {
            debug!(plugin = id, reason, "skipping plugin");
            selection.skipped.insert(id.to_string());
            continue;
        }

        selection.runnable.push(id.to_string());
        for api in plugin.apis() {
            if !selection.required_apis.iter().any(|a| a == api) {
                selection.required_apis.push((*api).to_string());
            }
        }
    }

    if selection.required_apis.is_empty() {
        return Err(EngineError::NothingToCollect);
    }

    Ok(selection)
}

fn classify(
    id: &str,
    types: &[&str],
    compliance: &[(&str, &str)],
    settings: &ScanSettings,
    context: &CloudContext,
    skip_list: &HashSet<String>,
) -> Option<&'static str> {
    if let Some(filter) = &settings.plugin {
        if filter != id {
            return Some("does not match the plugin filter");
        }
        // An explicit filter match overrides every later rule.
        return None;
    }

    if skip_list.contains(id) {
        return Some("listed in skip-plugins");
    }

    if let Some(scope) = context.account_scope {
        if !types.is_empty() && !types.contains(&scope.tag()) {
            return Some("not applicable to the credential scope");
        }
    }

    if !settings.compliance.is_empty() {
        let matches = settings
            .compliance
            .iter()
            .any(|program| compliance.iter().any(|(name, _)| *name == program.as_str()));
        if !matches {
            return Some("does not match the requested compliance programs");
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        AccountScope, CloudContext, CollectionSnapshot, Finding, Plugin, ScanSettings,
    };
    use crate::runner::PluginRegistryBuilder;
    use anyhow::Result;
    use async_trait::async_trait;

    struct Fake {
        id: &'static str,
        apis: &'static [&'static str],
        compliance: &'static [(&'static str, &'static str)],
        types: &'static [&'static str],
    }

    impl Fake {
        fn new(id: &'static str, apis: &'static [&'static str]) -> Self {
            Self {
                id,
                apis,
                compliance: &[],
                types: &[],
            }
        }
    }

    #[async_trait]
    impl Plugin for Fake {
        fn id(&self) -> &'static str {
            self.id
        }
        fn title(&self) -> &'static str {
            "Fake"
        }
        fn category(&self) -> &'static str {
            "Test"
        }
        fn apis(&self) -> &'static [&'static str] {
            self.apis
        }
        fn compliance(&self) -> &'static [(&'static str, &'static str)] {
            self.compliance
        }
        fn types(&self) -> &'static [&'static str] {
            self.types
        }
        async fn run(&self, _: &CollectionSnapshot, _: &ScanSettings) -> Result<Vec<Finding>> {
            Ok(Vec::new())
        }
    }

    fn aws() -> CloudContext {
        CloudContext::new("aws")
    }

    #[test]
    fn api_union_preserves_first_seen_order() {
        let registry = PluginRegistryBuilder::new()
            .with_plugin(Fake::new("one", &["A", "B"]))
            .with_plugin(Fake::new("two", &["B", "C"]))
            .build();

        let selection = select(&registry, &ScanSettings::default(), &aws()).unwrap();
        assert_eq!(selection.runnable, vec!["one", "two"]);
        assert_eq!(selection.required_apis, vec!["A", "B", "C"]);
        assert!(selection.skipped.is_empty());
    }

    #[test]
    fn plugin_filter_overrides_skip_list() {
        let registry = PluginRegistryBuilder::new()
            .with_plugin(Fake::new("target", &["A"]))
            .with_plugin(Fake::new("other", &["B"]))
            .build();

        let settings = ScanSettings::new()
            .with_plugin("target")
            .with_skip_plugins("target,other");

        let selection = select(&registry, &settings, &aws()).unwrap();
        assert_eq!(selection.runnable, vec!["target"]);
        assert!(selection.is_skipped("other"));
        assert_eq!(selection.required_apis, vec!["A"]);
    }

    #[test]
    fn unknown_plugin_filter_is_fatal() {
        let registry = PluginRegistryBuilder::new()
            .with_plugin(Fake::new("one", &["A"]))
            .build();

        let settings = ScanSettings::new().with_plugin("missing");
        match select(&registry, &settings, &aws()) {
            Err(EngineError::InvalidPlugin(id)) => assert_eq!(id, "missing"),
            other => panic!("expected InvalidPlugin, got {other:?}"),
        }
    }

    #[test]
    fn skipping_everything_is_fatal() {
        let registry = PluginRegistryBuilder::new()
            .with_plugin(Fake::new("one", &["A"]))
            .build();

        let settings = ScanSettings::new().with_skip_plugins("one");
        assert!(matches!(
            select(&registry, &settings, &aws()),
            Err(EngineError::NothingToCollect)
        ));
    }

    #[test]
    fn compliance_programs_gate_plugins() {
        let mut hipaa = Fake::new("covered", &["A"]);
        hipaa.compliance = &[("hipaa", "HIPAA requires backups.")];
        let registry = PluginRegistryBuilder::new()
            .with_plugin(hipaa)
            .with_plugin(Fake::new("uncovered", &["B"]))
            .build();

        let settings = ScanSettings::new().with_compliance(vec!["hipaa".to_string()]);
        let selection = select(&registry, &settings, &aws()).unwrap();

        assert_eq!(selection.runnable, vec!["covered"]);
        assert!(selection.is_skipped("uncovered"));
        assert_eq!(selection.required_apis, vec!["A"]);
    }

    #[test]
    fn credential_scope_gates_tagged_plugins() {
        let mut org_only = Fake::new("orgOnly", &["A"]);
        org_only.types = &["org"];
        let mut either = Fake::new("either", &["B"]);
        either.types = &["org", "user"];
        let registry = PluginRegistryBuilder::new()
            .with_plugin(org_only)
            .with_plugin(either)
            .with_plugin(Fake::new("untagged", &["C"]))
            .build();

        let context = CloudContext::new("github").with_account_scope(AccountScope::User);
        let selection = select(&registry, &ScanSettings::default(), &context).unwrap();

        assert!(selection.is_skipped("orgOnly"));
        assert_eq!(selection.runnable, vec!["either", "untagged"]);
    }
}
