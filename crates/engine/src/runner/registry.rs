use crate::core::Plugin;
use std::collections::HashMap;
use std::sync::Arc;

/// Static catalog of plugins. Iteration preserves registration order, which
/// is also the order the executor admits plugins to the worker pool.
pub struct PluginRegistry {
    plugins: Vec<Arc<dyn Plugin>>,
    index: HashMap<&'static str, usize>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self {
            plugins: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn register<P: Plugin + 'static>(&mut self, plugin: P) {
        self.register_arc(Arc::new(plugin));
    }

    pub fn register_arc(&mut self, plugin: Arc<dyn Plugin>) {
        let id = plugin.id();
        match self.index.get(id) {
            Some(&slot) => self.plugins[slot] = plugin,
            None => {
                self.index.insert(id, self.plugins.len());
                self.plugins.push(plugin);
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Plugin>> {
        self.index.get(id).map(|&slot| self.plugins[slot].clone())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Plugin>> {
        self.plugins.iter()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn list_ids(&self) -> Vec<&'static str> {
        self.plugins.iter().map(|p| p.id()).collect()
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

pub struct PluginRegistryBuilder {
    registry: PluginRegistry,
}

impl PluginRegistryBuilder {
    pub fn new() -> Self {
        Self {
            registry: PluginRegistry::new(),
        }
    }

    pub fn with_plugin<P: Plugin + 'static>(mut self, plugin: P) -> Self {
        self.registry.register(plugin);
        self
    }

    pub fn build(self) -> PluginRegistry {
        self.registry
    }
}

impl Default for PluginRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CollectionSnapshot, Finding, Plugin, ScanSettings};
    use anyhow::Result;
    use async_trait::async_trait;

    struct Stub(&'static str);

    #[async_trait]
    impl Plugin for Stub {
        fn id(&self) -> &'static str {
            self.0
        }
        fn title(&self) -> &'static str {
            "Stub"
        }
        fn category(&self) -> &'static str {
            "Test"
        }
        fn apis(&self) -> &'static [&'static str] {
            &["EC2:describeInstances"]
        }
        async fn run(&self, _: &CollectionSnapshot, _: &ScanSettings) -> Result<Vec<Finding>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn preserves_registration_order() {
        let registry = PluginRegistryBuilder::new()
            .with_plugin(Stub("c"))
            .with_plugin(Stub("a"))
            .with_plugin(Stub("b"))
            .build();

        assert_eq!(registry.list_ids(), vec!["c", "a", "b"]);
        assert!(registry.contains("a"));
        assert!(registry.get("d").is_none());
    }

    #[test]
    fn re_registration_replaces_in_place() {
        let mut registry = PluginRegistry::new();
        registry.register(Stub("a"));
        registry.register(Stub("b"));
        registry.register(Stub("a"));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.list_ids(), vec!["a", "b"]);
    }
}
