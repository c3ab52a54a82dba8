//! The Collection Snapshot: pre-fetched provider data shared read-only by
//! every plugin during a scan.
//!
//! The shape mirrors what collectors write: `service → apiName → region →
//! cell`, where a cell is `{data}` on success or `{err}` on failure. APIs
//! that are queried per resource (for example `getTopicAttributes` per topic
//! ARN) nest one more level: `service → apiName → region → resource → cell`.
//!
//! The snapshot is built once, before any plugin runs, and never mutated
//! afterwards. That shared-read/no-write property is what makes concurrent
//! plugin execution safe.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Success payload or error for one provider API call in one region.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResultCell {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub err: Option<Value>,
}

impl ResultCell {
    pub fn ok(data: Value) -> Self {
        Self {
            data: Some(data),
            err: None,
        }
    }

    pub fn error(err: impl Into<Value>) -> Self {
        Self {
            data: None,
            err: Some(err.into()),
        }
    }

    pub fn has_err(&self) -> bool {
        self.err.is_some()
    }

    /// The payload as a JSON array, the most common collector shape.
    pub fn items(&self) -> Option<&Vec<Value>> {
        self.data.as_ref().and_then(Value::as_array)
    }

    /// Human-readable error detail, with the same fallback the console
    /// output has always shown when a collector recorded nothing useful.
    pub fn error_message(&self) -> String {
        match &self.err {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Object(map)) => map
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| "Unable to obtain data".to_string()),
            _ => "Unable to obtain data".to_string(),
        }
    }
}

/// Cell or resource-keyed map of cells under one region.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RegionEntry {
    Cell(ResultCell),
    Keyed(BTreeMap<String, ResultCell>),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionSnapshot {
    #[serde(flatten)]
    services: BTreeMap<String, BTreeMap<String, BTreeMap<String, RegionEntry>>>,
}

impl CollectionSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_value(value: Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    pub fn services(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(String::as_str)
    }

    pub fn get(&self, service: &str, api: &str, region: &str) -> Option<&ResultCell> {
        match self.entry(service, api, region)? {
            RegionEntry::Cell(cell) => Some(cell),
            RegionEntry::Keyed(_) => None,
        }
    }

    pub fn get_keyed(
        &self,
        service: &str,
        api: &str,
        region: &str,
        resource: &str,
    ) -> Option<&ResultCell> {
        match self.entry(service, api, region)? {
            RegionEntry::Keyed(map) => map.get(resource),
            RegionEntry::Cell(_) => None,
        }
    }

    pub fn keyed(
        &self,
        service: &str,
        api: &str,
        region: &str,
    ) -> Option<&BTreeMap<String, ResultCell>> {
        match self.entry(service, api, region)? {
            RegionEntry::Keyed(map) => Some(map),
            RegionEntry::Cell(_) => None,
        }
    }

    pub fn insert(&mut self, service: &str, api: &str, region: &str, cell: ResultCell) {
        self.region_slot(service, api)
            .insert(region.to_string(), RegionEntry::Cell(cell));
    }

    pub fn insert_keyed(
        &mut self,
        service: &str,
        api: &str,
        region: &str,
        resource: &str,
        cell: ResultCell,
    ) {
        let slot = self
            .region_slot(service, api)
            .entry(region.to_string())
            .or_insert_with(|| RegionEntry::Keyed(BTreeMap::new()));
        if let RegionEntry::Keyed(map) = slot {
            map.insert(resource.to_string(), cell);
        }
    }

    /// Drops every service/API pair not named in `api_calls` (identifiers of
    /// the form `Service:apiName`, service matched case-insensitively).
    pub fn retain_api_calls(&mut self, api_calls: &[String]) {
        let wanted: Vec<(String, String)> = api_calls
            .iter()
            .filter_map(|call| {
                let (service, api) = call.split_once(':')?;
                Some((service.to_lowercase(), api.to_string()))
            })
            .collect();

        for (service, apis) in self.services.iter_mut() {
            let service_key = service.to_lowercase();
            apis.retain(|api, _| wanted.iter().any(|(s, a)| *s == service_key && a == api));
        }
        self.services.retain(|_, apis| !apis.is_empty());
    }

    fn entry(&self, service: &str, api: &str, region: &str) -> Option<&RegionEntry> {
        self.services.get(service)?.get(api)?.get(region)
    }

    fn region_slot(&mut self, service: &str, api: &str) -> &mut BTreeMap<String, RegionEntry> {
        self.services
            .entry(service.to_string())
            .or_default()
            .entry(api.to_string())
            .or_default()
    }
}
