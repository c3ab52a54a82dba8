use crate::core::{CollectionSnapshot, Finding, Plugin, ScanSettings};
use crate::plugins::aws::regions;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Ensures ElasticSearch clusters are healthy, i.e. their status metric has
/// stayed out of red.
pub struct EsClusterStatus;

#[async_trait]
impl Plugin for EsClusterStatus {
    fn id(&self) -> &'static str {
        "esClusterStatus"
    }

    fn title(&self) -> &'static str {
        "ElasticSearch Cluster Status"
    }

    fn category(&self) -> &'static str {
        "ES"
    }

    fn description(&self) -> &'static str {
        "Ensures ElasticSearch clusters are healthy, i.e. status is green"
    }

    fn apis(&self) -> &'static [&'static str] {
        &["ES:listDomainNames", "CloudWatch:getEsMetricStatistics"]
    }

    async fn run(
        &self,
        snapshot: &CollectionSnapshot,
        settings: &ScanSettings,
    ) -> Result<Vec<Finding>> {
        let mut results = Vec::new();

        for region in regions::regions(settings) {
            let Some(domains) = snapshot.get("es", "listDomainNames", region) else {
                continue;
            };

            if domains.has_err() || domains.data.is_none() {
                results.push(
                    Finding::unknown(format!(
                        "Unable to query for ES domains: {}",
                        domains.error_message()
                    ))
                    .with_region(*region),
                );
                continue;
            }

            let domain_items = domains.items().map(Vec::as_slice).unwrap_or(&[]);
            if domain_items.is_empty() {
                results.push(Finding::pass("No ES domains found").with_region(*region));
                continue;
            }

            for domain in domain_items {
                let Some(name) = domain.get("DomainName").and_then(Value::as_str) else {
                    continue;
                };

                let stats =
                    snapshot.get_keyed("cloudwatch", "getEsMetricStatistics", region, name);
                let Some(stats) = stats.filter(|s| !s.has_err() && s.data.is_some()) else {
                    results.push(
                        Finding::unknown(format!(
                            "Unable to query for ES domain metrics: {}",
                            stats.map(|s| s.error_message())
                                .unwrap_or_else(|| "Unable to obtain data".to_string())
                        ))
                        .with_region(*region)
                        .with_resource(name),
                    );
                    continue;
                };

                let datapoints = stats
                    .data
                    .as_ref()
                    .and_then(|data| data.get("Datapoints"))
                    .and_then(Value::as_array)
                    .map(Vec::as_slice)
                    .unwrap_or(&[]);
                if datapoints.is_empty() {
                    continue;
                }

                // The ClusterStatus.red metric reports 1 while the cluster
                // is red; anything above that sustained means unhealthy.
                let maximum = datapoints
                    .iter()
                    .filter_map(|point| point.get("Maximum").and_then(Value::as_f64))
                    .fold(0.0_f64, f64::max);

                if maximum > 1.0 {
                    results.push(
                        Finding::fail(format!("ES cluster for ES domain {name} is unhealthy"))
                            .with_region(*region)
                            .with_resource(name),
                    );
                } else {
                    results.push(
                        Finding::pass(format!("ES cluster for ES domain {name} is healthy"))
                            .with_region(*region)
                            .with_resource(name),
                    );
                }
            }
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ResultCell, Status};
    use serde_json::json;

    fn cache(datapoints: Value) -> CollectionSnapshot {
        let mut cache = CollectionSnapshot::new();
        cache.insert(
            "es",
            "listDomainNames",
            "us-east-1",
            ResultCell::ok(json!([{ "DomainName": "search-logs" }])),
        );
        cache.insert_keyed(
            "cloudwatch",
            "getEsMetricStatistics",
            "us-east-1",
            "search-logs",
            ResultCell::ok(json!({ "Datapoints": datapoints })),
        );
        cache
    }

    #[tokio::test]
    async fn red_cluster_fails() {
        let cache = cache(json!([{ "Maximum": 2.0 }, { "Maximum": 0.0 }]));
        let results = EsClusterStatus.run(&cache, &ScanSettings::default()).await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, Status::Fail);
        assert_eq!(results[0].resource.as_deref(), Some("search-logs"));
    }

    #[tokio::test]
    async fn healthy_cluster_passes() {
        let cache = cache(json!([{ "Maximum": 1.0 }, { "Maximum": 0.0 }]));
        let results = EsClusterStatus.run(&cache, &ScanSettings::default()).await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, Status::Pass);
    }

    #[tokio::test]
    async fn missing_metrics_is_unknown() {
        let mut cache = CollectionSnapshot::new();
        cache.insert(
            "es",
            "listDomainNames",
            "us-east-1",
            ResultCell::ok(json!([{ "DomainName": "search-logs" }])),
        );

        let results = EsClusterStatus.run(&cache, &ScanSettings::default()).await.unwrap();
        assert_eq!(results[0].status, Status::Unknown);
    }

    #[tokio::test]
    async fn no_datapoints_emits_nothing_for_the_domain() {
        let cache = cache(json!([]));
        let results = EsClusterStatus.run(&cache, &ScanSettings::default()).await.unwrap();
        assert!(results.is_empty());
    }
}
