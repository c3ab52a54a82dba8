use crate::core::{CollectionSnapshot, Finding, Plugin, ScanSettings};
use crate::plugins::aws::regions;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

/// Ensures OpenSearch Serverless collections are encrypted with customer
/// managed KMS keys rather than the AWS-owned default key.
pub struct CollectionCmkEncrypted;

#[async_trait]
impl Plugin for CollectionCmkEncrypted {
    fn id(&self) -> &'static str {
        "collectionCmkEncrypted"
    }

    fn title(&self) -> &'static str {
        "OpenSearch Collection CMK Encryption"
    }

    fn category(&self) -> &'static str {
        "OpenSearch"
    }

    fn description(&self) -> &'static str {
        "Ensures OpenSearch Serverless collections are encrypted with KMS Customer Master Keys"
    }

    fn apis(&self) -> &'static [&'static str] {
        &[
            "OpenSearchServerless:listCollections",
            "OpenSearchServerless:listEncryptionSecurityPolicies",
            "OpenSearchServerless:getEncryptionSecurityPolicy",
        ]
    }

    async fn run(
        &self,
        snapshot: &CollectionSnapshot,
        settings: &ScanSettings,
    ) -> Result<Vec<Finding>> {
        let mut results = Vec::new();

        for region in regions::regions(settings) {
            let Some(collections) =
                snapshot.get("opensearchserverless", "listCollections", region)
            else {
                continue;
            };

            if collections.has_err() || collections.data.is_none() {
                results.push(
                    Finding::unknown(format!(
                        "Unable to query for OpenSearch collections: {}",
                        collections.error_message()
                    ))
                    .with_region(*region),
                );
                continue;
            }

            let collection_items = collections.items().map(Vec::as_slice).unwrap_or(&[]);
            if collection_items.is_empty() {
                results.push(Finding::pass("No collections found").with_region(*region));
                continue;
            }

            let policies = snapshot.get(
                "opensearchserverless",
                "listEncryptionSecurityPolicies",
                region,
            );
            let Some(policies) = policies.filter(|p| !p.has_err() && p.data.is_some()) else {
                results.push(
                    Finding::unknown(format!(
                        "Unable to query for encryption security policies: {}",
                        policies
                            .map(|p| p.error_message())
                            .unwrap_or_else(|| "Unable to obtain data".to_string())
                    ))
                    .with_region(*region),
                );
                continue;
            };

            let policy_items = policies.items().map(Vec::as_slice).unwrap_or(&[]);
            if policy_items.is_empty() {
                results.push(Finding::pass("No security policies found").with_region(*region));
                continue;
            }

            // collection arn -> name of the AWS-owned-key policy covering it
            let mut default_key_policies: HashMap<&str, &str> = HashMap::new();
            let mut lookup_failed = false;

            for policy in policy_items {
                let Some(policy_name) = policy.get("name").and_then(Value::as_str) else {
                    continue;
                };

                let detail = snapshot.get_keyed(
                    "opensearchserverless",
                    "getEncryptionSecurityPolicy",
                    region,
                    policy_name,
                );
                let Some(detail) = detail.filter(|d| !d.has_err() && d.data.is_some()) else {
                    results.push(
                        Finding::unknown(format!(
                            "Unable to query encryption security policy: {}",
                            detail
                                .map(|d| d.error_message())
                                .unwrap_or_else(|| "Unable to obtain data".to_string())
                        ))
                        .with_region(*region),
                    );
                    lookup_failed = true;
                    break;
                };

                let Some(document) = detail
                    .data
                    .as_ref()
                    .and_then(|data| data.pointer("/securityPolicyDetail/policy"))
                else {
                    continue;
                };

                if !document
                    .get("AWSOwnedKey")
                    .and_then(Value::as_bool)
                    .unwrap_or(false)
                {
                    continue;
                }

                let rules = document
                    .get("Rules")
                    .and_then(Value::as_array)
                    .map(Vec::as_slice)
                    .unwrap_or(&[]);

                for collection in collection_items {
                    let (Some(name), Some(arn)) = (
                        collection.get("name").and_then(Value::as_str),
                        collection.get("arn").and_then(Value::as_str),
                    ) else {
                        continue;
                    };

                    let covered = rules.iter().any(|rule| {
                        rule.get("ResourceType").and_then(Value::as_str) == Some("collection")
                            && rule
                                .get("Resource")
                                .and_then(Value::as_array)
                                .map(Vec::as_slice)
                                .unwrap_or(&[])
                                .iter()
                                .filter_map(Value::as_str)
                                .any(|resource| resource.contains(&format!("collection/{name}")))
                    });

                    if covered {
                        default_key_policies.entry(arn).or_insert(policy_name);
                    }
                }
            }

            if lookup_failed {
                continue;
            }

            for collection in collection_items {
                let Some(arn) = collection.get("arn").and_then(Value::as_str) else {
                    continue;
                };
                if default_key_policies.contains_key(arn) {
                    results.push(
                        Finding::fail(
                            "OpenSearch Serverless collection is using the default key for encryption",
                        )
                        .with_region(*region)
                        .with_resource(arn),
                    );
                } else {
                    results.push(
                        Finding::pass("OpenSearch Serverless collection is using a CMK for encryption")
                            .with_region(*region)
                            .with_resource(arn),
                    );
                }
            }
        }

        Ok(results)
    }
}
