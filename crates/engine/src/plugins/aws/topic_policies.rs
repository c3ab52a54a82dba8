use crate::core::{CollectionSnapshot, Finding, Plugin, ScanSettings};
use crate::plugins::aws::regions;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Ensures SNS topic policies do not allow global send or subscribe.
pub struct TopicPolicies;

#[async_trait]
impl Plugin for TopicPolicies {
    fn id(&self) -> &'static str {
        "topicPolicies"
    }

    fn title(&self) -> &'static str {
        "SNS Topic Policies"
    }

    fn category(&self) -> &'static str {
        "SNS"
    }

    fn description(&self) -> &'static str {
        "Ensures SNS topics do not allow global send or subscribe"
    }

    fn apis(&self) -> &'static [&'static str] {
        &["SNS:listTopics", "SNS:getTopicAttributes"]
    }

    fn compliance(&self) -> &'static [(&'static str, &'static str)] {
        &[(
            "hipaa",
            "HIPAA requires access to message topics to be restricted to authorized parties.",
        )]
    }

    async fn run(
        &self,
        snapshot: &CollectionSnapshot,
        settings: &ScanSettings,
    ) -> Result<Vec<Finding>> {
        let mut results = Vec::new();

        for region in regions::regions(settings) {
            let Some(topics) = snapshot.get("sns", "listTopics", region) else {
                continue;
            };

            if topics.has_err() || topics.data.is_none() {
                results.push(
                    Finding::unknown(format!(
                        "Unable to query for SNS topics: {}",
                        topics.error_message()
                    ))
                    .with_region(*region),
                );
                continue;
            }

            let topic_items = topics.items().map(Vec::as_slice).unwrap_or(&[]);
            if topic_items.is_empty() {
                results.push(Finding::pass("No SNS topics found").with_region(*region));
                continue;
            }

            for topic in topic_items {
                let Some(arn) = topic.get("TopicArn").and_then(Value::as_str) else {
                    continue;
                };

                let Some(attributes) =
                    snapshot.get_keyed("sns", "getTopicAttributes", region, arn)
                else {
                    continue;
                };

                if attributes.has_err() || attributes.data.is_none() {
                    results.push(
                        Finding::unknown(format!(
                            "Unable to query SNS topic for policy: {}",
                            attributes.error_message()
                        ))
                        .with_region(*region)
                        .with_resource(arn),
                    );
                    continue;
                }

                let policy_raw = attributes
                    .data
                    .as_ref()
                    .and_then(|data| data.pointer("/Attributes/Policy"))
                    .and_then(Value::as_str);
                let Some(policy_raw) = policy_raw else {
                    results.push(
                        Finding::unknown("The SNS topic does not have a policy attached")
                            .with_region(*region)
                            .with_resource(arn),
                    );
                    continue;
                };

                let Ok(policy) = serde_json::from_str::<Value>(policy_raw) else {
                    results.push(
                        Finding::unknown("The SNS topic policy is not valid JSON")
                            .with_region(*region)
                            .with_resource(arn),
                    );
                    continue;
                };

                let actions = global_actions(&policy);
                if actions.is_empty() {
                    results.push(
                        Finding::pass("The SNS topic policy does not allow global access")
                            .with_region(*region)
                            .with_resource(arn),
                    );
                } else {
                    results.push(
                        Finding::fail(format!(
                            "The SNS topic policy allows global access to the action(s): {}",
                            actions.join(", ")
                        ))
                        .with_region(*region)
                        .with_resource(arn),
                    );
                }
            }
        }

        Ok(results)
    }
}

/// Actions granted to everyone by `Allow` statements with an open principal
/// and no restricting condition.
fn global_actions(policy: &Value) -> Vec<String> {
    let mut actions: Vec<String> = Vec::new();

    let statements = policy
        .get("Statement")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);

    for statement in statements {
        let allows = statement.get("Effect").and_then(Value::as_str) == Some("Allow");

        let principal = statement.pointer("/Principal/AWS").and_then(Value::as_str);
        let open_principal = matches!(principal, Some("*") | Some("arn:aws:iam::*"));

        let conditioned = statement.get("Condition").is_some();

        if !(allows && open_principal && !conditioned) {
            continue;
        }

        match statement.get("Action") {
            Some(Value::String(action)) => {
                if !actions.contains(action) {
                    actions.push(action.clone());
                }
            }
            Some(Value::Array(list)) => {
                for action in list.iter().filter_map(Value::as_str) {
                    if !actions.iter().any(|a| a == action) {
                        actions.push(action.to_string());
                    }
                }
            }
            _ => {}
        }
    }

    actions
}
