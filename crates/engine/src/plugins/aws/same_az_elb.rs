use crate::core::{CollectionSnapshot, Finding, Plugin, ScanSettings};
use crate::plugins::aws::regions;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

/// Ensures autoscaling groups with ELB health checks reference active load
/// balancers in the same availability zones.
pub struct SameAzElb;

#[async_trait]
impl Plugin for SameAzElb {
    fn id(&self) -> &'static str {
        "sameAzElb"
    }

    fn title(&self) -> &'static str {
        "AutoScaling Group Missing ELB"
    }

    fn category(&self) -> &'static str {
        "AutoScaling"
    }

    fn description(&self) -> &'static str {
        "Ensures all autoscaling groups are referencing active load balancers"
    }

    fn apis(&self) -> &'static [&'static str] {
        &[
            "AutoScaling:describeAutoScalingGroups",
            "ELB:describeLoadBalancers",
            "ELBv2:describeLoadBalancers",
        ]
    }

    async fn run(
        &self,
        snapshot: &CollectionSnapshot,
        settings: &ScanSettings,
    ) -> Result<Vec<Finding>> {
        let mut results = Vec::new();

        for region in regions::regions(settings) {
            let groups = snapshot.get("autoscaling", "describeAutoScalingGroups", region);
            let classic = snapshot.get("elb", "describeLoadBalancers", region);
            let modern = snapshot.get("elbv2", "describeLoadBalancers", region);

            let (Some(groups), Some(classic), Some(modern)) = (groups, classic, modern) else {
                continue;
            };

            if groups.has_err() || groups.data.is_none() {
                results.push(
                    Finding::unknown(format!(
                        "Unable to query for AutoScaling groups: {}",
                        groups.error_message()
                    ))
                    .with_region(*region),
                );
                continue;
            }
            if classic.has_err() || classic.data.is_none() {
                results.push(
                    Finding::unknown(format!(
                        "Unable to query for Classic load balancers: {}",
                        classic.error_message()
                    ))
                    .with_region(*region),
                );
                continue;
            }
            if modern.has_err() || modern.data.is_none() {
                results.push(
                    Finding::unknown(format!(
                        "Unable to query for Application/Network load balancers: {}",
                        modern.error_message()
                    ))
                    .with_region(*region),
                );
                continue;
            }

            let group_items = groups.items().map(Vec::as_slice).unwrap_or(&[]);
            if group_items.is_empty() {
                results.push(Finding::pass("No AutoScaling group found").with_region(*region));
                continue;
            }

            let mut load_balancers: HashMap<&str, &Value> = HashMap::new();
            for elb in classic
                .items()
                .map(Vec::as_slice)
                .unwrap_or(&[])
                .iter()
                .chain(modern.items().map(Vec::as_slice).unwrap_or(&[]))
            {
                if let Some(name) = elb.get("LoadBalancerName").and_then(Value::as_str) {
                    load_balancers.insert(name, elb);
                }
            }

            for group in group_items {
                let resource = group
                    .get("AutoScalingGroupARN")
                    .and_then(Value::as_str)
                    .unwrap_or("");
                let health_check = group.get("HealthCheckType").and_then(Value::as_str);

                if health_check != Some("ELB") {
                    results.push(
                        Finding::pass("AutoScaling group does not utilize a load balancer")
                            .with_region(*region)
                            .with_resource(resource),
                    );
                    continue;
                }

                if load_balancers.is_empty() {
                    results.push(Finding::pass("No load balancer found").with_region(*region));
                    continue;
                }

                let names: Vec<&str> = group
                    .get("LoadBalancerNames")
                    .and_then(Value::as_array)
                    .map(Vec::as_slice)
                    .unwrap_or(&[])
                    .iter()
                    .filter_map(Value::as_str)
                    .collect();

                if names.is_empty() {
                    results.push(
                        Finding::fail("AutoScaling group does not have any load balancer associated")
                            .with_region(*region)
                            .with_resource(resource),
                    );
                    continue;
                }

                let group_azs: Vec<&str> = group
                    .get("AvailabilityZones")
                    .and_then(Value::as_array)
                    .map(Vec::as_slice)
                    .unwrap_or(&[])
                    .iter()
                    .filter_map(Value::as_str)
                    .collect();

                for name in names {
                    let Some(balancer) = load_balancers.get(name) else {
                        results.push(
                            Finding::fail(format!(
                                "AutoScaling group utilizes an inactive load balancer \"{name}\""
                            ))
                            .with_region(*region)
                            .with_resource(resource),
                        );
                        continue;
                    };

                    let mismatched = balancer
                        .get("AvailabilityZones")
                        .and_then(Value::as_array)
                        .map(Vec::as_slice)
                        .unwrap_or(&[])
                        .iter()
                        .filter_map(Value::as_str)
                        .any(|az| !group_azs.contains(&az));

                    if mismatched {
                        results.push(
                            Finding::fail(format!(
                                "Load balancer \"{name}\" is not in the same AZ as the AutoScaling group"
                            ))
                            .with_region(*region)
                            .with_resource(resource),
                        );
                    } else {
                        results.push(
                            Finding::pass(format!(
                                "Load balancer \"{name}\" is in the same AZ as the AutoScaling group"
                            ))
                            .with_region(*region)
                            .with_resource(resource),
                        );
                    }
                }
            }
        }

        Ok(results)
    }
}
