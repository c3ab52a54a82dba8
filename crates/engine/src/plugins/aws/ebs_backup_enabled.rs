use crate::core::{CollectionSnapshot, Finding, Plugin, ScanSettings};
use crate::plugins::aws::regions;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashSet;

/// Ensures each EBS volume has at least one snapshot backing it up.
pub struct EbsBackupEnabled;

#[async_trait]
impl Plugin for EbsBackupEnabled {
    fn id(&self) -> &'static str {
        "ebsBackupEnabled"
    }

    fn title(&self) -> &'static str {
        "EBS Backup Enabled"
    }

    fn category(&self) -> &'static str {
        "EC2"
    }

    fn description(&self) -> &'static str {
        "Checks whether EBS volumes are backed up in the form of snapshots"
    }

    fn apis(&self) -> &'static [&'static str] {
        &[
            "EC2:describeVolumes",
            "EC2:describeSnapshots",
            "STS:getCallerIdentity",
        ]
    }

    fn compliance(&self) -> &'static [(&'static str, &'static str)] {
        &[
            (
                "hipaa",
                "HIPAA requires backups of system data to ensure recovery from emergencies.",
            ),
            (
                "pci",
                "PCI requires that a backup and recovery process exists for cardholder environments.",
            ),
        ]
    }

    async fn run(
        &self,
        snapshot: &CollectionSnapshot,
        settings: &ScanSettings,
    ) -> Result<Vec<Finding>> {
        let mut results = Vec::new();

        let account_id = snapshot
            .get("sts", "getCallerIdentity", regions::default_region(settings))
            .and_then(|cell| cell.data.as_ref())
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();
        let partition = regions::partition(settings);

        for region in regions::regions(settings) {
            let Some(volumes) = snapshot.get("ec2", "describeVolumes", region) else {
                continue;
            };
            let Some(backups) = snapshot.get("ec2", "describeSnapshots", region) else {
                continue;
            };

            if volumes.has_err() || volumes.data.is_none() {
                results.push(
                    Finding::unknown(format!(
                        "Unable to query for EBS volumes: {}",
                        volumes.error_message()
                    ))
                    .with_region(*region),
                );
                continue;
            }

            let volume_items = volumes.items().map(Vec::as_slice).unwrap_or(&[]);
            if volume_items.is_empty() {
                results.push(Finding::pass("No EBS volumes found").with_region(*region));
                continue;
            }

            if backups.has_err() || backups.data.is_none() {
                results.push(
                    Finding::unknown(format!(
                        "Unable to query for EBS snapshots: {}",
                        backups.error_message()
                    ))
                    .with_region(*region),
                );
                continue;
            }

            let backed_up: HashSet<&str> = backups
                .items()
                .map(Vec::as_slice)
                .unwrap_or(&[])
                .iter()
                .filter_map(|snap| snap.get("VolumeId").and_then(Value::as_str))
                .collect();

            for volume in volume_items {
                let Some(volume_id) = volume.get("VolumeId").and_then(Value::as_str) else {
                    continue;
                };
                let arn = format!(
                    "arn:{partition}:ec2:{region}:{account_id}:volume/{volume_id}"
                );
                if backed_up.contains(volume_id) {
                    results.push(
                        Finding::pass("EBS volume is backed up")
                            .with_region(*region)
                            .with_resource(arn),
                    );
                } else {
                    results.push(
                        Finding::fail("EBS volume is not backed up")
                            .with_region(*region)
                            .with_resource(arn),
                    );
                }
            }
        }

        Ok(results)
    }
}
