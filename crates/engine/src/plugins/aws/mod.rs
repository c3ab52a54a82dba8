pub mod regions;

pub mod collection_cmk_encrypted;
pub mod ebs_backup_enabled;
pub mod es_cluster_status;
pub mod same_az_elb;
pub mod topic_policies;

pub use collection_cmk_encrypted::CollectionCmkEncrypted;
pub use ebs_backup_enabled::EbsBackupEnabled;
pub use es_cluster_status::EsClusterStatus;
pub use same_az_elb::SameAzElb;
pub use topic_policies::TopicPolicies;

use crate::runner::{PluginRegistry, PluginRegistryBuilder};

pub fn registry() -> PluginRegistry {
    PluginRegistryBuilder::new()
        .with_plugin(SameAzElb)
        .with_plugin(EbsBackupEnabled)
        .with_plugin(EsClusterStatus)
        .with_plugin(CollectionCmkEncrypted)
        .with_plugin(TopicPolicies)
        .build()
}
