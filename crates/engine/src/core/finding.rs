use crate::core::Status;
use serde::{Deserialize, Serialize};

/// The literal segment used in suppression keys when a finding carries no
/// region or resource.
pub const ANY: &str = "any";

/// One reported check outcome. Findings are produced by plugin logic (or
/// synthesized by the executor when a plugin crashes) and consumed
/// immediately by the aggregator; they are not retained after output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub status: Status,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,

    pub message: String,

    #[serde(default)]
    pub custom: bool,
}

impl Finding {
    pub fn new(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            region: None,
            resource: None,
            message: message.into(),
            custom: false,
        }
    }

    pub fn pass(message: impl Into<String>) -> Self {
        Self::new(Status::Pass, message)
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self::new(Status::Warn, message)
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self::new(Status::Fail, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(Status::Unknown, message)
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    pub fn with_custom(mut self, custom: bool) -> Self {
        self.custom = custom;
        self
    }

    /// Identity key checked against compiled suppression rules:
    /// `pluginId:region:resource`, with `any` standing in for a missing
    /// region or resource.
    pub fn suppression_key(&self, plugin_id: &str) -> String {
        format!(
            "{}:{}:{}",
            plugin_id,
            self.region.as_deref().unwrap_or(ANY),
            self.resource.as_deref().unwrap_or(ANY)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suppression_key_uses_any_fallbacks() {
        let finding = Finding::fail("open to the world").with_region("us-east-1");
        assert_eq!(finding.suppression_key("snsTopicPolicies"), "snsTopicPolicies:us-east-1:any");

        let bare = Finding::unknown("crashed");
        assert_eq!(bare.suppression_key("x"), "x:any:any");
    }

    #[test]
    fn builders_fill_fields() {
        let finding = Finding::pass("backed up")
            .with_region("eu-west-1")
            .with_resource("arn:aws:ec2:eu-west-1:123:volume/vol-1");
        assert_eq!(finding.status, Status::Pass);
        assert_eq!(finding.region.as_deref(), Some("eu-west-1"));
        assert!(!finding.custom);
    }
}
