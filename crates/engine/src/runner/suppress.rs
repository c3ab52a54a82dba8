//! Compiled suppression rules.
//!
//! Each expression is a colon-delimited `pluginId:region:resource` triple
//! where `*` matches any run of characters. An expression is compiled into
//! a single anchored regex over the whole suppression key, so `s3Bucket*`
//! matches both `s3BucketEncryption` and `s3BucketVersioning`, and a bare
//! `*` segment matches anything including the literal `any` placeholder.
//!
//! Suppressed findings are still computed; they are simply never written to
//! the output sink and never contribute to the exit severity.

use crate::runner::EngineError;
use regex::Regex;

#[derive(Debug, Default)]
pub struct SuppressionFilter {
    rules: Vec<Regex>,
}

impl SuppressionFilter {
    pub fn compile(expressions: &[String]) -> Result<Self, EngineError> {
        let mut rules = Vec::with_capacity(expressions.len());
        for expression in expressions {
            let pattern = format!("^{}$", regex::escape(expression).replace("\\*", ".*"));
            let rule = Regex::new(&pattern).map_err(|source| EngineError::InvalidSuppression {
                expression: expression.clone(),
                source,
            })?;
            rules.push(rule);
        }
        Ok(Self { rules })
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// True iff the key matches any compiled expression.
    pub fn matches(&self, key: &str) -> bool {
        self.rules.iter().any(|rule| rule.is_match(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(expressions: &[&str]) -> SuppressionFilter {
        let owned: Vec<String> = expressions.iter().map(|s| s.to_string()).collect();
        SuppressionFilter::compile(&owned).unwrap()
    }

    #[test]
    fn empty_filter_suppresses_nothing() {
        let filter = filter(&[]);
        assert!(filter.is_empty());
        assert!(!filter.matches("anyPlugin:us-east-1:any"));
    }

    #[test]
    fn wildcard_prefix_matches_plugin_family() {
        let filter = filter(&["s3Bucket*:*:*"]);
        assert!(filter.matches("s3BucketEncryption:us-east-1:my-bucket"));
        assert!(filter.matches("s3BucketEncryption:any:any"));
        assert!(!filter.matches("s3Versioning:us-east-1:my-bucket"));
    }

    #[test]
    fn exact_triple_matches_any_placeholder() {
        let filter = filter(&["pluginA:us-east-1:any"]);
        assert!(filter.matches("pluginA:us-east-1:any"));
        assert!(!filter.matches("pluginA:us-west-2:any"));
        assert!(!filter.matches("pluginB:us-east-1:any"));
    }

    #[test]
    fn regex_metacharacters_in_resources_are_literal() {
        let filter = filter(&["plugin:us-east-1:arn:aws:s3:::bucket.name"]);
        assert!(filter.matches("plugin:us-east-1:arn:aws:s3:::bucket.name"));
        assert!(!filter.matches("plugin:us-east-1:arn:aws:s3:::bucketXname"));
    }

    #[test]
    fn invalid_expressions_cannot_occur_after_escaping() {
        // Everything user-supplied is escaped before compiling, so even
        // hostile input compiles.
        let filter = filter(&["((("]);
        assert!(!filter.matches("plugin:any:any"));
        assert!(filter.matches("((("));
    }
}
