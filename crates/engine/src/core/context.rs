use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Scope of the active credential for providers that distinguish
/// organization-wide from single-account access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountScope {
    Organization,
    User,
}

impl AccountScope {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Organization => "org",
            Self::User => "user",
        }
    }
}

/// Identity of the account being scanned. Credentials themselves live in
/// the collector; the engine only needs the provider name and, for
/// multi-tenant providers, the credential scope.
#[derive(Debug, Clone)]
pub struct CloudContext {
    pub provider: String,
    pub account_scope: Option<AccountScope>,
}

impl CloudContext {
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            account_scope: None,
        }
    }

    pub fn with_account_scope(mut self, scope: AccountScope) -> Self {
        self.account_scope = Some(scope);
        self
    }
}

/// Plugin ids to exclude from a run. Accepts either an explicit list or a
/// comma-delimited string; both normalize to the same set.
#[derive(Debug, Clone, Default)]
pub enum SkipList {
    #[default]
    None,
    Ids(Vec<String>),
    Delimited(String),
}

impl SkipList {
    pub fn normalize(&self) -> HashSet<String> {
        match self {
            Self::None => HashSet::new(),
            Self::Ids(ids) => ids.iter().map(|id| id.trim().to_string()).collect(),
            Self::Delimited(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        match self {
            Self::None => false,
            Self::Ids(ids) => ids.iter().any(|i| i.trim() == id),
            Self::Delimited(raw) => raw.split(',').any(|i| i.trim() == id),
        }
    }
}

impl From<Vec<String>> for SkipList {
    fn from(ids: Vec<String>) -> Self {
        if ids.is_empty() {
            Self::None
        } else {
            Self::Ids(ids)
        }
    }
}

impl From<&str> for SkipList {
    fn from(raw: &str) -> Self {
        if raw.trim().is_empty() {
            Self::None
        } else {
            Self::Delimited(raw.to_string())
        }
    }
}

/// Immutable configuration for one scan, constructed once from CLI or
/// config input and read-only for the remainder of the run.
#[derive(Debug, Clone, Default)]
pub struct ScanSettings {
    /// Run exactly this plugin and nothing else.
    pub plugin: Option<String>,

    pub skip_plugins: SkipList,

    /// Compliance programs to scan for; when non-empty, plugins that do not
    /// declare at least one of these programs are skipped.
    pub compliance: Vec<String>,

    /// Suppression expressions of the form `pluginId:region:resource`.
    pub suppress: Vec<String>,

    /// Drop passing results from output (they still count toward the exit
    /// severity).
    pub ignore_ok: bool,

    pub skip_paginate: bool,
    pub govcloud: bool,
    pub china: bool,

    /// Make the process exit status reflect the worst finding.
    pub exit_code: bool,
}

impl ScanSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_plugin(mut self, id: impl Into<String>) -> Self {
        self.plugin = Some(id.into());
        self
    }

    pub fn with_skip_plugins(mut self, skip: impl Into<SkipList>) -> Self {
        self.skip_plugins = skip.into();
        self
    }

    pub fn with_compliance(mut self, programs: Vec<String>) -> Self {
        self.compliance = programs;
        self
    }

    pub fn with_suppress(mut self, patterns: Vec<String>) -> Self {
        self.suppress = patterns;
        self
    }

    pub fn with_ignore_ok(mut self, ignore_ok: bool) -> Self {
        self.ignore_ok = ignore_ok;
        self
    }

    pub fn with_exit_code(mut self, exit_code: bool) -> Self {
        self.exit_code = exit_code;
        self
    }

    pub fn with_govcloud(mut self, govcloud: bool) -> Self {
        self.govcloud = govcloud;
        self
    }

    pub fn with_china(mut self, china: bool) -> Self {
        self.china = china;
        self
    }

    pub fn with_skip_paginate(mut self, skip_paginate: bool) -> Self {
        self.skip_paginate = skip_paginate;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skip_list_normalizes_both_forms() {
        let from_ids = SkipList::from(vec!["a".to_string(), "b".to_string()]);
        let from_csv = SkipList::from("a, b");
        assert_eq!(from_ids.normalize(), from_csv.normalize());
        assert!(from_csv.contains("b"));
        assert!(!from_csv.contains("c"));
    }

    #[test]
    fn empty_skip_list_matches_nothing() {
        assert!(!SkipList::from("").contains("a"));
        assert!(SkipList::from(Vec::new()).normalize().is_empty());
    }
}
