// Host selection by group and tag predicates

use std::collections::HashSet;

use super::Host;

/// Criteria for selecting a subset of candidate hosts.
///
/// Dimensions combine with AND; within a dimension, membership is an OR.
/// Exclusion is applied last and always wins.
#[derive(Debug, Clone, Default)]
pub struct FilterCriteria {
    groups: Option<HashSet<String>>,
    tags: Option<HashSet<String>>,
    exclude_tags: HashSet<String>,
}

impl FilterCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep hosts whose group is in the set
    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups = Some(groups.into_iter().map(Into::into).collect());
        self
    }

    /// Keep hosts carrying at least one of the listed tags
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    /// Remove hosts carrying any of the listed tags, even if they matched
    /// a group or tag criterion
    pub fn with_exclude_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// True when no criteria were supplied (the filter is the identity)
    pub fn is_empty(&self) -> bool {
        self.groups.is_none() && self.tags.is_none() && self.exclude_tags.is_empty()
    }

    /// Apply the criteria, preserving input order and deduplicating by
    /// hostname
    pub fn filter<'a>(&self, hosts: &'a [Host]) -> Vec<&'a Host> {
        let mut seen = HashSet::new();
        hosts
            .iter()
            .filter(|host| self.matches(host) && seen.insert(host.hostname.as_str()))
            .collect()
    }

    fn matches(&self, host: &Host) -> bool {
        if host.tags.iter().any(|t| self.exclude_tags.contains(t)) {
            return false;
        }

        if let Some(ref groups) = self.groups {
            if !groups.contains(&host.group) {
                return false;
            }
        }

        if let Some(ref tags) = self.tags {
            if !host.tags.iter().any(|t| tags.contains(t)) {
                return false;
            }
        }

        true
    }
}
