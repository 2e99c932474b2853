//! Rule storage contract and an in-memory implementation.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::error::{Result, RuleError};
use crate::rule::Rule;

/// Optional filters for listing rules. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleFilter {
    /// Only rules bound to this device.
    pub device_id: Option<String>,
    /// Only rules bound to this metric.
    pub metric_name: Option<String>,
}

impl RuleFilter {
    /// A filter matching every rule.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Restricts the filter to one device.
    #[must_use]
    pub fn device(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    /// Restricts the filter to one metric.
    #[must_use]
    pub fn metric(mut self, metric_name: impl Into<String>) -> Self {
        self.metric_name = Some(metric_name.into());
        self
    }

    /// Returns true if `rule` passes the filter.
    #[must_use]
    pub fn matches(&self, rule: &Rule) -> bool {
        self.device_id.as_ref().is_none_or(|d| *d == rule.device_id)
            && self
                .metric_name
                .as_ref()
                .is_none_or(|m| *m == rule.metric_name)
    }
}

/// Storage of alerting rules.
///
/// The processor only needs [`find_by_device_and_metric`](Self::find_by_device_and_metric);
/// the remaining operations back rule management.
pub trait RuleStore: Send + Sync + fmt::Debug {
    /// Returns the rules bound to a device's metric.
    fn find_by_device_and_metric(&self, device_id: &str, metric_name: &str) -> Result<Vec<Rule>>;

    /// Stores a new rule.
    ///
    /// # Errors
    ///
    /// Returns `RuleError::DuplicateRule` if the ID is taken.
    fn insert(&self, rule: Rule) -> Result<()>;

    /// Loads a rule by ID.
    fn get(&self, id: &str) -> Result<Option<Rule>>;

    /// Replaces a stored rule.
    ///
    /// # Errors
    ///
    /// Returns `RuleError::RuleNotFound` if no rule has this ID.
    fn update(&self, rule: Rule) -> Result<()>;

    /// Removes a rule, returning whether it existed.
    fn delete(&self, id: &str) -> Result<bool>;

    /// Lists rules passing `filter`.
    fn list(&self, filter: &RuleFilter) -> Result<Vec<Rule>>;
}

/// Thread-safe in-memory rule storage, in insertion order.
///
/// Clones share the same underlying data.
#[derive(Debug, Default)]
pub struct InMemoryRuleStore {
    rules: Arc<RwLock<Vec<Rule>>>,
}

impl InMemoryRuleStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.read().len()
    }

    /// Returns true if no rules are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.read().is_empty()
    }

    /// Removes all rules.
    pub fn clear(&self) {
        self.rules.write().clear();
    }
}

impl Clone for InMemoryRuleStore {
    fn clone(&self) -> Self {
        Self {
            rules: Arc::clone(&self.rules),
        }
    }
}

impl RuleStore for InMemoryRuleStore {
    fn find_by_device_and_metric(&self, device_id: &str, metric_name: &str) -> Result<Vec<Rule>> {
        let rules = self.rules.read();
        Ok(rules
            .iter()
            .filter(|r| r.device_id == device_id && r.metric_name == metric_name)
            .cloned()
            .collect())
    }

    fn insert(&self, rule: Rule) -> Result<()> {
        let mut rules = self.rules.write();
        if rules.iter().any(|r| r.id == rule.id) {
            return Err(RuleError::DuplicateRule { id: rule.id });
        }

        debug!(
            rule_id = %rule.id,
            device_id = %rule.device_id,
            metric = %rule.metric_name,
            "stored rule"
        );
        rules.push(rule);
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<Rule>> {
        Ok(self.rules.read().iter().find(|r| r.id == id).cloned())
    }

    fn update(&self, rule: Rule) -> Result<()> {
        let mut rules = self.rules.write();
        let Some(slot) = rules.iter_mut().find(|r| r.id == rule.id) else {
            return Err(RuleError::RuleNotFound { id: rule.id });
        };
        *slot = rule;
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<bool> {
        let mut rules = self.rules.write();
        let before = rules.len();
        rules.retain(|r| r.id != id);
        Ok(rules.len() != before)
    }

    fn list(&self, filter: &RuleFilter) -> Result<Vec<Rule>> {
        let rules = self.rules.read();
        Ok(rules.iter().filter(|r| filter.matches(r)).cloned().collect())
    }
}
