//! Rule management with strict validation.
//!
//! Rules written through [`RuleService`] must parse cleanly. Rules placed
//! into a [`RuleStore`] by other means are still evaluated tolerantly.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::error::{Result, RuleError};
use crate::rule::{Rule, RuleNode};
use crate::store::{RuleFilter, RuleStore};

/// Payload for creating or replacing a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleRequest {
    /// Device the rule watches.
    pub device_id: String,
    /// Metric the rule applies to.
    pub metric_name: String,
    /// Raw rule content. `None` stores a rule that never matches.
    #[serde(default)]
    pub rule_content: Option<Value>,
}

impl RuleRequest {
    /// Creates a request with content.
    #[must_use]
    pub fn new(
        device_id: impl Into<String>,
        metric_name: impl Into<String>,
        rule_content: Value,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            metric_name: metric_name.into(),
            rule_content: Some(rule_content),
        }
    }

    fn into_rule(self, id: String) -> Result<Rule> {
        if self.device_id.trim().is_empty() {
            return Err(invalid("device id must not be empty"));
        }
        if self.metric_name.trim().is_empty() {
            return Err(invalid("metric name must not be empty"));
        }

        let Some(content) = self.rule_content else {
            return Ok(Rule::without_content(id, self.device_id, self.metric_name));
        };

        let root = RuleNode::from_content(&content);
        root.validate().map_err(|reason| invalid(reason.to_string()))?;

        Ok(Rule::new(id, self.device_id, self.metric_name, root))
    }
}

fn invalid(reason: impl Into<String>) -> RuleError {
    RuleError::InvalidRule {
        reason: reason.into(),
    }
}

/// CRUD operations over a [`RuleStore`].
#[derive(Debug, Clone)]
pub struct RuleService {
    store: Arc<dyn RuleStore>,
}

impl RuleService {
    /// Creates a service over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn RuleStore>) -> Self {
        Self { store }
    }

    /// Validates and stores a new rule under a fresh ID.
    ///
    /// # Errors
    ///
    /// Returns `RuleError::InvalidRule` if the request does not validate.
    pub fn create(&self, request: RuleRequest) -> Result<Rule> {
        let rule = request.into_rule(Uuid::new_v4().to_string())?;
        self.store.insert(rule.clone())?;
        info!(
            rule_id = %rule.id,
            device_id = %rule.device_id,
            metric = %rule.metric_name,
            "rule created"
        );
        Ok(rule)
    }

    /// Loads a rule.
    ///
    /// # Errors
    ///
    /// Returns `RuleError::RuleNotFound` if no rule has this ID.
    pub fn get(&self, id: &str) -> Result<Rule> {
        self.store
            .get(id)?
            .ok_or_else(|| RuleError::RuleNotFound { id: id.to_string() })
    }

    /// Lists rules passing `filter`.
    pub fn list(&self, filter: &RuleFilter) -> Result<Vec<Rule>> {
        self.store.list(filter)
    }

    /// Validates and replaces an existing rule.
    ///
    /// # Errors
    ///
    /// Returns `RuleError::RuleNotFound` if the rule does not exist, or
    /// `RuleError::InvalidRule` if the request does not validate.
    pub fn update(&self, id: &str, request: RuleRequest) -> Result<Rule> {
        if self.store.get(id)?.is_none() {
            return Err(RuleError::RuleNotFound { id: id.to_string() });
        }

        let rule = request.into_rule(id.to_string())?;
        self.store.update(rule.clone())?;
        info!(rule_id = %rule.id, "rule updated");
        Ok(rule)
    }

    /// Deletes a rule.
    ///
    /// # Errors
    ///
    /// Returns `RuleError::RuleNotFound` if no rule has this ID.
    pub fn delete(&self, id: &str) -> Result<()> {
        if !self.store.delete(id)? {
            return Err(RuleError::RuleNotFound { id: id.to_string() });
        }
        info!(rule_id = %id, "rule deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::ComparisonOperator;
    use crate::store::InMemoryRuleStore;
    use serde_json::json;

    fn service() -> (RuleService, InMemoryRuleStore) {
        let store = InMemoryRuleStore::new();
        (RuleService::new(Arc::new(store.clone())), store)
    }

    mod create_tests {
        use super::*;

        #[test]
        fn valid_rule_is_stored() {
            let (svc, store) = service();
            let rule = svc
                .create(RuleRequest::new(
                    "d1",
                    "temperature",
                    json!({"type": "gt", "value": 25}),
                ))
                .unwrap();

            assert!(!rule.id.is_empty());
            assert_eq!(
                rule.root,
                Some(RuleNode::comparison(ComparisonOperator::Gt, 25.0))
            );
            assert_eq!(store.len(), 1);
        }

        #[test]
        fn rule_without_content_is_allowed() {
            let (svc, _) = service();
            let request = RuleRequest {
                device_id: "d1".to_string(),
                metric_name: "temperature".to_string(),
                rule_content: None,
            };
            assert!(svc.create(request).unwrap().root.is_none());
        }

        #[test]
        fn unknown_operator_rejected() {
            let (svc, store) = service();
            let err = svc
                .create(RuleRequest::new(
                    "d1",
                    "temperature",
                    json!({"type": "between", "value": 25}),
                ))
                .unwrap_err();
            assert!(matches!(err, RuleError::InvalidRule { .. }));
            assert!(store.is_empty());
        }

        #[test]
        fn invalid_inner_node_rejected() {
            let (svc, _) = service();
            let err = svc
                .create(RuleRequest::new(
                    "d1",
                    "temperature",
                    json!({"type": "repeat", "times": 2, "value": {"type": "gt"}}),
                ))
                .unwrap_err();
            assert!(matches!(err, RuleError::InvalidRule { .. }));
        }

        #[test]
        fn blank_binding_rejected() {
            let (svc, _) = service();
            let content = json!({"type": "gt", "value": 1});
            assert!(svc.create(RuleRequest::new(" ", "t", content.clone())).is_err());
            assert!(svc.create(RuleRequest::new("d1", "", content)).is_err());
        }
    }

    mod manage_tests {
        use super::*;

        #[test]
        fn get_update_delete() {
            let (svc, _) = service();
            let rule = svc
                .create(RuleRequest::new("d1", "temperature", json!({"type": "gt", "value": 25})))
                .unwrap();

            assert_eq!(svc.get(&rule.id).unwrap(), rule);

            let updated = svc
                .update(
                    &rule.id,
                    RuleRequest::new("d1", "temperature", json!({"type": "lt", "value": 5})),
                )
                .unwrap();
            assert_eq!(updated.id, rule.id);
            assert_eq!(
                svc.get(&rule.id).unwrap().root,
                Some(RuleNode::comparison(ComparisonOperator::Lt, 5.0))
            );

            svc.delete(&rule.id).unwrap();
            assert!(matches!(
                svc.get(&rule.id).unwrap_err(),
                RuleError::RuleNotFound { .. }
            ));
        }

        #[test]
        fn missing_ids_are_not_found() {
            let (svc, _) = service();
            let request = RuleRequest::new("d1", "t", json!({"type": "gt", "value": 1}));
            assert!(matches!(
                svc.update("ghost", request).unwrap_err(),
                RuleError::RuleNotFound { .. }
            ));
            assert!(matches!(
                svc.delete("ghost").unwrap_err(),
                RuleError::RuleNotFound { .. }
            ));
        }

        #[test]
        fn invalid_update_keeps_old_rule() {
            let (svc, _) = service();
            let rule = svc
                .create(RuleRequest::new("d1", "t", json!({"type": "gt", "value": 1})))
                .unwrap();
            let bad = RuleRequest::new("d1", "t", json!({"type": "repeat", "times": 0}));
            assert!(svc.update(&rule.id, bad).is_err());
            assert_eq!(svc.get(&rule.id).unwrap(), rule);
        }

        #[test]
        fn list_uses_filter() {
            let (svc, _) = service();
            let content = json!({"type": "gt", "value": 1});
            svc.create(RuleRequest::new("d1", "a", content.clone())).unwrap();
            svc.create(RuleRequest::new("d2", "a", content)).unwrap();
            assert_eq!(svc.list(&RuleFilter::all().device("d2")).unwrap().len(), 1);
            assert_eq!(svc.list(&RuleFilter::all()).unwrap().len(), 2);
        }

        #[test]
        fn request_deserializes_camel_case() {
            let request: RuleRequest = serde_json::from_value(json!({
                "deviceId": "d1",
                "metricName": "temperature",
                "ruleContent": {"type": "eq", "value": "on"}
            }))
            .unwrap();
            assert_eq!(request.device_id, "d1");
            assert!(request.rule_content.is_some());
        }
    }
}
