//! Fixture files seeding the in-memory stores.
//!
//! ```json
//! {
//!   "rules": [{"id": "r1", "deviceId": "d1", "metricName": "temperature",
//!              "ruleContent": {"type": "gt", "value": 25}}],
//!   "telemetry": [{"id": "t1", "deviceId": "d1", "seq": 1,
//!                  "timestamp": "2024-01-01T00:00:00Z",
//!                  "metrics": {"temperature": 30}}]
//! }
//! ```

use std::path::Path;

use mop_rules::{InMemoryRuleStore, InvalidReason, Rule, RuleStore};
use mop_telemetry::{InMemoryTelemetryStore, TelemetryReading};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, WorkerError};

/// Rules and readings loaded from a fixture file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Fixtures {
    /// Rules to store.
    pub rules: Vec<Rule>,
    /// Readings to store.
    pub telemetry: Vec<TelemetryReading>,
}

/// A rule whose content does not validate.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleProblem {
    /// ID of the offending rule.
    pub rule_id: String,
    /// What is wrong with its content.
    pub reason: InvalidReason,
}

impl Fixtures {
    /// Loads fixtures from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `WorkerError::Fixture` if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let fixture_error = |reason: String| WorkerError::Fixture {
            path: path.display().to_string(),
            reason,
        };

        let content = std::fs::read_to_string(path).map_err(|e| fixture_error(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| fixture_error(e.to_string()))
    }

    /// Parses fixtures from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is invalid.
    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Inserts every rule and reading into the given stores.
    ///
    /// Rules are stored as-is; invalid content is kept and simply never
    /// matches.
    ///
    /// # Errors
    ///
    /// Returns an error on duplicate rule or reading IDs.
    pub fn seed(&self, rules: &InMemoryRuleStore, telemetry: &InMemoryTelemetryStore) -> Result<()> {
        for rule in &self.rules {
            rules.insert(rule.clone())?;
        }
        telemetry.insert_all(self.telemetry.iter().cloned())?;

        info!(
            rules = self.rules.len(),
            readings = self.telemetry.len(),
            devices = telemetry.device_count(),
            "seeded stores from fixtures"
        );
        Ok(())
    }

    /// Strictly validates every rule, returning the ones that fail.
    ///
    /// Rules without content are accepted.
    #[must_use]
    pub fn check_rules(&self) -> Vec<RuleProblem> {
        self.rules
            .iter()
            .filter_map(|rule| {
                let root = rule.root.as_ref()?;
                root.validate().err().map(|reason| RuleProblem {
                    rule_id: rule.id.clone(),
                    reason,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"{
        "rules": [
            {"id": "r1", "deviceId": "d1", "metricName": "temperature",
             "ruleContent": {"type": "gt", "value": 25}},
            {"id": "r2", "deviceId": "d1", "metricName": "temperature",
             "ruleContent": {"type": "between", "value": 25}},
            {"id": "r3", "deviceId": "d1", "metricName": "humidity"}
        ],
        "telemetry": [
            {"id": "t1", "deviceId": "d1", "seq": 1,
             "timestamp": "2024-01-01T00:00:00Z",
             "metrics": {"temperature": 30}}
        ]
    }"#;

    #[test]
    fn parses_rules_and_readings() {
        let fixtures = Fixtures::from_json(SAMPLE).unwrap();
        assert_eq!(fixtures.rules.len(), 3);
        assert_eq!(fixtures.telemetry.len(), 1);
        assert!(fixtures.rules[2].root.is_none());
    }

    #[test]
    fn check_rules_reports_invalid_content_only() {
        let fixtures = Fixtures::from_json(SAMPLE).unwrap();
        let problems = fixtures.check_rules();
        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].rule_id, "r2");
        assert_eq!(
            problems[0].reason,
            InvalidReason::UnknownType("between".to_string())
        );
    }

    #[test]
    fn seed_fills_stores() {
        let fixtures = Fixtures::from_json(SAMPLE).unwrap();
        let rules = InMemoryRuleStore::new();
        let telemetry = InMemoryTelemetryStore::new();

        fixtures.seed(&rules, &telemetry).unwrap();
        assert_eq!(rules.len(), 3);
        assert_eq!(telemetry.len(), 1);
    }

    #[test]
    fn seed_twice_is_rejected() {
        let fixtures = Fixtures::from_json(SAMPLE).unwrap();
        let rules = InMemoryRuleStore::new();
        let telemetry = InMemoryTelemetryStore::new();

        fixtures.seed(&rules, &telemetry).unwrap();
        assert!(fixtures.seed(&rules, &telemetry).is_err());
    }

    #[test]
    fn empty_object_is_empty_fixtures() {
        assert_eq!(Fixtures::from_json("{}").unwrap(), Fixtures::default());
    }

    #[test]
    fn load_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let err = Fixtures::load(file.path()).unwrap_err();
        let expected = file.path().display().to_string();
        assert!(matches!(err, WorkerError::Fixture { path, .. } if path == expected));
    }
}
