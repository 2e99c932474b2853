//! Telemetry processing: the engine's entry point.

use std::sync::Arc;

use mop_telemetry::{TelemetryError, TelemetryStore};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::alert::{Alert, AlertSink};
use crate::error::{Result, RuleError};
use crate::evaluator::Evaluator;
use crate::history::{HistoryResolver, StoreHistory};
use crate::store::RuleStore;

/// Summary of one [`RuleProcessor::process_telemetry`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingReport {
    /// The processed reading.
    pub telemetry_id: String,
    /// Number of metrics the reading carried.
    pub metrics_seen: usize,
    /// Number of rules evaluated across all metrics.
    pub rules_evaluated: usize,
    /// Number of rules that held.
    pub rules_matched: usize,
    /// Alerts created, one per matching rule.
    pub alerts: Vec<Alert>,
}

/// Evaluates every rule bound to a reading's metrics and raises alerts.
///
/// Holds no mutable state of its own; concurrent calls for different
/// readings are safe as long as the collaborators are.
#[derive(Debug, Clone)]
pub struct RuleProcessor {
    telemetry: Arc<dyn TelemetryStore>,
    rules: Arc<dyn RuleStore>,
    alerts: Arc<dyn AlertSink>,
    evaluator: Evaluator,
}

impl RuleProcessor {
    /// Creates a processor whose repeat windows come from `telemetry`.
    #[must_use]
    pub fn new(
        telemetry: Arc<dyn TelemetryStore>,
        rules: Arc<dyn RuleStore>,
        alerts: Arc<dyn AlertSink>,
    ) -> Self {
        let history = Arc::new(StoreHistory::new(Arc::clone(&telemetry)));
        Self::with_history(telemetry, rules, alerts, history)
    }

    /// Creates a processor with a separate history resolver.
    #[must_use]
    pub fn with_history(
        telemetry: Arc<dyn TelemetryStore>,
        rules: Arc<dyn RuleStore>,
        alerts: Arc<dyn AlertSink>,
        history: Arc<dyn HistoryResolver>,
    ) -> Self {
        Self {
            telemetry,
            rules,
            alerts,
            evaluator: Evaluator::new(history),
        }
    }

    /// Processes the reading with the given ID.
    ///
    /// Metrics are visited in name order. Each satisfied rule produces
    /// exactly one alert; calling this twice for the same ID produces the
    /// alerts twice.
    ///
    /// # Errors
    ///
    /// Returns `RuleError::TelemetryNotFound` if the reading does not exist,
    /// or the underlying error if a store or the alert sink fails. Alerts
    /// created before a failure are kept.
    pub fn process_telemetry(&self, telemetry_id: &str) -> Result<ProcessingReport> {
        let reading = match self.telemetry.get_by_id(telemetry_id) {
            Ok(reading) => reading,
            Err(TelemetryError::NotFound { id }) => {
                warn!(telemetry_id = %id, "telemetry reading not found");
                return Err(RuleError::TelemetryNotFound { id });
            }
            Err(e) => return Err(e.into()),
        };

        let mut report = ProcessingReport {
            telemetry_id: reading.id.clone(),
            metrics_seen: reading.metrics.len(),
            ..ProcessingReport::default()
        };

        if reading.has_no_metrics() {
            debug!(telemetry_id = %reading.id, "reading has no metrics");
            return Ok(report);
        }

        for metric_name in reading.metrics.keys() {
            let rules = self
                .rules
                .find_by_device_and_metric(&reading.device_id, metric_name)?;

            for rule in &rules {
                report.rules_evaluated += 1;

                if !self.evaluator.evaluate(rule, &reading)? {
                    continue;
                }

                report.rules_matched += 1;
                let alert = self.alerts.create(&rule.id, &reading.id)?;
                info!(
                    alert_id = %alert.id,
                    rule_id = %rule.id,
                    telemetry_id = %reading.id,
                    device_id = %reading.device_id,
                    metric = %metric_name,
                    "rule matched, alert created"
                );
                report.alerts.push(alert);
            }
        }

        debug!(
            telemetry_id = %report.telemetry_id,
            metrics = report.metrics_seen,
            evaluated = report.rules_evaluated,
            matched = report.rules_matched,
            "telemetry processed"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::InMemoryAlertSink;
    use crate::rule::Rule;
    use crate::store::InMemoryRuleStore;
    use mop_telemetry::{InMemoryTelemetryStore, TelemetryReading};
    use serde_json::json;

    struct Fixture {
        telemetry: InMemoryTelemetryStore,
        rules: InMemoryRuleStore,
        alerts: InMemoryAlertSink,
        processor: RuleProcessor,
    }

    fn fixture() -> Fixture {
        let telemetry = InMemoryTelemetryStore::new();
        let rules = InMemoryRuleStore::new();
        let alerts = InMemoryAlertSink::new();
        let processor = RuleProcessor::new(
            Arc::new(telemetry.clone()),
            Arc::new(rules.clone()),
            Arc::new(alerts.clone()),
        );
        Fixture {
            telemetry,
            rules,
            alerts,
            processor,
        }
    }

    #[test]
    fn missing_reading_is_not_found() {
        let f = fixture();
        let err = f.processor.process_telemetry("nope").unwrap_err();
        assert!(matches!(err, RuleError::TelemetryNotFound { id } if id == "nope"));
        assert_eq!(f.alerts.count(), 0);
    }

    #[test]
    fn reading_without_metrics_does_nothing() {
        let f = fixture();
        f.telemetry
            .insert(TelemetryReading::builder("d1", 1).id("t1").build())
            .unwrap();
        f.rules
            .insert(Rule::from_content(
                "r1",
                "d1",
                "temperature",
                &json!({"type": "gt", "value": 25}),
            ))
            .unwrap();

        let report = f.processor.process_telemetry("t1").unwrap();
        assert_eq!(report.metrics_seen, 0);
        assert_eq!(report.rules_evaluated, 0);
        assert!(report.alerts.is_empty());
    }

    #[test]
    fn each_metric_looks_up_its_own_rules() {
        let f = fixture();
        f.telemetry
            .insert(
                TelemetryReading::builder("d1", 1)
                    .id("t1")
                    .metric("temperature", 30.0)
                    .metric("humidity", 40.0)
                    .build(),
            )
            .unwrap();
        f.rules
            .insert(Rule::from_content(
                "hot",
                "d1",
                "temperature",
                &json!({"type": "gt", "value": 25}),
            ))
            .unwrap();
        f.rules
            .insert(Rule::from_content(
                "dry",
                "d1",
                "humidity",
                &json!({"type": "lt", "value": 30}),
            ))
            .unwrap();
        f.rules
            .insert(Rule::from_content(
                "other-device",
                "d2",
                "temperature",
                &json!({"type": "gt", "value": 0}),
            ))
            .unwrap();

        let report = f.processor.process_telemetry("t1").unwrap();
        assert_eq!(report.metrics_seen, 2);
        assert_eq!(report.rules_evaluated, 2);
        assert_eq!(report.rules_matched, 1);
        assert_eq!(report.alerts[0].rule_id, "hot");
        assert_eq!(f.alerts.for_telemetry("t1").len(), 1);
    }

    #[test]
    fn invalid_rule_does_not_stop_the_others() {
        let f = fixture();
        f.telemetry
            .insert(
                TelemetryReading::builder("d1", 1)
                    .id("t1")
                    .metric("temperature", 30.0)
                    .build(),
            )
            .unwrap();
        f.rules
            .insert(Rule::from_content(
                "broken",
                "d1",
                "temperature",
                &json!({"type": "between", "value": 25}),
            ))
            .unwrap();
        f.rules
            .insert(Rule::without_content("empty", "d1", "temperature"))
            .unwrap();
        f.rules
            .insert(Rule::from_content(
                "ok",
                "d1",
                "temperature",
                &json!({"type": "gte", "value": 30}),
            ))
            .unwrap();

        let report = f.processor.process_telemetry("t1").unwrap();
        assert_eq!(report.rules_evaluated, 3);
        assert_eq!(report.rules_matched, 1);
        assert_eq!(report.alerts[0].rule_id, "ok");
    }

    #[test]
    fn report_serializes_camel_case() {
        let report = ProcessingReport {
            telemetry_id: "t1".to_string(),
            ..ProcessingReport::default()
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["telemetryId"], "t1");
        assert_eq!(json["rulesMatched"], 0);
    }
}
