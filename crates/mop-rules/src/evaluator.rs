//! Recursive rule evaluation.
//!
//! [`Evaluator::evaluate`] answers one question: does this rule hold for this
//! reading? Malformed rule content, missing metrics and unsupported value
//! shapes all answer "no". The only errors come from reading history for a
//! repeat node.

use std::sync::Arc;

use mop_telemetry::TelemetryReading;
use tracing::{debug, warn};

use crate::comparator::compare;
use crate::error::Result;
use crate::history::HistoryResolver;
use crate::rule::{Rule, RuleNode};
use crate::value::MetricValue;

/// Evaluates rule trees against telemetry readings.
#[derive(Debug, Clone)]
pub struct Evaluator {
    history: Arc<dyn HistoryResolver>,
}

impl Evaluator {
    /// Creates an evaluator that reads repeat windows from `history`.
    #[must_use]
    pub fn new(history: Arc<dyn HistoryResolver>) -> Self {
        Self { history }
    }

    /// Returns whether `rule` is satisfied by `reading`.
    ///
    /// # Errors
    ///
    /// Returns an error only if a repeat node's history window cannot be read.
    pub fn evaluate(&self, rule: &Rule, reading: &TelemetryReading) -> Result<bool> {
        let Some(root) = rule.root.as_ref() else {
            warn!(rule_id = %rule.id, "rule has no content");
            return Ok(false);
        };

        let Some(value) = metric_value(rule, reading) else {
            return Ok(false);
        };

        self.evaluate_node(rule, root, &value, reading)
    }

    fn evaluate_node(
        &self,
        rule: &Rule,
        node: &RuleNode,
        value: &MetricValue,
        reading: &TelemetryReading,
    ) -> Result<bool> {
        match node {
            RuleNode::Comparison {
                operator,
                threshold,
            } => Ok(compare(*operator, value, threshold)),
            RuleNode::Repeat { times, inner } => self.evaluate_repeat(rule, *times, inner, reading),
            RuleNode::Invalid { reason, .. } => {
                warn!(rule_id = %rule.id, reason = %reason, "invalid rule content");
                Ok(false)
            }
        }
    }

    /// Holds when `inner` holds for every one of the device's `times` most
    /// recent readings, the current one included.
    fn evaluate_repeat(
        &self,
        rule: &Rule,
        times: u32,
        inner: &RuleNode,
        reading: &TelemetryReading,
    ) -> Result<bool> {
        let required = times as usize;
        let window = self.history.recent_readings(&reading.device_id, required)?;

        if window.len() < required {
            debug!(
                rule_id = %rule.id,
                device_id = %reading.device_id,
                required,
                available = window.len(),
                "not enough readings for repeat rule"
            );
            return Ok(false);
        }

        for past in &window {
            let Some(value) = metric_value(rule, past) else {
                return Ok(false);
            };
            if !self.evaluate_node(rule, inner, &value, past)? {
                debug!(
                    rule_id = %rule.id,
                    reading_id = %past.id,
                    seq = past.seq,
                    "reading breaks repeat chain"
                );
                return Ok(false);
            }
        }

        Ok(true)
    }
}

/// Extracts and coerces the rule's metric from a reading.
fn metric_value(rule: &Rule, reading: &TelemetryReading) -> Option<MetricValue> {
    let Some(raw) = reading.metric(&rule.metric_name) else {
        debug!(
            rule_id = %rule.id,
            reading_id = %reading.id,
            metric = %rule.metric_name,
            "metric missing from reading"
        );
        return None;
    };

    match MetricValue::coerce(raw) {
        Ok(value) => Some(value),
        Err(unsupported) => {
            debug!(
                rule_id = %rule.id,
                reading_id = %reading.id,
                metric = %rule.metric_name,
                kind = unsupported.kind,
                "metric has unsupported type"
            );
            None
        }
    }
}
