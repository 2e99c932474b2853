//! Rule trees and the rules that carry them.
//!
//! Rule content is authored as JSON:
//!
//! ```json
//! {"type": "gt", "value": 25.0}
//! {"type": "repeat", "times": 3, "value": {"type": "gt", "value": 25.0}}
//! ```
//!
//! [`RuleNode::from_content`] turns that JSON into a closed tree. Parsing
//! never fails: structurally wrong content at any depth becomes
//! [`RuleNode::Invalid`], which keeps the original JSON and evaluates to
//! "not satisfied". Rule management applies [`RuleNode::validate`] to reject
//! such content up front.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::value::{MetricValue, json_kind};

/// Content tag of the temporal repeat operator.
pub const REPEAT_TYPE: &str = "repeat";

/// Comparison operators for rule leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonOperator {
    /// Greater than (`gt`).
    Gt,
    /// Less than (`lt`).
    Lt,
    /// Greater than or equal (`gte`).
    Gte,
    /// Less than or equal (`lte`).
    Lte,
    /// Equal (`eq`); numeric equality uses a fixed epsilon.
    Eq,
}

impl ComparisonOperator {
    /// All operators, in tag order.
    pub const ALL: [Self; 5] = [Self::Gt, Self::Lt, Self::Gte, Self::Lte, Self::Eq];

    /// Returns the content tag of this operator.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Gt => "gt",
            Self::Lt => "lt",
            Self::Gte => "gte",
            Self::Lte => "lte",
            Self::Eq => "eq",
        }
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComparisonOperator {
    type Err = InvalidReason;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gt" => Ok(Self::Gt),
            "lt" => Ok(Self::Lt),
            "gte" => Ok(Self::Gte),
            "lte" => Ok(Self::Lte),
            "eq" => Ok(Self::Eq),
            other => Err(InvalidReason::UnknownType(other.to_string())),
        }
    }
}

/// Why a piece of rule content could not be turned into a usable node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidReason {
    /// The content is not a JSON object.
    #[error("rule content must be an object")]
    NotAnObject,
    /// The `type` field is absent or not a string.
    #[error("rule content missing 'type' field")]
    MissingType,
    /// The `type` field names no known operator.
    #[error("unknown rule type '{0}'")]
    UnknownType(String),
    /// A comparison has no `value`.
    #[error("comparison missing 'value' field")]
    MissingThreshold,
    /// A comparison `value` is neither a number nor a string.
    #[error("comparison threshold has unsupported type {0}")]
    UnsupportedThreshold(&'static str),
    /// A repeat has no `times`.
    #[error("repeat missing 'times' field")]
    MissingTimes,
    /// A repeat `times` cannot be read as an integer.
    #[error("repeat 'times' is not a valid integer: {0}")]
    InvalidTimes(String),
    /// A repeat `times` is zero or negative.
    #[error("repeat 'times' must be positive, got {0}")]
    NonPositiveTimes(i64),
    /// A repeat `value` is absent or not an object.
    #[error("repeat missing or invalid 'value' field")]
    MissingInner,
}

/// A node of a rule tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum RuleNode {
    /// Compares the metric value against a literal threshold.
    Comparison {
        /// The comparison operator.
        operator: ComparisonOperator,
        /// The literal to compare against.
        threshold: MetricValue,
    },
    /// Holds when `inner` holds for each of the device's `times` most recent readings.
    Repeat {
        /// How many recent readings must satisfy `inner`. Always positive.
        times: u32,
        /// The predicate each reading must satisfy.
        inner: Box<RuleNode>,
    },
    /// Content that could not be parsed. Never satisfied.
    Invalid {
        /// The original content, kept verbatim.
        content: Value,
        /// What was wrong with it.
        reason: InvalidReason,
    },
}

impl RuleNode {
    /// Creates a comparison leaf.
    pub fn comparison(operator: ComparisonOperator, threshold: impl Into<MetricValue>) -> Self {
        Self::Comparison {
            operator,
            threshold: threshold.into(),
        }
    }

    /// Creates a repeat node. A zero count yields an invalid node.
    #[must_use]
    pub fn repeat(times: u32, inner: Self) -> Self {
        if times == 0 {
            return Self::Invalid {
                content: json!({
                    "type": REPEAT_TYPE,
                    "times": 0,
                    "value": inner.to_content(),
                }),
                reason: InvalidReason::NonPositiveTimes(0),
            };
        }
        Self::Repeat {
            times,
            inner: Box::new(inner),
        }
    }

    /// Parses rule content, turning anything malformed into [`RuleNode::Invalid`].
    #[must_use]
    pub fn from_content(content: &Value) -> Self {
        let invalid = |reason| Self::Invalid {
            content: content.clone(),
            reason,
        };

        let Value::Object(map) = content else {
            return invalid(InvalidReason::NotAnObject);
        };
        let Some(tag) = map.get("type").and_then(Value::as_str) else {
            return invalid(InvalidReason::MissingType);
        };

        let parsed = if tag == REPEAT_TYPE {
            Self::parse_repeat(map)
        } else {
            tag.parse::<ComparisonOperator>()
                .and_then(|operator| Self::parse_comparison(operator, map))
        };

        parsed.unwrap_or_else(invalid)
    }

    fn parse_comparison(
        operator: ComparisonOperator,
        map: &Map<String, Value>,
    ) -> Result<Self, InvalidReason> {
        let raw = match map.get("value") {
            None | Some(Value::Null) => return Err(InvalidReason::MissingThreshold),
            Some(raw) => raw,
        };
        let threshold = MetricValue::coerce(raw)
            .map_err(|unsupported| InvalidReason::UnsupportedThreshold(unsupported.kind))?;

        Ok(Self::Comparison {
            operator,
            threshold,
        })
    }

    fn parse_repeat(map: &Map<String, Value>) -> Result<Self, InvalidReason> {
        let times = match map.get("times") {
            None | Some(Value::Null) => return Err(InvalidReason::MissingTimes),
            Some(raw) => parse_times(raw)?,
        };

        let inner = match map.get("value") {
            Some(inner @ Value::Object(_)) => Self::from_content(inner),
            _ => return Err(InvalidReason::MissingInner),
        };

        Ok(Self::Repeat {
            times,
            inner: Box::new(inner),
        })
    }

    /// Renders this node back to rule content JSON.
    #[must_use]
    pub fn to_content(&self) -> Value {
        match self {
            Self::Comparison {
                operator,
                threshold,
            } => json!({
                "type": operator.as_str(),
                "value": threshold.to_json(),
            }),
            Self::Repeat { times, inner } => json!({
                "type": REPEAT_TYPE,
                "times": times,
                "value": inner.to_content(),
            }),
            Self::Invalid { content, .. } => content.clone(),
        }
    }

    /// Checks the whole tree, returning the first problem found depth-first.
    pub fn validate(&self) -> Result<(), InvalidReason> {
        match self {
            Self::Comparison { .. } => Ok(()),
            Self::Repeat { inner, .. } => inner.validate(),
            Self::Invalid { reason, .. } => Err(reason.clone()),
        }
    }

    /// Returns true if no node in the tree is invalid.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Returns the number of nodes on the longest root-to-leaf path.
    #[must_use]
    pub fn depth(&self) -> usize {
        match self {
            Self::Repeat { inner, .. } => 1 + inner.depth(),
            Self::Comparison { .. } | Self::Invalid { .. } => 1,
        }
    }
}

/// Reads a repeat count from an integer, a float (truncated), or a numeric string.
fn parse_times(raw: &Value) -> Result<u32, InvalidReason> {
    let times = match raw {
        Value::Number(n) => match n.as_i64() {
            Some(i) => i,
            None => n
                .as_f64()
                .map(|f| f.trunc() as i64)
                .ok_or_else(|| InvalidReason::InvalidTimes(n.to_string()))?,
        },
        Value::String(s) => s
            .parse::<i64>()
            .map_err(|_| InvalidReason::InvalidTimes(s.clone()))?,
        other => return Err(InvalidReason::InvalidTimes(json_kind(other).to_string())),
    };

    if times <= 0 {
        return Err(InvalidReason::NonPositiveTimes(times));
    }
    u32::try_from(times).map_err(|_| InvalidReason::InvalidTimes(times.to_string()))
}

impl From<Value> for RuleNode {
    fn from(content: Value) -> Self {
        Self::from_content(&content)
    }
}

impl From<RuleNode> for Value {
    fn from(node: RuleNode) -> Self {
        node.to_content()
    }
}

impl fmt::Display for RuleNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Comparison {
                operator,
                threshold,
            } => write!(f, "{operator} {threshold}"),
            Self::Repeat { times, inner } => write!(f, "repeat({times}, {inner})"),
            Self::Invalid { reason, .. } => write!(f, "invalid({reason})"),
        }
    }
}

/// An alerting rule bound to one metric of one device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    /// Unique identifier of the rule.
    pub id: String,
    /// The device whose readings the rule watches.
    pub device_id: String,
    /// The metric of each reading the rule applies to.
    pub metric_name: String,
    /// The predicate. A rule without one never matches.
    #[serde(rename = "ruleContent", default)]
    pub root: Option<RuleNode>,
}

impl Rule {
    /// Creates a rule with the given predicate.
    pub fn new(
        id: impl Into<String>,
        device_id: impl Into<String>,
        metric_name: impl Into<String>,
        root: RuleNode,
    ) -> Self {
        Self {
            id: id.into(),
            device_id: device_id.into(),
            metric_name: metric_name.into(),
            root: Some(root),
        }
    }

    /// Creates a rule from raw rule content JSON.
    pub fn from_content(
        id: impl Into<String>,
        device_id: impl Into<String>,
        metric_name: impl Into<String>,
        content: &Value,
    ) -> Self {
        Self::new(id, device_id, metric_name, RuleNode::from_content(content))
    }

    /// Creates a rule with no predicate.
    pub fn without_content(
        id: impl Into<String>,
        device_id: impl Into<String>,
        metric_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            device_id: device_id.into(),
            metric_name: metric_name.into(),
            root: None,
        }
    }
}
