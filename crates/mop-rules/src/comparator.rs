//! Type-aware comparison of metric values against thresholds.
//!
//! Dispatch depends only on the coerced pair:
//!
//! | metric  | threshold | semantics                                  |
//! |---------|-----------|--------------------------------------------|
//! | text    | text      | lexicographic; `eq` is exact equality      |
//! | numeric | numeric   | `f64` ordering; `eq` within [`EQ_EPSILON`] |
//! | mixed   | mixed     | parse the text side, then numeric; a text  |
//! |         |           | side that is not a number never matches    |

use std::cmp::Ordering;

use tracing::{debug, trace};

use crate::rule::ComparisonOperator;
use crate::value::MetricValue;

/// Tolerance for numeric equality.
pub const EQ_EPSILON: f64 = 1e-4;

/// Compares `value` against `threshold` with the given operator.
#[must_use]
pub fn compare(operator: ComparisonOperator, value: &MetricValue, threshold: &MetricValue) -> bool {
    trace!(
        ?operator,
        value_kind = value.kind(),
        threshold_kind = threshold.kind(),
        "comparing"
    );
    match (value, threshold) {
        (MetricValue::Text(a), MetricValue::Text(b)) => compare_text(operator, a, b),
        (MetricValue::Numeric(a), MetricValue::Numeric(b)) => compare_numeric(operator, *a, *b),
        (MetricValue::Text(text), MetricValue::Numeric(b)) => match value.as_number() {
            Some(a) => compare_numeric(operator, a, *b),
            None => {
                debug!(
                    metric_value = %text,
                    threshold_kind = threshold.kind(),
                    "cannot compare text metric as number"
                );
                false
            }
        },
        (MetricValue::Numeric(a), MetricValue::Text(text)) => match threshold.as_number() {
            Some(b) => compare_numeric(operator, *a, b),
            None => {
                debug!(
                    threshold = %text,
                    value_kind = value.kind(),
                    "cannot compare text threshold as number"
                );
                false
            }
        },
    }
}

fn compare_text(operator: ComparisonOperator, a: &str, b: &str) -> bool {
    if operator == ComparisonOperator::Eq {
        return a == b;
    }
    ordering_holds(operator, a.cmp(b))
}

fn compare_numeric(operator: ComparisonOperator, a: f64, b: f64) -> bool {
    match operator {
        ComparisonOperator::Gt => a > b,
        ComparisonOperator::Lt => a < b,
        ComparisonOperator::Gte => a >= b,
        ComparisonOperator::Lte => a <= b,
        ComparisonOperator::Eq => (a - b).abs() < EQ_EPSILON,
    }
}

fn ordering_holds(operator: ComparisonOperator, ordering: Ordering) -> bool {
    match operator {
        ComparisonOperator::Gt => ordering == Ordering::Greater,
        ComparisonOperator::Lt => ordering == Ordering::Less,
        ComparisonOperator::Gte => ordering != Ordering::Less,
        ComparisonOperator::Lte => ordering != Ordering::Greater,
        ComparisonOperator::Eq => ordering == Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    use crate::rule::ComparisonOperator as Op;

    fn num(n: f64) -> MetricValue {
        MetricValue::Numeric(n)
    }

    fn text(s: &str) -> MetricValue {
        MetricValue::from(s)
    }

    mod numeric_tests {
        use super::*;
        use test_case::test_case;

        #[test_case(Op::Gt, 30.0, 25.0, true ; "gt holds")]
        #[test_case(Op::Gt, 25.0, 25.0, false ; "gt equal")]
        #[test_case(Op::Lt, 20.0, 25.0, true ; "lt holds")]
        #[test_case(Op::Lt, 25.0, 25.0, false ; "lt equal")]
        #[test_case(Op::Gte, 25.0, 25.0, true ; "gte equal")]
        #[test_case(Op::Gte, 24.9, 25.0, false ; "gte below")]
        #[test_case(Op::Lte, 25.0, 25.0, true ; "lte equal")]
        #[test_case(Op::Lte, 25.1, 25.0, false ; "lte above")]
        #[test_case(Op::Eq, 25.0, 25.0, true ; "eq exact")]
        #[test_case(Op::Eq, 25.00005, 25.0, true ; "eq within epsilon")]
        #[test_case(Op::Eq, 25.0002, 25.0, false ; "eq outside epsilon")]
        #[test_case(Op::Gt, 15.0, 10.0, true ; "integers widened")]
        fn numeric(operator: ComparisonOperator, a: f64, b: f64, expected: bool) {
            assert_eq!(compare(operator, &num(a), &num(b)), expected);
        }

        #[test]
        fn eq_boundary_is_exclusive() {
            assert!(!compare(Op::Eq, &num(1.0), &num(1.0 + 2.0 * EQ_EPSILON)));
            assert!(compare(Op::Eq, &num(1.0), &num(1.0 + EQ_EPSILON / 2.0)));
        }

        #[test]
        fn nan_never_matches() {
            for operator in ComparisonOperator::ALL {
                assert!(!compare(operator, &num(f64::NAN), &num(1.0)));
            }
        }
    }

    mod text_tests {
        use super::*;
        use test_case::test_case;

        #[test_case(Op::Gt, "online", "active", true ; "gt lexicographic")]
        #[test_case(Op::Lt, "active", "online", true ; "lt lexicographic")]
        #[test_case(Op::Gte, "abc", "abc", true ; "gte equal")]
        #[test_case(Op::Lte, "abd", "abc", false ; "lte above")]
        #[test_case(Op::Eq, "active", "active", true ; "eq exact")]
        #[test_case(Op::Eq, "active", "Active", false ; "eq case sensitive")]
        #[test_case(Op::Gt, "9", "10", true ; "digits compare as text")]
        fn text_pairs(operator: ComparisonOperator, a: &str, b: &str, expected: bool) {
            assert_eq!(compare(operator, &text(a), &text(b)), expected);
        }
    }

    mod mixed_tests {
        use super::*;

        #[test]
        fn text_metric_parsed_against_numeric_threshold() {
            assert!(compare(Op::Gt, &text("30"), &num(25.0)));
            assert!(!compare(Op::Gt, &text("abc"), &num(25.0)));
        }

        #[test]
        fn numeric_metric_against_text_threshold() {
            assert!(compare(Op::Gt, &num(30.0), &text("25.0")));
            assert!(!compare(Op::Gt, &num(30.0), &text("warm")));
        }

        #[test]
        fn only_exact_infinity_spelling_parses() {
            assert!(!compare(Op::Gt, &text("inf"), &num(25.0)));
            assert!(!compare(Op::Lt, &text("inf"), &num(25.0)));
            assert!(compare(Op::Gt, &text("Infinity"), &num(25.0)));
            assert!(compare(Op::Lt, &num(25.0), &text("Infinity")));
            assert!(!compare(Op::Eq, &text("nan"), &num(25.0)));
        }

        #[test]
        fn mixed_eq_uses_epsilon() {
            assert!(compare(Op::Eq, &text("25.00001"), &num(25.0)));
            assert!(compare(Op::Eq, &num(25.0), &text(" 25 ")));
        }

        #[test]
        fn unparseable_text_is_false_for_every_operator() {
            for operator in ComparisonOperator::ALL {
                assert!(!compare(operator, &text("n/a"), &num(1.0)));
                assert!(!compare(operator, &num(1.0), &text("n/a")));
            }
        }
    }

    proptest! {
        #[test]
        fn prop_numeric_matches_f64_semantics(a in -1.0e6f64..1.0e6, b in -1.0e6f64..1.0e6) {
            prop_assert_eq!(compare(Op::Gt, &num(a), &num(b)), a > b);
            prop_assert_eq!(compare(Op::Lt, &num(a), &num(b)), a < b);
            prop_assert_eq!(compare(Op::Gte, &num(a), &num(b)), a >= b);
            prop_assert_eq!(compare(Op::Lte, &num(a), &num(b)), a <= b);
            prop_assert_eq!(compare(Op::Eq, &num(a), &num(b)), (a - b).abs() < EQ_EPSILON);
        }

        #[test]
        fn prop_text_matches_str_ordering(a in "[a-z0-9]{0,8}", b in "[a-z0-9]{0,8}") {
            prop_assert_eq!(compare(Op::Gt, &text(&a), &text(&b)), a > b);
            prop_assert_eq!(compare(Op::Lt, &text(&a), &text(&b)), a < b);
            prop_assert_eq!(compare(Op::Gte, &text(&a), &text(&b)), a >= b);
            prop_assert_eq!(compare(Op::Lte, &text(&a), &text(&b)), a <= b);
            prop_assert_eq!(compare(Op::Eq, &text(&a), &text(&b)), a == b);
        }

        #[test]
        fn prop_mixed_is_symmetric_with_numeric(x in -1.0e4f64..1.0e4, t in -10_000i32..10_000) {
            let threshold = f64::from(t);
            let as_text = t.to_string();
            prop_assert_eq!(compare(Op::Gt, &num(x), &text(&as_text)), x > threshold);
            prop_assert_eq!(compare(Op::Lt, &text(&as_text), &num(x)), threshold < x);
            prop_assert_eq!(
                compare(Op::Gt, &num(x), &text(&as_text)),
                compare(Op::Lt, &text(&as_text), &num(x))
            );
        }
    }
}
