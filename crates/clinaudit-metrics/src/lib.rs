//! Derived metric engine.
//!
//! A fixed, versioned rule set computed from validated responses at write
//! time, so analysis fields (waits, intervals, ratios) are consistent
//! across every episode instead of recomputed ad hoc downstream. Rules are
//! pure: the same ResponseSet always yields the same metric values. A rule
//! whose input is absent (an inactive conditional question) simply omits
//! its metric.

use std::collections::BTreeMap;

use clinaudit_model::ResponseSet;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// One derivation over validated response fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum MetricRule {
    /// Whole-day interval between two date (or datetime) answers.
    IntervalDays {
        name: String,
        from: String,
        to: String,
    },
    /// Fractional-hour interval between two datetime answers.
    IntervalHours {
        name: String,
        from: String,
        to: String,
    },
    /// Ratio of two numeric answers; omitted when the denominator is zero.
    Ratio {
        name: String,
        numerator: String,
        denominator: String,
    },
}

impl MetricRule {
    pub fn name(&self) -> &str {
        match self {
            MetricRule::IntervalDays { name, .. }
            | MetricRule::IntervalHours { name, .. }
            | MetricRule::Ratio { name, .. } => name,
        }
    }

    /// Evaluate against a validated ResponseSet; `None` when an input is
    /// missing or not of the required type.
    fn evaluate(&self, responses: &ResponseSet) -> Option<f64> {
        match self {
            MetricRule::IntervalDays { from, to, .. } => {
                let from = responses.get(from)?.as_date()?;
                let to = responses.get(to)?.as_date()?;
                Some((to - from).num_days() as f64)
            }
            MetricRule::IntervalHours { from, to, .. } => {
                let from = responses.get(from)?.as_datetime()?;
                let to = responses.get(to)?.as_datetime()?;
                Some((to - from).num_seconds() as f64 / 3600.0)
            }
            MetricRule::Ratio {
                numerator,
                denominator,
                ..
            } => {
                let numerator = responses.get(numerator)?.as_number()?;
                let denominator = responses.get(denominator)?.as_number()?;
                if denominator == 0.0 {
                    return None;
                }
                Some(numerator / denominator)
            }
        }
    }
}

/// A versioned collection of metric rules for one audit.
///
/// The version number is recorded so a stored episode's derived values can
/// be traced back to the exact rule set that produced them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSet {
    pub version: u32,
    pub rules: Vec<MetricRule>,
}

impl MetricSet {
    /// An empty rule set; apply produces no metrics.
    pub fn empty() -> Self {
        Self {
            version: 0,
            rules: Vec::new(),
        }
    }

    pub fn new(version: u32, rules: Vec<MetricRule>) -> Self {
        Self { version, rules }
    }

    /// Compute every evaluable metric for a validated ResponseSet.
    pub fn apply(&self, responses: &ResponseSet) -> BTreeMap<String, f64> {
        let mut derived = BTreeMap::new();
        for rule in &self.rules {
            match rule.evaluate(responses) {
                Some(value) => {
                    derived.insert(rule.name().to_string(), value);
                }
                None => trace!(metric = rule.name(), "metric input missing, omitted"),
            }
        }
        derived
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use clinaudit_model::ResponseValue;

    fn date(s: &str) -> ResponseValue {
        ResponseValue::Date(NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("date"))
    }

    fn datetime(s: &str) -> ResponseValue {
        ResponseValue::DateTime(
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").expect("datetime"),
        )
    }

    fn rules() -> MetricSet {
        MetricSet::new(
            1,
            vec![
                MetricRule::IntervalDays {
                    name: "los_days".to_string(),
                    from: "Q_ADMIT".to_string(),
                    to: "Q_DISCHARGE".to_string(),
                },
                MetricRule::IntervalHours {
                    name: "door_to_theatre_hours".to_string(),
                    from: "Q_ARRIVAL".to_string(),
                    to: "Q_THEATRE".to_string(),
                },
            ],
        )
    }

    #[test]
    fn computes_day_and_hour_intervals() {
        let mut responses = ResponseSet::new();
        responses.insert("Q_ADMIT".to_string(), date("2026-01-10"));
        responses.insert("Q_DISCHARGE".to_string(), date("2026-01-15"));
        responses.insert("Q_ARRIVAL".to_string(), datetime("2026-01-10T08:00:00"));
        responses.insert("Q_THEATRE".to_string(), datetime("2026-01-11T14:30:00"));

        let derived = rules().apply(&responses);
        assert_eq!(derived.get("los_days"), Some(&5.0));
        assert_eq!(derived.get("door_to_theatre_hours"), Some(&30.5));
    }

    #[test]
    fn missing_input_omits_the_metric() {
        let mut responses = ResponseSet::new();
        responses.insert("Q_ADMIT".to_string(), date("2026-01-10"));
        // Q_DISCHARGE inactive, Q_ARRIVAL/Q_THEATRE absent.
        let derived = rules().apply(&responses);
        assert!(derived.is_empty());
    }

    #[test]
    fn wrong_input_type_omits_rather_than_errors() {
        let mut responses = ResponseSet::new();
        responses.insert("Q_ADMIT".to_string(), ResponseValue::Text("soon".to_string()));
        responses.insert("Q_DISCHARGE".to_string(), date("2026-01-15"));
        let derived = rules().apply(&responses);
        assert!(!derived.contains_key("los_days"));
    }

    #[test]
    fn ratio_skips_zero_denominator() {
        let set = MetricSet::new(
            1,
            vec![MetricRule::Ratio {
                name: "complication_rate".to_string(),
                numerator: "Q_COMPLICATIONS".to_string(),
                denominator: "Q_PROCEDURES".to_string(),
            }],
        );

        let mut responses = ResponseSet::new();
        responses.insert("Q_COMPLICATIONS".to_string(), ResponseValue::Number(3.0));
        responses.insert("Q_PROCEDURES".to_string(), ResponseValue::Number(0.0));
        assert!(set.apply(&responses).is_empty());

        responses.insert("Q_PROCEDURES".to_string(), ResponseValue::Number(12.0));
        assert_eq!(set.apply(&responses).get("complication_rate"), Some(&0.25));
    }

    #[test]
    fn negative_intervals_are_reported_not_clamped() {
        let mut responses = ResponseSet::new();
        responses.insert("Q_ADMIT".to_string(), date("2026-01-15"));
        responses.insert("Q_DISCHARGE".to_string(), date("2026-01-10"));
        let derived = rules().apply(&responses);
        // Downstream quality review needs to see impossible orderings.
        assert_eq!(derived.get("los_days"), Some(&-5.0));
    }
}
