//! Reward-message construction for the downstream scoring service.
//!
//! The message schema is fixed by the consumer: an experiment id, a
//! list of per-metric results (lift percentage, confidence interval,
//! p-value, significance flag, sample size), and a string-valued factor
//! map. This module is a field-by-field mapping with the consumer's
//! defaulting rules -- absent fields become empty strings, zeros,
//! `p = 1.0`, or `false`; it performs no estimation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use gs_core::types::LiftSummary;
use gs_core::Result;

/// Confidence interval bounds, in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    /// Lower bound.
    pub lower: f64,
    /// Upper bound.
    pub upper: f64,
}

/// Per-metric experiment result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentResult {
    /// Metric name (e.g. "spend").
    pub metric_name: String,
    /// Estimated lift, in percent.
    pub lift_percentage: f64,
    /// 95% confidence interval on the lift.
    pub confidence_interval: ConfidenceInterval,
    /// Two-sided p-value.
    pub p_value: f64,
    /// Significance at the 5% level.
    pub is_significant: bool,
    /// Observations behind the estimate.
    pub sample_size: u64,
}

/// Reward message for the scoring service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reward {
    /// Experiment identifier.
    pub experiment_id: String,
    /// One entry per metric.
    pub results: Vec<ExperimentResult>,
    /// Experiment factor levels, stringified.
    pub factors: BTreeMap<String, String>,
}

impl Reward {
    /// Build a single-metric reward message from an estimation summary.
    pub fn from_summary(summary: &LiftSummary, experiment_id: impl Into<String>) -> Reward {
        Reward {
            experiment_id: experiment_id.into(),
            results: vec![ExperimentResult {
                metric_name: summary.metric.clone(),
                lift_percentage: summary.lift_percentage,
                confidence_interval: ConfidenceInterval {
                    lower: summary.ci_lower,
                    upper: summary.ci_upper,
                },
                p_value: summary.p_value,
                is_significant: summary.is_significant,
                sample_size: summary.sample_size,
            }],
            factors: BTreeMap::new(),
        }
    }

    /// Build a reward message from raw lift JSON.
    ///
    /// Accepts either a `{"metrics": [...]}` list or a bare
    /// single-metric object (detected by a `"metric"` key). The
    /// explicit `experiment_id` wins over one embedded in the JSON.
    pub fn from_json(json: &str, experiment_id: Option<&str>) -> Result<Reward> {
        let data: Value = serde_json::from_str(json)?;

        let experiment_id = experiment_id
            .map(str::to_string)
            .or_else(|| data.get("experiment_id").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_default();

        let metrics: Vec<&Value> = match data.get("metrics").and_then(Value::as_array) {
            Some(list) => list.iter().collect(),
            None if data.get("metric").is_some() => vec![&data],
            None => Vec::new(),
        };

        let results = metrics.into_iter().map(metric_result).collect();

        let mut factors = BTreeMap::new();
        if let Some(map) = data.get("factors").and_then(Value::as_object) {
            for (key, value) in map {
                factors.insert(key.clone(), stringify(value));
            }
        }

        Ok(Reward { experiment_id, results, factors })
    }

    /// Serialize to the consumer's JSON shape.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

fn metric_result(metric: &Value) -> ExperimentResult {
    let name = metric
        .get("metric")
        .or_else(|| metric.get("name"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let ci = metric.get("confidence_interval");
    ExperimentResult {
        metric_name: name,
        lift_percentage: number_or(metric.get("lift_percentage"), 0.0),
        confidence_interval: ConfidenceInterval {
            lower: number_or(ci.and_then(|c| c.get("lower")), 0.0),
            upper: number_or(ci.and_then(|c| c.get("upper")), 0.0),
        },
        p_value: number_or(metric.get("p_value"), 1.0),
        is_significant: metric
            .get("is_significant")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        sample_size: metric.get("sample_size").and_then(Value::as_u64).unwrap_or(0),
    }
}

fn number_or(value: Option<&Value>, default: f64) -> f64 {
    value.and_then(Value::as_f64).unwrap_or(default)
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
