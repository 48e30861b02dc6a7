use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::value::FilterValue;

/// Scalar aggregates plus nested per-group results.
///
/// Nesting mirrors multi-level grouping: group by `role`, then by `status`
/// inside each role, and so on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregationResult {
    pub count: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<FilterValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<FilterValue>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub grouped_results: HashMap<String, AggregationResult>,
}

impl AggregationResult {
    pub fn new(count: i64) -> Self {
        Self {
            count,
            ..Default::default()
        }
    }

    pub fn with_sum(mut self, sum: f64) -> Self {
        self.sum = Some(sum);
        self
    }

    pub fn with_avg(mut self, avg: f64) -> Self {
        self.avg = Some(avg);
        self
    }

    pub fn with_min(mut self, min: impl Into<FilterValue>) -> Self {
        self.min = Some(min.into());
        self
    }

    pub fn with_max(mut self, max: impl Into<FilterValue>) -> Self {
        self.max = Some(max.into());
        self
    }

    /// Insert or replace the nested result for `key`.
    pub fn add_grouped_result(&mut self, key: impl Into<String>, result: AggregationResult) {
        self.grouped_results.insert(key.into(), result);
    }

    pub fn grouped_result(&self, key: &str) -> Option<&AggregationResult> {
        self.grouped_results.get(key)
    }

    /// Group keys in no particular order.
    pub fn group_keys(&self) -> Vec<&str> {
        self.grouped_results.keys().map(String::as_str).collect()
    }
}
