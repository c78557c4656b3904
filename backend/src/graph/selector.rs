//! Label selector matching over raw resource JSON
//!
//! Services carry a plain `{key: value}` selector; workloads carry a
//! `LabelSelector` with `matchLabels` and `matchExpressions`.

use serde_json::Value;
use std::collections::BTreeMap;

/// A parsed equality/set-based selector
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelSelector {
    match_labels: BTreeMap<String, String>,
    expressions: Vec<Requirement>,
}

#[derive(Debug, Clone, PartialEq)]
enum Requirement {
    In(String, Vec<String>),
    NotIn(String, Vec<String>),
    Exists(String),
    DoesNotExist(String),
    /// Unknown operator or missing key; selects nothing
    Unsatisfiable,
}

impl LabelSelector {
    /// Parse a service-style selector (`spec.selector` as a string map)
    pub fn from_map(value: &Value) -> Option<Self> {
        let labels = string_map(value)?;
        Some(Self {
            match_labels: labels,
            expressions: Vec::new(),
        })
    }

    /// Parse a workload-style `LabelSelector` object
    pub fn from_label_selector(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let match_labels = obj
            .get("matchLabels")
            .and_then(string_map)
            .unwrap_or_default();

        let expressions = obj
            .get("matchExpressions")
            .and_then(Value::as_array)
            .map(|exprs| exprs.iter().map(parse_requirement).collect())
            .unwrap_or_default();

        Some(Self {
            match_labels,
            expressions,
        })
    }

    /// An empty selector; callers decide whether that means "everything" or "nothing"
    pub fn is_empty(&self) -> bool {
        self.match_labels.is_empty() && self.expressions.is_empty()
    }

    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        let labels_ok = self
            .match_labels
            .iter()
            .all(|(k, v)| labels.get(k) == Some(v));

        labels_ok
            && self.expressions.iter().all(|req| match req {
                Requirement::In(key, values) => labels.get(key).is_some_and(|v| values.contains(v)),
                Requirement::NotIn(key, values) => {
                    labels.get(key).map_or(true, |v| !values.contains(v))
                }
                Requirement::Exists(key) => labels.contains_key(key),
                Requirement::DoesNotExist(key) => !labels.contains_key(key),
                Requirement::Unsatisfiable => false,
            })
    }

    /// Match against a resource's `metadata.labels`
    pub fn matches_resource(&self, resource: &Value) -> bool {
        self.matches(&resource_labels(resource))
    }
}

/// `metadata.labels` as a map; non-string values are skipped
pub fn resource_labels(resource: &Value) -> BTreeMap<String, String> {
    resource
        .pointer("/metadata/labels")
        .and_then(string_map)
        .unwrap_or_default()
}

fn string_map(value: &Value) -> Option<BTreeMap<String, String>> {
    let obj = value.as_object()?;
    Some(
        obj.iter()
            .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
            .collect(),
    )
}

fn parse_requirement(expr: &Value) -> Requirement {
    let Some(key) = expr.get("key").and_then(Value::as_str).map(str::to_string) else {
        return Requirement::Unsatisfiable;
    };
    let values: Vec<String> = expr
        .get("values")
        .and_then(Value::as_array)
        .map(|vs| {
            vs.iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    match expr.get("operator").and_then(Value::as_str) {
        Some("In") => Requirement::In(key, values),
        Some("NotIn") => Requirement::NotIn(key, values),
        Some("Exists") => Requirement::Exists(key),
        Some("DoesNotExist") => Requirement::DoesNotExist(key),
        _ => Requirement::Unsatisfiable,
    }
}
