use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Target identifier the host sends while no metric has been picked yet.
pub const PLACEHOLDER_TARGET: &str = "select metric";

/// Series kind of a query target. Unknown kinds are kept verbatim; an empty
/// kind means `timeserie`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TargetKind {
    #[default]
    Timeserie,
    Table,
    Other(String),
}

impl From<String> for TargetKind {
    fn from(kind: String) -> Self {
        match kind.as_str() {
            "" | "timeserie" => TargetKind::Timeserie,
            "table" => TargetKind::Table,
            _ => TargetKind::Other(kind),
        }
    }
}

impl From<TargetKind> for String {
    fn from(kind: TargetKind) -> Self {
        kind.to_string()
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetKind::Timeserie => f.write_str("timeserie"),
            TargetKind::Table => f.write_str("table"),
            TargetKind::Other(kind) => f.write_str(kind),
        }
    }
}

/// Treats an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryTarget {
    #[serde(default, deserialize_with = "null_as_default")]
    pub target: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ref_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub hide: bool,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<TargetKind>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>,
}

/// Value bound to a template variable: one string or a multi-value selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariableValue {
    Single(String),
    Multi(Vec<String>),
}

impl VariableValue {
    pub fn values(&self) -> Vec<&str> {
        match self {
            VariableValue::Single(value) => vec![value.as_str()],
            VariableValue::Multi(values) => values.iter().map(String::as_str).collect(),
        }
    }
}

impl From<&str> for VariableValue {
    fn from(value: &str) -> Self {
        VariableValue::Single(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopedVar {
    #[serde(default)]
    pub text: Option<Value>,
    pub value: VariableValue,
}

pub type ScopedVars = HashMap<String, ScopedVar>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub range: TimeRange,
    #[serde(default)]
    pub targets: Vec<QueryTarget>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_data_points: Option<u64>,
    #[serde(default)]
    pub scoped_vars: ScopedVars,
}

/// Target after placeholder removal, interpolation and kind defaulting.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedTarget {
    pub target: String,
    pub ref_id: String,
    pub hide: bool,
    #[serde(rename = "type")]
    pub kind: TargetKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRequest {
    pub range: TimeRange,
    pub targets: Vec<NormalizedTarget>,
    pub max_data_points: Option<u64>,
}

/// One `[value, timestamp]` sample as the host expects it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Datapoint(pub Value, pub i64);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesResult {
    pub target: String,
    pub datapoints: Vec<Datapoint>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryResponse {
    pub data: Vec<SeriesResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataEntry {
    #[serde(rename = "text")]
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationSpec {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub datasource: Value,
    #[serde(default)]
    pub enable: bool,
    #[serde(default)]
    pub icon_color: String,
    #[serde(default)]
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationRequest {
    pub range: TimeRange,
    #[serde(default)]
    pub range_raw: Value,
    pub annotation: AnnotationSpec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub status: TestStatus,
    pub message: String,
    pub title: String,
}

impl TestResult {
    pub fn success(username: &str) -> Self {
        Self {
            status: TestStatus::Success,
            message: format!("Data source is working, authenticated as {}", username),
            title: "Success".to_string(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: TestStatus::Error,
            message: message.into(),
            title: "Error".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_target_kind_keeps_unknown_values() {
        let target: QueryTarget = serde_json::from_value(json!({
            "target": "DP_1",
            "refId": "A",
            "type": "histogram"
        }))
        .unwrap();

        assert_eq!(target.kind, Some(TargetKind::Other("histogram".into())));
        assert!(!target.hide);
        assert_eq!(serde_json::to_value(&target).unwrap()["type"], "histogram");
    }

    #[test]
    fn test_target_null_fields_default() {
        let target: QueryTarget = serde_json::from_value(json!({
            "target": "DP_1",
            "refId": null,
            "hide": null,
            "type": null
        }))
        .unwrap();

        assert!(!target.hide);
        assert_eq!(target.ref_id, "");
        assert_eq!(target.kind, None);
    }

    #[test]
    fn test_query_request_from_host_json() {
        let request: QueryRequest = serde_json::from_value(json!({
            "range": {
                "from": "2024-03-01T10:00:00.000Z",
                "to": "2024-03-01T11:00:00.000Z",
                "raw": {"from": "now-1h", "to": "now"}
            },
            "targets": [{"target": "$sensor", "refId": "A", "hide": false}],
            "maxDataPoints": 500,
            "scopedVars": {
                "sensor": {"text": "Temp", "value": ["DP_1", "DP_2"]}
            }
        }))
        .unwrap();

        assert_eq!(request.max_data_points, Some(500));
        assert_eq!(request.targets[0].kind, None);
        assert_eq!(
            request.scoped_vars["sensor"].value,
            VariableValue::Multi(vec!["DP_1".into(), "DP_2".into()])
        );
    }

    #[test]
    fn test_datapoint_serializes_as_pair() {
        let series = SeriesResult {
            target: "DP_1".into(),
            datapoints: vec![Datapoint(json!(1.5), 100)],
        };
        assert_eq!(
            serde_json::to_value(&series).unwrap(),
            json!({"target": "DP_1", "datapoints": [[1.5, 100]]})
        );
    }

    #[test]
    fn test_metadata_entry_uses_host_field_names() {
        let entry = MetadataEntry {
            label: "Boiler temperature".into(),
            value: "DP_42".into(),
        };
        assert_eq!(
            serde_json::to_value(&entry).unwrap(),
            json!({"text": "Boiler temperature", "value": "DP_42"})
        );
    }
}
