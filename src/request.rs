use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::config::InstanceSettings;
use crate::error::Result;
use crate::models::{AnnotationRequest, AnnotationSpec, NormalizedRequest, TargetKind, TimeRange};
use crate::transport::{HttpMethod, HttpRequest};

pub const POINT_VALUES_PATH: &str = "/rest/v1/point-values/multiple-points-multiple-arrays";
pub const CURRENT_USER_PATH: &str = "/rest/v1/users/current";
pub const DATA_POINTS_PATH: &str = "/rest/v2/data-points";
pub const ANNOTATIONS_PATH: &str = "/annotations";
pub const SEARCH_LIMIT: u32 = 20;

#[derive(Debug, Serialize)]
struct PointValuesBody {
    from: String,
    to: String,
    xids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnnotationBody<'a> {
    range: &'a TimeRange,
    range_raw: &'a Value,
    annotation: AnnotationSpec,
}

/// Same rendering as a JavaScript `Date#toISOString`.
fn iso_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Turns normalized calls into transport-ready requests. Holds the base URL
/// and the headers fixed when the datasource was configured.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    base_url: String,
    headers: BTreeMap<String, String>,
    with_credentials: bool,
}

impl RequestBuilder {
    pub fn new(settings: &InstanceSettings) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("Accept".to_string(), "application/json".to_string());
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        if let Some(auth) = settings.authorization() {
            headers.insert("Authorization".to_string(), auth);
        }

        Self {
            base_url: settings.base_url().to_string(),
            headers,
            with_credentials: settings.with_credentials,
        }
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    fn request(&self, method: HttpMethod, path: &str, body: Option<Value>) -> HttpRequest {
        HttpRequest {
            url: format!("{}{}", self.base_url, path),
            method,
            body,
            headers: self.headers.clone(),
            with_credentials: self.with_credentials,
        }
    }

    /// Point-value fetch for every visible `timeserie` target. Returns `None`
    /// when nothing is left to ask for; no request must be sent in that case.
    pub fn bulk_query(&self, query: &NormalizedRequest) -> Result<Option<HttpRequest>> {
        let xids: Vec<String> = query
            .targets
            .iter()
            .filter(|t| !t.hide)
            .filter(|t| t.kind == TargetKind::Timeserie)
            .map(|t| t.target.clone())
            .collect();

        if xids.is_empty() {
            return Ok(None);
        }

        let body = PointValuesBody {
            from: iso_timestamp(&query.range.from),
            to: iso_timestamp(&query.range.to),
            xids,
            limit: query.max_data_points.filter(|limit| *limit > 0),
        };

        let body = serde_json::to_value(body)?;
        Ok(Some(self.request(HttpMethod::Post, POINT_VALUES_PATH, Some(body))))
    }

    pub fn connectivity_check(&self) -> HttpRequest {
        self.request(HttpMethod::Get, CURRENT_USER_PATH, None)
    }

    /// RQL listing of data points whose name starts with `term`.
    pub fn metadata_search(&self, term: &str) -> HttpRequest {
        let mut query_parts = Vec::with_capacity(2);
        if !term.is_empty() {
            query_parts.push(format!("name=like={}*", term));
        }
        query_parts.push(format!("limit({})", SEARCH_LIMIT));

        let path = format!("{}?{}", DATA_POINTS_PATH, query_parts.join("&"));
        self.request(HttpMethod::Get, &path, None)
    }

    /// `query` is the already interpolated annotation query; every other
    /// field of the annotation passes through.
    pub fn annotation_query(&self, request: &AnnotationRequest, query: String) -> Result<HttpRequest> {
        let body = AnnotationBody {
            range: &request.range,
            range_raw: &request.range_raw,
            annotation: AnnotationSpec {
                query,
                ..request.annotation.clone()
            },
        };

        let body = serde_json::to_value(body)?;
        Ok(self.request(HttpMethod::Post, ANNOTATIONS_PATH, Some(body)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JsonData;
    use crate::models::NormalizedTarget;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn builder() -> RequestBuilder {
        RequestBuilder::new(&InstanceSettings::new("http://mango:8080/"))
    }

    fn range() -> TimeRange {
        TimeRange {
            from: Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
            to: Utc.with_ymd_and_hms(2024, 3, 1, 11, 30, 0).unwrap(),
            raw: None,
        }
    }

    fn target(id: &str, kind: TargetKind, hide: bool) -> NormalizedTarget {
        NormalizedTarget {
            target: id.into(),
            ref_id: "A".into(),
            hide,
            kind,
        }
    }

    #[test]
    fn test_bulk_query_filters_targets() {
        let query = NormalizedRequest {
            range: range(),
            targets: vec![
                target("DP_1", TargetKind::Timeserie, false),
                target("DP_2", TargetKind::Timeserie, true),
                target("DP_3", TargetKind::Table, false),
                target("DP_4", TargetKind::Timeserie, false),
            ],
            max_data_points: Some(1000),
        };

        let request = builder().bulk_query(&query).unwrap().unwrap();
        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(
            request.url,
            "http://mango:8080/rest/v1/point-values/multiple-points-multiple-arrays"
        );
        assert_eq!(
            request.body,
            Some(json!({
                "from": "2024-03-01T10:00:00.000Z",
                "to": "2024-03-01T11:30:00.000Z",
                "xids": ["DP_1", "DP_4"],
                "limit": 1000
            }))
        );
    }

    #[test]
    fn test_bulk_query_without_limit() {
        for max in [None, Some(0)] {
            let query = NormalizedRequest {
                range: range(),
                targets: vec![target("DP_1", TargetKind::Timeserie, false)],
                max_data_points: max,
            };
            let body = builder().bulk_query(&query).unwrap().unwrap().body.unwrap();
            assert!(body.get("limit").is_none());
        }
    }

    #[test]
    fn test_bulk_query_empty_after_filter() {
        let query = NormalizedRequest {
            range: range(),
            targets: vec![
                target("DP_1", TargetKind::Timeserie, true),
                target("DP_2", TargetKind::Table, false),
            ],
            max_data_points: None,
        };
        assert_eq!(builder().bulk_query(&query).unwrap(), None);
    }

    #[test]
    fn test_connectivity_check() {
        let request = builder().connectivity_check();
        assert_eq!(request.method, HttpMethod::Get);
        assert_eq!(request.url, "http://mango:8080/rest/v1/users/current");
        assert_eq!(request.body, None);
    }

    #[test]
    fn test_metadata_search_urls() {
        let b = builder();
        assert_eq!(
            b.metadata_search("temp").url,
            "http://mango:8080/rest/v2/data-points?name=like=temp*&limit(20)"
        );
        assert_eq!(
            b.metadata_search("").url,
            "http://mango:8080/rest/v2/data-points?limit(20)"
        );
    }

    #[test]
    fn test_annotation_body() {
        let request = AnnotationRequest {
            range: range(),
            range_raw: json!({"from": "now-6h", "to": "now"}),
            annotation: AnnotationSpec {
                name: "Alarms".into(),
                datasource: json!("Mango"),
                enable: true,
                icon_color: "rgba(255, 96, 96, 1)".into(),
                query: "$site".into(),
            },
        };

        let built = builder()
            .annotation_query(&request, "{north,south}".into())
            .unwrap();

        assert_eq!(built.url, "http://mango:8080/annotations");
        assert_eq!(
            built.body,
            Some(json!({
                "range": {
                    "from": "2024-03-01T10:00:00Z",
                    "to": "2024-03-01T11:30:00Z"
                },
                "rangeRaw": {"from": "now-6h", "to": "now"},
                "annotation": {
                    "name": "Alarms",
                    "datasource": "Mango",
                    "enable": true,
                    "iconColor": "rgba(255, 96, 96, 1)",
                    "query": "{north,south}"
                }
            }))
        );
    }

    #[test]
    fn test_headers() {
        let settings = InstanceSettings {
            with_credentials: true,
            json_data: Some(JsonData {
                use_auth_token: true,
                auth_token: Some("tok".into()),
            }),
            ..InstanceSettings::new("http://mango:8080")
        };
        let request = RequestBuilder::new(&settings).connectivity_check();

        assert!(request.with_credentials);
        assert_eq!(request.headers["Accept"], "application/json");
        assert_eq!(request.headers["Content-Type"], "application/json");
        assert_eq!(request.headers["Authorization"], "Bearer tok");

        let anonymous = builder().connectivity_check();
        assert!(!anonymous.headers.contains_key("Authorization"));
    }
}
