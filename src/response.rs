use serde::Deserialize;
use serde_json::Value;

use crate::error::{DatasourceError, Result};
use crate::models::{Datapoint, MetadataEntry, QueryResponse, SeriesResult, TestResult};

#[derive(Debug, Deserialize)]
struct PointValue {
    value: Value,
    timestamp: i64,
}

#[derive(Debug, Deserialize)]
struct CurrentUser {
    username: String,
}

#[derive(Debug, Deserialize)]
struct DataPointItem {
    name: String,
    xid: String,
}

#[derive(Debug, Deserialize)]
struct DataPointPage {
    items: Vec<DataPointItem>,
}

/// One series per key of the point-values response, in response order.
///
/// Keys are not checked against the xids that were asked for: anything the
/// service returns is passed on to the host.
pub fn shape_point_values(raw: Value) -> Result<QueryResponse> {
    let Value::Object(series) = raw else {
        return Err(DatasourceError::Decode(
            "point values response is not an object".to_string(),
        ));
    };

    let data = series
        .into_iter()
        .map(|(xid, values)| -> Result<SeriesResult> {
            let values: Vec<PointValue> = serde_json::from_value(values)?;
            Ok(SeriesResult {
                target: xid,
                datapoints: values
                    .into_iter()
                    .map(|pv| Datapoint(pv.value, pv.timestamp))
                    .collect(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(QueryResponse { data })
}

pub fn shape_current_user(raw: Value) -> Result<TestResult> {
    let user: CurrentUser = serde_json::from_value(raw)?;
    Ok(TestResult::success(&user.username))
}

pub fn shape_data_points(raw: Value) -> Result<Vec<MetadataEntry>> {
    let page: DataPointPage = serde_json::from_value(raw)?;
    Ok(page
        .items
        .into_iter()
        .map(|item| MetadataEntry {
            label: item.name,
            value: item.xid,
        })
        .collect())
}

pub fn shape_annotations(raw: Value) -> Value {
    raw
}
