use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec_with_registry, register_int_counter_vec_with_registry,
    register_int_counter_with_registry, Encoder, HistogramTimer, HistogramVec, IntCounter,
    IntCounterVec, Registry, TextEncoder,
};

use crate::error::{DatasourceError, Result};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    pub static ref REQUEST_COUNTER: IntCounterVec = register_int_counter_vec_with_registry!(
        "datasource_requests_total",
        "Total number of datasource operations by kind",
        &["operation"],
        REGISTRY
    ).unwrap();

    pub static ref REQUEST_FAILURES: IntCounterVec = register_int_counter_vec_with_registry!(
        "datasource_request_failures_total",
        "Total number of failed datasource operations by kind",
        &["operation"],
        REGISTRY
    ).unwrap();

    pub static ref REQUEST_DURATION: HistogramVec = register_histogram_vec_with_registry!(
        "datasource_request_duration_seconds",
        "Duration of datasource operations in seconds",
        &["operation"],
        vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0],
        REGISTRY
    ).unwrap();

    pub static ref EMPTY_QUERIES: IntCounter = register_int_counter_with_registry!(
        "datasource_empty_queries_total",
        "Queries answered without a remote call because no target was left",
        REGISTRY
    ).unwrap();
}

/// Datasource entry point, used as the metrics label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Query,
    TestConnection,
    MetricSearch,
    Annotations,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Query => "query",
            Operation::TestConnection => "test_connection",
            Operation::MetricSearch => "metric_search",
            Operation::Annotations => "annotations",
        }
    }
}

/// Counts the operation on creation and records its duration when dropped.
pub struct RequestTimer {
    operation: Operation,
    timer: Option<HistogramTimer>,
}

impl RequestTimer {
    pub fn new(operation: Operation) -> Self {
        REQUEST_COUNTER.with_label_values(&[operation.as_str()]).inc();
        Self {
            operation,
            timer: Some(
                REQUEST_DURATION
                    .with_label_values(&[operation.as_str()])
                    .start_timer(),
            ),
        }
    }

    pub fn failed(&self) {
        REQUEST_FAILURES
            .with_label_values(&[self.operation.as_str()])
            .inc();
    }
}

impl Drop for RequestTimer {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.observe_duration();
        }
    }
}

pub fn record_empty_query() {
    EMPTY_QUERIES.inc();
}

/// Renders every registered metric in the prometheus text format.
pub fn gather() -> Result<String> {
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&REGISTRY.gather(), &mut buffer)
        .map_err(|e| DatasourceError::Internal(format!("Failed to encode metrics: {}", e)))?;

    String::from_utf8(buffer)
        .map_err(|e| DatasourceError::Internal(format!("Metrics are not valid UTF-8: {}", e)))
}
