use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::config::InstanceSettings;
use crate::error::Result;
use crate::metrics::{self, Operation, RequestTimer};
use crate::models::{AnnotationRequest, MetadataEntry, QueryRequest, QueryResponse, TestResult};
use crate::normalize::normalize;
use crate::request::RequestBuilder;
use crate::response;
use crate::template::{Interpolator, VariableFormat};
use crate::transport::Transport;

/// Datasource for a Mango REST endpoint. Every call is independent: the
/// instance only keeps the configuration it was built with.
#[derive(Clone)]
pub struct MangoDatasource {
    name: String,
    builder: RequestBuilder,
    transport: Arc<dyn Transport>,
    templates: Arc<dyn Interpolator>,
}

impl MangoDatasource {
    pub fn new(
        settings: &InstanceSettings,
        transport: Arc<dyn Transport>,
        templates: Arc<dyn Interpolator>,
    ) -> Self {
        Self {
            name: settings.name.clone(),
            builder: RequestBuilder::new(settings),
            transport,
            templates,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self, request), fields(datasource = %self.name, targets = request.targets.len()))]
    pub async fn query(&self, request: &QueryRequest) -> Result<QueryResponse> {
        let timer = RequestTimer::new(Operation::Query);

        let normalized = normalize(request, self.templates.as_ref());
        let Some(http) = self.builder.bulk_query(&normalized)? else {
            debug!("No visible timeserie targets, skipping remote call");
            metrics::record_empty_query();
            return Ok(QueryResponse::default());
        };

        let raw = self.transport.execute(http).await.map_err(|e| {
            timer.failed();
            e
        })?;

        let shaped = response::shape_point_values(raw).map_err(|e| {
            timer.failed();
            e
        })?;
        debug!(series = shaped.data.len(), "Shaped point values");
        Ok(shaped)
    }

    /// Never fails: transport and decoding errors become an error result.
    #[instrument(skip(self), fields(datasource = %self.name))]
    pub async fn test_connection(&self) -> TestResult {
        let timer = RequestTimer::new(Operation::TestConnection);

        let outcome = match self.transport.execute(self.builder.connectivity_check()).await {
            Ok(raw) => response::shape_current_user(raw),
            Err(e) => Err(e.into()),
        };

        match outcome {
            Ok(result) => {
                info!("{}", result.message);
                result
            }
            Err(e) => {
                timer.failed();
                warn!(error = %e, "Connection test failed");
                TestResult::failure(e.to_string())
            }
        }
    }

    /// Lists data points whose name starts with `search`. Variables in the
    /// term are resolved in regex mode, so escaped characters such as `\.`
    /// end up verbatim inside the RQL `like` clause.
    #[instrument(skip(self), fields(datasource = %self.name))]
    pub async fn find_metric_options(&self, search: &str) -> Result<Vec<MetadataEntry>> {
        let timer = RequestTimer::new(Operation::MetricSearch);

        let term = self.templates.replace(search, None, VariableFormat::Regex);
        let http = self.builder.metadata_search(&term);

        let result = match self.transport.execute(http).await {
            Ok(raw) => response::shape_data_points(raw),
            Err(e) => Err(e.into()),
        };
        if result.is_err() {
            timer.failed();
        }
        result
    }

    #[instrument(skip(self, request), fields(datasource = %self.name, annotation = %request.annotation.name))]
    pub async fn annotation_query(&self, request: &AnnotationRequest) -> Result<Value> {
        let timer = RequestTimer::new(Operation::Annotations);

        let query = self
            .templates
            .replace(&request.annotation.query, None, VariableFormat::Glob);
        let http = self.builder.annotation_query(request, query)?;

        let raw = self.transport.execute(http).await.map_err(|e| {
            timer.failed();
            e
        })?;
        Ok(response::shape_annotations(raw))
    }
}
