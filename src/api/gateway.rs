use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::{
    config::ServerConfig,
    datasource::MangoDatasource,
    metrics,
    models::{
        AnnotationRequest, MetadataEntry, QueryRequest, QueryResponse, SearchRequest, TestResult,
        TestStatus,
    },
    template::TemplateSrv,
    transport::ReqwestTransport,
    DatasourceError, Result,
};

#[derive(Clone)]
pub struct GatewayState {
    pub datasource: Arc<MangoDatasource>,
}

pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/", get(test_connection))
        .route("/query", post(query))
        .route("/search", post(search))
        .route("/annotations", post(annotations))
        .route("/metrics", get(prometheus_metrics))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn test_connection(State(state): State<GatewayState>) -> (StatusCode, Json<TestResult>) {
    let result = state.datasource.test_connection().await;
    let status = match result.status {
        TestStatus::Success => StatusCode::OK,
        TestStatus::Error => StatusCode::BAD_GATEWAY,
    };
    (status, Json(result))
}

async fn query(
    State(state): State<GatewayState>,
    request: std::result::Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>> {
    let Json(request) = request?;
    info!("Query with {} target(s)", request.targets.len());
    let response = state.datasource.query(&request).await?;
    Ok(Json(response))
}

async fn search(
    State(state): State<GatewayState>,
    request: std::result::Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<Vec<MetadataEntry>>> {
    let Json(request) = request?;
    let options = state.datasource.find_metric_options(&request.target).await?;
    Ok(Json(options))
}

async fn annotations(
    State(state): State<GatewayState>,
    request: std::result::Result<Json<AnnotationRequest>, JsonRejection>,
) -> Result<Json<Value>> {
    let Json(request) = request?;
    let events = state.datasource.annotation_query(&request).await?;
    Ok(Json(events))
}

async fn prometheus_metrics() -> Result<impl IntoResponse> {
    let body = metrics::gather()?;
    Ok(([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body))
}

/// Builds the datasource described by `config` and serves it until the
/// listener fails.
pub async fn start_gateway(config: ServerConfig) -> Result<()> {
    let transport = ReqwestTransport::new(config.request_timeout)?;
    let datasource = MangoDatasource::new(
        &config.instance,
        Arc::new(transport),
        Arc::new(TemplateSrv::new()),
    );

    let state = GatewayState {
        datasource: Arc::new(datasource),
    };
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!(
        "Serving datasource {} for {} on {}",
        config.instance.name,
        config.instance.base_url(),
        addr
    );

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| DatasourceError::Internal(format!("Failed to bind to address: {}", e)))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| DatasourceError::Internal(format!("Server error: {}", e)))?;

    Ok(())
}
