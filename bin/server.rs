// EcomInsight - Web Server
// Dashboard page plus the JSON API behind it

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use clap::Parser;
use ecominsight::{
    charts::{self, Bounds, ScatterChart},
    metrics, DashboardError, InsightCache, InsightTable, PredictionClient, PredictionReport,
    PredictionRequest, SegmentShare, Settings, SummaryMetrics, CHURN_RATE_DELTA,
    DATA_MISSING_MESSAGE,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "ecominsight-server")]
#[command(about = "EcomInsight web dashboard")]
#[command(version)]
struct Args {
    /// Server bind address
    #[arg(long, env = "ECOMINSIGHT_BIND", default_value = "127.0.0.1:8501")]
    bind: SocketAddr,

    #[command(flatten)]
    settings: Settings,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Shared application state
#[derive(Clone)]
struct AppState {
    insights: Arc<InsightCache>,
    predictor: Arc<PredictionClient>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Failures mapped onto HTTP statuses
struct ApiError(DashboardError);

impl From<DashboardError> for ApiError {
    fn from(err: DashboardError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            DashboardError::DataFileMissing { .. } => {
                (StatusCode::SERVICE_UNAVAILABLE, DATA_MISSING_MESSAGE.to_string())
            }
            DashboardError::InvalidInput { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, self.0.to_string())
            }
            DashboardError::Prediction(_) => (StatusCode::BAD_GATEWAY, self.0.to_string()),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, self.0.to_string()),
        };

        if status.is_server_error() {
            error!(%status, error = %self.0, "request failed");
        }

        (status, Json(ApiResponse::<()>::err(message))).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<ApiResponse<T>>, ApiError>;

#[derive(Serialize)]
struct Tile {
    label: &'static str,
    value: String,
}

#[derive(Serialize)]
struct MetricsResponse {
    summary: SummaryMetrics,
    tiles: Vec<Tile>,
    churn_rate_delta: &'static str,
    skipped_rows: usize,
}

#[derive(Serialize)]
struct ScatterResponse {
    #[serde(flatten)]
    chart: ScatterChart,
    bounds: Bounds,
}

#[derive(Serialize)]
struct MetricRow {
    metric: &'static str,
    value: String,
}

/// Result panel contents for one prediction
#[derive(Serialize)]
struct PredictionResponseBody {
    risk_score: f64,
    score_label: String,
    will_churn: bool,
    headline: &'static str,
    confidence: &'static str,
    business_metrics: Vec<MetricRow>,
    decision: String,
}

impl From<PredictionReport> for PredictionResponseBody {
    fn from(report: PredictionReport) -> Self {
        Self {
            risk_score: report.risk_score,
            score_label: report.score_label(),
            will_churn: report.will_churn,
            headline: report.headline(),
            confidence: report.advice.confidence.as_str(),
            business_metrics: report
                .business_metrics()
                .into_iter()
                .map(|(metric, value)| MetricRow { metric, value })
                .collect(),
            decision: report.decision(),
        }
    }
}

impl AppState {
    /// The first load reads the whole CSV, so it runs off the async workers
    async fn table(&self) -> std::result::Result<Arc<InsightTable>, ApiError> {
        let insights = Arc::clone(&self.insights);
        tokio::task::spawn_blocking(move || insights.get())
            .await
            .map_err(|err| ApiError(DashboardError::Io(std::io::Error::other(err))))?
            .map_err(ApiError::from)
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/metrics - Headline metric tiles
async fn get_metrics(State(state): State<AppState>) -> ApiResult<MetricsResponse> {
    let table = state.table().await?;
    let summary = SummaryMetrics::from_table(&table);
    let tiles = summary
        .tiles()
        .into_iter()
        .map(|(label, value)| Tile { label, value })
        .collect();

    Ok(Json(ApiResponse::ok(MetricsResponse {
        summary,
        tiles,
        churn_rate_delta: CHURN_RATE_DELTA,
        skipped_rows: table.skipped_rows,
    })))
}

/// GET /api/segments - Segment shares, largest first
async fn get_segments(State(state): State<AppState>) -> ApiResult<Vec<SegmentShare>> {
    let table = state.table().await?;
    Ok(Json(ApiResponse::ok(charts::segment_shares(&table))))
}

/// GET /api/scatter - Revenue vs. tenure series per segment
async fn get_scatter(State(state): State<AppState>) -> ApiResult<ScatterResponse> {
    let table = state.table().await?;
    let chart = charts::scatter_chart(&table);
    let bounds = chart.bounds();
    Ok(Json(ApiResponse::ok(ScatterResponse { chart, bounds })))
}

/// POST /api/predict - Forward a profile to the churn service
async fn predict(
    State(state): State<AppState>,
    Json(request): Json<PredictionRequest>,
) -> ApiResult<PredictionResponseBody> {
    request.validate()?;

    let response = state.predictor.predict(&request).await?;
    let report = PredictionReport::new(&request, &response);

    info!(
        score = %metrics::format_percent(report.risk_score),
        will_churn = report.will_churn,
        "prediction served"
    );

    Ok(Json(ApiResponse::ok(report.into())))
}

/// GET / - Serve the dashboard page
async fn serve_index() -> impl IntoResponse {
    let footer = ecominsight::footer_caption().replace('&', "&amp;");
    Html(include_str!("../web/index.html").replace("{{FOOTER}}", &footer))
}

fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(get_metrics))
        .route("/segments", get(get_segments))
        .route("/scatter", get(get_scatter))
        .route("/predict", post(predict))
        .with_state(state);

    Router::new()
        .route("/", get(serve_index))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("ecominsight=debug,ecominsight_server=debug,tower_http=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ecominsight=info,warn"))
    };
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    info!("Starting EcomInsight server v{}", ecominsight::VERSION);

    let insights = Arc::new(InsightCache::new(&args.settings.data_path));
    // Warm the cache; a missing file is reported per request until it appears
    if let Err(err) = insights.get() {
        error!(%err, "insights not available at startup");
    }

    let state = AppState {
        insights,
        predictor: Arc::new(PredictionClient::new(&args.settings)?),
    };

    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", args.bind))?;

    info!("Dashboard: http://{}", args.bind);
    info!("Prediction service: {}", args.settings.predict_endpoint());

    axum::serve(listener, build_router(state))
        .await
        .context("Server terminated")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use mockito::Server;
    use serde_json::{json, Value};
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;
    use tower::ServiceExt;

    fn insights_csv() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "tenure,monetary,frequency,segment_name,is_churned").unwrap();
        writeln!(file, "100,200.0,4,Champions,0").unwrap();
        writeln!(file, "20,50.0,1,At Risk,1").unwrap();
        file
    }

    fn state_for(data: &std::path::Path, predict_url: &str) -> AppState {
        AppState {
            insights: Arc::new(InsightCache::new(data)),
            predictor: Arc::new(
                PredictionClient::with_endpoint(
                    format!("{}/predict/churn", predict_url),
                    Some(Duration::from_secs(5)),
                )
                .unwrap(),
            ),
        }
    }

    async fn call(router: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn call_text(router: Router, request: Request<Body>) -> (StatusCode, String) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let csv = insights_csv();
        let router = build_router(state_for(csv.path(), "http://127.0.0.1:1"));

        let (status, body) = call(router, get("/api/metrics")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["summary"]["total_customers"], 2);
        assert_eq!(body["data"]["tiles"][1]["value"], "$125.00");
        assert_eq!(body["data"]["tiles"][2]["value"], "50.0%");
        assert_eq!(body["data"]["churn_rate_delta"], "-1.2%");
    }

    #[tokio::test]
    async fn test_missing_data_file_returns_503() {
        let dir = tempfile::tempdir().unwrap();
        let router = build_router(state_for(&dir.path().join("missing.csv"), "http://127.0.0.1:1"));

        let (status, body) = call(router, get("/api/segments")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], DATA_MISSING_MESSAGE);
    }

    #[tokio::test]
    async fn test_data_file_picked_up_once_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("insights.csv");
        let router = build_router(state_for(&path, "http://127.0.0.1:1"));

        let (status, _) = call(router.clone(), get("/api/metrics")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        std::fs::write(&path, "tenure,monetary,frequency,segment_name,is_churned\n5,40.0,1,New,0\n")
            .unwrap();
        let (status, body) = call(router, get("/api/metrics")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["summary"]["total_customers"], 1);
    }

    #[tokio::test]
    async fn test_index_page_footer() {
        let csv = insights_csv();
        let router = build_router(state_for(csv.path(), "http://127.0.0.1:1"));

        let (status, page) = call_text(router, get("/")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(!page.contains("{{FOOTER}}"));
        assert!(page.contains(&format!("EcomInsight AI Platform v{}", ecominsight::VERSION)));
        assert!(page.contains("Explainable AI &amp; Business Intelligence Architecture | 2025"));
    }

    #[tokio::test]
    async fn test_scatter_endpoint() {
        let csv = insights_csv();
        let router = build_router(state_for(csv.path(), "http://127.0.0.1:1"));

        let (status, body) = call(router, get("/api/scatter")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["x_label"], "Days as Customer");
        assert_eq!(body["data"]["series"].as_array().unwrap().len(), 2);
        assert_eq!(body["data"]["bounds"]["x"], json!([20.0, 100.0]));
    }

    #[tokio::test]
    async fn test_predict_proxies_to_service() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/predict/churn")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"churn_risk_score": 0.9, "will_churn": true}"#)
            .create_async()
            .await;

        let csv = insights_csv();
        let router = build_router(state_for(csv.path(), &server.url()));

        let payload = json!({
            "frequency": 10, "monetary": 100.0, "tenure": 30,
            "return_rate": 0.2, "avg_discount": 0.1, "avg_quantity": 1
        });
        let (status, body) = call(router, post_json("/api/predict", payload)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["headline"], "HIGH CHURN RISK");
        assert_eq!(body["data"]["confidence"], "High");
        assert_eq!(body["data"]["business_metrics"][0]["value"], "$90.00");
        assert_eq!(body["data"]["business_metrics"][1]["value"], "Critical (1-7 Days)");
    }

    #[tokio::test]
    async fn test_predict_service_down_returns_502() {
        let csv = insights_csv();
        let router = build_router(state_for(csv.path(), "http://127.0.0.1:1"));

        let payload = serde_json::to_value(PredictionRequest::default()).unwrap();
        let (status, body) = call(router, post_json("/api/predict", payload)).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["error"].as_str().unwrap().starts_with("API Connection Error:"));
    }

    #[tokio::test]
    async fn test_predict_rejects_out_of_range_input() {
        let csv = insights_csv();
        let router = build_router(state_for(csv.path(), "http://127.0.0.1:1"));

        let payload = json!({
            "frequency": 5, "monetary": 250.0, "tenure": 120,
            "return_rate": 2.0, "avg_discount": 0.1, "avg_quantity": 2
        });
        let (status, body) = call(router, post_json("/api/predict", payload)).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().contains("return_rate"));
    }
}
