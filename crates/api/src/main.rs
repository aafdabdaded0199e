use anyhow::Context;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use salescast_core::dashboard::session::{DashboardSession, SessionSnapshot, UpdateOutcome};
use salescast_core::dashboard::views::DashboardView;
use salescast_core::dashboard::Dashboard;
use salescast_core::forecast::pipeline::ForecastPipeline;

const DASHBOARD_PAGE: &str = include_str!("dashboard.html");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = salescast_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    // Load-time failures are fatal.
    let state = match build_state(&settings) {
        Ok(state) => state,
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %format!("{e:#}"), "dashboard startup failed");
            return Err(e);
        }
    };

    let app = router(state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8050);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "dashboard listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn build_state(settings: &salescast_core::config::Settings) -> anyhow::Result<AppState> {
    let data = salescast_core::ingest::load_all(settings)?;
    tracing::info!(
        observations = data.series.len(),
        stores = data.stores.len(),
        warnings = data.report.warnings.len(),
        "data loaded"
    );

    let pipeline = ForecastPipeline::from_settings(settings);
    let dashboard = Dashboard::new(data.series, pipeline);
    let initial = dashboard
        .recompute(None, None)
        .context("initial forecast over the full series failed")?;
    tracing::info!(
        forecast_date = %initial.summary.date_text,
        forecasted_sales = %initial.summary.sales_text,
        "initial forecast ready"
    );

    Ok(AppState::new(dashboard, Some(initial)))
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/healthz", get(healthz))
        .route("/api/dashboard", get(recompute))
        .route("/api/dashboard/current", get(current))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

async fn index() -> Html<&'static str> {
    Html(DASHBOARD_PAGE)
}

/// Read-only dashboard plus the single interactive session.
#[derive(Debug, Clone)]
struct AppState {
    dashboard: Dashboard,
    session: Arc<DashboardSession>,
}

impl AppState {
    fn new(dashboard: Dashboard, initial: Option<DashboardView>) -> Self {
        Self {
            dashboard,
            session: Arc::new(DashboardSession::new(initial)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RangeQuery {
    start: Option<String>,
    end: Option<String>,
}

#[derive(Debug, Serialize)]
struct ApiUpdate {
    status: &'static str,
    token: u64,
    message: Option<String>,
    view: Option<Arc<DashboardView>>,
}

async fn recompute(
    State(state): State<AppState>,
    Query(range): Query<RangeQuery>,
) -> Result<Response, StatusCode> {
    let start = parse_bound(range.start.as_deref())?;
    let end = parse_bound(range.end.as_deref())?;

    let token = state.session.begin();
    let dashboard = state.dashboard.clone();
    let session = Arc::clone(&state.session);
    // Completion is recorded by the task itself, so the session settles even
    // when the client disconnects and this handler is dropped.
    let task = tokio::task::spawn_blocking(move || {
        let result = dashboard.recompute(start, end);
        session.complete(token, result)
    });
    let outcome = match task.await {
        Ok(outcome) => outcome,
        Err(e) => state.session.complete(
            token,
            Err(anyhow::Error::new(e).context("recompute task failed")),
        ),
    };

    let response = match outcome {
        UpdateOutcome::Applied(view) => (
            StatusCode::OK,
            Json(ApiUpdate {
                status: "ok",
                token: token.0,
                message: None,
                view: Some(view),
            }),
        ),
        UpdateOutcome::Failed { message, previous } => {
            tracing::warn!(
                token = token.0,
                start = ?start,
                end = ?end,
                error = %message,
                "recompute failed; keeping previous view"
            );
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ApiUpdate {
                    status: "error",
                    token: token.0,
                    message: Some(message),
                    view: previous,
                }),
            )
        }
        UpdateOutcome::Superseded { latest } => (
            StatusCode::CONFLICT,
            Json(ApiUpdate {
                status: "superseded",
                token: token.0,
                message: Some(format!("superseded by request {}", latest.0)),
                view: None,
            }),
        ),
    };

    Ok(response.into_response())
}

async fn current(State(state): State<AppState>) -> Json<SessionSnapshot> {
    Json(state.session.snapshot())
}

fn parse_bound(raw: Option<&str>) -> Result<Option<NaiveDate>, StatusCode> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => salescast_core::time::cadence::parse_iso_date(s)
            .map(Some)
            .map_err(|_| StatusCode::BAD_REQUEST),
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &salescast_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use chrono::Duration;
    use salescast_core::domain::series::{Observation, TrainingSeries};
    use salescast_core::dashboard::session::UpdateState;
    use salescast_core::forecast::additive::AdditiveEngine;
    use salescast_core::forecast::{FittedModel, ForecastEngine};
    use salescast_core::time::cadence::Frequency;
    use serde_json::Value;
    use std::sync::{mpsc, Mutex};
    use tower::ServiceExt;

    fn sample_series() -> TrainingSeries {
        let start = NaiveDate::from_ymd_opt(2022, 1, 2).unwrap();
        TrainingSeries::from_observations((0..100).map(|i| Observation {
            date: start + Duration::weeks(i),
            value: 10_000.0 + 25.0 * i as f64 + ((i % 6) as f64) * 150.0,
        }))
    }

    fn test_state() -> AppState {
        let pipeline =
            ForecastPipeline::new(Arc::new(AdditiveEngine::default()), 10, Frequency::Weekly);
        let dashboard = Dashboard::new(sample_series(), pipeline);
        let initial = dashboard.recompute(None, None).unwrap();
        AppState::new(dashboard, Some(initial))
    }

    /// Blocks each fit until the test sends on the paired channel.
    struct GatedEngine {
        inner: AdditiveEngine,
        gate: Mutex<mpsc::Receiver<()>>,
    }

    impl ForecastEngine for GatedEngine {
        fn name(&self) -> &'static str {
            "gated"
        }

        fn fit(&self, series: &TrainingSeries) -> anyhow::Result<Box<dyn FittedModel>> {
            self.gate.lock().unwrap().recv()?;
            self.inner.fit(series)
        }
    }

    fn gated_state() -> (AppState, mpsc::Sender<()>) {
        let (release, gate) = mpsc::channel();
        let engine = GatedEngine {
            inner: AdditiveEngine::default(),
            gate: Mutex::new(gate),
        };
        let pipeline = ForecastPipeline::new(Arc::new(engine), 10, Frequency::Weekly);
        let dashboard = Dashboard::new(sample_series(), pipeline);
        (AppState::new(dashboard, None), release)
    }

    async fn wait_until(state: &AppState, pred: impl Fn(&UpdateState) -> bool) {
        for _ in 0..2_000 {
            if pred(&state.session.snapshot().state) {
                return;
            }
            tokio::task::yield_now().await;
            std::thread::sleep(std::time::Duration::from_millis(2));
        }
        panic!("session stuck in {:?}", state.session.snapshot().state);
    }

    async fn fetch(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
        let res = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = res.status();
        let body = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body.to_vec())
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let (status, body) = fetch(app, uri).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn healthz_is_ok() {
        let (status, body) = fetch(router(test_state()), "/healthz").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"ok");
    }

    #[tokio::test]
    async fn index_serves_dashboard_page() {
        let (status, body) = fetch(router(test_state()), "/").await;
        assert_eq!(status, StatusCode::OK);
        let html = String::from_utf8(body).unwrap();
        assert!(html.contains("Weekly Sales Forecast Dashboard"));
        assert!(html.contains("/api/dashboard"));
    }

    #[tokio::test]
    async fn recompute_returns_view_for_valid_range() {
        let (status, v) = get_json(
            router(test_state()),
            "/api/dashboard?start=2022-06-01&end=2023-06-01",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(v["status"], "ok");
        assert_eq!(v["token"], 1);
        assert_eq!(v["view"]["training_start"], "2022-06-05");
        assert_eq!(
            v["view"]["charts"]["yearly_seasonality"]["series"][0]["x"]
                .as_array()
                .unwrap()
                .len(),
            12
        );
    }

    #[tokio::test]
    async fn empty_bounds_mean_full_range() {
        let (status, v) = get_json(router(test_state()), "/api/dashboard?start=&end=").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(v["view"]["training_start"], "2022-01-02");
    }

    #[tokio::test]
    async fn fit_failure_keeps_previous_view() {
        let state = test_state();
        let (status, v) = get_json(
            router(state.clone()),
            "/api/dashboard?start=2023-06-01&end=2022-06-01",
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(v["status"], "error");
        assert!(v["message"].as_str().unwrap().contains("window"));
        assert_eq!(v["view"]["training_start"], "2022-01-02");

        let (status, snap) = get_json(router(state), "/api/dashboard/current").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(snap["state"], "error");
        assert_eq!(snap["view"]["training_start"], "2022-01-02");
    }

    #[tokio::test]
    async fn malformed_date_is_bad_request() {
        let (status, _) = fetch(
            router(test_state()),
            "/api/dashboard?start=06/01/2022",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn current_starts_idle_with_initial_view() {
        let (status, snap) = get_json(router(test_state()), "/api/dashboard/current").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(snap["state"], "idle");
        assert_eq!(snap["latest_token"], 0);
        assert!(snap["view"]["summary"]["sales_text"]
            .as_str()
            .unwrap()
            .starts_with('$'));
    }

    #[tokio::test]
    async fn superseded_request_returns_conflict() {
        let (state, release) = gated_state();
        let request = tokio::spawn(fetch(router(state.clone()), "/api/dashboard"));
        wait_until(&state, |s| matches!(s, UpdateState::Recomputing { token: 1 })).await;

        let newer = state.session.begin();
        release.send(()).unwrap();

        let (status, body) = request.await.unwrap();
        assert_eq!(status, StatusCode::CONFLICT);
        let v: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(v["status"], "superseded");
        assert_eq!(v["token"], 1);
        assert!(v["view"].is_null());

        let snap = state.session.snapshot();
        assert_eq!(snap.latest_token, newer.0);
        assert!(snap.view.is_none());
    }

    #[tokio::test]
    async fn dropped_request_still_settles_session() {
        let (state, release) = gated_state();
        let request = tokio::spawn(fetch(router(state.clone()), "/api/dashboard"));
        wait_until(&state, |s| matches!(s, UpdateState::Recomputing { .. })).await;

        request.abort();
        assert!(request.await.unwrap_err().is_cancelled());
        release.send(()).unwrap();

        wait_until(&state, |s| *s == UpdateState::Idle).await;
        assert!(state.session.current().is_some());
    }
}
