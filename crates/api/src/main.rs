use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stock_advisor_core::domain::market::{CapBucket, Exchange};
use stock_advisor_core::domain::recommendation::Recommendation;
use stock_advisor_core::ranking::{PageRequest, RecommendationService};
use stock_advisor_core::DISCLAIMER;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = stock_advisor_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let service = match RecommendationService::from_settings(&settings) {
        Ok(service) => Arc::new(service),
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "failed to build recommendation service");
            return Err(e);
        }
    };

    let app = router(AppState { service });

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/recommendations/top", get(top_recommendations))
        .route("/recommendations/one", get(one_recommendation))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

#[derive(Clone)]
struct AppState {
    service: Arc<RecommendationService>,
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    time: String,
}

async fn health() -> Json<Health> {
    Json(Health {
        status: "ok",
        time: rfc3339(Utc::now()),
    })
}

/// Every field is a raw string so malformed values fall back instead of
/// rejecting the request.
#[derive(Debug, Default, Deserialize)]
struct TopQuery {
    n: Option<String>,
    page: Option<String>,
    cap: Option<String>,
}

impl TopQuery {
    fn page_request(&self) -> PageRequest {
        PageRequest::clamped(lenient_int(self.n.as_deref()), lenient_int(self.page.as_deref()))
    }

    fn cap(&self) -> CapBucket {
        CapBucket::parse_lenient(self.cap.as_deref())
    }
}

#[derive(Debug, Serialize)]
struct TopResponse {
    timestamp: String,
    recommendations: Vec<Recommendation>,
    page: usize,
    page_size: usize,
    cap: CapBucket,
    total_available: usize,
    disclaimer: &'static str,
}

async fn top_recommendations(
    State(state): State<AppState>,
    Query(q): Query<TopQuery>,
) -> Json<TopResponse> {
    let cap = q.cap();
    let page = q.page_request();
    let top = state.service.top(cap, page).await;
    tracing::info!(%cap, page = top.page, page_size = top.page_size, returned = top.items.len(), "top recommendations");

    Json(TopResponse {
        timestamp: rfc3339(top.produced_at),
        recommendations: top.items,
        page: top.page,
        page_size: top.page_size,
        cap: top.cap,
        total_available: top.total_available,
        disclaimer: DISCLAIMER,
    })
}

#[derive(Debug, Default, Deserialize)]
struct OneQuery {
    ticker: Option<String>,
    exchange: Option<String>,
}

#[derive(Debug, Serialize)]
struct OneResponse {
    timestamp: String,
    recommendation: Option<Recommendation>,
    note: Option<String>,
}

async fn one_recommendation(
    State(state): State<AppState>,
    Query(q): Query<OneQuery>,
) -> Json<OneResponse> {
    let exchange = Exchange::parse_lenient(q.exchange.as_deref());
    let ticker = q.ticker.as_deref().unwrap_or("");
    let one = state.service.rank_one(ticker, exchange).await;

    Json(OneResponse {
        timestamp: rfc3339(state.service.now()),
        recommendation: one.recommendation,
        note: one.note,
    })
}

fn lenient_int(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
}

fn rfc3339(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(
    settings: &stock_advisor_core::config::Settings,
) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
