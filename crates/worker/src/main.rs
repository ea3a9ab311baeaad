use clap::Parser;
use serde_json::json;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stock_advisor_core::domain::market::{CapBucket, Exchange};
use stock_advisor_core::ranking::{PageRequest, RecommendationService};
use stock_advisor_core::DISCLAIMER;

#[derive(Debug, Parser)]
#[command(name = "stock_advisor_worker")]
struct Args {
    /// Universe to rank: small, mid, large or all. Unknown values rank "all".
    #[arg(long)]
    cap: Option<String>,

    /// Page size, clamped to 1..=3.
    #[arg(long)]
    n: Option<i64>,

    /// Page number, clamped to 1..=3.
    #[arg(long)]
    page: Option<i64>,

    /// Score a single ticker instead of ranking a universe.
    #[arg(long)]
    ticker: Option<String>,

    /// NSE or BSE; only used with --ticker.
    #[arg(long)]
    exchange: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = stock_advisor_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let service = match RecommendationService::from_settings(&settings) {
        Ok(service) => service,
        Err(err) => {
            sentry_anyhow::capture_anyhow(&err);
            return Err(err);
        }
    };

    let payload = match args.ticker.as_deref() {
        Some(ticker) => {
            let exchange = Exchange::parse_lenient(args.exchange.as_deref());
            let one = service.rank_one(ticker, exchange).await;
            tracing::info!(ticker = %one.ticker, found = one.recommendation.is_some(), "single-ticker run done");
            json!({
                "timestamp": rfc3339(service.now()),
                "recommendation": one.recommendation,
                "note": one.note,
            })
        }
        None => {
            let cap = CapBucket::parse_lenient(args.cap.as_deref());
            let top = service
                .top(cap, PageRequest::clamped(args.n, args.page))
                .await;
            tracing::info!(%cap, returned = top.items.len(), total_available = top.total_available, "ranking run done");
            json!({
                "timestamp": rfc3339(top.produced_at),
                "recommendations": top.items,
                "page": top.page,
                "page_size": top.page_size,
                "cap": top.cap,
                "total_available": top.total_available,
                "disclaimer": DISCLAIMER,
            })
        }
    };

    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

fn rfc3339(at: chrono::DateTime<chrono::Utc>) -> String {
    at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
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
