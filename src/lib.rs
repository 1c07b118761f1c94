pub mod catalog;
pub mod config;
pub mod enrichment;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod preferences;
pub mod render;
pub mod server;
pub mod session;
pub mod store;
pub mod utils;
pub mod weather;

use std::sync::Arc;

use anyhow::Context;
use tokio::{
    net::TcpListener,
    signal::{self, ctrl_c},
};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use config::AppConfig;
use enrichment::{DisabledSource, EnrichmentSource, FoodFactsSource};
use preferences::Preferences;
use server::AppState;
use session::{Session, SystemClock};
use store::Store;
use weather::NwsWeather;

const DEFAULT_LOG_FILTER: &str = "campus_life=info,campus_life_lib=info";

pub async fn run() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    fmt().with_env_filter(filter).init();

    let config = AppConfig::load().context("loading config")?;
    let tz = config.timezone()?;
    let addr = config.socket_addr()?;

    let db_path = config.database_path();
    let store = Store::open(&db_path).with_context(|| format!("opening {db_path:?}"))?;
    info!("preferences stored in {:?}", db_path);

    let enrichment: Arc<dyn EnrichmentSource> = if config.enrichment_enabled {
        Arc::new(
            FoodFactsSource::new(
                &config.food_facts_endpoint,
                &config.user_agent,
                config.http_timeout(),
            )
            .context("building food facts client")?,
        )
    } else {
        warn!("nutrition enrichment disabled; menu items show fallback values");
        Arc::new(DisabledSource)
    };
    let weather = NwsWeather::new(
        &config.weather_endpoint,
        &config.user_agent,
        config.http_timeout(),
    )
    .context("building weather client")?;

    let session = Session::new(
        Preferences::new(store),
        enrichment,
        Arc::new(weather),
        Arc::new(SystemClock::new(tz)),
    );
    let app = server::router(Arc::new(AppState { session, config }));

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving")?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = ctrl_c().await {
            warn!("failed to install Ctrl+C handler: {err}");
            std::future::pending::<()>().await;
        }
        info!("received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("received terminate signal, shutting down");
            }
            Err(err) => {
                warn!("failed to install terminate handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
