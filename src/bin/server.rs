use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fractalfield::api;
use fractalfield::config::ServerConfig;
use fractalfield::policy::Engine;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fractalfield=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = match ServerConfig::from_env() {
        Ok(cfg) => cfg,
        Err(err) => {
            error!("{err}");
            std::process::exit(1);
        }
    };

    let engine = Arc::new(Engine::new(cfg.limits.clone()));
    let app = api::app(engine, &cfg.static_dir);

    let listener = match tokio::net::TcpListener::bind(cfg.bind).await {
        Ok(listener) => listener,
        Err(err) => {
            error!("Failed to bind {}: {err}", cfg.bind);
            std::process::exit(1);
        }
    };

    info!("fractalfield server at http://{}", cfg.bind);
    info!("Serving static files from: {}", cfg.static_dir.display());

    if let Err(err) = axum::serve(listener, app).await {
        error!("Server error: {err}");
    }
}
