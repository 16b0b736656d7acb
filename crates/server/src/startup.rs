use std::{env, net::SocketAddr, sync::Arc};

use axum::Router;
use configs::AppConfig;
use dotenvy::dotenv;
use service::delivery_service::repo::SeaOrmDeliveryServiceRepository;
use service::DeliveryServiceRepository;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::auth::ServerState;
use crate::errors::StartupError;
use crate::routes;

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// Load config.toml; without one, fall back to env vars and built-in defaults.
pub fn load_config() -> AppConfig {
    match AppConfig::load_and_validate() {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!(error = %e, "config file unusable, using environment and defaults");
            let mut cfg = AppConfig::default();
            if let Ok(host) = env::var("SERVER_HOST") {
                cfg.server.host = host;
            }
            if let Some(port) = env::var("SERVER_PORT").ok().and_then(|p| p.parse::<u16>().ok()) {
                cfg.server.port = port;
            }
            cfg.database = configs::DatabaseConfig::from_env();
            cfg.auth.normalize_from_env();
            cfg
        }
    }
}

fn bind_addr(cfg: &AppConfig) -> Result<SocketAddr, StartupError> {
    format!("{}:{}", cfg.server.host, cfg.server.port)
        .parse()
        .map_err(|e| StartupError::InvalidConfig(format!("server address: {e}")))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl+C");
    }
}

/// Public entry: build the app and run the HTTP server
pub async fn run() -> anyhow::Result<()> {
    dotenv().ok();
    let cfg = load_config();
    common::utils::logging::init_logging(&cfg.logging.format);

    cfg.database
        .validate()
        .map_err(|e| StartupError::InvalidConfig(e.to_string()))?;
    if cfg.auth.jwt_secret.trim().is_empty() {
        return Err(StartupError::InvalidConfig("auth.jwt_secret is empty; set it in config.toml or JWT_SECRET".into()).into());
    }

    // DB connection
    let db = models::db::connect_with_config(&cfg.database).await?;
    let repo: Arc<dyn DeliveryServiceRepository> = Arc::new(SeaOrmDeliveryServiceRepository::new(db));

    let addr = bind_addr(&cfg)?;
    let state = ServerState::new(repo, cfg.rules, cfg.auth.jwt_secret);
    let app: Router = routes::build_router(state, build_cors());

    info!(%addr, "starting delivery service api");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server stopped");
    Ok(())
}
