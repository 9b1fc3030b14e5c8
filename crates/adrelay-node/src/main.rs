//! # Adrelay Node
//!
//! HTTP node exposing direct campaign provisioning and the conversational
//! dispatch endpoint.

use std::net::SocketAddr;

use axum::{
    routing::{get, post},
    Router,
};
use clap::Parser;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

mod api;
mod config;
mod state;

use config::AppConfig;
use state::AppState;

#[derive(Parser, Debug)]
#[command(name = "adrelay-node")]
#[command(about = "Multi-platform ad campaign provisioning node")]
#[command(version)]
struct Cli {
    /// Bind address (overrides config)
    #[arg(long, env = "ADRELAY__API__HOST")]
    host: Option<String>,

    /// HTTP port (overrides config)
    #[arg(long, env = "ADRELAY__API__PORT")]
    port: Option<u16>,
}

/// Run the node until the listener fails.
pub async fn run_server(config: AppConfig) -> anyhow::Result<()> {
    info!("🚀 Adrelay node starting...");

    let state = AppState::from_config(&config)?;
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.api.host, config.api.port).parse()?;
    info!("🌐 Listening on http://{}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the API router.
fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(api::health::health_check))
        .route("/api/v1/capabilities", get(api::capabilities::list_capabilities))
        .route("/api/v1/campaigns/:platform", post(api::campaigns::create_campaign))
        .route("/api/v1/chat", post(api::chat::chat))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "adrelay=info,tower_http=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });
    if let Some(host) = cli.host {
        config.api.host = host;
    }
    if let Some(port) = cli.port {
        config.api.port = port;
    }

    info!(
        host = %config.api.host,
        port = config.api.port,
        step_timeout_secs = config.http.timeout_secs,
        "Configuration loaded"
    );

    run_server(config).await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use adrelay_core::Platform;
    use adrelay_pipeline::Pipeline;
    use axum_test::TestServer;
    use serde_json::Value;

    use super::*;
    use crate::api::testing::StubAdapter;

    fn server() -> TestServer {
        let pipelines = Platform::ALL
            .into_iter()
            .map(|p| Arc::new(Pipeline::new(StubAdapter::new(p, None))))
            .collect();
        TestServer::new(create_router(AppState::new(pipelines, None, 5))).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = server().get("/health").await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["platforms"].as_array().unwrap().len(), 3);
        assert_eq!(body["chat"], false);
    }

    #[tokio::test]
    async fn test_capabilities_listing() {
        let response = server().get("/api/v1/capabilities").await;
        response.assert_status_ok();
        let body: Value = response.json();
        let names: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["name"].as_str().unwrap())
            .collect();
        assert_eq!(
            names,
            vec![
                "list_connected_platforms",
                "create_search_ads_campaign",
                "create_video_ads_campaign",
                "create_social_ads_campaign",
            ]
        );
        assert_eq!(body[2]["inputSchema"]["additionalProperties"], false);
    }

    #[test]
    fn test_state_from_default_config() {
        let state = AppState::from_config(&AppConfig::default()).unwrap();
        assert_eq!(state.pipelines.len(), 3);
        assert!(state.router.is_none());
    }
}
