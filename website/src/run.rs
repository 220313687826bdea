use axum::Router;
use axum::extract::FromRef;
use reqwest::ClientBuilder;
use snafu::ResultExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::Result;
use crate::config::Config;
use crate::error::{BindSnafu, HttpClientSnafu, ServeSnafu};
use crate::forms::FormRegistry;
use crate::services::tokens::{ApiTokenService, TokenService};
use crate::web::all_routes;

const MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub config: Arc<Config>,
    pub tokens: Arc<dyn TokenService>,
    pub forms: FormRegistry,
}

pub async fn run(config: Config) -> Result<()> {
    let port = config.server.port;
    let frontend_dir = config.frontend_dir.clone();
    let client = ClientBuilder::new()
        .timeout(Duration::from_secs(10))
        .build()
        .context(HttpClientSnafu {
            msg: "Unable to build HTTP client",
        })?;

    let tokens = ApiTokenService::new(client, &config.api_url);

    let state = AppState {
        config: Arc::new(config),
        tokens: Arc::new(tokens),
        forms: FormRegistry::new(),
    };

    let routes_all = Router::new()
        .merge(all_routes(state, &frontend_dir))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES)),
        );

    // Setup the server
    let ip = "127.0.0.1";
    let addr = format!("{}:{}", ip, port);
    info!("HTTP Server running on {}", addr);

    let listener = TcpListener::bind(&addr).await.context(BindSnafu { addr: addr.clone() })?;
    axum::serve(listener, routes_all.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context(ServeSnafu)?;

    info!("HTTP Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {e}");
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
