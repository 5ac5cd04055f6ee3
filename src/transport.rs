//! Serving the MCP handler over stdio or streamable HTTP.

use std::error::Error;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
};
use rmcp::{
    ServiceExt,
    transport::{
        stdio,
        streamable_http_server::{
            StreamableHttpServerConfig, StreamableHttpService, session::local::LocalSessionManager,
        },
    },
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::tools::LocalFind;

pub async fn serve_stdio() -> Result<(), Box<dyn Error>> {
    let service = LocalFind::new()
        .serve(stdio())
        .await
        .inspect_err(|e| error!("failed to start server: {e}"))?;

    service.waiting().await?;
    Ok(())
}

pub async fn serve_http(config: &Config) -> Result<(), Box<dyn Error>> {
    let listener = TcpListener::bind(config.bind_addr()).await?;
    info!(
        addr = %listener.local_addr()?,
        path = config.mcp_endpoint(),
        auth = config.api_key.is_some(),
        "serving MCP over streamable HTTP"
    );

    axum::serve(listener, http_router(config))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown requested");
        })
        .await?;
    Ok(())
}

/// `/health` plus the MCP service at `--mcp-path`, bearer-protected when an API key is set.
/// Each MCP session gets its own handler instance.
pub fn http_router(config: &Config) -> Router {
    let mcp = StreamableHttpService::new(
        || Ok(LocalFind::new()),
        Arc::new(LocalSessionManager::default()),
        StreamableHttpServerConfig::default(),
    );

    let mut service = Router::new().nest_service(config.mcp_endpoint(), mcp);
    if let Some(key) = &config.api_key {
        service = service.layer(middleware::from_fn_with_state(
            Arc::<str>::from(key.as_str()),
            require_bearer,
        ));
    }

    Router::new()
        .route("/health", get(health))
        .merge(service)
        .layer(TraceLayer::new_for_http())
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn require_bearer(State(key): State<Arc<str>>, request: Request, next: Next) -> Response {
    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|token| token == &*key);

    if authorized {
        next.run(request).await
    } else {
        warn!(uri = %request.uri(), "rejected request without valid API key");
        StatusCode::UNAUTHORIZED.into_response()
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    async fn spawn(args: &[&str]) -> String {
        let config =
            Config::try_parse_from(std::iter::once("localfind").chain(args.iter().copied()))
                .unwrap();
        let app = http_router(&config);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn health_is_open() {
        let base = spawn(&["--api-key", "secret"]).await;
        let body: serde_json::Value = reqwest::get(format!("{base}/health"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn mcp_endpoint_requires_bearer_key() {
        let base = spawn(&["--api-key", "secret"]).await;
        let client = reqwest::Client::new();

        let missing = client.post(format!("{base}/mcp")).send().await.unwrap();
        assert_eq!(missing.status(), reqwest::StatusCode::UNAUTHORIZED);

        let wrong = client
            .post(format!("{base}/mcp"))
            .bearer_auth("nope")
            .send()
            .await
            .unwrap();
        assert_eq!(wrong.status(), reqwest::StatusCode::UNAUTHORIZED);

        let right = client
            .post(format!("{base}/mcp"))
            .bearer_auth("secret")
            .send()
            .await
            .unwrap();
        assert_ne!(right.status(), reqwest::StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn mcp_endpoint_is_open_without_key() {
        let base = spawn(&["--mcp-path", "/rpc/"]).await;
        let response = reqwest::Client::new()
            .post(format!("{base}/rpc"))
            .send()
            .await
            .unwrap();
        assert_ne!(response.status(), reqwest::StatusCode::UNAUTHORIZED);
        assert_ne!(response.status(), reqwest::StatusCode::NOT_FOUND);
    }
}
