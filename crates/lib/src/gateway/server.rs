//! Gateway HTTP server: `POST /chat` plus a health check on `/`.

use crate::auth;
use crate::config::{self, Config};
use crate::gateway::protocol::{ChatReply, ChatRequest, ErrorBody};
use crate::intel;
use crate::llm::{self, Generator};
use crate::persona::Persona;
use crate::report::{self, JudgeClient, JudgeReport, Reporter};
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Shared, read-only state for request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub config: Arc<Config>,
    /// When Some, `x-api-key` must match.
    pub api_key: Option<String>,
    pub persona: Arc<Persona>,
    pub generator: Arc<dyn Generator>,
    /// None when reporting is disabled.
    pub reporter: Option<Arc<dyn Reporter>>,
}

impl GatewayState {
    pub fn new(
        config: Config,
        persona: Persona,
        generator: Arc<dyn Generator>,
        reporter: Option<Arc<dyn Reporter>>,
    ) -> Self {
        let api_key = config::resolve_api_key(&config);
        Self {
            config: Arc::new(config),
            api_key,
            persona: Arc::new(persona),
            generator,
            reporter,
        }
    }

    /// Build production state: configured LLM backend and judge client.
    pub fn from_config(config: Config, config_path: &std::path::Path) -> Result<Self> {
        let persona = Persona::from_config(&config, config_path)?;
        let generator = llm::build_generator(&config).context("building llm client")?;
        let reporter: Option<Arc<dyn Reporter>> = if config.report.enabled {
            let client = JudgeClient::from_config(&config.report).context("building report client")?;
            log::info!("reporting to {}", client.url());
            Some(Arc::new(client))
        } else {
            log::info!("reporting disabled");
            None
        };
        Ok(Self::new(config, persona, generator, reporter))
    }
}

/// Routes with permissive CORS so browser-based portals can call `/chat`.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/", get(health_http))
        .route("/chat", post(chat))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Run the gateway server; binds to config.server.bind:config.server.port.
/// When bind is not loopback, an api key must be configured or startup fails.
/// Blocks until shutdown (e.g. Ctrl+C).
pub async fn run_gateway(config: Config, config_path: PathBuf) -> Result<()> {
    let bind = config.server.bind.trim().to_string();
    let port = config.server.port;
    if config::resolve_api_key(&config).is_none() {
        if !config::is_loopback_bind(&bind) {
            anyhow::bail!(
                "refusing to bind to {} without an api key (set API_SECRET_KEY or server.apiKey)",
                bind
            );
        }
        log::warn!("no api key configured; /chat is open on loopback");
    }

    let state = GatewayState::from_config(config, &config_path)?;
    log::info!(
        "persona {} on backend {}",
        state.persona.name,
        state.generator.backend()
    );
    let app = router(state);

    let bind_addr = format!("{}:{}", bind, port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("gateway listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("gateway server exited")?;
    log::info!("gateway stopped");
    Ok(())
}

/// Future that completes on SIGINT or SIGTERM. Detached report tasks are not awaited.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::warn!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                log::warn!("failed to install SIGTERM handler: {}", e);
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
    log::info!("shutdown signal received, draining connections");
}

/// POST /chat — check key, reply in persona, extract intelligence, maybe schedule a report.
/// The body is parsed only after the key check so unauthenticated callers learn nothing.
async fn chat(State(state): State<GatewayState>, headers: HeaderMap, body: Bytes) -> Response {
    if auth::check_api_key(&headers, state.api_key.as_deref()).is_err() {
        return (StatusCode::UNAUTHORIZED, Json(ErrorBody::new("Invalid API Key"))).into_response();
    }
    let req: ChatRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => {
            log::debug!("chat: bad request body: {}", e);
            return (StatusCode::UNPROCESSABLE_ENTITY, Json(ErrorBody::new(e.to_string())))
                .into_response();
        }
    };

    let prompt = state
        .persona
        .build_prompt(&req.conversation_history, &req.message.text);
    let reply = llm::generate_or_fallback(state.generator.as_ref(), &prompt).await;

    let found = intel::extract(&req.message.text);
    let total = req.total_messages();
    log::info!(
        "chat: session {} message {} ({} identifier(s) found)",
        req.session_id,
        total,
        found.len()
    );

    if let Some(ref reporter) = state.reporter {
        if report::should_report(&found, total, state.config.report.message_threshold) {
            let report = JudgeReport::new(req.session_id, total, found, state.persona.agent_notes());
            report::schedule(reporter.clone(), report);
        }
    }

    Json(ChatReply::success(reply)).into_response()
}

/// GET / returns a simple health JSON (for uptime checks).
async fn health_http(State(state): State<GatewayState>) -> Json<serde_json::Value> {
    Json(json!({
        "runtime": "running",
        "port": state.config.server.port,
        "backend": state.generator.backend(),
    }))
}
