//! Ops HTTP server: shared state, router and listener.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    Router,
    extract::Request,
    middleware,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{Span, info, info_span, instrument, warn};

use clawkeeper_config::ClawkeeperConfig;
use clawkeeper_core::{GatewayEnv, Sandbox};
use clawkeeper_supervisor::{
    CliTemplate, CommandProxy, GatewayLaunch, GatewaySignature, GatewaySupervisor, ProxySettings,
};

use crate::auth::RequireAccess;
use crate::handlers;

/// Application state shared across routes.
#[derive(Clone)]
pub struct OpsState {
    pub supervisor: GatewaySupervisor,
    pub proxy: CommandProxy,
    /// Environment handed to every gateway launch.
    pub gateway_env: Arc<GatewayEnv>,
    pub access_token: Option<Arc<str>>,
}

impl OpsState {
    pub fn new(
        supervisor: GatewaySupervisor,
        proxy: CommandProxy,
        gateway_env: GatewayEnv,
        access_token: Option<String>,
    ) -> Self {
        Self {
            supervisor,
            proxy,
            gateway_env: Arc::new(gateway_env),
            access_token: access_token.map(Arc::from),
        }
    }

    /// Wire supervisor and proxy from config over the given sandbox.
    pub fn from_config(config: &ClawkeeperConfig, sandbox: Arc<dyn Sandbox>) -> Self {
        let gw = &config.gateway;
        let supervisor = GatewaySupervisor::new(
            sandbox,
            GatewayLaunch {
                command: gw.command.clone(),
                signature: GatewaySignature::new(gw.signatures.iter().cloned()),
                grace_period: gw.grace_period(),
            },
        );
        let proxy = CommandProxy::new(
            supervisor.clone(),
            ProxySettings {
                cli: CliTemplate {
                    binary: gw.cli_binary.clone(),
                    control_url: gw.control_url.clone(),
                },
                timeout: gw.command_timeout(),
                poll_interval: gw.poll_interval(),
                timeout_policy: gw.timeout_policy,
            },
        );
        Self::new(
            supervisor,
            proxy,
            gw.gateway_env(),
            config.server.access_token.clone(),
        )
    }
}

/// Build the router. `/health` is public; every other route sits behind
/// the access guard.
pub fn build_router(state: OpsState) -> Router {
    let guarded = Router::new()
        .route("/status", get(handlers::get_status))
        .route("/processes", get(handlers::list_processes))
        .route("/logs", get(handlers::get_logs))
        .route("/restart", post(handlers::restart))
        .route("/config/get", get(handlers::config_get))
        .route("/config/set", post(handlers::config_set))
        .route_layer(middleware::from_extractor_with_state::<RequireAccess, _>(
            state.clone(),
        ));

    Router::new()
        .route("/health", get(handlers::health))
        .merge(guarded)
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .with_state(state)
}

/// Request span with method and path only. Query strings carry config
/// values such as `gateway.auth.token` and never reach the logs.
fn request_span(req: &Request) -> Span {
    info_span!("ops_request", method = %req.method(), path = %req.uri().path())
}

/// Starts the ops HTTP server and serves until ctrl-c.
#[instrument(skip(state))]
pub async fn start_server(addr: SocketAddr, state: OpsState) -> Result<()> {
    if state.access_token.is_none() {
        warn!("No access token configured; ops routes are open to any caller");
    }
    let app = build_router(state);

    let listener = TcpListener::bind(&addr).await?;
    info!("Ops HTTP server listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Ops HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
