mod config;
mod routes_chain;
mod routes_verify;
mod source;
mod source_http;
mod state;
mod types;
mod verify_exec;
mod watch_loop;
#[cfg(test)]
mod test_support;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value as JsonValue};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use qproof::{Ed25519RootVerifier, ProofVerifier};

use crate::config::AppConfig;
use crate::source::ProofSource;
use crate::source_http::HttpProofSource;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env()?;

    let verifier = build_verifier(&cfg)?;
    info!(
        hash = verifier.hasher().name(),
        require_signatures = cfg.verifier.require_signatures,
        "verifier ready"
    );

    let source = HttpProofSource::new(cfg.backend_url.clone(), cfg.request_timeout)?;
    let src = source.info();
    // the explorer still serves POST routes while the proof server is away
    match source.ping().await {
        Ok(()) => info!(source = %src.name, backend = %src.base_url, "proof server: ok"),
        Err(e) => warn!(source = %src.name, backend = %src.base_url, "proof server unreachable: {e:#}"),
    }

    let app_state = Arc::new(AppState::new(cfg.clone(), verifier, Arc::new(source)));

    let shared_for_watch = app_state.clone();
    tokio::spawn(async move {
        crate::watch_loop::run_watch_loop(shared_for_watch).await;
    });

    let app = Router::new()
        .route("/health", get(health))
        .route("/verify/proof", post(crate::routes_verify::post_verify_proof))
        .route("/verify/proofchain", post(crate::routes_chain::post_verify_proofchain))
        .route("/verify/proofchain/:block/:thread/:leaf", get(crate::routes_chain::get_proofchain))
        .route("/verify/:block/:thread/:leaf", get(crate::routes_verify::get_verify))
        .route("/validate/:block/:thread/:leaf", get(crate::routes_verify::get_validate))
        .route("/watch", get(crate::watch_loop::get_watch))
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let addr = &cfg.bind_addr;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("explorer listening on http://{addr}");
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

fn build_verifier(cfg: &AppConfig) -> Result<ProofVerifier> {
    let mut verifier = ProofVerifier::new(cfg.verifier.clone());
    if let Some(key) = &cfg.root_public_key {
        let keys = Ed25519RootVerifier::from_hex(key).context("QPROOF_ROOT_PUBKEY")?;
        verifier = verifier.with_signature_verifier(Box::new(keys));
    }
    Ok(verifier)
}

async fn health() -> Json<JsonValue> {
    Json(json!({ "status": "ok" }))
}
