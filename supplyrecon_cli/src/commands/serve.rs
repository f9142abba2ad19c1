//! The `serve` subcommand: expose reconciliation runs over HTTP.
//!
//! `POST /reconcile` runs the engine on a blocking thread and answers with the
//! [`ReconResponse`] envelope. A second request arriving while a run is in
//! flight gets `409 Conflict`; it is never queued.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use clap::Args;
use serde_json::json;
use supplyrecon_lib::{
    ConfigStore, Db, Engine, InputSource, ReconConfig, ReconError, ReconResponse,
    ReconcileRequest, RunMode,
};

use super::resolve_db_path;

/// Arguments for the `serve` subcommand.
#[derive(Args)]
pub struct ServeArgs {
    /// SQLite database path (overrides config and SUPPLYRECON_DB)
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Address to listen on (overrides [server] bind)
    #[arg(long)]
    pub bind: Option<String>,
}

pub async fn run(args: &ServeArgs, config: &ReconConfig) -> Result<()> {
    let db_path = resolve_db_path(args.db.as_deref(), config);
    let db = Db::open(&db_path)?;
    db.init()?;

    let engine = Arc::new(Engine::new(db).with_sample_size(config.run.sample_size));
    let app = router(engine);

    let bind = args.bind.as_deref().unwrap_or(&config.server.bind);
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {}", bind))?;
    tracing::info!("Listening on {} (store {})", bind, db_path.display());

    axum::serve(listener, app).await?;
    Ok(())
}

pub fn router<S>(engine: Arc<Engine<S>>) -> Router
where
    S: InputSource + ConfigStore + Send + 'static,
{
    Router::new()
        .route("/reconcile", post(reconcile_handler::<S>))
        .route("/health", get(health))
        .with_state(engine)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn reconcile_handler<S>(
    State(engine): State<Arc<Engine<S>>>,
    body: Bytes,
) -> impl IntoResponse
where
    S: InputSource + ConfigStore + Send + 'static,
{
    let request = match parse_request(&body) {
        Ok(request) => request,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ReconResponse::failure(format!("invalid request body: {}", e))),
            )
        }
    };
    let mode = if request.include_medium {
        RunMode::with_medium()
    } else {
        RunMode::high_only()
    };

    let joined = tokio::task::spawn_blocking(move || engine.run(mode)).await;
    match joined {
        Ok(Ok(summary)) => (StatusCode::OK, Json(ReconResponse::from_summary(&summary))),
        Ok(Err(e)) => {
            tracing::warn!("Reconciliation request failed: {}", e);
            (status_for(&e), Json(ReconResponse::failure(e.to_string())))
        }
        Err(e) => {
            tracing::error!("Reconciliation task aborted: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ReconResponse::failure("reconciliation task aborted")),
            )
        }
    }
}

/// An empty body means the defaults (high-confidence only).
fn parse_request(body: &[u8]) -> Result<ReconcileRequest, serde_json::Error> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ReconcileRequest::default());
    }
    serde_json::from_slice(body)
}

fn status_for(err: &ReconError) -> StatusCode {
    match err {
        ReconError::RunInProgress => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
