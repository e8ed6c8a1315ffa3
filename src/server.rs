//! HTTP surface: the webhook callback and a liveness route.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::future::join_all;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::core::{Disposition, EventRouter};
use crate::domain::WebhookBatch;

/// Build the application router.
pub fn app(router: Arc<EventRouter>) -> Router {
    Router::new()
        .route("/callback", post(callback))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(router)
}

/// Serve until the process is stopped.
pub async fn serve(router: Arc<EventRouter>, port: u16) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("Failed to bind port {port}"))?;
    info!(%port, "webhook server listening");
    axum::serve(listener, app(router))
        .await
        .context("Webhook server terminated")?;
    Ok(())
}

async fn health() -> &'static str {
    "ok"
}

/// Webhook entry point.
///
/// Events in a batch are handled concurrently. One failing event fails the
/// whole delivery with a 500 so the platform redelivers it; detached work
/// spawned by successful siblings is unaffected.
async fn callback(
    State(router): State<Arc<EventRouter>>,
    Json(batch): Json<WebhookBatch>,
) -> Result<Json<Vec<Disposition>>, StatusCode> {
    let count = batch.events.len();
    let results = join_all(batch.events.into_iter().map(|event| router.handle(event))).await;

    match results.into_iter().collect::<Result<Vec<_>, _>>() {
        Ok(dispositions) => {
            info!(events = count, "webhook batch handled");
            Ok(Json(dispositions))
        }
        Err(error) => {
            error!(error = %error, "webhook batch failed");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
