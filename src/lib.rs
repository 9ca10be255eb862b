//! logtriage -- unsupervised anomaly triage for Windows authentication logs.
//!
//! The core is the synchronous [`pipeline::analyze`] function: parse a
//! JSON event batch, encode it into a numeric feature space, fit an
//! isolation forest over that batch, and return a ranked anomaly report.
//! The HTTP surface in [`api`] is thin plumbing around it.

pub mod api;
pub mod config;
pub mod pipeline;

use anyhow::Result;

/// Start the logtriage daemon: an HTTP API around the analysis core.
pub async fn serve(bind: &str, config: config::AnalyzerConfig) -> Result<()> {
    let state = api::state::AppState { config };
    let app = api::router(state);

    let addr: std::net::SocketAddr = bind.parse()?;
    tracing::info!(%addr, "logtriage listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
