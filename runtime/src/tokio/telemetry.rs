//! Utilities for collecting and reporting telemetry data.

use super::Context;
use crate::{Metrics, Spawner};
use axum::{
    http::{header, Response, StatusCode},
    routing::get,
    serve, Extension, Router,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, Registry};

/// Initialize telemetry with the given configuration.
///
/// Logs are emitted as JSON (filtered at `level`). If `metrics` is provided, an HTTP server
/// exposing `/metrics` in the Prometheus text format is spawned on that address.
pub fn init(context: Context, level: Level, metrics: Option<SocketAddr>) {
    // Create fmt layer for logging
    let fmt_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_line_number(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE);

    // Create a filter layer to set the maximum level
    let filter = tracing_subscriber::EnvFilter::new(level.to_string());

    // Expose metrics over HTTP
    if let Some(cfg) = metrics {
        context
            .with_label("metrics")
            .spawn(move |context| async move {
                // Create a listener for the metrics server
                let listener = TcpListener::bind(cfg)
                    .await
                    .expect("Could not bind to metrics address");

                // Create a router for the metrics server
                let app = Router::new()
                    .route(
                        "/metrics",
                        get(|Extension(ctx): Extension<Context>| async move {
                            Response::builder()
                                .status(StatusCode::OK)
                                .header(header::CONTENT_TYPE, "text/plain; version=0.0.4")
                                .body(ctx.encode())
                                .expect("failed to create response")
                        }),
                    )
                    .layer(Extension(context));

                // Serve the metrics over HTTP
                //
                // `serve` will spawn its own tasks using `tokio`. These will not be tracked
                // like tasks spawned by `context`.
                serve(listener, app.into_make_service())
                    .await
                    .expect("Could not serve metrics");
            });
    }

    // Set the global subscriber
    let subscriber = Registry::default().with(filter).with(fmt_layer);
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");
}
